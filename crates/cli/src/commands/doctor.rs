//! `pinchat doctor`: diagnose configuration and store health.

use pinchat_config::AppConfig;

pub async fn run(check_provider: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 PinChat Doctor");
    println!("=================\n");

    let mut issues = 0;

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Cannot continue without a valid config.");
            return Ok(());
        }
    };

    if config.session.jwt_secret.as_deref().is_some_and(|s| !s.is_empty()) {
        println!("  ✅ JWT secret set");
    } else {
        println!("  ❌ No JWT secret: set JWT_SECRET");
        issues += 1;
    }

    if config.model.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
        println!("  ✅ Model API key set");
    } else {
        println!("  ❌ No model API key: set GEMINI_API_KEY");
        issues += 1;
    }

    match pinchat_memory::open(&config.database).await {
        Ok(stores) => match stores.pins.count().await {
            Ok(0) => {
                println!("  ⚠️  Store reachable, but no PINs provisioned: run `pinchat provision`");
                issues += 1;
            }
            Ok(n) => println!("  ✅ Store reachable ({n} PINs)"),
            Err(e) => {
                println!("  ❌ Store query failed: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Store unreachable: {e}");
            issues += 1;
        }
    }

    if check_provider {
        match pinchat_providers::build_from_config(&config.model) {
            Ok(provider) => match provider.health_check().await {
                Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
                Ok(false) => {
                    println!("  ❌ Provider '{}' rejected the health check", provider.name());
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Provider health check failed: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  ❌ Provider not configured: {e}");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
