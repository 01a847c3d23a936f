//! `pinchat hash-pin`: print the Argon2id hash of a PIN.

use pinchat_config::AppConfig;
use pinchat_security::{Pin, PinHasher};

pub async fn run(raw: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let pin = Pin::parse(raw, config.pin.length)?;
    let hasher = PinHasher::from_config(&config.pin)?;
    let hash = hasher.hash(&pin)?;

    println!("{hash}");
    Ok(())
}
