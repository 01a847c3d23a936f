//! `pinchat provision`: create a PIN record in the configured store.

use std::sync::Arc;

use pinchat_config::AppConfig;
use pinchat_core::error::{Error, StoreError};
use pinchat_core::identity::PinRecord;
use pinchat_security::{AuditEvent, AuditLogger, AuditOutcome, IdentityResolver, Pin, PinHasher};

pub async fn run(pin: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let length = config.pin.length;

    let (pin, generated) = match pin {
        Some(raw) => (Pin::parse(&raw, length)?, false),
        None => (Pin::generate(length), true),
    };

    let stores = pinchat_memory::open(&config.database).await?;
    let hasher = Arc::new(PinHasher::from_config(&config.pin)?);
    let audit = Arc::new(AuditLogger::tracing());
    let resolver = IdentityResolver::new(stores.pins, hasher).with_audit(audit.clone());

    let record = match provision(&resolver, &audit, &pin).await {
        Ok(record) => record,
        Err(Error::Store(StoreError::Duplicate(_))) => {
            println!("❌ That PIN is already provisioned. Choose another.");
            return Err("duplicate PIN".into());
        }
        Err(e) => return Err(e.into()),
    };

    println!("✅ PIN provisioned");
    println!("   Identity: {}", record.id);
    if generated {
        println!("   PIN:      {}", pin.expose());
        println!("   Store the PIN now: it cannot be recovered from the hash.");
    }

    Ok(())
}

/// Resolve, then insert. A PIN that already resolves is refused with
/// [`StoreError::Duplicate`].
async fn provision(
    resolver: &IdentityResolver,
    audit: &AuditLogger,
    pin: &Pin,
) -> Result<PinRecord, Error> {
    match resolver.provision(pin).await {
        Ok(record) => {
            audit.log(
                AuditEvent::Provision,
                record.id.as_str(),
                AuditOutcome::Success,
                None,
            );
            Ok(record)
        }
        Err(e) => {
            audit.log(
                AuditEvent::Provision,
                "anonymous",
                AuditOutcome::Failure,
                Some(e.to_string()),
            );
            Err(e)
        }
    }
}
