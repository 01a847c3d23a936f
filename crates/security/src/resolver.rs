//! Identity resolution: find the PIN record a plaintext PIN belongs to.
//!
//! Hashes are salted per record, so there is no key to look a PIN up by.
//! Resolution loads every record and compares the PIN against each hash in
//! stored order. The first match wins. With duplicate auditing on (the
//! default) the scan continues past it and any further match is reported as
//! a [`AuditEvent::DuplicatePin`] failure. The scan costs one Argon2
//! evaluation per provisioned PIN.

use std::sync::Arc;

use pinchat_core::error::{Error, StoreError};
use pinchat_core::identity::PinRecord;
use pinchat_core::store::PinStore;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditEvent, AuditLogger, AuditOutcome};
use crate::pin::{Pin, PinHasher};

/// Resolves plaintext PINs to identities.
pub struct IdentityResolver {
    store: Arc<dyn PinStore>,
    hasher: Arc<PinHasher>,
    audit: Arc<AuditLogger>,
    /// Scan every record and report duplicate matches instead of stopping
    /// at the first one.
    audit_duplicates: bool,
}

/// Result of one pass over the PIN records.
struct ScanOutcome {
    matched: Option<PinRecord>,
    duplicates: usize,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn PinStore>, hasher: Arc<PinHasher>) -> Self {
        Self {
            store,
            hasher,
            audit: Arc::new(AuditLogger::tracing()),
            audit_duplicates: true,
        }
    }

    pub fn with_duplicate_audit(mut self, enabled: bool) -> Self {
        self.audit_duplicates = enabled;
        self
    }

    /// Share an audit logger for duplicate-match reports.
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Resolve `pin` to its record. `Ok(None)` means no record matched.
    pub async fn resolve(&self, pin: &Pin) -> Result<Option<PinRecord>, Error> {
        let records = self.store.all().await?;
        debug!(records = records.len(), "Scanning PIN records");

        let hasher = self.hasher.clone();
        let pin = pin.clone();
        let full_scan = self.audit_duplicates;

        // Argon2 is CPU-bound; keep it off the async workers.
        let outcome = tokio::task::spawn_blocking(move || scan(&hasher, &pin, records, full_scan))
            .await
            .map_err(|e| Error::Internal(format!("PIN scan task failed: {e}")))?;

        if let Some(record) = &outcome.matched {
            if outcome.duplicates > 0 {
                error!(
                    identity = %record.id,
                    duplicates = outcome.duplicates,
                    "Data-integrity fault: duplicate PIN records, first stored record wins"
                );
                self.audit.log(
                    AuditEvent::DuplicatePin,
                    record.id.as_str(),
                    AuditOutcome::Failure,
                    Some(format!("{} additional records match", outcome.duplicates)),
                );
            }
        }

        Ok(outcome.matched)
    }

    /// Provision a new PIN. Fails if the PIN already resolves to a record,
    /// since salted hashes cannot be deduplicated by the store itself.
    pub async fn provision(&self, pin: &Pin) -> Result<PinRecord, Error> {
        if self.resolve(pin).await?.is_some() {
            return Err(StoreError::Duplicate("PIN is already provisioned".into()).into());
        }

        let hasher = self.hasher.clone();
        let pin = pin.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&pin))
            .await
            .map_err(|e| Error::Internal(format!("PIN hash task failed: {e}")))?
            .map_err(|e| Error::Internal(e.to_string()))?;

        let record = PinRecord::new(hash);
        self.store.insert(record.clone()).await?;
        info!(identity = %record.id, "Provisioned PIN record");
        Ok(record)
    }
}

fn scan(hasher: &PinHasher, pin: &Pin, records: Vec<PinRecord>, full_scan: bool) -> ScanOutcome {
    let mut matched: Option<PinRecord> = None;
    let mut duplicates = 0usize;

    for record in records {
        if record.pin_hash.is_empty() {
            warn!(identity = %record.id, "Skipping PIN record with empty hash");
            continue;
        }

        match hasher.verify(pin, &record.pin_hash) {
            Ok(true) if matched.is_none() => {
                matched = Some(record);
                if !full_scan {
                    break;
                }
            }
            Ok(true) => {
                duplicates += 1;
                error!(identity = %record.id, "PIN matches more than one record");
            }
            Ok(false) => {}
            Err(e) => {
                warn!(identity = %record.id, error = %e, "Skipping PIN record with unreadable hash");
            }
        }
    }

    ScanOutcome { matched, duplicates }
}
