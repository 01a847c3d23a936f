//! Audit logging for authentication events.
//!
//! Every login attempt and every rejected session token produces one entry.
//! Entries never carry PIN digits or token contents; the subject is either a
//! resolved identity or a coarse client descriptor.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    /// Identity id when known, otherwise `"anonymous"`.
    pub subject: String,
    pub outcome: AuditOutcome,
    pub details: Option<String>,
}

/// Auditable authentication events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A PIN was submitted to the login endpoint
    Login,
    /// A session token was presented with a chat request
    TokenCheck,
    /// A PIN record was provisioned from the CLI
    Provision,
    /// Resolution found more than one record for a PIN
    DuplicatePin,
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

/// Where audit entries are written.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Keeps entries in memory and forwards each to its sinks.
pub struct AuditLogger {
    entries: Mutex<Vec<AuditEntry>>,
    sinks: Vec<Box<dyn AuditSink>>,
    /// Cap on retained entries; the oldest are dropped first.
    retain: usize,
}

const DEFAULT_RETAIN: usize = 1024;

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entry_count", &self.lock().len())
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            sinks,
            retain: DEFAULT_RETAIN,
        }
    }

    /// Logger that only writes through [`TracingSink`].
    pub fn tracing() -> Self {
        Self::with_sinks(vec![Box::new(TracingSink)])
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn log(
        &self,
        event: AuditEvent,
        subject: &str,
        outcome: AuditOutcome,
        details: Option<String>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event,
            subject: subject.into(),
            outcome,
            details,
        };

        for sink in &self.sinks {
            sink.record(&entry);
        }

        let mut entries = self.lock();
        if entries.len() >= self.retain {
            let excess = entries.len() + 1 - self.retain;
            entries.drain(..excess);
        }
        entries.push(entry);
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().clone()
    }

    pub fn entries_by_outcome(&self, outcome: &AuditOutcome) -> Vec<AuditEntry> {
        self.lock()
            .iter()
            .filter(|e| &e.outcome == outcome)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

/// Writes entries as structured `tracing` events on the `audit` target.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        match entry.outcome {
            AuditOutcome::Success => tracing::info!(
                target: "audit",
                event = ?entry.event,
                subject = %entry.subject,
                outcome = ?entry.outcome,
                details = ?entry.details,
                "AUDIT"
            ),
            AuditOutcome::Failure | AuditOutcome::Denied => tracing::warn!(
                target: "audit",
                event = ?entry.event,
                subject = %entry.subject,
                outcome = ?entry.outcome,
                details = ?entry.details,
                "AUDIT"
            ),
        }
    }
}
