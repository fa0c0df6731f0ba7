//! # Diagnostics Ledger
//!
//! Append-only record of every failure the module system absorbed, keyed by a
//! generated incident id plus a short description. Informational notes (such
//! as ambiguous capability lookups) are kept in a separate list so they never
//! count as failures.
use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use log::{info, warn};
use uuid::Uuid;

/// Snapshot of one absorbed failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    /// Top-level error message
    pub message: String,
    /// Messages of the error's `source()` chain, outermost first
    pub causes: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

impl Incident {
    pub fn from_error(error: &(dyn StdError + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            message: error.to_string(),
            causes,
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    incidents: HashMap<String, Incident>,
    notes: Vec<String>,
}

/// Shared by every component of a registry (`Arc<DiagnosticsLedger>`).
#[derive(Debug, Default)]
pub struct DiagnosticsLedger {
    state: Mutex<LedgerState>,
}

impl DiagnosticsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a failure under an explicit key. A colliding key overwrites.
    pub fn record(&self, key: impl Into<String>, error: &(dyn StdError + 'static)) {
        let key = key.into();
        warn!("{}: {}", key, error);
        self.state().incidents.insert(key, Incident::from_error(error));
    }

    /// Record a failure under a fresh `"<uuid> - <context>"` key and return it.
    pub fn record_failure(&self, context: &str, error: &(dyn StdError + 'static)) -> String {
        let key = format!("{} - {}", Uuid::new_v4(), context);
        self.record(key.clone(), error);
        key
    }

    /// Keep an informational note.
    pub fn note(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.state().notes.push(message);
    }

    pub fn has_incidents(&self) -> bool {
        !self.state().incidents.is_empty()
    }

    pub fn incident_count(&self) -> usize {
        self.state().incidents.len()
    }

    /// Snapshot every incident, optionally clearing the ledger under the same lock.
    pub fn drain_all(&self, clear: bool) -> HashMap<String, Incident> {
        let mut state = self.state();
        if clear {
            std::mem::take(&mut state.incidents)
        } else {
            state.incidents.clone()
        }
    }

    /// Snapshot the notes, optionally clearing them.
    pub fn drain_notes(&self, clear: bool) -> Vec<String> {
        let mut state = self.state();
        if clear {
            std::mem::take(&mut state.notes)
        } else {
            state.notes.clone()
        }
    }
}
