// 🗄️ Oracle Store - single owner of mutable process state
// Current baseline, validated ledger, and oracle-data map behind locks

use crate::baseline::{build_baseline, ProfileMap};
use crate::ledger::{Transaction, ValidatedLedger};
use crate::parser::{decode_csv_base64, parse_batch};
use crate::screening::{screen, ScreeningConfig, Verdict};
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

// ============================================================================
// REPORTS
// ============================================================================

/// Outcome of one batch upload.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub accepted: usize,
    pub skipped: usize,

    /// False when zero valid rows parsed and the prior baseline was kept
    #[serde(skip)]
    pub updated: bool,
}

impl BatchReport {
    /// Structured error code for the caller; EMPTY_BATCH is non-fatal.
    pub fn error_code(&self) -> Option<&'static str> {
        if self.updated {
            None
        } else {
            Some("EMPTY_BATCH")
        }
    }
}

/// Outcome of one candidate submission: the verdict plus whether the
/// ledger actually grew (false for rejections and duplicates).
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    #[serde(flatten)]
    pub verdict: Verdict,
    pub inserted: bool,
}

// ============================================================================
// ORACLE STORE
// ============================================================================

/// Process-scoped oracle state.
///
/// Locking discipline: the profile map sits behind a RwLock and is swapped
/// wholesale on upload, so a concurrent screening call sees either the old
/// baseline in full or the new one in full. Ledger inserts are serialized
/// by a Mutex, so a duplicate race admits at most one copy. Oracle data is
/// an independent last-write-wins map.
#[derive(Debug, Default)]
pub struct OracleStore {
    profiles: RwLock<ProfileMap>,
    ledger: Mutex<ValidatedLedger>,
    oracle_data: Mutex<HashMap<String, Value>>,
    config: ScreeningConfig,
}

impl OracleStore {
    pub fn new(config: ScreeningConfig) -> Self {
        OracleStore {
            profiles: RwLock::new(ProfileMap::new()),
            ledger: Mutex::new(ValidatedLedger::new()),
            oracle_data: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Baseline
    // ------------------------------------------------------------------

    /// Ingest a historical batch and replace the current baseline.
    ///
    /// The new profile map is built completely before the write lock is
    /// taken, so the swap is all-or-nothing. Zero valid rows leaves the
    /// prior baseline untouched (EMPTY_BATCH).
    pub fn upload_batch(&self, csv_text: &str) -> Result<BatchReport> {
        let batch = parse_batch(csv_text)?;

        if batch.is_empty() {
            return Ok(BatchReport {
                accepted: 0,
                skipped: batch.skipped,
                updated: false,
            });
        }

        let fresh = build_baseline(&batch.transactions);
        *self.profiles.write().unwrap() = fresh;

        Ok(BatchReport {
            accepted: batch.accepted,
            skipped: batch.skipped,
            updated: true,
        })
    }

    /// Upload variant for the HTTP surface: base64-encoded CSV.
    pub fn upload_batch_base64(&self, encoded: &str) -> Result<BatchReport> {
        let csv_text = decode_csv_base64(encoded)?;
        self.upload_batch(&csv_text)
    }

    /// Snapshot of the current baseline (for reporting/diagnostics).
    pub fn profiles(&self) -> ProfileMap {
        self.profiles.read().unwrap().clone()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.read().unwrap().len()
    }

    // ------------------------------------------------------------------
    // Screening + admission
    // ------------------------------------------------------------------

    /// Screen one candidate and, if admitted, insert it into the ledger.
    ///
    /// The profile read lock is dropped before the ledger lock is taken;
    /// screening itself is pure and needs no ledger access.
    pub fn submit(&self, tx: Transaction) -> Submission {
        let verdict = {
            let profiles = self.profiles.read().unwrap();
            screen(&tx, &profiles, &self.config)
        };

        let inserted = if verdict.admitted {
            self.ledger.lock().unwrap().insert(tx)
        } else {
            false
        };

        Submission { verdict, inserted }
    }

    /// All admitted transactions, in admission order.
    pub fn valid_transactions(&self) -> Vec<Transaction> {
        self.ledger.lock().unwrap().all()
    }

    pub fn ledger_len(&self) -> usize {
        self.ledger.lock().unwrap().len()
    }

    // ------------------------------------------------------------------
    // Oracle data (out-of-band key/value side channel)
    // ------------------------------------------------------------------

    /// Write or overwrite one datum. Last write wins per key.
    pub fn put_oracle_datum(&self, key: impl Into<String>, value: Value) {
        self.oracle_data.lock().unwrap().insert(key.into(), value);
    }

    /// Snapshot of the full oracle-data map.
    pub fn oracle_data(&self) -> HashMap<String, Value> {
        self.oracle_data.lock().unwrap().clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================
