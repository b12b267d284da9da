// 🔍 Screening Engine - verdicts against the behavioral baseline
// Ordered decision policy, cheapest checks first; pure function of inputs

use crate::baseline::ProfileMap;
use crate::ledger::Transaction;
use chrono::Duration;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Screening thresholds. Configuration, not hard-coded constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningConfig {
    /// How far a transaction may predate a party's first observed
    /// activity before it is considered stale (seconds)
    pub grace_window_seconds: i64,

    /// A transaction is an outlier when its amount exceeds the sender's
    /// historical average by more than this factor
    pub outlier_multiplier: f64,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        ScreeningConfig {
            grace_window_seconds: 86_400,
            outlier_multiplier: 10.0,
        }
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// Why a transaction was admitted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictReason {
    Ok,
    UnknownCounterparty,
    AmountOutlier,
    StaleTimestamp,
    Malformed,
}

impl VerdictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictReason::Ok => "OK",
            VerdictReason::UnknownCounterparty => "UNKNOWN_COUNTERPARTY",
            VerdictReason::AmountOutlier => "AMOUNT_OUTLIER",
            VerdictReason::StaleTimestamp => "STALE_TIMESTAMP",
            VerdictReason::Malformed => "MALFORMED",
        }
    }
}

/// One screening decision. Ephemeral - produced per call, persisted only
/// implicitly through ledger membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub transaction: Transaction,
    pub admitted: bool,
    pub reason: VerdictReason,
}

impl Verdict {
    fn admit(transaction: Transaction) -> Self {
        Verdict {
            transaction,
            admitted: true,
            reason: VerdictReason::Ok,
        }
    }

    fn reject(transaction: Transaction, reason: VerdictReason) -> Self {
        Verdict {
            transaction,
            admitted: false,
            reason,
        }
    }
}

// ============================================================================
// SCREENING
// ============================================================================

/// Screen one candidate transaction against the current baseline.
///
/// Ordered policy, first match wins:
/// 1. structurally invalid                          → MALFORMED
/// 2. predates a known party's history (+ grace)    → STALE_TIMESTAMP
/// 3. neither party known to the baseline           → UNKNOWN_COUNTERPARTY
/// 4. amount >> sender's historical average         → AMOUNT_OUTLIER
/// 5. otherwise                                     → OK
pub fn screen(tx: &Transaction, profiles: &ProfileMap, config: &ScreeningConfig) -> Verdict {
    if !tx.is_well_formed() {
        return Verdict::reject(tx.clone(), VerdictReason::Malformed);
    }

    let sender_profile = profiles.get(&tx.sender);
    let receiver_profile = profiles.get(&tx.receiver);

    // Rule 1: timestamp predates a known party's earliest activity by more
    // than the grace window
    let grace = Duration::seconds(config.grace_window_seconds);
    for profile in [sender_profile, receiver_profile].into_iter().flatten() {
        if tx.timestamp < profile.first_seen - grace {
            return Verdict::reject(tx.clone(), VerdictReason::StaleTimestamp);
        }
    }

    // Rule 2: an account with no history at all cannot be evaluated
    if sender_profile.is_none() && receiver_profile.is_none() {
        return Verdict::reject(tx.clone(), VerdictReason::UnknownCounterparty);
    }

    // Rule 3: amount outlier relative to the sender's outgoing history.
    // A sender with no outgoing history has no average to compare against.
    if let Some(average) = sender_profile.and_then(|p| p.average_sent()) {
        if tx.amount > average * config.outlier_multiplier {
            return Verdict::reject(tx.clone(), VerdictReason::AmountOutlier);
        }
    }

    Verdict::admit(tx.clone())
}

// ============================================================================
// TESTS
// ============================================================================
