// 📒 Validated Ledger - append-only store of admitted transactions
// Deduplicated by identity hash, ordered by admission

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

// ============================================================================
// TRANSACTION
// ============================================================================

/// A single ledger transaction. Immutable once admitted.
///
/// Identity for deduplication is the full (sender, receiver, amount,
/// timestamp) tuple - there is no surrogate key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Transaction {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
        }
    }

    /// Compute identity hash for duplicate detection
    ///
    /// Two transactions with the same tuple always produce the same hash,
    /// so re-inserting an admitted transaction is a no-op.
    pub fn identity_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}",
            self.sender,
            self.receiver,
            self.amount,
            self.timestamp.to_rfc3339()
        ));
        format!("{:x}", hasher.finalize())
    }

    /// Structural validity: non-blank parties, finite non-negative amount.
    /// Screening treats anything that fails this as MALFORMED.
    pub fn is_well_formed(&self) -> bool {
        !self.sender.trim().is_empty()
            && !self.receiver.trim().is_empty()
            && self.amount.is_finite()
            && self.amount >= 0.0
    }
}

// ============================================================================
// VALIDATED LEDGER
// ============================================================================

/// Append-only, deduplicated sequence of admitted transactions.
///
/// No update or delete is exposed; the ledger only grows for the lifetime
/// of the process.
#[derive(Debug, Default)]
pub struct ValidatedLedger {
    entries: Vec<Transaction>,
    seen: HashSet<String>,
}

impl ValidatedLedger {
    pub fn new() -> Self {
        ValidatedLedger {
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Idempotent insert: returns false (and changes nothing) when the
    /// identity tuple is already present.
    pub fn insert(&mut self, tx: Transaction) -> bool {
        let hash = tx.identity_hash();
        if !self.seen.insert(hash) {
            return false;
        }
        self.entries.push(tx);
        true
    }

    /// Snapshot of all entries in admission order.
    ///
    /// Returns a copy so callers never observe a torn read while another
    /// request is inserting.
    pub fn all(&self) -> Vec<Transaction> {
        self.entries.clone()
    }

    pub fn contains(&self, tx: &Transaction) -> bool {
        self.seen.contains(&tx.identity_hash())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tx(sender: &str, receiver: &str, amount: f64, secs: i64) -> Transaction {
        Transaction::new(
            sender,
            receiver,
            amount,
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
    }

    #[test]
    fn test_identity_hash_stable() {
        let t = tx("alice", "bob", 42.5, 1_700_000_000);
        let hash1 = t.identity_hash();
        let hash2 = t.clone().identity_hash();

        assert_eq!(hash1, hash2, "Same tuple should produce same hash");
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_identity_hash_differs_per_field() {
        let base = tx("alice", "bob", 42.5, 1_700_000_000);

        assert_ne!(base.identity_hash(), tx("carol", "bob", 42.5, 1_700_000_000).identity_hash());
        assert_ne!(base.identity_hash(), tx("alice", "dave", 42.5, 1_700_000_000).identity_hash());
        assert_ne!(base.identity_hash(), tx("alice", "bob", 42.6, 1_700_000_000).identity_hash());
        assert_ne!(base.identity_hash(), tx("alice", "bob", 42.5, 1_700_000_001).identity_hash());
    }

    #[test]
    fn test_insert_idempotent() {
        let mut ledger = ValidatedLedger::new();
        let t = tx("alice", "bob", 100.0, 1_700_000_000);

        assert!(ledger.insert(t.clone()));
        assert_eq!(ledger.len(), 1);

        // Second insert of the same identity tuple is a no-op, not an error
        assert!(!ledger.insert(t));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_all_preserves_admission_order() {
        let mut ledger = ValidatedLedger::new();
        let first = tx("alice", "bob", 10.0, 1_700_000_300);
        let second = tx("bob", "carol", 20.0, 1_700_000_100);
        let third = tx("carol", "alice", 30.0, 1_700_000_200);

        ledger.insert(first.clone());
        ledger.insert(second.clone());
        ledger.insert(third.clone());

        // Admission order, not timestamp order
        assert_eq!(ledger.all(), vec![first, second, third]);
    }

    #[test]
    fn test_all_returns_snapshot() {
        let mut ledger = ValidatedLedger::new();
        ledger.insert(tx("alice", "bob", 10.0, 1_700_000_000));

        let snapshot = ledger.all();
        ledger.insert(tx("bob", "carol", 20.0, 1_700_000_001));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_contains() {
        let mut ledger = ValidatedLedger::new();
        let t = tx("alice", "bob", 10.0, 1_700_000_000);

        assert!(!ledger.contains(&t));
        ledger.insert(t.clone());
        assert!(ledger.contains(&t));
    }

    #[test]
    fn test_is_well_formed() {
        assert!(tx("alice", "bob", 0.0, 0).is_well_formed());
        assert!(!tx("", "bob", 10.0, 0).is_well_formed());
        assert!(!tx("alice", "   ", 10.0, 0).is_well_formed());
        assert!(!tx("alice", "bob", -1.0, 0).is_well_formed());
        assert!(!tx("alice", "bob", f64::NAN, 0).is_well_formed());
    }
}
