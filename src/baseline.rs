// 📊 Baseline Builder - per-account behavioral profiles
// Single pass, order-independent accumulation over a historical batch

use crate::ledger::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Profile map keyed by account id. The whole map is replaced on each
/// successful batch upload.
pub type ProfileMap = HashMap<String, AccountProfile>;

// ============================================================================
// ACCOUNT PROFILE
// ============================================================================

/// Aggregate historical statistics for one account.
///
/// Derived from the uploaded batch only; never mutated directly by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    /// Transactions where this account was the sender
    pub sent_count: usize,

    /// Transactions where this account was the receiver
    pub received_count: usize,

    /// Total amount sent
    pub total_sent: f64,

    /// Total amount received
    pub total_received: f64,

    /// Earliest observed activity (either direction)
    pub first_seen: DateTime<Utc>,

    /// Latest observed activity (either direction)
    pub last_seen: DateTime<Utc>,

    /// Accounts this one has transacted with, either direction.
    /// BTreeSet keeps serialization deterministic.
    pub counterparties: BTreeSet<String>,
}

impl AccountProfile {
    fn seed(timestamp: DateTime<Utc>) -> Self {
        AccountProfile {
            sent_count: 0,
            received_count: 0,
            total_sent: 0.0,
            total_received: 0.0,
            first_seen: timestamp,
            last_seen: timestamp,
            counterparties: BTreeSet::new(),
        }
    }

    fn observe(&mut self, timestamp: DateTime<Utc>, counterparty: &str) {
        self.first_seen = self.first_seen.min(timestamp);
        self.last_seen = self.last_seen.max(timestamp);
        self.counterparties.insert(counterparty.to_string());
    }

    fn record_outgoing(&mut self, tx: &Transaction) {
        self.sent_count += 1;
        self.total_sent += tx.amount;
        self.observe(tx.timestamp, &tx.receiver);
    }

    fn record_incoming(&mut self, tx: &Transaction) {
        self.received_count += 1;
        self.total_received += tx.amount;
        self.observe(tx.timestamp, &tx.sender);
    }

    /// Average outgoing amount; None when the account never sent.
    pub fn average_sent(&self) -> Option<f64> {
        if self.sent_count == 0 {
            return None;
        }
        Some(self.total_sent / self.sent_count as f64)
    }

    /// Average incoming amount; None when the account never received.
    pub fn average_received(&self) -> Option<f64> {
        if self.received_count == 0 {
            return None;
        }
        Some(self.total_received / self.received_count as f64)
    }

    /// Sent/received volume ratio; None when nothing was received.
    pub fn in_out_ratio(&self) -> Option<f64> {
        if self.total_received == 0.0 {
            return None;
        }
        Some(self.total_sent / self.total_received)
    }

    pub fn transaction_count(&self) -> usize {
        self.sent_count + self.received_count
    }
}

// ============================================================================
// BASELINE BUILDER
// ============================================================================

/// Build per-account profiles from a historical batch.
///
/// Accumulation is commutative and associative (counts, sums, min/max,
/// set union), so any row order yields the same profiles. Caveat: the
/// amount totals are f64 sums, so permutation invariance is exact only up
/// to float rounding in the last bit; screening compares against a wide
/// multiplier, which is insensitive at that scale.
pub fn build_baseline(batch: &[Transaction]) -> ProfileMap {
    let mut profiles = ProfileMap::new();

    for tx in batch {
        profiles
            .entry(tx.sender.clone())
            .or_insert_with(|| AccountProfile::seed(tx.timestamp))
            .record_outgoing(tx);

        profiles
            .entry(tx.receiver.clone())
            .or_insert_with(|| AccountProfile::seed(tx.timestamp))
            .record_incoming(tx);
    }

    profiles
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

    fn sample_batch() -> Vec<Transaction> {
        vec![
            tx("alice", "bob", 100.0, 1_000),
            tx("alice", "carol", 200.0, 2_000),
            tx("bob", "alice", 50.0, 3_000),
            tx("carol", "bob", 25.0, 4_000),
        ]
    }

    #[test]
    fn test_profile_aggregates() {
        let profiles = build_baseline(&sample_batch());
        let alice = &profiles["alice"];

        assert_eq!(alice.sent_count, 2);
        assert_eq!(alice.received_count, 1);
        assert_eq!(alice.total_sent, 300.0);
        assert_eq!(alice.total_received, 50.0);
        assert_eq!(alice.average_sent(), Some(150.0));
        assert_eq!(alice.average_received(), Some(50.0));
        assert_eq!(alice.in_out_ratio(), Some(6.0));
        assert_eq!(alice.transaction_count(), 3);
    }

    #[test]
    fn test_first_and_last_seen_span_both_directions() {
        let profiles = build_baseline(&sample_batch());
        let bob = &profiles["bob"];

        // bob first appears as receiver at t=1000, last as receiver at t=4000
        assert_eq!(bob.first_seen, Utc.timestamp_opt(1_000, 0).unwrap());
        assert_eq!(bob.last_seen, Utc.timestamp_opt(4_000, 0).unwrap());
    }

    #[test]
    fn test_counterparties_both_directions() {
        let profiles = build_baseline(&sample_batch());
        let bob = &profiles["bob"];

        let expected: BTreeSet<String> =
            ["alice", "carol"].iter().map(|s| s.to_string()).collect();
        assert_eq!(bob.counterparties, expected);
    }

    #[test]
    fn test_receive_only_account() {
        let batch = vec![tx("alice", "bob", 100.0, 1_000)];
        let profiles = build_baseline(&batch);
        let bob = &profiles["bob"];

        assert_eq!(bob.sent_count, 0);
        assert_eq!(bob.average_sent(), None);
        assert_eq!(bob.in_out_ratio(), None);
    }

    #[test]
    fn test_order_independence() {
        let batch = sample_batch();
        let mut reversed = batch.clone();
        reversed.reverse();
        let mut rotated = batch.clone();
        rotated.rotate_left(2);

        let reference = build_baseline(&batch);
        assert_eq!(reference, build_baseline(&reversed));
        assert_eq!(reference, build_baseline(&rotated));
    }

    #[test]
    fn test_empty_batch_yields_empty_map() {
        assert!(build_baseline(&[]).is_empty());
    }
}
