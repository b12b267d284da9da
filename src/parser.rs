// 🏗️ Batch Parser - base64 CSV → Transactions
// Malformed rows are skipped and counted, never fatal to the batch

use crate::ledger::Transaction;
use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

// ============================================================================
// PARSED BATCH
// ============================================================================

/// Result of parsing one uploaded batch.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedBatch {
    /// Rows that parsed into well-formed transactions
    #[serde(skip)]
    pub transactions: Vec<Transaction>,

    /// Count of accepted rows (= transactions.len())
    pub accepted: usize,

    /// Count of rows skipped as malformed
    pub skipped: usize,
}

impl ParsedBatch {
    pub fn is_empty(&self) -> bool {
        self.accepted == 0
    }
}

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

/// Column indices resolved from the header row.
///
/// Two header dialects are recognized: the native
/// `sender,receiver,amount,timestamp` layout and the legacy wallet-export
/// layout `input_address,output_address,transaction_value_btc,timestamp`.
struct ColumnLayout {
    sender: usize,
    receiver: usize,
    amount: usize,
    timestamp: usize,
}

impl ColumnLayout {
    fn detect(headers: &csv::StringRecord) -> Result<Self> {
        let find = |names: &[&str]| -> Option<usize> {
            headers.iter().position(|h| {
                let h = h.trim().to_lowercase();
                names.iter().any(|n| h == *n)
            })
        };

        let sender = find(&["sender", "input_address"]);
        let receiver = find(&["receiver", "output_address"]);
        let amount = find(&["amount", "transaction_value_btc"]);
        let timestamp = find(&["timestamp"]);

        match (sender, receiver, amount, timestamp) {
            (Some(sender), Some(receiver), Some(amount), Some(timestamp)) => Ok(ColumnLayout {
                sender,
                receiver,
                amount,
                timestamp,
            }),
            _ => Err(anyhow!(
                "CSV header missing required columns (need sender, receiver, amount, timestamp)"
            )),
        }
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// Decode a base64-encoded CSV payload into text.
///
/// Invalid base64 is a request-level error, not a skipped row.
pub fn decode_csv_base64(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .context("Payload is not valid base64")?;
    String::from_utf8(bytes).context("Decoded CSV is not valid UTF-8")
}

/// Parse timestamp from string.
///
/// Accepted formats, tried in order: RFC 3339 / ISO-8601 (with Z or offset),
/// ISO-8601 without a zone designator (assumed UTC - browser clients strip
/// the Z before posting), "YYYY-MM-DD HH:MM:SS" (assumed UTC), "YYYY-MM-DD"
/// (midnight UTC), and integer Unix epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    if let Ok(secs) = raw.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }

    None
}

/// Parse one CSV row into a Transaction. None = malformed, skip.
fn parse_row(record: &csv::StringRecord, layout: &ColumnLayout) -> Option<Transaction> {
    let sender = record.get(layout.sender)?.trim();
    let receiver = record.get(layout.receiver)?.trim();
    let amount: f64 = record.get(layout.amount)?.trim().parse().ok()?;
    let timestamp = parse_timestamp(record.get(layout.timestamp)?)?;

    let tx = Transaction::new(sender, receiver, amount, timestamp);
    if !tx.is_well_formed() {
        return None;
    }
    Some(tx)
}

/// Parse a CSV batch into transactions.
///
/// A missing or unrecognizable header is fatal; individual bad rows are
/// skipped and counted.
pub fn parse_batch(csv_text: &str) -> Result<ParsedBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = reader
        .headers()
        .context("Failed to read CSV header row")?
        .clone();
    let layout = ColumnLayout::detect(&headers)?;

    let mut transactions = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        match parse_row(&record, &layout) {
            Some(tx) => transactions.push(tx),
            None => skipped += 1,
        }
    }

    let accepted = transactions.len();
    Ok(ParsedBatch {
        transactions,
        accepted,
        skipped,
    })
}

// ============================================================================
// TESTS
// ============================================================================
