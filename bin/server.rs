// AML Oracle - Web Server
// HTTP/JSON surface consumed by the external UI

use aml_oracle::{OracleStore, ScreeningConfig, Transaction, VerdictReason};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    oracle: Arc<OracleStore>,
}

// ============================================================================
// Request/response bodies
// ============================================================================

#[derive(Serialize)]
struct VerdictResponse {
    admitted: bool,
    reason: &'static str,
    inserted: bool,
}

impl VerdictResponse {
    fn malformed() -> Self {
        VerdictResponse {
            admitted: false,
            reason: VerdictReason::Malformed.as_str(),
            inserted: false,
        }
    }
}

#[derive(Serialize)]
struct UploadResponse {
    accepted: usize,
    skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Pull a required string field out of a JSON body.
fn field_str<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name)?.as_str().filter(|s| !s.trim().is_empty())
}

/// Amounts arrive as JSON numbers or as numeric strings from form inputs.
fn field_amount(body: &Value, name: &str) -> Option<f64> {
    match body.get(name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, PartialEq)]
enum TimestampField {
    /// Absent, null, or not a scalar - a structural request error
    Missing,
    /// Present but not a recognizable timestamp - a MALFORMED verdict
    Unparseable,
    Parsed(DateTime<Utc>),
}

/// Timestamps arrive as ISO strings or as epoch-second JSON numbers
/// (upstream screening services post the numeric form).
fn field_timestamp(body: &Value, name: &str) -> TimestampField {
    match body.get(name) {
        Some(Value::String(s)) => match aml_oracle::parse_timestamp(s) {
            Some(t) => TimestampField::Parsed(t),
            None => TimestampField::Unparseable,
        },
        Some(Value::Number(n)) => {
            match n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()) {
                Some(t) => TimestampField::Parsed(t),
                None => TimestampField::Unparseable,
            }
        }
        _ => TimestampField::Missing,
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": aml_oracle::VERSION,
        "ledger_size": state.oracle.ledger_len(),
        "profile_accounts": state.oracle.profile_count(),
    }))
}

/// POST /add-transaction - Screen one candidate and admit it if it passes
async fn add_transaction(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let (sender, receiver) = match (field_str(&body, "sender"), field_str(&body, "receiver")) {
        (Some(s), Some(r)) => (s.to_string(), r.to_string()),
        _ => return bad_request("Missing or empty sender/receiver").into_response(),
    };

    let amount = match field_amount(&body, "amount") {
        Some(a) => a,
        None => return bad_request("Missing or non-numeric amount").into_response(),
    };

    // A present but unparseable timestamp is a screening outcome, not a
    // request error: the verdict is MALFORMED.
    let timestamp = match field_timestamp(&body, "timestamp") {
        TimestampField::Parsed(t) => t,
        TimestampField::Missing => {
            return bad_request("Missing or non-scalar timestamp").into_response()
        }
        TimestampField::Unparseable => {
            return (StatusCode::OK, Json(VerdictResponse::malformed())).into_response()
        }
    };

    let submission = state
        .oracle
        .submit(Transaction::new(sender, receiver, amount, timestamp));

    let response = VerdictResponse {
        admitted: submission.verdict.admitted,
        reason: submission.verdict.reason.as_str(),
        inserted: submission.inserted,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /valid-transactions - Full validated ledger, admission order
async fn get_valid_transactions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.oracle.valid_transactions())
}

/// POST /upload-batch - base64 CSV of historical transactions
async fn upload_batch(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let encoded = match body.get("csv_base64").and_then(Value::as_str) {
        Some(e) => e,
        None => return bad_request("Missing csv_base64").into_response(),
    };

    match state.oracle.upload_batch_base64(encoded) {
        Ok(report) => {
            let response = UploadResponse {
                accepted: report.accepted,
                skipped: report.skipped,
                error: report.error_code(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => bad_request(format!("{e:#}")).into_response(),
    }
}

/// POST /oracle-data - Write or overwrite one datum
async fn put_oracle_data(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let key = match field_str(&body, "key") {
        Some(k) => k.to_string(),
        None => return bad_request("Missing or empty key").into_response(),
    };
    let value = match body.get("value") {
        Some(v) => v.clone(),
        None => return bad_request("Missing value").into_response(),
    };

    state.oracle.put_oracle_datum(key, value);
    (StatusCode::OK, Json(serde_json::json!({ "ok": true }))).into_response()
}

/// GET /oracle-data - Current oracle-data state
async fn get_oracle_data(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.oracle.oracle_data())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 AML Oracle - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let state = AppState {
        oracle: Arc::new(OracleStore::new(ScreeningConfig::default())),
    };
    println!(
        "✓ Screening config: grace window {}s, outlier multiplier {}",
        state.oracle.config().grace_window_seconds,
        state.oracle.config().outlier_multiplier
    );

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/add-transaction", post(add_transaction))
        .route("/valid-transactions", get(get_valid_transactions))
        .route("/upload-batch", post(upload_batch))
        .route("/oracle-data", post(put_oracle_data).get(get_oracle_data))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let addr = "0.0.0.0:8080";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Oracle running on http://localhost:8080");
    println!("   POST /add-transaction");
    println!("   GET  /valid-transactions");
    println!("   POST /upload-batch");
    println!("   POST/GET /oracle-data");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_timestamp_epoch_seconds_number() {
        // Upstream services post epoch seconds as a JSON number
        let body = json!({ "timestamp": 1_705_312_800 });
        assert_eq!(
            field_timestamp(&body, "timestamp"),
            TimestampField::Parsed(Utc.timestamp_opt(1_705_312_800, 0).unwrap())
        );
    }

    #[test]
    fn test_field_timestamp_iso_string() {
        let body = json!({ "timestamp": "2024-01-15T10:00:00Z" });
        assert_eq!(
            field_timestamp(&body, "timestamp"),
            TimestampField::Parsed(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_field_timestamp_unparseable_is_malformed_not_missing() {
        let garbage = json!({ "timestamp": "next tuesday" });
        assert_eq!(field_timestamp(&garbage, "timestamp"), TimestampField::Unparseable);

        // Fractional epoch seconds are not accepted
        let fractional = json!({ "timestamp": 1_705_312_800.5 });
        assert_eq!(
            field_timestamp(&fractional, "timestamp"),
            TimestampField::Unparseable
        );
    }

    #[test]
    fn test_field_timestamp_missing_or_wrong_type() {
        assert_eq!(field_timestamp(&json!({}), "timestamp"), TimestampField::Missing);
        assert_eq!(
            field_timestamp(&json!({ "timestamp": null }), "timestamp"),
            TimestampField::Missing
        );
        assert_eq!(
            field_timestamp(&json!({ "timestamp": [1, 2] }), "timestamp"),
            TimestampField::Missing
        );
    }
}
