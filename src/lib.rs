// AML Oracle - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod baseline;
pub mod ledger;
pub mod parser;
pub mod screening;
pub mod store;

// Re-export commonly used types
pub use baseline::{build_baseline, AccountProfile, ProfileMap};
pub use ledger::{Transaction, ValidatedLedger};
pub use parser::{decode_csv_base64, parse_batch, parse_timestamp, ParsedBatch};
pub use screening::{screen, ScreeningConfig, Verdict, VerdictReason};
pub use store::{BatchReport, OracleStore, Submission};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
