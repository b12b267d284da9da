// AML Oracle - CLI
// Offline mode: import a historical CSV, build the baseline, print metrics

use anyhow::{bail, Context, Result};
use aml_oracle::{build_baseline, parse_batch, AccountProfile};
use std::env;
use std::fs;
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let path = args
                .get(2)
                .context("Usage: aml-oracle import <transactions.csv>")?;
            run_import(Path::new(path))
        }
        _ => {
            eprintln!("AML Oracle v{}", aml_oracle::VERSION);
            eprintln!();
            eprintln!("Usage:");
            eprintln!("  aml-oracle import <transactions.csv>   Build baseline and print per-account metrics");
            eprintln!();
            eprintln!("Run the HTTP oracle with: cargo run --features server --bin oracle-server");
            Ok(())
        }
    }
}

fn run_import(csv_path: &Path) -> Result<()> {
    println!("📊 AML Oracle - Baseline Import");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load and parse CSV
    println!("\n📂 Loading CSV...");
    let csv_text = fs::read_to_string(csv_path)
        .with_context(|| format!("Failed to read {:?}", csv_path))?;
    let batch = parse_batch(&csv_text)?;
    println!(
        "✓ Parsed {} transactions ({} malformed rows skipped)",
        batch.accepted, batch.skipped
    );

    if batch.is_empty() {
        bail!("EMPTY_BATCH: no valid rows in {:?}", csv_path);
    }

    // 2. Build baseline
    println!("\n🔧 Building baseline...");
    let profiles = build_baseline(&batch.transactions);
    println!("✓ Profiled {} accounts", profiles.len());

    // 3. Per-account metrics
    println!("\n📈 Account metrics:");
    let mut accounts: Vec<(&String, &AccountProfile)> = profiles.iter().collect();
    accounts.sort_by(|a, b| a.0.cmp(b.0));

    for (account, profile) in accounts {
        println!(
            "  {:<24} sent {:>4} (avg {}) | recv {:>4} (avg {}) | ratio {} | {} counterparties",
            account,
            profile.sent_count,
            fmt_opt(profile.average_sent()),
            profile.received_count,
            fmt_opt(profile.average_received()),
            fmt_opt(profile.in_out_ratio()),
            profile.counterparties.len(),
        );
    }

    println!("\n✓ Done");
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}
