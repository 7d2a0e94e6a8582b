//! Fraud ring detection example
//!
//! Builds a small synthetic transaction batch containing a circular flow,
//! a fan-in smurfing burst, and a layered shell chain, runs the pipeline,
//! and prints the resulting report. Run with `RUST_LOG=debug` to see the
//! pipeline's per-stage tracing output.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing_subscriber::{fmt, EnvFilter};

use ring_muling_detector::{FraudDetectionPipeline, Transaction};

fn tx(id: &str, from: &str, to: &str, minute: i64, amount: Decimal) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        sender_id: from.to_string(),
        receiver_id: to.to_string(),
        amount,
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(minute),
    }
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Fraud Ring Detector ===\n");

    let mut transactions = Vec::new();

    // A circular flow: A -> B -> C -> A.
    transactions.push(tx("T1", "A", "B", 0, dec!(1000)));
    transactions.push(tx("T2", "B", "C", 1, dec!(1000)));
    transactions.push(tx("T3", "C", "A", 2, dec!(1000)));

    // A fan-in smurfing burst: 12 distinct senders feed HUB within a day.
    for i in 0..12 {
        transactions.push(tx(
            &format!("SM{i}"),
            &format!("S{i}"),
            "HUB",
            60 + i,
            dec!(250),
        ));
    }

    // A layered shell chain: X -> P -> Q -> R -> Y, each intermediate
    // touching exactly two transactions.
    transactions.push(tx("L1", "X", "P", 200, dec!(5000)));
    transactions.push(tx("L2", "P", "Q", 201, dec!(5000)));
    transactions.push(tx("L3", "Q", "R", 202, dec!(5000)));
    transactions.push(tx("L4", "R", "Y", 203, dec!(5000)));

    let pipeline = FraudDetectionPipeline::new();
    let report = pipeline.run(&transactions).expect("valid transaction batch");

    println!("Summary: {:#?}", report.summary);
    println!("\nFraud rings detected: {}", report.fraud_rings.len());
    for ring in &report.fraud_rings {
        println!(
            "  {} [{}] risk={:.4} members={:?}",
            ring.ring_id, ring.pattern, ring.risk_score, ring.members
        );
    }

    println!("\nSuspicious accounts: {}", report.suspicious_accounts.len());
    for account in &report.suspicious_accounts {
        println!(
            "  {} score={} risk={} ring={:?}",
            account.account_id, account.suspicion_score, account.risk_level, account.associated_ring
        );
    }

    let json = report.to_json().expect("report serializes");
    println!("\n{json}");
}
