use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account_scorer::AccountScore;
use crate::ring::FinalRing;
use crate::Transaction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_accounts: usize,
    pub total_transactions: usize,
    pub fraud_rings_detected: usize,
    pub suspicious_accounts_count: usize,
    pub ml_model_active: bool,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudRingEntry {
    pub ring_id: String,
    pub pattern: String,
    pub members: Vec<String>,
    pub risk_score: f64,
    /// Only populated for cycle rings: the summed amount and transaction
    /// count over every parallel edge on the cycle's traversal order.
    /// Provisional in the sense that the aggregator's risk formula never
    /// reads them back — they are carried through purely for downstream
    /// consumers that want the raw activity behind the score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousAccountEntry {
    pub account_id: String,
    pub suspicion_score: u8,
    pub risk_level: String,
    pub associated_ring: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ml_probability: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub summary: Summary,
    pub fraud_rings: Vec<FraudRingEntry>,
    pub suspicious_accounts: Vec<SuspiciousAccountEntry>,
}

impl Report {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn risk_level(score: u8) -> &'static str {
    if score >= 80 {
        "HIGH"
    } else if score >= 50 {
        "MEDIUM"
    } else {
        "LOW"
    }
}

#[allow(clippy::too_many_arguments)]
pub fn assemble_report(
    transactions: &[Transaction],
    rings: &[FinalRing],
    accounts: &[AccountScore],
    ml_active: bool,
    rule_scores: Option<&HashMap<String, u8>>,
    ml_probabilities: Option<&HashMap<String, f64>>,
    processing_time_seconds: f64,
) -> Report {
    let mut all_accounts: HashSet<&str> = HashSet::new();
    for tx in transactions {
        all_accounts.insert(tx.sender_id.as_str());
        all_accounts.insert(tx.receiver_id.as_str());
    }

    let fraud_rings: Vec<FraudRingEntry> = rings
        .iter()
        .map(|r| FraudRingEntry {
            ring_id: r.ring_id.clone(),
            pattern: r.pattern.as_str().to_string(),
            members: r.members.clone(),
            risk_score: (r.risk_score * 10000.0).round() / 10000.0,
            total_amount: r.provisional_total_amount,
            transaction_count: r.provisional_transaction_count,
        })
        .collect();

    let suspicious_accounts: Vec<SuspiciousAccountEntry> = accounts
        .iter()
        .map(|account| SuspiciousAccountEntry {
            account_id: account.account_id.clone(),
            suspicion_score: account.suspicion_score,
            risk_level: risk_level(account.suspicion_score).to_string(),
            associated_ring: account.involved_rings.first().cloned(),
            rule_score: rule_scores.and_then(|m| m.get(&account.account_id).copied()),
            ml_probability: ml_probabilities.and_then(|m| m.get(&account.account_id).copied()),
        })
        .collect();

    Report {
        summary: Summary {
            total_accounts: all_accounts.len(),
            total_transactions: transactions.len(),
            fraud_rings_detected: fraud_rings.len(),
            suspicious_accounts_count: suspicious_accounts.len(),
            ml_model_active: ml_active,
            processing_time_seconds: (processing_time_seconds * 10000.0).round() / 10000.0,
        },
        fraud_rings,
        suspicious_accounts,
    }
}
