use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::graph::TransactionGraph;
use crate::ring::{FinalRing, Pattern};
use crate::PipelineConfig;

/// The feature vector extracted per account for optional ML blending.
/// Field order matches the original rule-based pipeline's feature columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountFeatures {
    pub account_id: String,
    pub total_transactions: usize,
    pub total_amount_sent: Decimal,
    pub avg_transaction_amount: Decimal,
    pub unique_receivers: usize,
    pub unique_senders: usize,
    pub max_transactions_per_hour: usize,
    pub smurfing_flag: u8,
    pub layering_depth: usize,
    pub cycle_count: usize,
    pub ring_size: usize,
    pub merchant_flag: u8,
}

/// Extracts one [`AccountFeatures`] row per account in the graph, ordered
/// by account ID.
///
/// `max_transactions_per_hour` here buckets transactions by calendar hour
/// (`year-month-day-hour`), not by a sliding window — this is a
/// deliberately different metric from the account scorer's velocity bonus,
/// kept distinct because the feature vector and the rule-based score are
/// independent signals, not two views of the same number.
pub fn extract_account_features(
    graph: &TransactionGraph,
    rings: &[FinalRing],
    config: &PipelineConfig,
) -> Vec<AccountFeatures> {
    let mut sent_amounts: HashMap<String, Vec<Decimal>> = HashMap::new();
    let mut sent_timestamps: HashMap<String, Vec<DateTime<Utc>>> = HashMap::new();
    let mut receivers_of: HashMap<String, HashSet<String>> = HashMap::new();
    let mut senders_to: HashMap<String, HashSet<String>> = HashMap::new();
    let mut tx_count: HashMap<String, usize> = HashMap::new();

    for edge in graph.edges() {
        sent_amounts.entry(edge.sender_id.clone()).or_default().push(edge.amount);
        sent_timestamps
            .entry(edge.sender_id.clone())
            .or_default()
            .push(edge.timestamp);
        receivers_of
            .entry(edge.sender_id.clone())
            .or_default()
            .insert(edge.receiver_id.clone());
        *tx_count.entry(edge.sender_id.clone()).or_insert(0) += 1;

        senders_to
            .entry(edge.receiver_id.clone())
            .or_default()
            .insert(edge.sender_id.clone());
        *tx_count.entry(edge.receiver_id.clone()).or_insert(0) += 1;
    }

    let smurfing_accounts: HashSet<&String> = rings
        .iter()
        .filter(|r| matches!(r.pattern, Pattern::SmurfingFanIn | Pattern::SmurfingFanOut))
        .flat_map(|r| r.members.iter())
        .collect();

    let mut layering_depth: HashMap<String, usize> = HashMap::new();
    let mut cycle_counts: HashMap<String, usize> = HashMap::new();
    let mut ring_size_map: HashMap<String, usize> = HashMap::new();

    for ring in rings {
        for member in &ring.members {
            let slot = ring_size_map.entry(member.clone()).or_insert(0);
            if ring.members.len() > *slot {
                *slot = ring.members.len();
            }
        }
        match ring.pattern {
            Pattern::Layered => {
                let depth = ring.members.len().saturating_sub(1);
                for member in &ring.members {
                    let slot = layering_depth.entry(member.clone()).or_insert(0);
                    if depth > *slot {
                        *slot = depth;
                    }
                }
            }
            Pattern::Cycle => {
                for member in &ring.members {
                    *cycle_counts.entry(member.clone()).or_insert(0) += 1;
                }
            }
            _ => {}
        }
    }

    let mut account_ids: Vec<String> = graph.nodes().cloned().collect();
    account_ids.sort();

    account_ids
        .into_iter()
        .map(|account_id| {
            let amounts = sent_amounts.get(&account_id).cloned().unwrap_or_default();
            let total_sent: Decimal = amounts.iter().sum();
            let avg = if amounts.is_empty() {
                Decimal::ZERO
            } else {
                total_sent / Decimal::from(amounts.len() as u64)
            };
            let total_tx = *tx_count.get(&account_id).unwrap_or(&0);
            let timestamps = sent_timestamps.get(&account_id).cloned().unwrap_or_default();

            AccountFeatures {
                total_transactions: total_tx,
                total_amount_sent: total_sent,
                avg_transaction_amount: avg,
                unique_receivers: receivers_of.get(&account_id).map_or(0, HashSet::len),
                unique_senders: senders_to.get(&account_id).map_or(0, HashSet::len),
                max_transactions_per_hour: max_hourly_bucket_count(&timestamps),
                smurfing_flag: smurfing_accounts.contains(&account_id) as u8,
                layering_depth: *layering_depth.get(&account_id).unwrap_or(&0),
                cycle_count: *cycle_counts.get(&account_id).unwrap_or(&0),
                ring_size: *ring_size_map.get(&account_id).unwrap_or(&0),
                merchant_flag: (total_tx > config.account_merchant_absolute_threshold) as u8,
                account_id,
            }
        })
        .collect()
}

fn max_hourly_bucket_count(timestamps: &[DateTime<Utc>]) -> usize {
    if timestamps.is_empty() {
        return 0;
    }
    let mut buckets: HashMap<(i32, u32, u32, u32), usize> = HashMap::new();
    for ts in timestamps {
        let key = (ts.year(), ts.month(), ts.day(), ts.hour());
        *buckets.entry(key).or_insert(0) += 1;
    }
    *buckets.values().max().unwrap()
}

/// Capability-probe seam for an optional, external ML scorer. A predictor
/// that reports itself unavailable (e.g. no model file on disk) is never
/// queried; the pipeline falls back to pure rule-based scores.
pub trait FraudPredictor {
    fn is_available(&self) -> bool;
    fn predict(&self, features: &[AccountFeatures]) -> HashMap<String, f64>;
}

/// Default predictor: always unavailable, never called.
pub struct NoPredictor;

impl FraudPredictor for NoPredictor {
    fn is_available(&self) -> bool {
        false
    }

    fn predict(&self, _features: &[AccountFeatures]) -> HashMap<String, f64> {
        HashMap::new()
    }
}

/// Blends rule-based scores with ML fraud probabilities:
/// `final = clamp(rule_weight * rule + ml_weight * (probability * 100))`,
/// rounded to the nearest integer.
pub fn compute_final_scores(
    rule_scores: &HashMap<String, u8>,
    ml_probabilities: &HashMap<String, f64>,
    config: &PipelineConfig,
) -> HashMap<String, u8> {
    rule_scores
        .iter()
        .map(|(account_id, &rule)| {
            let probability = *ml_probabilities.get(account_id).unwrap_or(&0.0);
            let raw = config.rule_weight * rule as f64 + config.ml_weight * (probability * 100.0);
            (account_id.clone(), raw.clamp(0.0, 100.0).round() as u8)
        })
        .collect()
}
