use std::collections::HashMap;

use chrono::DateTime;
use chrono::Utc;

use crate::graph::{AdjacencyMaps, TransactionGraph};
use crate::ring::{FinalRing, Pattern};
use crate::windows::max_window_count;
use crate::PipelineConfig;

/// Per-account facts the scorer needs beyond ring membership: raw activity
/// volume, peak hourly velocity, and whether the account looks like a
/// merchant rather than a mule.
#[derive(Debug, Clone, Copy)]
pub struct AccountMetrics {
    pub total_transactions: usize,
    pub max_tx_per_hour: usize,
    pub is_merchant: bool,
}

/// Final, sorted entry for one flagged account.
#[derive(Debug, Clone)]
pub struct AccountScore {
    pub account_id: String,
    pub suspicion_score: u8,
    pub involved_rings: Vec<String>,
}

/// Gathers, per account, its total transaction count, peak sliding-window
/// hourly velocity, and merchant status (more than
/// `account_merchant_absolute_threshold` total transactions).
pub fn compute_account_metrics(
    graph: &TransactionGraph,
    adjacency: &AdjacencyMaps,
    config: &PipelineConfig,
) -> HashMap<String, AccountMetrics> {
    let nodes: Vec<String> = graph.nodes().cloned().collect();
    let mut totals: HashMap<String, usize> = HashMap::new();
    let mut peaks: HashMap<String, usize> = HashMap::new();

    for node in &nodes {
        let mut timestamps: Vec<DateTime<Utc>> = Vec::new();
        if let Some(entries) = adjacency.outgoing.get(node) {
            timestamps.extend(entries.iter().map(|e| e.timestamp));
        }
        if let Some(entries) = adjacency.incoming.get(node) {
            timestamps.extend(entries.iter().map(|e| e.timestamp));
        }
        timestamps.sort();

        totals.insert(node.clone(), timestamps.len());
        peaks.insert(node.clone(), max_window_count(&timestamps, config.velocity_window));
    }

    nodes
        .into_iter()
        .map(|node| {
            let total = totals[&node];
            let is_merchant = total > config.account_merchant_absolute_threshold;
            (
                node.clone(),
                AccountMetrics {
                    total_transactions: total,
                    max_tx_per_hour: peaks[&node],
                    is_merchant,
                },
            )
        })
        .collect()
}

/// Maps each account to every ring ID it belongs to, in the order `rings`
/// is given. When `rings` is already sorted by risk score descending (as it
/// is coming out of the aggregator), the first entry for each account is
/// that account's highest-risk ring.
pub fn build_account_ring_map(rings: &[FinalRing]) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for ring in rings {
        for member in &ring.members {
            map.entry(member.clone()).or_default().push(ring.ring_id.clone());
        }
    }
    map
}

/// Sums each ring's pattern-specific base score into every member's running
/// total.
pub fn apply_ring_scores(rings: &[FinalRing], config: &PipelineConfig) -> HashMap<String, i32> {
    let mut scores: HashMap<String, i32> = HashMap::new();
    for ring in rings {
        let base = match ring.pattern {
            Pattern::Cycle => config.cycle_account_base,
            Pattern::SmurfingFanIn => config.smurfing_fan_in_account_base,
            Pattern::SmurfingFanOut => config.smurfing_fan_out_account_base,
            Pattern::Layered => config.layered_account_base,
        };
        for member in &ring.members {
            *scores.entry(member.clone()).or_insert(0) += base;
        }
    }
    scores
}

pub fn apply_velocity_bonus(
    scores: &mut HashMap<String, i32>,
    metrics: &HashMap<String, AccountMetrics>,
    config: &PipelineConfig,
) {
    for (account, score) in scores.iter_mut() {
        if let Some(m) = metrics.get(account) {
            if m.max_tx_per_hour > config.velocity_high_threshold {
                *score += config.velocity_high_bonus;
            } else if m.max_tx_per_hour > config.velocity_low_threshold {
                *score += config.velocity_low_bonus;
            }
        }
    }
}

pub fn apply_merchant_penalty(
    scores: &mut HashMap<String, i32>,
    metrics: &HashMap<String, AccountMetrics>,
    config: &PipelineConfig,
) {
    for (account, score) in scores.iter_mut() {
        if metrics.get(account).is_some_and(|m| m.is_merchant) {
            *score += config.merchant_penalty;
        }
    }
}

/// Clamps every score to `[0, 100]` and sorts descending by score, then
/// ascending by account ID for a deterministic tie-break.
pub fn build_final_account_list(
    scores: &HashMap<String, i32>,
    account_to_rings: &HashMap<String, Vec<String>>,
) -> Vec<AccountScore> {
    let mut out: Vec<AccountScore> = scores
        .iter()
        .map(|(account_id, &score)| AccountScore {
            account_id: account_id.clone(),
            suspicion_score: score.clamp(0, 100) as u8,
            involved_rings: account_to_rings.get(account_id).cloned().unwrap_or_default(),
        })
        .collect();

    out.sort_by(|a, b| {
        b.suspicion_score
            .cmp(&a.suspicion_score)
            .then_with(|| a.account_id.cmp(&b.account_id))
    });
    out
}

/// Runs the full per-account scoring pipeline: base scores by ring
/// membership, velocity bonus, merchant penalty, clamping, and the
/// deterministic final ordering. Returns an empty list when there are no
/// rings at all, since only accounts that belong to at least one ring are
/// ever scored.
pub fn compute_suspicion_scores(
    graph: &TransactionGraph,
    adjacency: &AdjacencyMaps,
    rings: &[FinalRing],
    config: &PipelineConfig,
) -> Vec<AccountScore> {
    if rings.is_empty() {
        return Vec::new();
    }

    let metrics = compute_account_metrics(graph, adjacency, config);
    let account_to_rings = build_account_ring_map(rings);
    let mut scores = apply_ring_scores(rings, config);
    apply_velocity_bonus(&mut scores, &metrics, config);
    apply_merchant_penalty(&mut scores, &metrics, config);
    build_final_account_list(&scores, &account_to_rings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transaction;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn tx(id: &str, from: &str, to: &str, minute: i64) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            amount: dec!(100),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
                + chrono::Duration::minutes(minute),
        }
    }

    fn final_ring(id: &str, pattern: Pattern, members: &[&str], risk: f64) -> FinalRing {
        FinalRing {
            ring_id: id.to_string(),
            pattern,
            members: members.iter().map(|m| m.to_string()).collect(),
            risk_score: risk,
            provisional_total_amount: None,
            provisional_transaction_count: None,
        }
    }

    #[test]
    fn ring_scores_accumulate_across_memberships() {
        let config = PipelineConfig::default();
        let rings = vec![
            final_ring("RING_001", Pattern::Cycle, &["A", "B", "C"], 0.9),
            final_ring("RING_002", Pattern::SmurfingFanIn, &["A", "D"], 0.85),
        ];
        let scores = apply_ring_scores(&rings, &config);
        assert_eq!(scores["A"], 70);
        assert_eq!(scores["B"], 40);
        assert_eq!(scores["D"], 30);
    }

    #[test]
    fn layered_base_score_is_twenty_five() {
        let config = PipelineConfig::default();
        let rings = vec![final_ring("RING_001", Pattern::Layered, &["X", "Y"], 0.8)];
        let scores = apply_ring_scores(&rings, &config);
        assert_eq!(scores["X"], 25);
    }

    #[test]
    fn deterministic_ordering_breaks_ties_by_account_id() {
        let mut scores = HashMap::new();
        scores.insert("C".to_string(), 50);
        scores.insert("A".to_string(), 50);
        scores.insert("B".to_string(), 80);
        let mut account_to_rings = HashMap::new();
        for id in ["A", "B", "C"] {
            account_to_rings.insert(id.to_string(), vec!["R1".to_string()]);
        }
        let result = build_final_account_list(&scores, &account_to_rings);
        let ids: Vec<&str> = result.iter().map(|a| a.account_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
    }

    #[test]
    fn clamps_scores_to_zero_and_one_hundred() {
        let mut low = HashMap::new();
        low.insert("A".to_string(), -40);
        let account_to_rings = HashMap::from([("A".to_string(), vec!["R1".to_string()])]);
        assert_eq!(build_final_account_list(&low, &account_to_rings)[0].suspicion_score, 0);

        let mut high = HashMap::new();
        high.insert("A".to_string(), 120);
        assert_eq!(build_final_account_list(&high, &account_to_rings)[0].suspicion_score, 100);
    }

    #[test]
    fn spec_example_cycle_with_velocity_bonus() {
        // A -> B -> C -> A forms a cycle; extra A -> B edges push A's
        // hourly count past the low-velocity threshold, earning the +10
        // bonus without crossing into the +20 band.
        let mut txns = vec![
            tx("T1", "A", "B", 0),
            tx("T2", "B", "C", 10),
            tx("T3", "C", "A", 20),
        ];
        for i in 0..5 {
            txns.push(tx(&format!("V{i}"), "A", "B", 3 + i * 7));
        }
        let graph = TransactionGraph::build(&txns);
        let adjacency = AdjacencyMaps::build(&graph);
        let config = PipelineConfig::default();
        let rings = vec![final_ring("RING_001", Pattern::Cycle, &["A", "B", "C"], 0.9)];

        let accounts = compute_suspicion_scores(&graph, &adjacency, &rings, &config);
        let a = accounts.iter().find(|a| a.account_id == "A").unwrap();
        assert_eq!(a.suspicion_score, 50);
        assert_eq!(a.involved_rings, vec!["RING_001"]);
    }

    #[test]
    fn spec_example_merchant_penalty_zeroes_the_score() {
        let base_minutes = 0;
        let txns: Vec<Transaction> = (0..201)
            .map(|i| tx(&format!("T{i}"), "A", &format!("R{i}"), base_minutes + i * 120))
            .collect();
        let graph = TransactionGraph::build(&txns);
        let adjacency = AdjacencyMaps::build(&graph);
        let config = PipelineConfig::default();
        let rings = vec![final_ring("RING_001", Pattern::Cycle, &["A", "B", "C"], 0.9)];

        let accounts = compute_suspicion_scores(&graph, &adjacency, &rings, &config);
        let a = accounts.iter().find(|a| a.account_id == "A").unwrap();
        assert_eq!(a.suspicion_score, 0);
    }

    #[test]
    fn merchant_absolute_threshold_is_exclusive_at_two_hundred() {
        let below: Vec<Transaction> = (0..200)
            .map(|i| tx(&format!("T{i}"), "A", "M", i * 60))
            .collect();
        let graph = TransactionGraph::build(&below);
        let adjacency = AdjacencyMaps::build(&graph);
        let config = PipelineConfig::default();
        let metrics = compute_account_metrics(&graph, &adjacency, &config);
        assert!(!metrics["A"].is_merchant);

        let at_boundary: Vec<Transaction> = (0..201)
            .map(|i| tx(&format!("T{i}"), "A", "M", i * 60))
            .collect();
        let graph = TransactionGraph::build(&at_boundary);
        let adjacency = AdjacencyMaps::build(&graph);
        let metrics = compute_account_metrics(&graph, &adjacency, &config);
        assert!(metrics["A"].is_merchant);
    }

    #[test]
    fn no_rings_means_no_scored_accounts() {
        let txns = vec![tx("T1", "A", "B", 0)];
        let graph = TransactionGraph::build(&txns);
        let adjacency = AdjacencyMaps::build(&graph);
        let config = PipelineConfig::default();
        assert!(compute_suspicion_scores(&graph, &adjacency, &[], &config).is_empty());
    }
}
