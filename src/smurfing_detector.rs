use std::collections::{BTreeSet, HashSet};

use crate::graph::AdjacencyMaps;
use crate::ring::{Pattern, RawRing};
use crate::windows::widest_window_first_max;
use crate::PipelineConfig;

/// Runs fan-in detection, then fan-out detection with every fan-in hub
/// excluded from seeding a fan-out ring of its own.
pub fn detect_smurfing(adjacency: &AdjacencyMaps, config: &PipelineConfig) -> Vec<RawRing> {
    let (fan_in, consumed) = detect_fan_in(adjacency, config);
    let fan_out = detect_fan_out(adjacency, config, &consumed);

    let mut all = fan_in;
    all.extend(fan_out);
    all
}

fn detect_fan_in(
    adjacency: &AdjacencyMaps,
    config: &PipelineConfig,
) -> (Vec<RawRing>, HashSet<String>) {
    let mut rings = Vec::new();
    let mut consumed = HashSet::new();

    let mut receivers: Vec<&String> = adjacency.incoming.keys().collect();
    receivers.sort();

    for receiver in receivers {
        if adjacency.is_merchant(receiver, config.smurfing_merchant_threshold) {
            continue;
        }
        let txns = &adjacency.incoming[receiver];
        if txns.len() < config.smurfing_min_counterparties {
            continue;
        }

        if let Some((unique, left, right)) = widest_window_first_max(
            txns,
            config.smurfing_window,
            |e| e.timestamp,
            |e| e.counterparty_id.as_str(),
        ) {
            if unique >= config.smurfing_min_counterparties {
                let mut members: BTreeSet<String> = txns[left..=right]
                    .iter()
                    .map(|e| e.counterparty_id.clone())
                    .collect();
                members.insert(receiver.clone());
                consumed.insert(receiver.clone());
                rings.push(RawRing {
                    members,
                    pattern: Pattern::SmurfingFanIn,
                    provisional_total_amount: None,
                    provisional_transaction_count: None,
                });
            }
        }
    }

    (rings, consumed)
}

fn detect_fan_out(
    adjacency: &AdjacencyMaps,
    config: &PipelineConfig,
    consumed: &HashSet<String>,
) -> Vec<RawRing> {
    let mut rings = Vec::new();

    let mut senders: Vec<&String> = adjacency.outgoing.keys().collect();
    senders.sort();

    for sender in senders {
        if consumed.contains(sender) {
            continue;
        }
        if adjacency.is_merchant(sender, config.smurfing_merchant_threshold) {
            continue;
        }
        let txns = &adjacency.outgoing[sender];
        if txns.len() < config.smurfing_min_counterparties {
            continue;
        }

        if let Some((unique, left, right)) = widest_window_first_max(
            txns,
            config.smurfing_window,
            |e| e.timestamp,
            |e| e.counterparty_id.as_str(),
        ) {
            if unique >= config.smurfing_min_counterparties {
                let mut members: BTreeSet<String> = txns[left..=right]
                    .iter()
                    .map(|e| e.counterparty_id.clone())
                    .collect();
                members.insert(sender.clone());
                rings.push(RawRing {
                    members,
                    pattern: Pattern::SmurfingFanOut,
                    provisional_total_amount: None,
                    provisional_transaction_count: None,
                });
            }
        }
    }

    rings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TransactionGraph;
    use crate::Transaction;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn tx(id: &str, from: &str, to: &str, hour: i64) -> Transaction {
        Transaction {
            transaction_id: id.to_string(),
            sender_id: from.to_string(),
            receiver_id: to.to_string(),
            amount: dec!(100),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::hours(hour),
        }
    }

    #[test]
    fn flags_fan_in_with_ten_distinct_senders_within_window() {
        let txns: Vec<Transaction> = (0..10)
            .map(|i| tx(&format!("T{i}"), &format!("S{i}"), "HUB", i))
            .collect();
        let graph = TransactionGraph::build(&txns);
        let adjacency = AdjacencyMaps::build(&graph);
        let config = PipelineConfig::default();
        let (rings, consumed) = detect_fan_in(&adjacency, &config);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].members.len(), 11);
        assert!(consumed.contains("HUB"));
    }

    #[test]
    fn does_not_flag_below_minimum_counterparties() {
        let txns: Vec<Transaction> = (0..9)
            .map(|i| tx(&format!("T{i}"), &format!("S{i}"), "HUB", i))
            .collect();
        let graph = TransactionGraph::build(&txns);
        let adjacency = AdjacencyMaps::build(&graph);
        let config = PipelineConfig::default();
        let (rings, _) = detect_fan_in(&adjacency, &config);
        assert!(rings.is_empty());
    }

    #[test]
    fn fan_in_hub_cannot_also_seed_a_fan_out_ring() {
        // HUB receives from 10 distinct senders, then fans the money back out
        // to 10 distinct receivers. Only the fan-in ring should be recorded.
        let mut txns: Vec<Transaction> = (0..10)
            .map(|i| tx(&format!("IN{i}"), &format!("S{i}"), "HUB", i))
            .collect();
        txns.extend((0..10).map(|i| tx(&format!("OUT{i}"), "HUB", &format!("R{i}"), 20 + i)));
        let graph = TransactionGraph::build(&txns);
        let adjacency = AdjacencyMaps::build(&graph);
        let config = PipelineConfig::default();
        let rings = detect_smurfing(&adjacency, &config);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].pattern, Pattern::SmurfingFanIn);
    }

    #[test]
    fn merchant_hub_is_excluded() {
        let txns: Vec<Transaction> = (0..150)
            .map(|i| tx(&format!("T{i}"), &format!("S{}", i % 20), "HUB", i))
            .collect();
        let graph = TransactionGraph::build(&txns);
        let adjacency = AdjacencyMaps::build(&graph);
        let config = PipelineConfig::default();
        let (rings, _) = detect_fan_in(&adjacency, &config);
        assert!(rings.is_empty());
    }
}
