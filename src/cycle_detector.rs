use std::collections::{BTreeSet, HashSet};

use rust_decimal::Decimal;

use crate::graph::TransactionGraph;
use crate::ring::{Pattern, RawRing};
use crate::PipelineConfig;

/// Enumerates elementary directed cycles of length `cycle_min_len` through
/// `cycle_max_len` over the graph's simple-successor projection.
///
/// Each cycle is discovered exactly once: the DFS rooted at a node only
/// records a cycle if that root is the lexicographically smallest node on
/// it, which rules out recording the same cycle once per rotation.
pub fn detect_cycles(graph: &TransactionGraph, config: &PipelineConfig) -> Vec<RawRing> {
    let mut out = Vec::new();
    let nodes: Vec<String> = graph.nodes().cloned().collect();

    for start in &nodes {
        let mut path = vec![start.clone()];
        let mut on_path: HashSet<String> = HashSet::new();
        on_path.insert(start.clone());
        walk(graph, start, &mut path, &mut on_path, &mut out, config);
    }

    out.sort_by(|a, b| a.members.iter().cmp(b.members.iter()));
    out
}

fn walk(
    graph: &TransactionGraph,
    start: &str,
    path: &mut Vec<String>,
    on_path: &mut HashSet<String>,
    out: &mut Vec<RawRing>,
    config: &PipelineConfig,
) {
    let current = path.last().unwrap().clone();

    for next in graph.simple_successors(&current) {
        if next == start {
            if path.len() >= config.cycle_min_len
                && path.len() <= config.cycle_max_len
                && path.iter().all(|n| n.as_str() >= start)
            {
                out.push(build_ring(graph, path));
            }
            continue;
        }

        if on_path.contains(next) || path.len() >= config.cycle_max_len {
            continue;
        }

        path.push(next.clone());
        on_path.insert(next.clone());
        walk(graph, start, path, on_path, out, config);
        path.pop();
        on_path.remove(next);
    }
}

fn build_ring(graph: &TransactionGraph, path: &[String]) -> RawRing {
    let mut total_amount = Decimal::ZERO;
    let mut transaction_count = 0usize;

    for i in 0..path.len() {
        let from = &path[i];
        let to = &path[(i + 1) % path.len()];
        for edge in graph.edges_between(from, to) {
            total_amount += edge.amount;
            transaction_count += 1;
        }
    }

    RawRing {
        members: path.iter().cloned().collect::<BTreeSet<String>>(),
        pattern: Pattern::Cycle,
        provisional_total_amount: Some(total_amount),
        provisional_transaction_count: Some(transaction_count),
    }
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
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(minute),
        }
    }

    #[test]
    fn finds_three_member_cycle_once() {
        let txns = vec![
            tx("T1", "A", "B", 0),
            tx("T2", "B", "C", 10),
            tx("T3", "C", "A", 20),
        ];
        let graph = TransactionGraph::build(&txns);
        let config = PipelineConfig::default();
        let rings = detect_cycles(&graph, &config);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].members.len(), 3);
        assert_eq!(rings[0].provisional_transaction_count, Some(3));
        assert_eq!(rings[0].provisional_total_amount, Some(dec!(300)));
    }

    #[test]
    fn ignores_cycles_shorter_than_minimum() {
        let txns = vec![tx("T1", "A", "B", 0), tx("T2", "B", "A", 10)];
        let graph = TransactionGraph::build(&txns);
        let config = PipelineConfig::default();
        assert!(detect_cycles(&graph, &config).is_empty());
    }

    #[test]
    fn ignores_cycles_longer_than_maximum() {
        let mut txns = Vec::new();
        let nodes = ["A", "B", "C", "D", "E", "F"];
        for i in 0..nodes.len() {
            txns.push(tx(
                &format!("T{i}"),
                nodes[i],
                nodes[(i + 1) % nodes.len()],
                (i * 10) as i64,
            ));
        }
        let graph = TransactionGraph::build(&txns);
        let config = PipelineConfig::default();
        assert!(detect_cycles(&graph, &config).is_empty());
    }

    #[test]
    fn accepts_cycles_of_four_and_five_members() {
        let nodes4 = ["A", "B", "C", "D"];
        let mut txns: Vec<Transaction> = (0..nodes4.len())
            .map(|i| tx(&format!("T{i}"), nodes4[i], nodes4[(i + 1) % nodes4.len()], (i * 10) as i64))
            .collect();
        let graph = TransactionGraph::build(&txns);
        let config = PipelineConfig::default();
        assert_eq!(detect_cycles(&graph, &config).len(), 1);

        let nodes5 = ["P", "Q", "R", "S", "T"];
        txns = (0..nodes5.len())
            .map(|i| tx(&format!("U{i}"), nodes5[i], nodes5[(i + 1) % nodes5.len()], (i * 10) as i64))
            .collect();
        let graph = TransactionGraph::build(&txns);
        assert_eq!(detect_cycles(&graph, &config).len(), 1);
    }

    #[test]
    fn sums_parallel_edges_on_each_step() {
        let txns = vec![
            tx("T1", "A", "B", 0),
            tx("T2", "A", "B", 1),
            tx("T3", "B", "C", 10),
            tx("T4", "C", "A", 20),
        ];
        let graph = TransactionGraph::build(&txns);
        let config = PipelineConfig::default();
        let rings = detect_cycles(&graph, &config);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].provisional_transaction_count, Some(4));
        assert_eq!(rings[0].provisional_total_amount, Some(dec!(400)));
    }
}
