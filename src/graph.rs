use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::Transaction;

/// One transaction, retained as an edge of the transaction multigraph.
#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// A transaction viewed from one account's side, paired with its
/// counterparty on the other side of the edge.
#[derive(Debug, Clone)]
pub struct AdjacencyEntry {
    pub counterparty_id: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    pub transaction_id: String,
}

/// The directed multigraph of transactions: one node per account, one edge
/// per transaction (so two accounts may be joined by many parallel edges).
/// Alongside the raw edges, a deduplicated successor projection is cached
/// for detectors that only care about simple reachability, not about how
/// many transactions moved along an edge.
#[derive(Debug)]
pub struct TransactionGraph {
    nodes: BTreeSet<String>,
    edges: Vec<GraphEdge>,
    simple_successors: HashMap<String, BTreeSet<String>>,
    edge_index: HashMap<(String, String), Vec<usize>>,
}

impl TransactionGraph {
    pub fn build(transactions: &[Transaction]) -> Self {
        let mut nodes = BTreeSet::new();
        let mut edges = Vec::with_capacity(transactions.len());
        let mut simple_successors: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut edge_index: HashMap<(String, String), Vec<usize>> = HashMap::new();

        for tx in transactions {
            nodes.insert(tx.sender_id.clone());
            nodes.insert(tx.receiver_id.clone());

            let idx = edges.len();
            edges.push(GraphEdge {
                transaction_id: tx.transaction_id.clone(),
                sender_id: tx.sender_id.clone(),
                receiver_id: tx.receiver_id.clone(),
                amount: tx.amount,
                timestamp: tx.timestamp,
            });

            simple_successors
                .entry(tx.sender_id.clone())
                .or_default()
                .insert(tx.receiver_id.clone());

            edge_index
                .entry((tx.sender_id.clone(), tx.receiver_id.clone()))
                .or_default()
                .push(idx);
        }

        Self {
            nodes,
            edges,
            simple_successors,
            edge_index,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &String> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Distinct accounts that received at least one transaction from `node`.
    pub fn simple_successors(&self, node: &str) -> impl Iterator<Item = &String> {
        self.simple_successors.get(node).into_iter().flatten()
    }

    /// Every transaction sent directly from `from` to `to`.
    pub fn edges_between(&self, from: &str, to: &str) -> impl Iterator<Item = &GraphEdge> {
        self.edge_index
            .get(&(from.to_string(), to.to_string()))
            .into_iter()
            .flatten()
            .map(move |&idx| &self.edges[idx])
    }
}

/// Per-account transaction history, split by direction and sorted by
/// timestamp ascending (ties keep the input order, since the sort below is
/// stable).
#[derive(Debug)]
pub struct AdjacencyMaps {
    pub outgoing: HashMap<String, Vec<AdjacencyEntry>>,
    pub incoming: HashMap<String, Vec<AdjacencyEntry>>,
}

impl AdjacencyMaps {
    pub fn build(graph: &TransactionGraph) -> Self {
        let mut outgoing: HashMap<String, Vec<AdjacencyEntry>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<AdjacencyEntry>> = HashMap::new();

        for edge in graph.edges() {
            outgoing
                .entry(edge.sender_id.clone())
                .or_default()
                .push(AdjacencyEntry {
                    counterparty_id: edge.receiver_id.clone(),
                    amount: edge.amount,
                    timestamp: edge.timestamp,
                    transaction_id: edge.transaction_id.clone(),
                });
            incoming
                .entry(edge.receiver_id.clone())
                .or_default()
                .push(AdjacencyEntry {
                    counterparty_id: edge.sender_id.clone(),
                    amount: edge.amount,
                    timestamp: edge.timestamp,
                    transaction_id: edge.transaction_id.clone(),
                });
        }

        for entries in outgoing.values_mut() {
            entries.sort_by_key(|e| e.timestamp);
        }
        for entries in incoming.values_mut() {
            entries.sort_by_key(|e| e.timestamp);
        }

        Self { outgoing, incoming }
    }

    pub fn total_transactions(&self, account: &str) -> usize {
        self.outgoing.get(account).map_or(0, Vec::len) + self.incoming.get(account).map_or(0, Vec::len)
    }

    pub fn is_merchant(&self, account: &str, threshold: usize) -> bool {
        self.total_transactions(account) > threshold
    }
}
