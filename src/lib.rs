//! # Ring Muling Detector
//!
//! A deterministic fraud-ring detection pipeline over directed
//! money-transfer transactions.
//!
//! Given a batch of transactions, the pipeline builds a directed multigraph
//! of accounts, runs three independent structural detectors (circular
//! flows, fan-in/fan-out smurfing, and layered shell chains), aggregates
//! their findings into a single risk-scored, sequentially numbered list of
//! fraud rings, and scores every implicated account. Account scores can
//! optionally be blended with an external ML fraud probability via the
//! [`FraudPredictor`] seam; when no predictor is supplied, the report is
//! pure rule-based output.
//!
//! The whole run is synchronous and single-threaded: detectors take shared
//! references only, so a caller driving several independent batches through
//! their own pipelines in parallel needs no changes here.

pub mod account_scorer;
pub mod cycle_detector;
pub mod features;
pub mod graph;
pub mod layered_detector;
pub mod report;
pub mod ring;
pub mod ring_aggregator;
pub mod smurfing_detector;
pub mod windows;

pub use account_scorer::{AccountMetrics, AccountScore};
pub use features::{AccountFeatures, FraudPredictor, NoPredictor};
pub use graph::{AdjacencyEntry, AdjacencyMaps, GraphEdge, TransactionGraph};
pub use report::{FraudRingEntry, Report, Summary, SuspiciousAccountEntry};
pub use ring::{FinalRing, Pattern, RawRing};

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// A single directed money transfer from `sender_id` to `receiver_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Fatal errors that stop the pipeline before or during a run.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum PipelineError {
    #[error("transaction batch is empty")]
    EmptyTransactionBatch,

    #[error("transaction {transaction_id} has non-positive amount {amount}")]
    NonPositiveAmount {
        transaction_id: String,
        amount: Decimal,
    },

    #[error("duplicate transaction id: {transaction_id}")]
    DuplicateTransactionId { transaction_id: String },

    #[error("internal invariant violated: {detail}")]
    InvariantViolation { detail: String },
}

/// Every tunable constant the pipeline uses, gathered in one place so a
/// caller can retune detection sensitivity without touching detector code.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Width of the sliding window used by smurfing fan-in/fan-out detection.
    pub smurfing_window: Duration,
    /// Minimum distinct counterparties within the window to flag a hub.
    pub smurfing_min_counterparties: usize,
    /// An account with more than this many total transactions is treated as
    /// a merchant and excluded from smurfing/layering consideration.
    pub smurfing_merchant_threshold: usize,

    pub layered_min_edges: usize,
    pub layered_max_edges: usize,
    pub layered_min_degree: usize,
    pub layered_max_degree: usize,
    pub layered_merchant_threshold: usize,

    pub cycle_min_len: usize,
    pub cycle_max_len: usize,

    /// Width of the sliding window used for account velocity scoring.
    pub velocity_window: Duration,
    pub velocity_high_threshold: usize,
    pub velocity_low_threshold: usize,
    pub velocity_high_bonus: i32,
    pub velocity_low_bonus: i32,

    /// An account with more total transactions than this is treated as a
    /// merchant for scoring purposes (penalized, not excluded).
    pub account_merchant_absolute_threshold: usize,
    pub merchant_penalty: i32,

    pub cycle_base_score: u32,
    pub smurfing_fan_in_base_score: u32,
    pub smurfing_fan_out_base_score: u32,
    pub layered_base_score: u32,

    pub cycle_account_base: i32,
    pub smurfing_fan_in_account_base: i32,
    pub smurfing_fan_out_account_base: i32,
    pub layered_account_base: i32,

    /// Weight given to the rule-based score when blending with an ML
    /// probability; `ml_weight` should be `1.0 - rule_weight`.
    pub rule_weight: f64,
    pub ml_weight: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            smurfing_window: Duration::hours(72),
            smurfing_min_counterparties: 10,
            smurfing_merchant_threshold: 100,

            layered_min_edges: 3,
            layered_max_edges: 5,
            layered_min_degree: 2,
            layered_max_degree: 3,
            layered_merchant_threshold: 100,

            cycle_min_len: 3,
            cycle_max_len: 5,

            velocity_window: Duration::minutes(60),
            velocity_high_threshold: 10,
            velocity_low_threshold: 5,
            velocity_high_bonus: 20,
            velocity_low_bonus: 10,

            account_merchant_absolute_threshold: 200,
            merchant_penalty: -50,

            cycle_base_score: 90,
            smurfing_fan_in_base_score: 85,
            smurfing_fan_out_base_score: 85,
            layered_base_score: 80,

            cycle_account_base: 40,
            smurfing_fan_in_account_base: 30,
            smurfing_fan_out_account_base: 30,
            layered_account_base: 25,

            rule_weight: 0.6,
            ml_weight: 0.4,
        }
    }
}

/// Runs the full batch fraud-ring detection pipeline over a fixed
/// [`PipelineConfig`].
pub struct FraudDetectionPipeline {
    config: PipelineConfig,
}

impl Default for FraudDetectionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FraudDetectionPipeline {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Runs the pipeline with pure rule-based account scoring.
    pub fn run(&self, transactions: &[Transaction]) -> Result<Report, PipelineError> {
        self.run_with_predictor(transactions, &NoPredictor)
    }

    /// Runs the pipeline, blending rule-based scores with `predictor`'s
    /// output when `predictor.is_available()` reports true.
    #[instrument(skip_all, fields(transaction_count = transactions.len()))]
    pub fn run_with_predictor(
        &self,
        transactions: &[Transaction],
        predictor: &dyn FraudPredictor,
    ) -> Result<Report, PipelineError> {
        let start = Instant::now();
        self.validate(transactions)?;

        debug!("building transaction graph");
        let graph = TransactionGraph::build(transactions);
        let adjacency = AdjacencyMaps::build(&graph);

        debug!("running structural detectors");
        let cycle_rings = cycle_detector::detect_cycles(&graph, &self.config);
        let smurfing_rings = smurfing_detector::detect_smurfing(&adjacency, &self.config);
        let layered_rings = layered_detector::detect_layered(&graph, &adjacency, &self.config);

        info!(
            cycles = cycle_rings.len(),
            smurfing = smurfing_rings.len(),
            layered = layered_rings.len(),
            "raw rings detected"
        );

        let rings = ring_aggregator::aggregate(cycle_rings, smurfing_rings, layered_rings, &self.config)?;
        let accounts = account_scorer::compute_suspicion_scores(&graph, &adjacency, &rings, &self.config);

        let (ml_active, rule_scores, ml_probabilities, final_accounts) =
            if predictor.is_available() && !accounts.is_empty() {
                let feature_vectors = features::extract_account_features(&graph, &rings, &self.config);
                let probabilities = predictor.predict(&feature_vectors);
                let rule_map: HashMap<String, u8> = accounts
                    .iter()
                    .map(|a| (a.account_id.clone(), a.suspicion_score))
                    .collect();
                let blended = features::compute_final_scores(&rule_map, &probabilities, &self.config);

                let mut blended_accounts = accounts;
                for account in &mut blended_accounts {
                    if let Some(&score) = blended.get(&account.account_id) {
                        account.suspicion_score = score;
                    }
                }
                blended_accounts.sort_by(|a, b| {
                    b.suspicion_score
                        .cmp(&a.suspicion_score)
                        .then_with(|| a.account_id.cmp(&b.account_id))
                });

                (true, Some(rule_map), Some(probabilities), blended_accounts)
            } else {
                if !predictor.is_available() {
                    warn!("ML predictor unavailable, falling back to rule-based scoring only");
                }
                (false, None, None, accounts)
            };

        let elapsed_seconds = start.elapsed().as_secs_f64();
        Ok(report::assemble_report(
            transactions,
            &rings,
            &final_accounts,
            ml_active,
            rule_scores.as_ref(),
            ml_probabilities.as_ref(),
            elapsed_seconds,
        ))
    }

    fn validate(&self, transactions: &[Transaction]) -> Result<(), PipelineError> {
        if transactions.is_empty() {
            return Err(PipelineError::EmptyTransactionBatch);
        }

        let mut seen_ids: HashSet<&str> = HashSet::new();
        for tx in transactions {
            if tx.amount <= Decimal::ZERO {
                return Err(PipelineError::NonPositiveAmount {
                    transaction_id: tx.transaction_id.clone(),
                    amount: tx.amount,
                });
            }
            if !seen_ids.insert(tx.transaction_id.as_str()) {
                return Err(PipelineError::DuplicateTransactionId {
                    transaction_id: tx.transaction_id.clone(),
                });
            }
        }

        Ok(())
    }
}
