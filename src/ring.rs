use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The structural pattern a ring of accounts was flagged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    Cycle,
    SmurfingFanIn,
    SmurfingFanOut,
    Layered,
}

impl Pattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::Cycle => "cycle",
            Pattern::SmurfingFanIn => "smurfing_fan_in",
            Pattern::SmurfingFanOut => "smurfing_fan_out",
            Pattern::Layered => "layered",
        }
    }
}

/// A ring as produced by a single detector, before aggregation assigns it a
/// ring ID and a final risk score.
#[derive(Debug, Clone)]
pub struct RawRing {
    pub members: BTreeSet<String>,
    pub pattern: Pattern,
    /// Only populated for cycle rings, which have a natural per-step amount.
    pub provisional_total_amount: Option<Decimal>,
    pub provisional_transaction_count: Option<usize>,
}

/// A ring after aggregation: scored, numbered, ready for the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalRing {
    pub ring_id: String,
    pub pattern: Pattern,
    pub members: Vec<String>,
    pub risk_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisional_total_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisional_transaction_count: Option<usize>,
}
