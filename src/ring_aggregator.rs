use crate::ring::{FinalRing, Pattern, RawRing};
use crate::{PipelineConfig, PipelineError};

/// Concatenates every detector's raw rings in a fixed order (cycle, then
/// smurfing fan-in, then smurfing fan-out, then layered), scores each one,
/// stable-sorts descending by risk score, and assigns sequential ring IDs.
///
/// The concatenation order only matters for ties: `Vec::sort_by` is stable,
/// so two rings with an identical risk score keep this relative order.
pub fn aggregate(
    cycle_rings: Vec<RawRing>,
    smurfing_rings: Vec<RawRing>,
    layered_rings: Vec<RawRing>,
    config: &PipelineConfig,
) -> Result<Vec<FinalRing>, PipelineError> {
    let mut ordered = Vec::with_capacity(cycle_rings.len() + smurfing_rings.len() + layered_rings.len());
    ordered.extend(cycle_rings);
    ordered.extend(smurfing_rings);
    ordered.extend(layered_rings);

    for raw in &ordered {
        if raw.members.len() < 2 {
            return Err(PipelineError::InvariantViolation {
                detail: format!("ring with pattern {:?} has fewer than 2 members", raw.pattern),
            });
        }
    }

    let mut scored: Vec<(f64, RawRing)> = ordered
        .into_iter()
        .map(|raw| (risk_score(&raw, config), raw))
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let width = id_width(scored.len());
    let rings = scored
        .into_iter()
        .enumerate()
        .map(|(i, (risk, raw))| FinalRing {
            ring_id: format!("RING_{:0width$}", i + 1, width = width),
            pattern: raw.pattern,
            members: raw.members.into_iter().collect(),
            risk_score: risk,
            provisional_total_amount: raw.provisional_total_amount,
            provisional_transaction_count: raw.provisional_transaction_count,
        })
        .collect();

    Ok(rings)
}

fn risk_score(raw: &RawRing, config: &PipelineConfig) -> f64 {
    let base = match raw.pattern {
        Pattern::Cycle => config.cycle_base_score,
        Pattern::SmurfingFanIn => config.smurfing_fan_in_base_score,
        Pattern::SmurfingFanOut => config.smurfing_fan_out_base_score,
        Pattern::Layered => config.layered_base_score,
    };
    let raw_score = (base + (raw.members.len() as u32).min(10)).min(100);
    (raw_score as f64 / 100.0 * 10000.0).round() / 10000.0
}

fn id_width(count: usize) -> usize {
    if count <= 999 {
        3
    } else {
        count.to_string().len()
    }
}
