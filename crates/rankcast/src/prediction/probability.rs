use super::round2;
use serde::{Deserialize, Serialize};

/// Confidence windows widen with the probability level, so the bands are
/// nested by construction.
const BANDS: [(u8, f64, &str); 4] = [
    (40, 0.05, "Most likely (±5%)"),
    (60, 0.10, "Probable range (±10%)"),
    (68, 0.10, "68% confidence (1σ)"),
    (95, 0.20, "95% confidence (2σ)"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityRange {
    pub min_rank: u32,
    pub max_rank: u32,
    pub probability: u8,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityDistribution {
    pub ranges: Vec<ProbabilityRange>,
    pub percentile: f64,
}

/// Multiplicative confidence windows around the point estimate, rounded toward
/// the inclusive edge so a band never claims coverage it cannot have.
pub(crate) fn distribution(predicted_rank: u32, total_candidates: u32) -> ProbabilityDistribution {
    let rank = predicted_rank as f64;

    let ranges = BANDS
        .iter()
        .map(|&(probability, width, label)| ProbabilityRange {
            min_rank: ((rank * (1.0 - width)).ceil().max(1.0)) as u32,
            max_rank: ((rank * (1.0 + width)).floor().min(total_candidates as f64)) as u32,
            probability,
            label: label.to_string(),
        })
        .collect();

    let percentile =
        (total_candidates - predicted_rank) as f64 / total_candidates as f64 * 100.0;

    ProbabilityDistribution {
        ranges,
        percentile: round2(percentile),
    }
}
