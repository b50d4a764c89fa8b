use super::{clamp_rank, PredictionError};
use serde::{Deserialize, Serialize};

/// Per-subject configuration supplied by the model loader. The engine carries
/// no subject or exam identifiers; tie-break emphasis is a flag here, not a
/// branch on subject names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectConfig {
    pub max_score: f64,
    /// Base impact multiplier for this subject's blend against the overall rank.
    #[serde(default = "default_blend_weight")]
    pub blend_weight: f64,
    /// True when the exam uses this subject to break rank ties, which
    /// strengthens how far its score moves the subject rank.
    #[serde(default)]
    pub tie_break_priority: bool,
}

pub(crate) fn default_blend_weight() -> f64 {
    0.7
}

/// Blends a subject score against the overall prediction.
///
/// A candidate disproportionately strong in one subject ranks better there
/// than overall, and vice versa; the multiplier tunes how strongly local
/// performance overrides the holistic estimate.
pub(crate) fn subject_rank(
    subject_score: f64,
    config: &SubjectConfig,
    total_score: f64,
    max_marks: f64,
    overall_rank: u32,
    total_candidates: u32,
    tie_break_bonus: f64,
) -> Result<u32, PredictionError> {
    if !(config.max_score > 0.0) {
        return Err(PredictionError::InvalidSubjectMaxScore {
            max_score: config.max_score,
        });
    }

    // A zero-confidence estimate defaults to the holistic prediction.
    if subject_score <= 0.0 {
        return Ok(overall_rank);
    }

    let subject_strength = (subject_score / config.max_score).clamp(0.0, 1.0);
    let overall_strength = (total_score / max_marks).clamp(0.0, 1.0);
    let gap = subject_strength - overall_strength;

    let mut multiplier = config.blend_weight;
    if config.tie_break_priority {
        multiplier += tie_break_bonus;
    }

    let shift = overall_rank as f64 * gap * multiplier;
    Ok(clamp_rank(overall_rank as f64 - shift, 1, total_candidates))
}
