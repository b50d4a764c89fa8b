use super::model::RankModel;
use super::subject::SubjectConfig;
use super::{round2, EngineTuning};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One hypothetical improvement lever, replayed through the rank model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub description: String,
    pub improved_rank: u32,
    /// `current_rank - improved_rank`; positive means a better rank.
    pub rank_improvement: i64,
    pub improvement_percent: f64,
}

/// Generates the what-if list: one accuracy-boost scenario plus one headroom
/// boost per subject the candidate actually reported a score for.
///
/// Ordering is a contract: descending by rank improvement, so the most
/// impactful lever comes first.
pub(crate) fn simulate(
    rank_model: &RankModel,
    subjects: &BTreeMap<String, SubjectConfig>,
    subject_scores: &BTreeMap<String, f64>,
    total_score: f64,
    current_rank: u32,
    tuning: &EngineTuning,
) -> Vec<Scenario> {
    let max_marks = rank_model.max_marks();
    let mut scenarios = Vec::new();

    let mut push = |id: String, description: String, score_boost: f64| {
        let improved_score = (total_score + score_boost).min(max_marks);
        let improved_rank = rank_model.predict(improved_score);
        let rank_improvement = current_rank as i64 - improved_rank as i64;
        scenarios.push(Scenario {
            id,
            description,
            improved_rank,
            rank_improvement,
            improvement_percent: round2(rank_improvement as f64 / current_rank as f64 * 100.0),
        });
    };

    let accuracy_label = tuning.accuracy_gain_label_percent;
    push(
        format!("accuracy_plus_{accuracy_label}"),
        format!("If you improve overall accuracy by {accuracy_label}%"),
        max_marks * tuning.accuracy_gain_fraction,
    );

    let headroom_label = (tuning.subject_headroom_fraction * 100.0).round() as u32;
    for (subject_id, config) in subjects {
        // No reported score for this subject: skip, never emit a placeholder.
        let Some(&current) = subject_scores.get(subject_id) else {
            continue;
        };
        let remaining = (config.max_score - current).max(0.0);
        push(
            format!("{subject_id}_plus_{headroom_label}"),
            format!("If you improve {subject_id} by {headroom_label}%"),
            remaining * tuning.subject_headroom_fraction,
        );
    }

    scenarios.sort_by(|a, b| b.rank_improvement.cmp(&a.rank_improvement));
    scenarios
}
