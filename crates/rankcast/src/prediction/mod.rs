//! Calibration-driven rank prediction and its derived analytics.
//!
//! Every component here is a pure function of its explicit inputs: no shared
//! state, no I/O, no async. The engine is handed an immutable [`ExamModel`]
//! snapshot per invocation and is safe to call from any number of concurrent
//! request handlers.

pub mod calibration;
pub mod model;
pub mod probability;
pub mod scenario;
pub mod subject;
pub mod trajectory;

pub use calibration::{CalibrationPoint, CalibrationTable, DegradedModelWarning};
pub use model::{PowerLawConfig, RankModel, DEFAULT_EXPONENT};
pub use probability::{ProbabilityDistribution, ProbabilityRange};
pub use scenario::Scenario;
pub use subject::SubjectConfig;
pub use trajectory::{
    AccuracyBandedTrajectory, FeatureWeight, HorizonProjection, LinearTrajectory,
    TrajectoryModel, TrajectoryProjection, FEATURE_ACCURACY_PERCENT,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typed failures for model configuration the engine cannot be total over.
/// Out-of-range scores are clamped instead; these are the cases where a
/// silent fallback would poison the output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("unknown exam '{0}'")]
    UnknownExam(String),
    #[error("exam '{exam}' declares invalid max marks {max_marks}")]
    InvalidMaxMarks { exam: String, max_marks: f64 },
    #[error("exam '{exam}' declares an empty candidate pool")]
    EmptyCandidatePool { exam: String },
    #[error(
        "exam '{exam}' declares invalid rank bounds [{rank_min}, {rank_max}] for {total_candidates} candidates"
    )]
    InvalidRankBounds {
        exam: String,
        rank_min: u32,
        rank_max: u32,
        total_candidates: u32,
    },
    #[error("exam '{exam}' declares invalid power-law exponent {exponent}")]
    InvalidExponent { exam: String, exponent: f64 },
    #[error("subject declares invalid max score {max_score}")]
    InvalidSubjectMaxScore { max_score: f64 },
    #[error("trajectory declares invalid monthly improvement range [{min}, {max}]")]
    InvalidMonthlyRange { min: f64, max: f64 },
}

/// Rounds to two decimals, used wherever percentages leave the engine.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds a fractional rank to the nearest integer and clamps it to bounds.
pub(crate) fn clamp_rank(value: f64, min: u32, max: u32) -> u32 {
    let rounded = value.round();
    if rounded <= min as f64 {
        min
    } else if rounded >= max as f64 {
        max
    } else {
        rounded as u32
    }
}

/// Named tuning defaults for the engine, overridable per deployment so none
/// of these live as inline literals in the formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTuning {
    /// Added to a subject's blend weight when it carries tie-break priority.
    pub tie_break_bonus: f64,
    /// Score delta of the accuracy scenario, as a fraction of max marks.
    pub accuracy_gain_fraction: f64,
    /// Accuracy gain advertised in the scenario description.
    pub accuracy_gain_label_percent: u32,
    /// Fraction of a subject's remaining headroom applied by subject scenarios.
    pub subject_headroom_fraction: f64,
    /// Accuracy assumed when the behavioral feature is absent.
    pub default_accuracy: f64,
    /// Projection horizons in months.
    pub horizons: Vec<u32>,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            tie_break_bonus: 0.15,
            accuracy_gain_fraction: 0.07,
            accuracy_gain_label_percent: 10,
            subject_headroom_fraction: 0.20,
            default_accuracy: 0.70,
            horizons: vec![1, 3, 6],
        }
    }
}

/// Everything the loader supplies for one exam: the rank model, per-subject
/// blending configuration, and the trajectory strategy. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamModel {
    rank_model: RankModel,
    subjects: BTreeMap<String, SubjectConfig>,
    trajectory: TrajectoryModel,
    warnings: Vec<DegradedModelWarning>,
}

impl ExamModel {
    pub fn new(
        rank_model: RankModel,
        subjects: BTreeMap<String, SubjectConfig>,
        trajectory: TrajectoryModel,
    ) -> Result<Self, PredictionError> {
        for config in subjects.values() {
            if !(config.max_score > 0.0) {
                return Err(PredictionError::InvalidSubjectMaxScore {
                    max_score: config.max_score,
                });
            }
        }

        // An inverted or non-finite clamp range would panic inside f64::clamp
        // at request time; reject it here as configuration.
        if let TrajectoryModel::Linear(linear) = &trajectory {
            let [min, max] = linear.monthly_range;
            if !min.is_finite() || !max.is_finite() || min > max {
                return Err(PredictionError::InvalidMonthlyRange { min, max });
            }
        }

        let warnings = rank_model.warnings();
        Ok(Self {
            rank_model,
            subjects,
            trajectory,
            warnings,
        })
    }

    pub fn exam_id(&self) -> &str {
        self.rank_model.exam_id()
    }

    pub fn rank_model(&self) -> &RankModel {
        &self.rank_model
    }

    pub fn subjects(&self) -> &BTreeMap<String, SubjectConfig> {
        &self.subjects
    }

    pub fn trajectory(&self) -> &TrajectoryModel {
        &self.trajectory
    }

    pub fn warnings(&self) -> &[DegradedModelWarning] {
        &self.warnings
    }
}

/// Validated inbound request. The engine still clamps scores defensively;
/// range validation upstream is a caller courtesy, not a precondition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub exam: String,
    pub total_score: f64,
    #[serde(default)]
    pub subject_scores: BTreeMap<String, f64>,
    /// Behavioral features (accuracy percentage, time per question, ...)
    /// consumed by the trajectory and scenario components only.
    #[serde(default)]
    pub features: BTreeMap<String, f64>,
}

/// Per-subject slice of the prediction. Absent subject scores never reach
/// this type; they serialize as `null` in [`Prediction::subject_ranks`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectPrediction {
    pub rank: u32,
    pub score: f64,
    pub max_score: f64,
}

/// Full engine output for one request. Composed per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub exam: String,
    pub overall_rank: u32,
    pub subject_ranks: BTreeMap<String, Option<SubjectPrediction>>,
    pub probability: ProbabilityDistribution,
    pub trajectory: TrajectoryProjection,
    pub scenarios: Vec<Scenario>,
    pub warnings: Vec<DegradedModelWarning>,
}

/// Stateless facade composing the rank model with the derived analytics.
#[derive(Debug, Clone, Default)]
pub struct PredictionEngine {
    tuning: EngineTuning,
}

impl PredictionEngine {
    pub fn new(tuning: EngineTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &EngineTuning {
        &self.tuning
    }

    pub fn predict(
        &self,
        model: &ExamModel,
        request: &PredictionRequest,
    ) -> Result<Prediction, PredictionError> {
        let rank_model = model.rank_model();
        let max_marks = rank_model.max_marks();
        let total_candidates = rank_model.total_candidates();

        let total_score = request.total_score.clamp(0.0, max_marks);
        let overall_rank = rank_model.predict(total_score);

        let mut subject_ranks = BTreeMap::new();
        for (subject_id, config) in model.subjects() {
            let entry = match request.subject_scores.get(subject_id) {
                // Absence is not zero: report null, never the overall rank.
                None => None,
                Some(&score) => {
                    let rank = subject::subject_rank(
                        score,
                        config,
                        total_score,
                        max_marks,
                        overall_rank,
                        total_candidates,
                        self.tuning.tie_break_bonus,
                    )?;
                    Some(SubjectPrediction {
                        rank,
                        score,
                        max_score: config.max_score,
                    })
                }
            };
            subject_ranks.insert(subject_id.clone(), entry);
        }

        let probability = probability::distribution(overall_rank, total_candidates);

        let trajectory = trajectory::project(
            model.trajectory(),
            rank_model,
            total_score,
            overall_rank,
            &request.features,
            &self.tuning,
        );

        let scenarios = scenario::simulate(
            rank_model,
            model.subjects(),
            &request.subject_scores,
            total_score,
            overall_rank,
            &self.tuning,
        );

        Ok(Prediction {
            exam: model.exam_id().to_string(),
            overall_rank,
            subject_ranks,
            probability,
            trajectory,
            scenarios,
            warnings: model.warnings().to_vec(),
        })
    }
}
