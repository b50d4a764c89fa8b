use super::calibration::{CalibrationTable, DegradedModelWarning};
use super::{clamp_rank, PredictionError};

/// Exponent applied when an exam supplies no tuned value. Fitted exponents
/// typically land between 2.1 and 3.2 depending on the cohort.
pub const DEFAULT_EXPONENT: f64 = 2.5;

/// Closed-form score-to-rank model used when no calibration table exists for
/// an exam. Same output contract as the interpolator: monotone, bounded,
/// deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerLawConfig {
    exam_id: String,
    max_marks: f64,
    total_candidates: u32,
    exponent: f64,
}

impl PowerLawConfig {
    pub fn new(
        exam_id: impl Into<String>,
        max_marks: f64,
        total_candidates: u32,
        exponent: f64,
    ) -> Result<Self, PredictionError> {
        let exam_id = exam_id.into();

        if !(max_marks > 0.0) {
            return Err(PredictionError::InvalidMaxMarks {
                exam: exam_id,
                max_marks,
            });
        }
        if total_candidates == 0 {
            return Err(PredictionError::EmptyCandidatePool { exam: exam_id });
        }
        if !(exponent > 0.0) {
            return Err(PredictionError::InvalidExponent {
                exam: exam_id,
                exponent,
            });
        }

        Ok(Self {
            exam_id,
            max_marks,
            total_candidates,
            exponent,
        })
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    pub fn max_marks(&self) -> f64 {
        self.max_marks
    }

    pub fn total_candidates(&self) -> u32 {
        self.total_candidates
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    /// `rank = round(total_candidates * (1 - score/max)^exponent)`, floored at 1.
    pub fn predict(&self, score: f64) -> u32 {
        let ratio = (score / self.max_marks).clamp(0.0, 1.0);
        let rank = self.total_candidates as f64 * (1.0 - ratio).powf(self.exponent);
        clamp_rank(rank, 1, self.total_candidates)
    }
}

/// The primary score-to-rank model behind a single interface.
///
/// An exam with fitted calibration points uses piecewise-linear interpolation;
/// exams without one use the power-law fallback. Every downstream component
/// (trajectory, scenarios) re-invokes this model rather than carrying a rank
/// formula of its own.
#[derive(Debug, Clone, PartialEq)]
pub enum RankModel {
    Calibrated(CalibrationTable),
    PowerLaw(PowerLawConfig),
}

impl RankModel {
    pub fn predict(&self, score: f64) -> u32 {
        match self {
            RankModel::Calibrated(table) => table.predict(score),
            RankModel::PowerLaw(config) => config.predict(score),
        }
    }

    pub fn exam_id(&self) -> &str {
        match self {
            RankModel::Calibrated(table) => table.exam_id(),
            RankModel::PowerLaw(config) => config.exam_id(),
        }
    }

    pub fn max_marks(&self) -> f64 {
        match self {
            RankModel::Calibrated(table) => table.max_marks(),
            RankModel::PowerLaw(config) => config.max_marks(),
        }
    }

    pub fn total_candidates(&self) -> u32 {
        match self {
            RankModel::Calibrated(table) => table.total_candidates(),
            RankModel::PowerLaw(config) => config.total_candidates(),
        }
    }

    pub fn warnings(&self) -> Vec<DegradedModelWarning> {
        match self {
            RankModel::Calibrated(table) => table.warnings(),
            RankModel::PowerLaw(_) => Vec::new(),
        }
    }
}
