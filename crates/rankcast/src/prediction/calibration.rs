use super::{clamp_rank, PredictionError};
use serde::{Deserialize, Serialize};

/// One knot of the isotonic calibration fitted from a historical candidate cohort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub score: f64,
    pub rank: f64,
}

/// Non-fatal model quality findings surfaced alongside predictions so callers
/// can qualify the estimate instead of receiving a hard failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegradedModelWarning {
    /// Fewer than two calibration points; predictions degenerate to constant extrapolation.
    SparseCalibration { exam: String, points: usize },
    /// Rank is not non-increasing in score across the calibration points.
    NonMonotoneCalibration { exam: String },
}

impl DegradedModelWarning {
    pub fn summary(&self) -> String {
        match self {
            DegradedModelWarning::SparseCalibration { exam, points } => format!(
                "exam '{exam}' has only {points} calibration point(s); predictions fall back to constant extrapolation"
            ),
            DegradedModelWarning::NonMonotoneCalibration { exam } => format!(
                "exam '{exam}' calibration is not monotone non-increasing; interpolation remains deterministic but unverified"
            ),
        }
    }
}

/// Immutable per-exam score-to-rank calibration, consumed read-only by the engine.
///
/// Points are sorted by score at construction; on duplicate scores the
/// first-seen point wins so interpolation stays deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    exam_id: String,
    points: Vec<CalibrationPoint>,
    rank_min: u32,
    rank_max: u32,
    total_candidates: u32,
    max_marks: f64,
}

impl CalibrationTable {
    pub fn new(
        exam_id: impl Into<String>,
        points: Vec<CalibrationPoint>,
        rank_min: u32,
        rank_max: u32,
        total_candidates: u32,
        max_marks: f64,
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
        if rank_min < 1 || rank_min > rank_max || rank_max > total_candidates {
            return Err(PredictionError::InvalidRankBounds {
                exam: exam_id,
                rank_min,
                rank_max,
                total_candidates,
            });
        }

        let mut points = points;
        points.sort_by(|a, b| a.score.total_cmp(&b.score));
        points.dedup_by(|next, kept| next.score == kept.score);

        Ok(Self {
            exam_id,
            points,
            rank_min,
            rank_max,
            total_candidates,
            max_marks,
        })
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    pub fn rank_min(&self) -> u32 {
        self.rank_min
    }

    pub fn rank_max(&self) -> u32 {
        self.rank_max
    }

    pub fn total_candidates(&self) -> u32 {
        self.total_candidates
    }

    pub fn max_marks(&self) -> f64 {
        self.max_marks
    }

    /// Quality findings for this table. The table remains usable either way.
    pub fn warnings(&self) -> Vec<DegradedModelWarning> {
        let mut warnings = Vec::new();

        if self.points.len() < 2 {
            warnings.push(DegradedModelWarning::SparseCalibration {
                exam: self.exam_id.clone(),
                points: self.points.len(),
            });
        }

        let monotone = self
            .points
            .windows(2)
            .all(|pair| pair[0].rank >= pair[1].rank);
        if !monotone {
            warnings.push(DegradedModelWarning::NonMonotoneCalibration {
                exam: self.exam_id.clone(),
            });
        }

        warnings
    }

    /// Piecewise-linear monotone interpolation with constant extrapolation
    /// outside the observed score range.
    pub fn predict(&self, score: f64) -> u32 {
        let score = score.clamp(0.0, self.max_marks);

        let mut lower: Option<&CalibrationPoint> = None;
        let mut upper: Option<&CalibrationPoint> = None;

        for point in &self.points {
            if point.score <= score && lower.map_or(true, |l| point.score > l.score) {
                lower = Some(point);
            }
            if point.score >= score && upper.map_or(true, |u| point.score < u.score) {
                upper = Some(point);
            }
        }

        let interpolated = match (lower, upper) {
            // Exact knot hit: return that point's rank directly.
            (Some(lower), _) if lower.score == score => lower.rank,
            // Below every knot: constant extrapolation from the lowest knot.
            (None, Some(upper)) => upper.rank,
            // Above every knot: constant extrapolation from the highest knot.
            (Some(lower), None) => lower.rank,
            (Some(lower), Some(upper)) => {
                let t = (score - lower.score) / (upper.score - lower.score);
                lower.rank + t * (upper.rank - lower.rank)
            }
            // Empty table: nothing observed, pessimal bound.
            (None, None) => self.rank_max as f64,
        };

        clamp_rank(interpolated, self.rank_min, self.rank_max)
    }
}
