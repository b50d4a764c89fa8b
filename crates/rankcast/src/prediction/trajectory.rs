use super::model::RankModel;
use super::{clamp_rank, round2, EngineTuning};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Behavioral feature key carrying accuracy as a 0-100 percentage.
pub const FEATURE_ACCURACY_PERCENT: &str = "accuracy_percent";

/// One weighted behavioral feature of the fitted linear improvement model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature: String,
    pub coefficient: f64,
}

/// Fitted linear model of monthly improvement over behavioral features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTrajectory {
    pub intercept: f64,
    pub coefficients: Vec<FeatureWeight>,
    /// Inclusive clamp applied to the predicted monthly improvement.
    pub monthly_range: [f64; 2],
}

/// Heuristic monthly-improvement model for exams without a fitted trajectory.
///
/// Improvement is keyed by the candidate's accuracy bracket (low accuracy
/// leaves more room to improve), then damped as the current score approaches
/// the maximum (near-max scores compress further).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyBandedTrajectory {
    /// Ascending accuracy bracket boundaries splitting 0-1 into five bands.
    #[serde(default = "AccuracyBandedTrajectory::default_accuracy_cutoffs")]
    pub accuracy_cutoffs: [f64; 4],
    /// Monthly score gain per accuracy band, as a fraction of max marks.
    #[serde(default = "AccuracyBandedTrajectory::default_monthly_gain_fractions")]
    pub monthly_gain_fractions: [f64; 5],
    /// Ascending score-ratio boundaries where the plateau damping starts.
    #[serde(default = "AccuracyBandedTrajectory::default_plateau_cutoffs")]
    pub plateau_cutoffs: [f64; 3],
    /// Damping multiplier for each plateau band; 1.0 applies below the first cutoff.
    #[serde(default = "AccuracyBandedTrajectory::default_plateau_multipliers")]
    pub plateau_multipliers: [f64; 3],
}

impl AccuracyBandedTrajectory {
    fn default_accuracy_cutoffs() -> [f64; 4] {
        [0.40, 0.55, 0.70, 0.85]
    }

    fn default_monthly_gain_fractions() -> [f64; 5] {
        [0.080, 0.060, 0.045, 0.030, 0.015]
    }

    fn default_plateau_cutoffs() -> [f64; 3] {
        [0.70, 0.80, 0.90]
    }

    fn default_plateau_multipliers() -> [f64; 3] {
        [0.75, 0.50, 0.25]
    }

    fn monthly_improvement(&self, accuracy: f64, score_ratio: f64, max_marks: f64) -> f64 {
        let band = self
            .accuracy_cutoffs
            .iter()
            .position(|cutoff| accuracy < *cutoff)
            .unwrap_or(self.accuracy_cutoffs.len());
        let base = max_marks * self.monthly_gain_fractions[band];

        let plateau = self
            .plateau_cutoffs
            .iter()
            .rposition(|cutoff| score_ratio >= *cutoff)
            .map(|idx| self.plateau_multipliers[idx])
            .unwrap_or(1.0);

        base * plateau
    }
}

impl Default for AccuracyBandedTrajectory {
    fn default() -> Self {
        Self {
            accuracy_cutoffs: Self::default_accuracy_cutoffs(),
            monthly_gain_fractions: Self::default_monthly_gain_fractions(),
            plateau_cutoffs: Self::default_plateau_cutoffs(),
            plateau_multipliers: Self::default_plateau_multipliers(),
        }
    }
}

/// The two monthly-improvement strategies, selected per exam by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum TrajectoryModel {
    Linear(LinearTrajectory),
    AccuracyBanded(AccuracyBandedTrajectory),
}

impl Default for TrajectoryModel {
    fn default() -> Self {
        TrajectoryModel::AccuracyBanded(AccuracyBandedTrajectory::default())
    }
}

/// Score and rank projected for one future horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonProjection {
    pub months: u32,
    pub projected_score: f64,
    pub projected_rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryProjection {
    /// Monthly improvement: percentage points for the linear model, marks per
    /// month for the accuracy-banded model. Rounded to two decimals.
    pub monthly_improvement: f64,
    pub horizons: Vec<HorizonProjection>,
}

pub(crate) fn project(
    model: &TrajectoryModel,
    rank_model: &RankModel,
    current_score: f64,
    current_rank: u32,
    features: &BTreeMap<String, f64>,
    tuning: &EngineTuning,
) -> TrajectoryProjection {
    let max_marks = rank_model.max_marks();
    let total_candidates = rank_model.total_candidates();

    match model {
        TrajectoryModel::Linear(linear) => {
            let mut delta = linear.intercept;
            for weight in &linear.coefficients {
                // Missing behavioral features contribute nothing.
                delta += weight.coefficient * features.get(&weight.feature).copied().unwrap_or(0.0);
            }
            let [min, max] = linear.monthly_range;
            let delta = delta.clamp(min, max);

            let horizons = tuning
                .horizons
                .iter()
                .map(|&months| {
                    let projected_score =
                        (current_score + delta * months as f64).clamp(0.0, max_marks);
                    // Geometric decay models diminishing marginal rank gains as
                    // the candidate approaches their ceiling.
                    let decayed =
                        current_rank as f64 * (1.0 - delta / 100.0).powi(months as i32);
                    HorizonProjection {
                        months,
                        projected_score,
                        projected_rank: clamp_rank(decayed, 1, total_candidates),
                    }
                })
                .collect();

            TrajectoryProjection {
                monthly_improvement: round2(delta),
                horizons,
            }
        }
        TrajectoryModel::AccuracyBanded(banded) => {
            let accuracy = features
                .get(FEATURE_ACCURACY_PERCENT)
                .map(|percent| (percent / 100.0).clamp(0.0, 1.0))
                .unwrap_or(tuning.default_accuracy);
            let score_ratio = (current_score / max_marks).clamp(0.0, 1.0);
            let monthly = banded.monthly_improvement(accuracy, score_ratio, max_marks);

            let horizons = tuning
                .horizons
                .iter()
                .map(|&months| {
                    let projected_score =
                        (current_score + monthly * months as f64).clamp(0.0, max_marks);
                    HorizonProjection {
                        months,
                        projected_score,
                        // Ranks come from the primary rank model, never a
                        // trajectory-local formula.
                        projected_rank: rank_model.predict(projected_score),
                    }
                })
                .collect();

            TrajectoryProjection {
                monthly_improvement: round2(monthly),
                horizons,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::calibration::{CalibrationPoint, CalibrationTable};
    use super::*;

    fn rank_model() -> RankModel {
        let points = vec![
            CalibrationPoint { score: 0.0, rank: 100_000.0 },
            CalibrationPoint { score: 80.0, rank: 40_000.0 },
            CalibrationPoint { score: 160.0, rank: 1.0 },
        ];
        RankModel::Calibrated(
            CalibrationTable::new("demo", points, 1, 100_000, 100_000, 160.0).expect("valid table"),
        )
    }

    fn linear_model() -> TrajectoryModel {
        TrajectoryModel::Linear(LinearTrajectory {
            intercept: 2.0,
            coefficients: vec![FeatureWeight {
                feature: "study_hours_per_day".to_string(),
                coefficient: 1.0,
            }],
            monthly_range: [0.0, 8.0],
        })
    }

    #[test]
    fn linear_model_sums_features_and_clamps() {
        let features = BTreeMap::from([("study_hours_per_day".to_string(), 3.0)]);
        let projection = project(
            &linear_model(),
            &rank_model(),
            80.0,
            40_000,
            &features,
            &EngineTuning::default(),
        );
        assert_eq!(projection.monthly_improvement, 5.0);

        let capped = BTreeMap::from([("study_hours_per_day".to_string(), 50.0)]);
        let projection = project(
            &linear_model(),
            &rank_model(),
            80.0,
            40_000,
            &capped,
            &EngineTuning::default(),
        );
        assert_eq!(projection.monthly_improvement, 8.0);
    }

    #[test]
    fn linear_ranks_decay_geometrically() {
        let features = BTreeMap::from([("study_hours_per_day".to_string(), 3.0)]);
        let projection = project(
            &linear_model(),
            &rank_model(),
            80.0,
            40_000,
            &features,
            &EngineTuning::default(),
        );

        let months: Vec<u32> = projection.horizons.iter().map(|h| h.months).collect();
        assert_eq!(months, vec![1, 3, 6]);

        // 5% monthly: 40000 * 0.95^h.
        assert_eq!(projection.horizons[0].projected_rank, 38_000);
        assert_eq!(projection.horizons[1].projected_rank, 34_295);
        assert_eq!(
            projection.horizons[2].projected_rank,
            (40_000.0_f64 * 0.95_f64.powi(6)).round() as u32
        );
    }

    #[test]
    fn missing_features_contribute_zero() {
        let projection = project(
            &linear_model(),
            &rank_model(),
            80.0,
            40_000,
            &BTreeMap::new(),
            &EngineTuning::default(),
        );
        assert_eq!(projection.monthly_improvement, 2.0);
    }

    #[test]
    fn banded_model_reinvokes_the_rank_model() {
        let model = TrajectoryModel::AccuracyBanded(AccuracyBandedTrajectory::default());
        let rank_model = rank_model();
        let features = BTreeMap::from([(FEATURE_ACCURACY_PERCENT.to_string(), 50.0)]);

        let projection = project(&model, &rank_model, 64.0, 52_000, &features, &EngineTuning::default());

        // 0.50 accuracy band and 0.4 score ratio: 160 * 0.060 = 9.6 marks/month.
        assert_eq!(projection.monthly_improvement, 9.6);
        for horizon in &projection.horizons {
            assert_eq!(
                horizon.projected_rank,
                rank_model.predict(horizon.projected_score)
            );
        }
    }

    #[test]
    fn plateau_damping_compresses_gains_near_max() {
        let banded = AccuracyBandedTrajectory::default();
        let low = banded.monthly_improvement(0.6, 0.50, 160.0);
        let high = banded.monthly_improvement(0.6, 0.92, 160.0);
        assert_eq!(low, 160.0 * 0.045);
        assert_eq!(high, 160.0 * 0.045 * 0.25);
    }

    #[test]
    fn accuracy_defaults_when_feature_absent() {
        let banded = TrajectoryModel::AccuracyBanded(AccuracyBandedTrajectory::default());
        let projection = project(
            &banded,
            &rank_model(),
            40.0,
            70_000,
            &BTreeMap::new(),
            &EngineTuning::default(),
        );
        // Default accuracy 0.7 lands in the fourth band: 160 * 0.030.
        assert_eq!(projection.monthly_improvement, 4.8);
    }

    #[test]
    fn every_horizon_clamps_independently() {
        let banded = TrajectoryModel::AccuracyBanded(AccuracyBandedTrajectory::default());
        let features = BTreeMap::from([(FEATURE_ACCURACY_PERCENT.to_string(), 30.0)]);
        let projection = project(
            &banded,
            &rank_model(),
            150.0,
            2_000,
            &features,
            &EngineTuning::default(),
        );
        for horizon in &projection.horizons {
            assert!(horizon.projected_score <= 160.0);
            assert!(horizon.projected_rank >= 1);
        }
        assert_eq!(projection.horizons[2].projected_score, 160.0);
    }
}
