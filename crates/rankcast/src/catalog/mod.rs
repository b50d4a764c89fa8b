//! Per-exam model definitions and their loader.
//!
//! The engine consumes immutable [`ExamModel`] snapshots; this module owns
//! turning serialized model files into validated snapshots. A lookup miss is
//! a typed error, never a silent fallback to another exam's table.

use crate::prediction::{
    CalibrationPoint, CalibrationTable, ExamModel, PowerLawConfig, PredictionError, RankModel,
    SubjectConfig, TrajectoryModel, DEFAULT_EXPONENT,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read model file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse model file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("duplicate exam id '{0}'")]
    DuplicateExam(String),
    #[error(transparent)]
    Model(#[from] PredictionError),
}

/// Serialized shape of one exam model file, close to the metadata the
/// calibration pipeline exports.
#[derive(Debug, Deserialize)]
pub struct ExamModelFile {
    pub exam: String,
    pub max_marks: f64,
    pub total_candidates: u32,
    #[serde(default = "default_rank_min")]
    pub rank_min: u32,
    pub rank_max: Option<u32>,
    /// Isotonic calibration knots as `[score, rank]` pairs. Absent or empty
    /// means the exam uses the power-law fallback.
    #[serde(default)]
    pub calibration_points: Vec<[f64; 2]>,
    pub power_law_exponent: Option<f64>,
    #[serde(default)]
    pub subjects: BTreeMap<String, SubjectConfig>,
    #[serde(default)]
    pub trajectory: TrajectoryModel,
}

fn default_rank_min() -> u32 {
    1
}

impl ExamModelFile {
    pub fn into_model(self) -> Result<ExamModel, PredictionError> {
        let rank_model = if self.calibration_points.is_empty() {
            RankModel::PowerLaw(PowerLawConfig::new(
                self.exam,
                self.max_marks,
                self.total_candidates,
                self.power_law_exponent.unwrap_or(DEFAULT_EXPONENT),
            )?)
        } else {
            let points = self
                .calibration_points
                .into_iter()
                .map(|[score, rank]| CalibrationPoint { score, rank })
                .collect();
            RankModel::Calibrated(CalibrationTable::new(
                self.exam,
                points,
                self.rank_min,
                self.rank_max.unwrap_or(self.total_candidates),
                self.total_candidates,
                self.max_marks,
            )?)
        };

        ExamModel::new(rank_model, self.subjects, self.trajectory)
    }
}

/// Read-only registry of exam models, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    exams: BTreeMap<String, ExamModel>,
}

impl ModelCatalog {
    pub fn from_models(
        models: impl IntoIterator<Item = ExamModel>,
    ) -> Result<Self, CatalogError> {
        let mut exams = BTreeMap::new();
        for model in models {
            let exam_id = model.exam_id().to_string();
            if exams.insert(exam_id.clone(), model).is_some() {
                return Err(CatalogError::DuplicateExam(exam_id));
            }
        }
        Ok(Self { exams })
    }

    /// Loads every `*.json` model file in a directory.
    pub fn from_dir(dir: &Path) -> Result<Self, CatalogError> {
        let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut models = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CatalogError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let raw = std::fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            let file: ExamModelFile =
                serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                    path: path.clone(),
                    source,
                })?;
            models.push(file.into_model()?);
        }

        Self::from_models(models)
    }

    pub fn get(&self, exam: &str) -> Result<&ExamModel, PredictionError> {
        self.exams
            .get(exam)
            .ok_or_else(|| PredictionError::UnknownExam(exam.to_string()))
    }

    pub fn exam_ids(&self) -> Vec<&str> {
        self.exams.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.exams.is_empty()
    }

    pub fn len(&self) -> usize {
        self.exams.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::DegradedModelWarning;

    const CALIBRATED: &str = r#"{
        "exam": "tg_mpc",
        "max_marks": 160,
        "total_candidates": 98650,
        "rank_max": 98650,
        "calibration_points": [[0, 98650], [80, 40000], [160, 1]],
        "subjects": {
            "maths": { "max_score": 80, "blend_weight": 0.9, "tie_break_priority": true },
            "physics": { "max_score": 40 }
        },
        "trajectory": {
            "strategy": "linear",
            "intercept": 2.0,
            "coefficients": [{ "feature": "study_hours_per_day", "coefficient": 1.0 }],
            "monthly_range": [0.0, 8.0]
        }
    }"#;

    #[test]
    fn parses_a_calibrated_model_file() {
        let file: ExamModelFile = serde_json::from_str(CALIBRATED).expect("parses");
        let model = file.into_model().expect("valid model");

        assert_eq!(model.exam_id(), "tg_mpc");
        assert!(matches!(model.rank_model(), RankModel::Calibrated(_)));
        assert!(model.subjects()["maths"].tie_break_priority);
        // Unspecified blend weight takes the default.
        assert_eq!(model.subjects()["physics"].blend_weight, 0.7);
        assert!(model.warnings().is_empty());
        assert_eq!(model.rank_model().predict(160.0), 1);
    }

    #[test]
    fn falls_back_to_power_law_without_calibration_points() {
        let raw = r#"{
            "exam": "ap_bipc",
            "max_marks": 160,
            "total_candidates": 72000,
            "power_law_exponent": 2.8
        }"#;
        let model = serde_json::from_str::<ExamModelFile>(raw)
            .expect("parses")
            .into_model()
            .expect("valid model");

        assert!(matches!(model.rank_model(), RankModel::PowerLaw(_)));
        assert_eq!(model.rank_model().predict(0.0), 72_000);
        assert!(matches!(model.trajectory(), TrajectoryModel::AccuracyBanded(_)));
    }

    #[test]
    fn missing_exponent_uses_the_named_default() {
        let raw = r#"{ "exam": "demo", "max_marks": 100, "total_candidates": 1000 }"#;
        let model = serde_json::from_str::<ExamModelFile>(raw)
            .expect("parses")
            .into_model()
            .expect("valid model");
        match model.rank_model() {
            RankModel::PowerLaw(config) => assert_eq!(config.exponent(), DEFAULT_EXPONENT),
            other => panic!("expected power law, got {other:?}"),
        }
    }

    #[test]
    fn sparse_calibration_loads_with_a_warning() {
        let raw = r#"{
            "exam": "demo",
            "max_marks": 100,
            "total_candidates": 1000,
            "calibration_points": [[50, 500]]
        }"#;
        let model = serde_json::from_str::<ExamModelFile>(raw)
            .expect("parses")
            .into_model()
            .expect("loads despite sparsity");
        assert!(matches!(
            model.warnings(),
            [DegradedModelWarning::SparseCalibration { points: 1, .. }]
        ));
    }

    #[test]
    fn inverted_trajectory_range_fails_to_load() {
        // A bad clamp range must surface as a load-time error, not a panic
        // on the first prediction for the exam.
        let raw = r#"{
            "exam": "demo",
            "max_marks": 160,
            "total_candidates": 98650,
            "calibration_points": [[0, 98650], [160, 1]],
            "trajectory": {
                "strategy": "linear",
                "intercept": 1.5,
                "coefficients": [],
                "monthly_range": [8.0, 0.0]
            }
        }"#;
        let err = serde_json::from_str::<ExamModelFile>(raw)
            .expect("parses")
            .into_model()
            .unwrap_err();
        assert!(matches!(err, PredictionError::InvalidMonthlyRange { .. }));
    }

    #[test]
    fn lookup_miss_is_a_typed_error() {
        let file: ExamModelFile = serde_json::from_str(CALIBRATED).expect("parses");
        let catalog =
            ModelCatalog::from_models([file.into_model().expect("valid")]).expect("catalog");

        assert!(catalog.get("tg_mpc").is_ok());
        let err = catalog.get("nonexistent").unwrap_err();
        assert!(matches!(err, PredictionError::UnknownExam(exam) if exam == "nonexistent"));
    }

    #[test]
    fn duplicate_exam_ids_are_rejected() {
        let model = |_: u32| {
            serde_json::from_str::<ExamModelFile>(CALIBRATED)
                .expect("parses")
                .into_model()
                .expect("valid")
        };
        let err = ModelCatalog::from_models([model(0), model(1)]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateExam(exam) if exam == "tg_mpc"));
    }
}
