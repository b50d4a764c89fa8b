use metrics_exporter_prometheus::PrometheusHandle;
use rankcast::catalog::{CatalogError, ModelCatalog};
use rankcast::config::ModelSourceConfig;
use rankcast::prediction::{
    AccuracyBandedTrajectory, CalibrationPoint, CalibrationTable, ExamModel, FeatureWeight,
    LinearTrajectory, PowerLawConfig, PredictionEngine, RankModel, SubjectConfig,
    TrajectoryModel,
};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Everything the predict handlers need, kept separate from the server
/// plumbing so route tests can build one without a metrics recorder.
#[derive(Clone)]
pub(crate) struct PredictionContext {
    pub(crate) catalog: Arc<ModelCatalog>,
    pub(crate) engine: PredictionEngine,
}

impl PredictionContext {
    pub(crate) fn new(catalog: ModelCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            engine: PredictionEngine::default(),
        }
    }
}

/// Builds the catalog from the configured model directory, or from the
/// bundled demo exams when no directory is configured.
pub(crate) fn load_catalog(config: &ModelSourceConfig) -> Result<ModelCatalog, CatalogError> {
    match &config.model_dir {
        Some(dir) => ModelCatalog::from_dir(dir),
        None => bundled_catalog(),
    }
}

/// Demo exams mirroring the calibration exports this service is deployed
/// with: one interpolated model with a fitted linear trajectory, one
/// power-law fallback with the heuristic trajectory.
pub(crate) fn bundled_catalog() -> Result<ModelCatalog, CatalogError> {
    let subject = |max_score: f64, blend_weight: f64, tie_break_priority: bool| SubjectConfig {
        max_score,
        blend_weight,
        tie_break_priority,
    };

    let mpc_table = CalibrationTable::new(
        "tg_mpc",
        vec![
            CalibrationPoint { score: 0.0, rank: 98_650.0 },
            CalibrationPoint { score: 40.0, rank: 82_000.0 },
            CalibrationPoint { score: 80.0, rank: 41_000.0 },
            CalibrationPoint { score: 120.0, rank: 9_500.0 },
            CalibrationPoint { score: 160.0, rank: 1.0 },
        ],
        1,
        98_650,
        98_650,
        160.0,
    )?;
    let mpc = ExamModel::new(
        RankModel::Calibrated(mpc_table),
        BTreeMap::from([
            ("maths".to_string(), subject(80.0, 0.9, true)),
            ("physics".to_string(), subject(40.0, 0.7, false)),
            ("chemistry".to_string(), subject(40.0, 0.7, false)),
        ]),
        TrajectoryModel::Linear(LinearTrajectory {
            intercept: 1.5,
            coefficients: vec![
                FeatureWeight {
                    feature: "study_hours_per_day".to_string(),
                    coefficient: 0.8,
                },
                FeatureWeight {
                    feature: "mock_tests_per_week".to_string(),
                    coefficient: 0.5,
                },
            ],
            monthly_range: [0.5, 7.0],
        }),
    )?;

    let bipc = ExamModel::new(
        RankModel::PowerLaw(PowerLawConfig::new("tg_bipc", 160.0, 72_000, 2.8)?),
        BTreeMap::from([
            ("biology".to_string(), subject(80.0, 0.9, true)),
            ("physics".to_string(), subject(40.0, 0.7, false)),
            ("chemistry".to_string(), subject(40.0, 0.7, false)),
        ]),
        TrajectoryModel::AccuracyBanded(AccuracyBandedTrajectory::default()),
    )?;

    ModelCatalog::from_models([mpc, bipc])
}
