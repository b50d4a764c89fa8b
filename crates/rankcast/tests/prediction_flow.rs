use rankcast::catalog::{ExamModelFile, ModelCatalog};
use rankcast::prediction::{
    CalibrationPoint, CalibrationTable, EngineTuning, ExamModel, PredictionEngine,
    PredictionError, PredictionRequest, RankModel, SubjectConfig, TrajectoryModel,
};
use std::collections::BTreeMap;

fn mpc_model() -> ExamModel {
    let file: ExamModelFile = serde_json::from_str(
        r#"{
            "exam": "tg_mpc",
            "max_marks": 160,
            "total_candidates": 98650,
            "rank_max": 98650,
            "calibration_points": [
                [0, 98650], [40, 82000], [80, 41000], [120, 9500], [160, 1]
            ],
            "subjects": {
                "maths": { "max_score": 80, "blend_weight": 0.9, "tie_break_priority": true },
                "physics": { "max_score": 40 },
                "chemistry": { "max_score": 40 }
            }
        }"#,
    )
    .expect("model file parses");
    file.into_model().expect("valid model")
}

fn request(total_score: f64, subject_scores: &[(&str, f64)]) -> PredictionRequest {
    PredictionRequest {
        exam: "tg_mpc".to_string(),
        total_score,
        subject_scores: subject_scores
            .iter()
            .map(|(id, score)| (id.to_string(), *score))
            .collect(),
        features: BTreeMap::new(),
    }
}

#[test]
fn higher_scores_never_predict_worse_ranks() {
    let engine = PredictionEngine::default();
    let model = mpc_model();

    let mut previous = u32::MAX;
    for step in 0..=64 {
        let score = step as f64 * 2.5;
        let prediction = engine
            .predict(&model, &request(score, &[]))
            .expect("prediction succeeds");
        assert!(
            prediction.overall_rank <= previous,
            "rank worsened between scores at step {step}"
        );
        assert!(prediction.overall_rank >= 1 && prediction.overall_rank <= 98_650);
        previous = prediction.overall_rank;
    }
}

#[test]
fn missing_subjects_stay_null_in_the_result() {
    let engine = PredictionEngine::default();
    let prediction = engine
        .predict(&mpc_model(), &request(96.0, &[("maths", 60.0)]))
        .expect("prediction succeeds");

    let maths = prediction.subject_ranks["maths"].as_ref().expect("maths rank");
    assert!(maths.rank >= 1);
    assert!(prediction.subject_ranks["physics"].is_none());
    assert!(prediction.subject_ranks["chemistry"].is_none());

    // Null must survive serialization, the wire contract consumers rely on.
    let rendered = serde_json::to_value(&prediction).expect("serializes");
    assert!(rendered["subject_ranks"]["physics"].is_null());
}

#[test]
fn confidence_bands_nest_around_the_estimate() {
    let engine = PredictionEngine::default();
    let prediction = engine
        .predict(&mpc_model(), &request(96.0, &[]))
        .expect("prediction succeeds");

    let ranges = &prediction.probability.ranges;
    for pair in [(40u8, 60u8), (68, 95)] {
        let narrow = ranges.iter().find(|r| r.probability == pair.0).expect("band");
        let wide = ranges.iter().find(|r| r.probability == pair.1).expect("band");
        assert!(wide.min_rank <= narrow.min_rank);
        assert!(wide.max_rank >= narrow.max_rank);
        assert!(narrow.min_rank <= prediction.overall_rank);
        assert!(narrow.max_rank >= prediction.overall_rank);
    }
}

#[test]
fn scenarios_replay_through_the_rank_model() {
    let engine = PredictionEngine::default();
    let model = mpc_model();
    let prediction = engine
        .predict(
            &model,
            &request(96.0, &[("maths", 48.0), ("physics", 28.0), ("chemistry", 20.0)]),
        )
        .expect("prediction succeeds");

    assert!(!prediction.scenarios.is_empty());
    assert!(prediction
        .scenarios
        .windows(2)
        .all(|pair| pair[0].rank_improvement >= pair[1].rank_improvement));

    for scenario in &prediction.scenarios {
        // Monotone model: a pure score boost can never worsen the rank.
        assert!(scenario.rank_improvement >= 0);
        assert!(scenario.improved_rank <= prediction.overall_rank);
    }
}

#[test]
fn trajectory_horizons_stay_in_domain() {
    let engine = PredictionEngine::new(EngineTuning::default());
    let model = mpc_model();
    let mut near_max = request(155.0, &[]);
    near_max
        .features
        .insert("accuracy_percent".to_string(), 95.0);

    let prediction = engine.predict(&model, &near_max).expect("prediction succeeds");
    assert_eq!(
        prediction
            .trajectory
            .horizons
            .iter()
            .map(|h| h.months)
            .collect::<Vec<_>>(),
        vec![1, 3, 6]
    );
    for horizon in &prediction.trajectory.horizons {
        assert!(horizon.projected_score <= 160.0);
        assert!(horizon.projected_rank >= 1);
        assert_eq!(
            horizon.projected_rank,
            model.rank_model().predict(horizon.projected_score)
        );
    }
}

#[test]
fn catalog_never_falls_back_to_another_exam() {
    let catalog = ModelCatalog::from_models([mpc_model()]).expect("catalog builds");
    let err = catalog.get("ap_bipc").unwrap_err();
    assert!(matches!(err, PredictionError::UnknownExam(exam) if exam == "ap_bipc"));
}

#[test]
fn degraded_tables_degrade_instead_of_failing() {
    let table = CalibrationTable::new(
        "sparse_exam",
        vec![CalibrationPoint { score: 70.0, rank: 5_000.0 }],
        1,
        50_000,
        50_000,
        100.0,
    )
    .expect("table builds");
    let model = ExamModel::new(
        RankModel::Calibrated(table),
        BTreeMap::from([(
            "core".to_string(),
            SubjectConfig {
                max_score: 100.0,
                blend_weight: 0.7,
                tie_break_priority: false,
            },
        )]),
        TrajectoryModel::default(),
    )
    .expect("model builds");

    let engine = PredictionEngine::default();
    let prediction = engine
        .predict(
            &model,
            &PredictionRequest {
                exam: "sparse_exam".to_string(),
                total_score: 20.0,
                subject_scores: BTreeMap::new(),
                features: BTreeMap::new(),
            },
        )
        .expect("degrades instead of failing");

    assert_eq!(prediction.overall_rank, 5_000);
    assert!(!prediction.warnings.is_empty());
}
