use crate::infra::{AppState, PredictionContext};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use rankcast::error::AppError;
use rankcast::prediction::{
    DegradedModelWarning, Prediction, PredictionRequest, ProbabilityDistribution, RankModel,
    Scenario, SubjectPrediction, TrajectoryProjection,
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

/// Lean response shape kept for existing v1 consumers.
#[derive(Debug, Serialize)]
pub(crate) struct PredictV1Response {
    pub(crate) version: &'static str,
    pub(crate) exam: String,
    pub(crate) overall_rank: u32,
    pub(crate) subject_ranks: BTreeMap<String, Option<u32>>,
    pub(crate) monthly_improvement: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct OverallPrediction {
    pub(crate) predicted_rank: u32,
    pub(crate) confidence_68: [u32; 2],
    pub(crate) confidence_95: [u32; 2],
    pub(crate) percentile: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModelMetadata {
    pub(crate) exam_name: String,
    pub(crate) model_strategy: &'static str,
    pub(crate) prediction_timestamp: String,
}

/// Full analytics response for v2 consumers.
#[derive(Debug, Serialize)]
pub(crate) struct PredictV2Response {
    pub(crate) exam: String,
    pub(crate) overall_prediction: OverallPrediction,
    pub(crate) subject_predictions: BTreeMap<String, Option<SubjectPrediction>>,
    pub(crate) probability_distribution: ProbabilityDistribution,
    pub(crate) trajectory: TrajectoryProjection,
    pub(crate) what_if_scenarios: Vec<Scenario>,
    pub(crate) warnings: Vec<DegradedModelWarning>,
    pub(crate) model_metadata: ModelMetadata,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamListResponse {
    pub(crate) exams: Vec<String>,
}

pub(crate) fn api_router(context: PredictionContext) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/exams", get(list_exams))
        .route("/api/v1/predict", post(predict_v1_endpoint))
        .route("/api/v2/predict", post(predict_v2_endpoint))
        .layer(Extension(context))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn list_exams(
    Extension(context): Extension<PredictionContext>,
) -> Json<ExamListResponse> {
    Json(ExamListResponse {
        exams: context
            .catalog
            .exam_ids()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

pub(crate) async fn predict_v1_endpoint(
    Extension(context): Extension<PredictionContext>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictV1Response>, AppError> {
    let model = context.catalog.get(&request.exam)?;
    let prediction = context.engine.predict(model, &request)?;

    let subject_ranks = prediction
        .subject_ranks
        .into_iter()
        .map(|(subject, entry)| (subject, entry.map(|p| p.rank)))
        .collect();

    Ok(Json(PredictV1Response {
        version: "v1",
        exam: prediction.exam,
        overall_rank: prediction.overall_rank,
        subject_ranks,
        monthly_improvement: prediction.trajectory.monthly_improvement,
    }))
}

pub(crate) async fn predict_v2_endpoint(
    Extension(context): Extension<PredictionContext>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictV2Response>, AppError> {
    let model = context.catalog.get(&request.exam)?;
    let prediction = context.engine.predict(model, &request)?;
    Ok(Json(v2_response(prediction, model.rank_model())))
}

fn confidence_window(distribution: &ProbabilityDistribution, probability: u8) -> [u32; 2] {
    distribution
        .ranges
        .iter()
        .find(|range| range.probability == probability)
        .map(|range| [range.min_rank, range.max_rank])
        .unwrap_or([0, 0])
}

fn strategy_label(rank_model: &RankModel) -> &'static str {
    match rank_model {
        RankModel::Calibrated(_) => "calibrated_interpolation",
        RankModel::PowerLaw(_) => "power_law",
    }
}

fn v2_response(prediction: Prediction, rank_model: &RankModel) -> PredictV2Response {
    let overall_prediction = OverallPrediction {
        predicted_rank: prediction.overall_rank,
        confidence_68: confidence_window(&prediction.probability, 68),
        confidence_95: confidence_window(&prediction.probability, 95),
        percentile: prediction.probability.percentile,
    };

    PredictV2Response {
        overall_prediction,
        subject_predictions: prediction.subject_ranks,
        probability_distribution: prediction.probability,
        trajectory: prediction.trajectory,
        what_if_scenarios: prediction.scenarios,
        warnings: prediction.warnings,
        model_metadata: ModelMetadata {
            exam_name: prediction.exam.clone(),
            model_strategy: strategy_label(rank_model),
            prediction_timestamp: Utc::now().to_rfc3339(),
        },
        exam: prediction.exam,
    }
}
