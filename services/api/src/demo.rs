use crate::infra::{load_catalog, PredictionContext};
use clap::Args;
use rankcast::config::ModelSourceConfig;
use rankcast::error::AppError;
use rankcast::prediction::PredictionRequest;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    /// Exam identifier, e.g. tg_mpc
    #[arg(long)]
    pub(crate) exam: String,
    /// Total score achieved across all subjects
    #[arg(long)]
    pub(crate) total_score: f64,
    /// Per-subject score as name=value; repeatable
    #[arg(long = "subject", value_parser = parse_named_value)]
    pub(crate) subjects: Vec<(String, f64)>,
    /// Behavioral feature as name=value (e.g. accuracy_percent=72); repeatable
    #[arg(long = "feature", value_parser = parse_named_value)]
    pub(crate) features: Vec<(String, f64)>,
    /// Load exam models from this directory instead of the bundled demo set
    #[arg(long)]
    pub(crate) model_dir: Option<PathBuf>,
}

pub(crate) fn parse_named_value(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid numeric value in '{raw}': {err}"))?;
    Ok((name.trim().to_string(), value))
}

pub(crate) fn run_predict(args: PredictArgs) -> Result<(), AppError> {
    let PredictArgs {
        exam,
        total_score,
        subjects,
        features,
        model_dir,
    } = args;

    let catalog = load_catalog(&ModelSourceConfig { model_dir })?;
    let context = PredictionContext::new(catalog);

    let request = PredictionRequest {
        exam,
        total_score,
        subject_scores: subjects.into_iter().collect::<BTreeMap<_, _>>(),
        features: features.into_iter().collect::<BTreeMap<_, _>>(),
    };

    let model = context.catalog.get(&request.exam)?;
    let prediction = context.engine.predict(model, &request)?;

    println!(
        "{}",
        serde_json::to_string_pretty(&prediction).expect("prediction serializes")
    );
    Ok(())
}
