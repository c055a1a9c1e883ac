//! Axum route handlers for the Templates API.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::templates::models::{ExtractionRecord, FewShotExample, PipelineResult, PromptMode, Variables};
use crate::templates::normalizer::{normalize, placeholders};
use crate::templates::prompts::render_few_shot_block;
use crate::templates::validation::{check_consistency, ValidationError};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub log_lines: Vec<String>,
    #[serde(default)]
    pub mode: PromptMode,
    /// Replaces the built-in examples in few-shot mode.
    pub few_shot_examples: Option<Vec<ExampleInput>>,
    /// Annotate each result with template/variable mismatches.
    #[serde(default)]
    pub validate: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExampleInput {
    pub log_line: String,
    pub template: String,
    #[serde(default)]
    pub variables: Variables,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub run_id: Uuid,
    pub processed_at: DateTime<Utc>,
    pub results: Vec<ExtractResult>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResult {
    #[serde(flatten)]
    pub result: PipelineResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<ValidationError>,
}

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub template: String,
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub normalized: String,
    pub placeholders: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/templates/extract
///
/// Runs the extraction + embedding pipeline over a batch of log lines.
/// Per-line failures are reported inside each result, never as an error status.
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    if request.log_lines.is_empty() {
        return Err(AppError::Validation("log_lines cannot be empty".to_string()));
    }

    let examples_block = request
        .few_shot_examples
        .map(build_examples_block)
        .transpose()?;

    let run_id = Uuid::new_v4();
    let results = state
        .pipeline
        .run(&request.log_lines, request.mode, examples_block.as_deref())
        .instrument(info_span!("pipeline_run", %run_id))
        .await;

    let results = results
        .into_iter()
        .map(|result| {
            let issues = if request.validate {
                check_consistency(&result.record).err()
            } else {
                None
            };
            ExtractResult { result, issues }
        })
        .collect();

    Ok(Json(ExtractResponse {
        run_id,
        processed_at: Utc::now(),
        results,
    }))
}

/// POST /api/v1/templates/normalize
pub async fn handle_normalize(Json(request): Json<NormalizeRequest>) -> Json<NormalizeResponse> {
    Json(NormalizeResponse {
        normalized: normalize(&request.template),
        placeholders: placeholders(&request.template)
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

fn build_examples_block(inputs: Vec<ExampleInput>) -> Result<String, AppError> {
    if inputs.is_empty() {
        return Err(AppError::Validation(
            "few_shot_examples cannot be an empty list".to_string(),
        ));
    }

    let examples = inputs
        .into_iter()
        .map(|input| {
            let record = ExtractionRecord {
                template: input.template,
                variables: input.variables,
                original_log: Some(input.log_line.clone()),
                parse_error: None,
            };
            FewShotExample::new(input.log_line, record)
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    Ok(render_few_shot_block(&examples))
}
