//! Axum route handler for the Analysis API.
//!
//! The handler is the upload gate: it rejects unsupported media types and
//! oversized files before the pipeline ever sees them.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::analysis::extractor::{DocumentFormat, RawDocument};
use crate::analysis::parser::AnalysisResult;
use crate::analysis::pipeline::{analyze, AnalysisError};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";
const JOB_DESCRIPTION_FIELD: &str = "jobDescription";

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    #[serde(rename = "aiAnalysis")]
    pub ai_analysis: AnalysisResult,
}

/// POST /api/analyze
///
/// Multipart form: `resume` (PDF or DOCX file) and `jobDescription` (text).
/// Requires a bearer session.
pub async fn handle_analyze(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let max_bytes = state.config.max_upload_bytes;
    let mut resume: Option<RawDocument> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            RESUME_FIELD => {
                let media_type = field.content_type().unwrap_or_default().to_string();
                if DocumentFormat::from_media_type(&media_type).is_none() {
                    return Err(AnalysisError::UnsupportedFormat { media_type }.into());
                }
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.len() > max_bytes {
                    return Err(upload_too_large(max_bytes));
                }
                resume = Some(RawDocument::new(bytes, media_type));
            }
            JOB_DESCRIPTION_FIELD => {
                job_description = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let resume =
        resume.ok_or_else(|| AppError::Validation("Resume file is required.".to_string()))?;
    let job_description = job_description
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Job description is required.".to_string()))?;

    info!(
        "Analysis requested by user {}: {} bytes of {}",
        user.user_id,
        resume.bytes.len(),
        resume.media_type
    );

    let ai_analysis = analyze(resume, &job_description, state.llm.as_ref()).await?;

    Ok(Json(AnalyzeResponse { ai_analysis }))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload exceeds the maximum allowed size".to_string())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}

fn upload_too_large(max_bytes: usize) -> AppError {
    AppError::PayloadTooLarge(format!(
        "Resume file exceeds the {max_bytes}-byte upload limit"
    ))
}
