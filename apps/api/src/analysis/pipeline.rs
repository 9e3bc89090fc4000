//! End-to-end analysis: extract → build prompt → generate → parse.
//!
//! Every stage failure is converted into exactly one `AnalysisError` kind here.
//! Low-level detail (decoder messages, raw model output) is logged, never returned.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::extractor::{extract_blocking, DocumentFormat, ExtractionError, RawDocument};
use crate::analysis::parser::{parse_analysis, AnalysisResult, MalformedAnalysis};
use crate::analysis::prompts::{build_prompt, ANALYSIS_PROMPT_VERSION};
use crate::llm_client::{GenerationBackend, LlmError};

/// The four ways an analysis can fail. None of them is fatal to the process.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Unsupported document type '{media_type}'")]
    UnsupportedFormat { media_type: String },

    #[error("Failed to extract {format} text ({byte_len} bytes): {reason}")]
    ExtractionFailure {
        format: DocumentFormat,
        byte_len: usize,
        reason: String,
    },

    #[error("Generation service error: {0}")]
    Upstream(#[from] LlmError),

    #[error("Model response unusable: {0}")]
    MalformedAnalysis(#[from] MalformedAnalysis),
}

impl From<ExtractionError> for AnalysisError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedFormat { media_type } => {
                AnalysisError::UnsupportedFormat { media_type }
            }
            ExtractionError::Failed {
                format,
                byte_len,
                reason,
            } => AnalysisError::ExtractionFailure {
                format,
                byte_len,
                reason,
            },
        }
    }
}

impl AnalysisError {
    /// Stable machine-readable kind, safe to expose to callers.
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            AnalysisError::ExtractionFailure { .. } => "EXTRACTION_FAILED",
            AnalysisError::Upstream(_) => "UPSTREAM_ERROR",
            AnalysisError::MalformedAnalysis(_) => "MALFORMED_ANALYSIS",
        }
    }

    /// Human-readable message without internal detail.
    pub fn public_message(&self) -> String {
        match self {
            AnalysisError::UnsupportedFormat { .. } => {
                "Unsupported file type. Only PDF and DOCX are allowed.".to_string()
            }
            AnalysisError::ExtractionFailure { format, .. } => {
                format!("Could not read text from the uploaded {format} document.")
            }
            AnalysisError::Upstream(_) => {
                "The analysis service is unavailable. Please try again.".to_string()
            }
            AnalysisError::MalformedAnalysis(_) => {
                "Error parsing AI analysis. Please try again.".to_string()
            }
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::Upstream(_) | AnalysisError::MalformedAnalysis(_)
        )
    }
}

/// Runs the full pipeline for one request.
pub async fn analyze(
    document: RawDocument,
    job_description: &str,
    backend: &dyn GenerationBackend,
) -> Result<AnalysisResult, AnalysisError> {
    let media_type = document.media_type.clone();
    let byte_len = document.bytes.len();

    let resume_text = extract_blocking(document).await.map_err(|e| {
        warn!("Extraction failed for {media_type} upload: {e}");
        AnalysisError::from(e)
    })?;

    let prompt = build_prompt(&resume_text, job_description);
    debug!(
        "Built analysis prompt {}: resume_chars={}, job_description_chars={}, total_chars={}",
        ANALYSIS_PROMPT_VERSION,
        prompt.resume_chars,
        prompt.job_description_chars,
        prompt.text.chars().count()
    );

    let raw = backend.generate(&prompt.text).await.map_err(|e| {
        warn!("Generation call failed: {e}");
        AnalysisError::from(e)
    })?;

    let result = parse_analysis(&raw).map_err(|e| {
        warn!("Model response rejected: {e}");
        debug!("Rejected model response body: {raw}");
        AnalysisError::from(e)
    })?;

    info!(
        "Analysis complete: media_type={}, bytes={}, score={}, skills={}, suggestions={}",
        media_type,
        byte_len,
        result.match_score,
        result.extracted_skills.len(),
        result.improvement_suggestions.len()
    );

    Ok(result)
}
