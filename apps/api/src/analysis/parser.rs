//! Response Parser/Validator: turns raw model text into a typed `AnalysisResult`.
//!
//! The model is only *asked* for a JSON object; nothing enforces it. So the text is
//! parsed into an untyped `serde_json::Value` first and every field is checked
//! before the typed result is built. Any surprise becomes a `MalformedAnalysis`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Validated analysis returned to callers. Field names match the JSON the model is asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub extracted_skills: Vec<String>,
    /// Nominally 0–100. Kept as the model's own number (integers stay integers), not clamped.
    pub match_score: Number,
    pub improvement_suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedAnalysis {
    #[error("Response is not a single JSON value: {0}")]
    InvalidJson(String),

    #[error("Response is a JSON {0}, expected an object")]
    NotAnObject(&'static str),

    #[error("Field '{field}' {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Field 'matchScore' {0}")]
    InvalidScore(String),
}

const SKILLS_FIELD: &str = "extractedSkills";
const SCORE_FIELD: &str = "matchScore";
const SUGGESTIONS_FIELD: &str = "improvementSuggestions";

/// Strips ```json ... ``` or ``` ... ``` code fences and surrounding whitespace.
/// Either fence may be missing. Fences in the middle of the text are left alone.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text)
        .trim();
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Parses and validates raw model output.
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult, MalformedAnalysis> {
    let body = strip_code_fences(raw);
    let value: Value =
        serde_json::from_str(body).map_err(|e| MalformedAnalysis::InvalidJson(e.to_string()))?;
    validate(&value)
}

fn validate(value: &Value) -> Result<AnalysisResult, MalformedAnalysis> {
    let object = value
        .as_object()
        .ok_or_else(|| MalformedAnalysis::NotAnObject(json_type_name(value)))?;

    Ok(AnalysisResult {
        extracted_skills: string_list(object, SKILLS_FIELD)?,
        match_score: match_score(object.get(SCORE_FIELD))?,
        improvement_suggestions: string_list(object, SUGGESTIONS_FIELD)?,
    })
}

/// Absent or null lists default to empty; anything else must be an array of strings.
fn string_list(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Vec<String>, MalformedAnalysis> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str()
                    .map(String::from)
                    .ok_or_else(|| MalformedAnalysis::InvalidField {
                        field,
                        reason: format!(
                            "element {i} is a {}, expected a string",
                            json_type_name(item)
                        ),
                    })
            })
            .collect(),
        Some(other) => Err(MalformedAnalysis::InvalidField {
            field,
            reason: format!("is a {}, expected an array of strings", json_type_name(other)),
        }),
    }
}

/// Numbers pass through unchanged. Numeric strings ("82", "82%") are coerced.
/// Missing, null, or any other value is rejected.
fn match_score(value: Option<&Value>) -> Result<Number, MalformedAnalysis> {
    match value {
        Some(Value::Number(n)) => Ok(n.clone()),
        Some(Value::String(s)) => {
            let digits = s.trim().trim_end_matches('%').trim_end();
            digits
                .parse::<Number>()
                .map_err(|_| MalformedAnalysis::InvalidScore(format!("'{s}' is not a number")))
        }
        None | Some(Value::Null) => Err(MalformedAnalysis::InvalidScore("is missing".to_string())),
        Some(other) => Err(MalformedAnalysis::InvalidScore(format!(
            "is a {}, expected a number",
            json_type_name(other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
