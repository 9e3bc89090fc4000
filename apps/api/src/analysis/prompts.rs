// Resume analysis prompt template and the bounded-input policy applied to it.
//
// Both inputs are cut to MAX_SEGMENT_CHARS before embedding. The cut is silent and
// intentional: an over-long resume or job description loses its tail rather than
// failing the request.

/// Bumped whenever ANALYSIS_INSTRUCTIONS changes wording.
pub const ANALYSIS_PROMPT_VERSION: &str = "2024-06-resume-match-v1";

/// Maximum characters kept from each of the resume text and the job description.
pub const MAX_SEGMENT_CHARS: usize = 8000;

pub const ANALYSIS_INSTRUCTIONS: &str = r#"Compare the resume text below with the job description below.

Respond with a single valid JSON object containing exactly these three keys:
{
  "extractedSkills": ["string"],
  "matchScore": number,
  "improvementSuggestions": ["string"]
}

FIELDS:
1. extractedSkills: the key skills found in the resume that are relevant to this job.
2. matchScore: a percentage from 0 to 100 for how well the resume fits the job,
   weighing experience, skills, and overall fit.
3. improvementSuggestions: concrete, actionable changes the candidate could make to
   the resume for this specific job.

RULES:
1. Return ONLY the JSON object, with no prose before or after it.
2. matchScore is a bare number, not a string.
3. Use empty arrays rather than omitting a list."#;

/// The fully composed prompt plus the sizes of the two embedded segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPrompt {
    pub text: String,
    /// Characters of resume text embedded (≤ MAX_SEGMENT_CHARS).
    pub resume_chars: usize,
    /// Characters of job description embedded (≤ MAX_SEGMENT_CHARS).
    pub job_description_chars: usize,
}

/// Returns the first `limit` characters of `s`, or all of `s` if it is shorter.
///
/// Counts Unicode scalar values, so the cut never lands inside a code point.
/// Anything past `limit` is dropped without notice.
pub fn bounded_prefix(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Composes the analysis prompt. Pure and total.
pub fn build_prompt(resume_text: &str, job_description: &str) -> AnalysisPrompt {
    let resume = bounded_prefix(resume_text, MAX_SEGMENT_CHARS);
    let job = bounded_prefix(job_description, MAX_SEGMENT_CHARS);

    // Inputs must reach the model verbatim, braces and all.
    let text = format!(
        "{ANALYSIS_INSTRUCTIONS}\n\n---\nResume Text:\n{resume}\n---\nJob Description:\n{job}\n---\n"
    );

    AnalysisPrompt {
        text,
        resume_chars: resume.chars().count(),
        job_description_chars: job.chars().count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_prefix_short_input_is_unchanged() {
        assert_eq!(bounded_prefix("hello", 8), "hello");
        assert_eq!(bounded_prefix("", 8), "");
        assert_eq!(bounded_prefix("exact", 5), "exact");
    }

    #[test]
    fn test_bounded_prefix_long_input_is_cut_to_limit() {
        assert_eq!(bounded_prefix("abcdefgh", 3), "abc");
        assert_eq!(bounded_prefix("abc", 0), "");
    }

    #[test]
    fn test_bounded_prefix_counts_chars_not_bytes() {
        let s = "ééééé"; // 5 chars, 10 bytes
        let cut = bounded_prefix(s, 3);
        assert_eq!(cut, "ééé");
        assert_eq!(cut.chars().count(), 3);
    }

    #[test]
    fn test_segment_length_property() {
        for n in [0, 1, 7999, 8000, 8001, 20_000] {
            let input = "x".repeat(n);
            let prompt = build_prompt(&input, &input);
            let expected = n.min(MAX_SEGMENT_CHARS);
            assert_eq!(prompt.resume_chars, expected, "n = {n}");
            assert_eq!(prompt.job_description_chars, expected, "n = {n}");
        }
    }

    #[test]
    fn test_long_inputs_are_truncated_independently() {
        let resume = format!("{}RESUME_TAIL", "r".repeat(MAX_SEGMENT_CHARS));
        let job = "Senior Rust engineer";
        let prompt = build_prompt(&resume, job);

        assert!(!prompt.text.contains("RESUME_TAIL"));
        assert!(prompt.text.contains(&"r".repeat(MAX_SEGMENT_CHARS)));
        assert!(prompt.text.contains("Job Description:\nSenior Rust engineer\n"));
        assert_eq!(prompt.job_description_chars, job.len());
    }

    #[test]
    fn test_prompt_names_all_three_fields() {
        let prompt = build_prompt("Rust, Go", "Backend role");
        for field in ["extractedSkills", "matchScore", "improvementSuggestions"] {
            assert!(prompt.text.contains(field), "missing {field}");
        }
        assert!(prompt.text.starts_with(ANALYSIS_INSTRUCTIONS));
    }

    #[test]
    fn test_placeholder_text_in_inputs_is_embedded_verbatim() {
        let prompt = build_prompt("{job}", "{resume}");
        assert!(prompt.text.contains("Resume Text:\n{job}\n"));
        assert!(prompt.text.contains("Job Description:\n{resume}\n"));
    }
}
