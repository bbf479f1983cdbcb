//! Locating the JSON object inside free-form model output

use super::types::AnalysisResult;
use crate::{Error, Result};

/// Body of the first fenced code block, without its language tag
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let end = rest.find("```")?;
    let block = &rest[..end];

    // Drop an info string such as `json` on the opening fence line
    match block.find('\n') {
        Some(nl) if !block[..nl].trim_start().starts_with('{') => Some(block[nl + 1..].trim()),
        _ => Some(block.trim()),
    }
}

/// First balanced `{...}` object in `text`
///
/// Braces inside JSON strings are ignored. If an opening brace never
/// closes, scanning resumes at the next one.
pub fn balanced_object(text: &str) -> Option<&str> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find('{') {
        let begin = search_from + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escape = false;

        for (index, ch) in text[begin..].char_indices() {
            if in_string {
                if escape {
                    escape = false;
                } else if ch == '\\' {
                    escape = true;
                } else if ch == '"' {
                    in_string = false;
                }
                continue;
            }

            match ch {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let end = begin + index + ch.len_utf8();
                        return Some(&text[begin..end]);
                    }
                }
                _ => {}
            }
        }

        search_from = begin + 1;
    }

    None
}

/// Candidate JSON texts, most specific first
///
/// 1. the first balanced object inside the first fenced code block
///    (or the whole block when it holds no braces)
/// 2. the first balanced object in the raw output
/// 3. the trimmed output
pub fn json_candidates(output: &str) -> Vec<&str> {
    let mut candidates = Vec::with_capacity(3);

    if let Some(block) = fenced_block(output) {
        candidates.push(balanced_object(block).unwrap_or(block));
    }
    if let Some(object) = balanced_object(output) {
        candidates.push(object);
    }
    candidates.push(output.trim());

    candidates.dedup();
    candidates
}

/// Parse an [`AnalysisResult`] out of raw backend output
pub fn parse_analysis(output: &str) -> Result<AnalysisResult> {
    if output.trim().is_empty() {
        return Err(Error::Parse("empty response".to_string()));
    }

    let mut last_error = None;
    for candidate in json_candidates(output) {
        match AnalysisResult::from_json(candidate) {
            Ok(result) => return Ok(result),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Parse("no JSON object in response".to_string())))
}
