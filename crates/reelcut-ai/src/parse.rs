//! Lenient parsing of model output into an [`AnalysisResult`].
//!
//! Models wrap JSON in prose or markdown fences often enough that strict
//! parsing is not an option. Accepted shapes:
//!
//! - an object with `segments`, `clips` or `highlights`, plus an optional `transcript`
//! - a bare array of segments
//!
//! Only top-level blocks are candidates: once a balanced block is seen the
//! scan resumes after it, so brackets nested in it (or in its strings) are
//! never tried on their own. Objects win over arrays. An array found in
//! prose must be non-empty; `[]` is accepted only as the whole reply.

use reelcut_models::{AnalysisResult, SegmentProposal};
use serde_json::Value;

use crate::error::{AiError, AiResult};

/// Keys that may hold the segment list, in priority order.
const SEGMENT_KEYS: [&str; 3] = ["segments", "clips", "highlights"];

/// Top-level blocks tried before giving up on a text.
const MAX_CANDIDATES: usize = 64;

/// Parse raw model output.
pub fn parse_analysis(raw: &str) -> AiResult<AnalysisResult> {
    // Whole reply, possibly fenced
    let body = strip_code_fences(raw);
    if let Some(result) = serde_json::from_str::<Value>(body).ok().and_then(interpret) {
        return Ok(result);
    }

    let blocks = top_level_blocks(raw);

    let object = blocks
        .iter()
        .filter(|block| block.starts_with('{'))
        .find_map(|block| decode(block));
    if let Some(result) = object {
        return Ok(result);
    }

    let array = blocks
        .iter()
        .filter(|block| block.starts_with('['))
        .find_map(|block| decode(block).filter(|result| !result.segments.is_empty()));
    if let Some(result) = array {
        return Ok(result);
    }

    Err(AiError::response_parse(
        "no JSON object or array with segments found in model output",
        raw,
    ))
}

fn decode(block: &str) -> Option<AnalysisResult> {
    serde_json::from_str::<Value>(block).ok().and_then(interpret)
}

/// Balanced `{...}` and `[...]` blocks not nested in an earlier block.
fn top_level_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while blocks.len() < MAX_CANDIDATES {
        let Some(offset) = text[pos..].find(|c| c == '{' || c == '[') else {
            break;
        };
        let start = pos + offset;
        match extract_balanced(text, start) {
            Some(block) => {
                blocks.push(block);
                pos = start + block.len();
            }
            None => pos = start + 1,
        }
    }

    blocks
}

fn interpret(value: Value) -> Option<AnalysisResult> {
    match value {
        Value::Array(_) => {
            let segments: Vec<SegmentProposal> = serde_json::from_value(value).ok()?;
            Some(AnalysisResult::new(None, segments))
        }
        Value::Object(mut map) => {
            let transcript = map.get("transcript").and_then(Value::as_str).map(str::to_string);
            let list = SEGMENT_KEYS.iter().find_map(|key| map.remove(*key));

            let segments = match list {
                Some(Value::Null) => Vec::new(),
                Some(list) => serde_json::from_value(list).ok()?,
                None if transcript.is_some() => Vec::new(),
                None => return None,
            };
            Some(AnalysisResult::new(transcript, segments))
        }
        _ => None,
    }
}

/// Return the balanced block opening at byte `start`, if it closes.
///
/// Brackets inside JSON string literals are ignored.
pub fn extract_balanced(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    let close = match bytes.get(start)? {
        b'{' => b'}',
        b'[' => b']',
        _ => return None,
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return (b == close).then(|| &text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Content of the first markdown code fence, or the trimmed text when unfenced.
pub fn strip_code_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text.trim();
    };
    let after_open = &text[open + 3..];
    // Skip the info string (```json)
    let body = match after_open.find('\n') {
        Some(nl) => &after_open[nl + 1..],
        None => after_open,
    };
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_models::NO_TRANSCRIPT;

    #[test]
    fn test_fenced_json_with_prose_and_clips_key() {
        let raw = r#"Sure! Here is the analysis you asked for:

```json
{
  "transcript": "Welcome back to the show.",
  "clips": [
    {"start": "00:01:00", "end": "00:01:45", "title": "Best Moment", "topic": "intro"}
  ]
}
```

Let me know if you need anything else."#;

        let result = parse_analysis(raw).unwrap();
        assert_eq!(result.transcript, "Welcome back to the show.");
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].title, "Best Moment");
        assert_eq!(result.segments[0].topic, "intro");
    }

    #[test]
    fn test_plain_segments_key() {
        let raw = r#"{"transcript":"t","segments":[{"start":"00:00:05","end":"00:00:40","title":"Hook"},{"start":"02:00","end":"02:30"}]}"#;
        let result = parse_analysis(raw).unwrap();
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[1].title, "clip");
    }

    #[test]
    fn test_bare_array() {
        let raw = r#"[{"start":"00:00:05","end":"00:00:40","title":"Hook","topic":"t"}]"#;
        let result = parse_analysis(raw).unwrap();
        assert_eq!(result.transcript, NO_TRANSCRIPT);
        assert_eq!(result.segments.len(), 1);
    }

    #[test]
    fn test_braces_inside_strings_do_not_break_scan() {
        let raw = r#"{"transcript":"he said {wow] and left","clips":[]}"#;
        let result = parse_analysis(raw).unwrap();
        assert_eq!(result.transcript, "he said {wow] and left");
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_skips_unrelated_braces_in_prose() {
        let raw = r#"Format {start,end} below: {"highlights":[{"start":"00:00:01","end":"00:00:31"}]}"#;
        let result = parse_analysis(raw).unwrap();
        assert_eq!(result.segments.len(), 1);
    }

    #[test]
    fn test_missing_transcript_and_segments() {
        let result = parse_analysis(r#"{"transcript": null, "clips": null}"#).unwrap();
        assert_eq!(result.transcript, NO_TRANSCRIPT);
        assert!(result.segments.is_empty());

        assert!(parse_analysis(r#"{"note": "nothing to see"}"#).is_err());
    }

    #[test]
    fn test_unparseable_keeps_raw() {
        let err = parse_analysis("I could not process this audio.").unwrap_err();
        assert_eq!(err.raw_response(), Some("I could not process this audio."));

        let err = parse_analysis(r#"{"clips": [{"title": "no times"}]}"#).unwrap_err();
        assert!(matches!(err, AiError::ResponseParse { .. }));
    }

    #[test]
    fn test_stray_brackets_in_prose_do_not_hide_object() {
        let raw = "Notes: speakers [] unknown.\n{\"transcript\":\"hi there\",\"clips\":[{\"start\":\"00:00:10\",\"end\":\"00:00:40\",\"title\":\"A\"}]}";
        let result = parse_analysis(raw).unwrap();
        assert_eq!(result.transcript, "hi there");
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].title, "A");
    }

    #[test]
    fn test_brackets_inside_broken_object_are_not_candidates() {
        // Trailing comma: the object does not decode, and the `[]` in its
        // transcript must not be taken as an empty segment list
        let raw = r#"{"transcript":"the list was [] empty","clips":[{"start":"00:00:10","end":"00:00:40","title":"A"},]}"#;
        let err = parse_analysis(raw).unwrap_err();
        assert!(matches!(err, AiError::ResponseParse { .. }));
        assert_eq!(err.raw_response(), Some(raw));
    }

    #[test]
    fn test_empty_array_only_as_whole_reply() {
        let result = parse_analysis("```json\n[]\n```").unwrap();
        assert!(result.segments.is_empty());

        assert!(parse_analysis("Nothing found [] sorry").is_err());
    }

    #[test]
    fn test_top_level_blocks() {
        let text = r#"a [x] {"b": [1, "{"]} c {"#;
        assert_eq!(top_level_blocks(text), vec!["[x]", r#"{"b": [1, "{"]}"#]);
    }

    #[test]
    fn test_extract_balanced() {
        let text = r#"x {"a": [1, {"b": "}"}]} y"#;
        let start = text.find('{').unwrap();
        assert_eq!(extract_balanced(text, start), Some(r#"{"a": [1, {"b": "}"}]}"#));
        assert_eq!(extract_balanced("{ unclosed", 0), None);
        assert_eq!(extract_balanced("{]", 0), None);
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1]\n"), "[1]");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }
}
