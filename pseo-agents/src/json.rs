//! Extraction of JSON from free-form LLM output

use serde::de::DeserializeOwned;

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (`json`, `JSON`, ...) on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse the first JSON value found in `text`.
///
/// Tries the whole (unfenced) text first, then the first value starting at
/// the earliest `{` or `[`, ignoring anything after it.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    let body = strip_code_fences(text);

    let first_error = match serde_json::from_str(body) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let Some(start) = body.find(['{', '[']) else {
        return Err(first_error);
    };

    serde_json::Deserializer::from_str(&body[start..])
        .into_iter::<T>()
        .next()
        .unwrap_or(Err(first_error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[1, 2]\n```  "), "[1, 2]");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_with_chatter() {
        let text = "Here is the profile you asked for:\n{\"category\": \"Video\"}\nHope it helps!";
        let value: Value = parse_json(text).unwrap();
        assert_eq!(value, json!({"category": "Video"}));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_json::<Value>("I cannot help with that.").is_err());
        assert!(parse_json::<Vec<Value>>("{\"not\": \"a list\"}").is_err());
    }
}
