//! Lenient extraction of a JSON object from model replies.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Extracts one JSON object from `text`.
///
/// The whole text is tried first. Otherwise it is scanned for balanced
/// `{ ... }` regions, outermost first and left to right, and the first
/// region that parses as an object wins. A `}` without a matching `{` is
/// skipped.
///
/// The scan counts every brace, including braces inside string literals,
/// so a value such as `"}"` can close a region early. Such a reply only
/// parses if the whole text is valid JSON.
pub fn try_parse_json_object(text: &str) -> Result<Map<String, Value>> {
    if let Ok(Value::Object(object)) = serde_json::from_str(text.trim()) {
        return Ok(object);
    }

    let mut depth = 0usize;
    let mut start = None;
    for (idx, byte) in text.bytes().enumerate() {
        match byte {
            b'{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth != 0 {
                    continue;
                }
                let Some(start) = start.take() else {
                    continue;
                };
                let candidate = &text[start..=idx];
                match serde_json::from_str(candidate) {
                    Ok(Value::Object(object)) => return Ok(object),
                    _ => trace!("skipping unparsable region: {candidate}"),
                }
            }
            _ => {}
        }
    }

    Err(Error::MalformedModelOutput(
        "no JSON object found in the reply".to_owned(),
    ))
}

/// Like [`try_parse_json_object`], but logs a warning and returns `None`
/// on failure.
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    try_parse_json_object(text)
        .inspect_err(|err| {
            warn!("model did not respond with proper json: {err}")
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_direct_parse() {
        let object =
            try_parse_json_object(r#" {"url": "https://a.b"} "#).unwrap();
        assert_eq!(Value::Object(object), json!({ "url": "https://a.b" }));
    }

    #[test]
    fn test_embedded_object() {
        let reply = r#"noise {"a":1,"b":[1,2]} more noise"#;
        let object = try_parse_json_object(reply).unwrap();
        assert_eq!(Value::Object(object), json!({ "a": 1, "b": [1, 2] }));
    }

    #[test]
    fn test_nested_and_fenced() {
        let reply = "Sure! Here you go:\n```json\n\
                     {\"function\": \"add\", \
                     \"parameters\": {\"a\": 1, \"b\": {\"c\": 2}}}\n\
                     ```\nAnything else?";
        let object = try_parse_json_object(reply).unwrap();
        assert_eq!(object["function"], "add");
        assert_eq!(object["parameters"]["b"]["c"], 2);
    }

    #[test]
    fn test_skips_unparsable_region() {
        let reply = r#"} {not json} then {"search_query": "rust"}"#;
        let object = try_parse_json_object(reply).unwrap();
        assert_eq!(object["search_query"], "rust");
    }

    #[test]
    fn test_no_object() {
        for reply in ["", "no json here", "{ unbalanced", "[1, 2, 3]", "42"] {
            let err = try_parse_json_object(reply).unwrap_err();
            assert!(matches!(err, Error::MalformedModelOutput(_)), "{reply}");
            assert!(parse_json_object(reply).is_none());
        }
    }

    #[test]
    fn test_brace_inside_string() {
        // The whole text is valid JSON, so the direct parse handles it.
        let object = try_parse_json_object(r#"{"a": "}"}"#).unwrap();
        assert_eq!(object["a"], "}");

        // Surrounded by prose, the string brace closes the region early.
        assert!(parse_json_object(r#"Answer: {"a": "}"} done"#).is_none());
    }
}
