//! Responses API payloads

use serde_json::{json, Value};

/// Request body for one system + user exchange.
pub fn request_body(
    model: &str,
    system_text: &str,
    user_text: &str,
    temperature: f64,
    max_output_tokens: u32,
) -> Value {
    let message = |role: &str, text: &str| {
        json!({
            "role": role,
            "content": [{"type": "input_text", "text": text}],
        })
    };
    json!({
        "model": model,
        "input": [message("system", system_text), message("user", user_text)],
        "temperature": temperature,
        "max_output_tokens": max_output_tokens,
    })
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Pull the generated text out of a response body.
///
/// A top-level `output_text` wins. Otherwise text parts of every `output`
/// item are joined with newlines. Returns an empty string when nothing
/// usable is present.
pub fn extract_text(data: &Value) -> String {
    if let Some(text) = non_blank(data.get("output_text")) {
        return text.trim().to_string();
    }

    let Some(items) = data.get("output").and_then(Value::as_array) else {
        return String::new();
    };

    let mut chunks: Vec<&str> = Vec::new();
    for item in items.iter().filter(|i| i.is_object()) {
        if let Some(content) = item.get("content").and_then(Value::as_array) {
            chunks.extend(
                content
                    .iter()
                    .filter(|c| {
                        matches!(
                            c.get("type").and_then(Value::as_str),
                            Some("output_text" | "text")
                        )
                    })
                    .filter_map(|c| non_blank(c.get("text"))),
            );
        }
        if let Some(text) = non_blank(item.get("text")) {
            chunks.push(text);
        }
    }
    chunks.join("\n").trim().to_string()
}

/// Error body as reported to the user: the server's JSON when it parses,
/// otherwise `{"error": <raw text>}`.
pub fn error_body(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => value.to_string(),
        Err(_) => json!({ "error": raw }).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = request_body("gpt-5.1", "sys", "user", 0.7, 900);
        assert_eq!(body["model"], "gpt-5.1");
        assert_eq!(body["input"][0]["role"], "system");
        assert_eq!(body["input"][0]["content"][0]["type"], "input_text");
        assert_eq!(body["input"][1]["content"][0]["text"], "user");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_output_tokens"], 900);
    }

    #[test]
    fn test_output_text_wins() {
        let data = json!({
            "output_text": "  a cat  ",
            "output": [{"content": [{"type": "output_text", "text": "ignored"}]}]
        });
        assert_eq!(extract_text(&data), "a cat");
    }

    #[test]
    fn test_output_items_joined() {
        let data = json!({
            "output_text": "   ",
            "output": [
                {"type": "reasoning", "content": [{"type": "summary", "text": "skip"}]},
                {"content": [
                    {"type": "output_text", "text": "line one"},
                    {"type": "text", "text": "line two"},
                    {"type": "output_text", "text": "  "}
                ]},
                "not an object",
                {"text": "item text"}
            ]
        });
        assert_eq!(extract_text(&data), "line one\nline two\nitem text");
    }

    #[test]
    fn test_nothing_usable_is_empty() {
        assert_eq!(extract_text(&json!({"output": []})), "");
        assert_eq!(extract_text(&json!(["x"])), "");
    }

    #[test]
    fn test_error_body() {
        assert_eq!(error_body(r#"{"error": {"code": 1}}"#), r#"{"error":{"code":1}}"#);
        assert_eq!(error_body("Bad Gateway"), r#"{"error":"Bad Gateway"}"#);
    }
}
