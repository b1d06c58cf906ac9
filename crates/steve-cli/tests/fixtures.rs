//! SSE fixture helpers for integration tests.
//!
//! Load `.sse` templates from `tests/fixtures/` and substitute placeholders.

#![allow(dead_code)]

use wiremock::ResponseTemplate;

pub const SSE_REPLY: &str = include_str!("fixtures/sse_reply.sse");
pub const SSE_ERROR: &str = include_str!("fixtures/sse_error_midstream.sse");

pub const GUIDE_SOURCES: &str = r#"[{"document_id":3,"title":"Guide","kb_id":1,"source":"guide.md"},{"document_id":3,"title":"Guide again","kb_id":1}]"#;

/// A streamed reply made of `tokens`, preceded by `sources`.
pub fn reply_sse(sources: &str, tokens: &[&str]) -> String {
    let frames: String = tokens
        .iter()
        .map(|t| format!("event: token\ndata: {}\n\n", json_string(t)))
        .collect();
    SSE_REPLY
        .replace("{{SOURCES}}", sources)
        .replace("{{TOKENS}}", &frames)
}

/// A stream that emits one token and then an `error` event.
pub fn error_sse(partial: &str, message: &str) -> String {
    SSE_ERROR
        .replace("{{PARTIAL}}", &json_string(partial))
        .replace("{{MESSAGE}}", &json_string(message))
}

pub fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap()
}
