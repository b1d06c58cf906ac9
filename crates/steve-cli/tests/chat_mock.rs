mod fixtures;

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use fixtures::{GUIDE_SOURCES, error_sse, reply_sse, sse_response};
use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_chat_streams_reply_and_exits_on_quit() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(body_partial_json(serde_json::json!({
            "kb_ids": [1, 2],
            "top_k": 4,
            "messages": [{"role": "user", "content": "hi"}]
        })))
        .respond_with(sse_response(&reply_sse(GUIDE_SOURCES, &["Hel", "lo", " world"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", home.path())
        .env("STEVE_API_URL", mock_server.uri())
        .args(["chat", "--kb", "1,2", "--top-k", "4"])
        .write_stdin("hi\n:q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello world"))
        .stdout(predicate::str::contains("Sources:"))
        .stdout(predicate::str::contains("[1] Guide (KB #1 · Doc 3)"))
        .stdout(predicate::str::contains("[2]").not())
        .stdout(predicate::str::contains("Goodbye!"));

    let sessions = fs::read_to_string(home.path().join("sessions.json")).unwrap();
    assert!(sessions.contains("\"title\": \"hi\""));
    assert!(sessions.contains("Hello world"));
}

#[tokio::test]
async fn test_chat_is_default_command_and_skips_empty_lines() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    fs::write(home.path().join("config.toml"), "knowledgebases = [7]\n").unwrap();

    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(body_partial_json(serde_json::json!({"kb_ids": [7]})))
        .respond_with(sse_response(&reply_sse("[]", &["Got it!"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", home.path())
        .env("STEVE_API_URL", mock_server.uri())
        .write_stdin("\n\ntest\n:q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Got it!"))
        .stdout(predicate::str::contains(":q to quit"));
}

#[tokio::test]
async fn test_chat_sends_prior_turns_as_history() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    // Partial matching accepts longer arrays, so the longer history is mounted first.
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(body_partial_json(serde_json::json!({
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "one"},
                {"role": "user", "content": "second"}
            ]
        })))
        .respond_with(sse_response(&reply_sse("[]", &["two"])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{"role": "user", "content": "first"}]
        })))
        .respond_with(sse_response(&reply_sse("[]", &["one"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", home.path())
        .env("STEVE_API_URL", mock_server.uri())
        .args(["chat", "--kb", "1", "--no-save"])
        .write_stdin("first\nsecond\n:q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("two"));

    assert!(!home.path().join("sessions.json").exists());
}

#[test]
fn test_chat_without_knowledgebase_fails() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", home.path())
        .env("STEVE_API_URL", "http://127.0.0.1:9")
        .arg("chat")
        .write_stdin(":q\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Select at least one knowledgebase"));
}

#[tokio::test]
async fn test_ask_recovers_from_stream_error_and_writes_html() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    let html = home.path().join("answer.html");

    Mock::given(method("POST"))
        .and(path("/chat/stream"))
        .respond_with(sse_response(&error_sse("par", "model crashed")))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "reply": "# Answer\n\nAll **good**",
            "sources": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", home.path())
        .env("STEVE_API_URL", mock_server.uri())
        .args(["ask", "--kb", "1", "--prompt", "question", "--html"])
        .arg(&html)
        .assert()
        .success()
        .stdout(predicate::str::contains("All **good**"));

    let written = fs::read_to_string(&html).unwrap();
    assert_eq!(written, "<h1>Answer</h1>\n<p>All <strong>good</strong></p>");
}

#[tokio::test]
async fn test_ask_reports_service_failure() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_json(
            serde_json::json!({"detail": "Upstream chat error: offline"}),
        ))
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", home.path())
        .env("STEVE_API_URL", mock_server.uri())
        .args(["ask", "--kb", "1", "--prompt", "question"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "Error: HTTP 502: Upstream chat error: offline",
        ))
        .stderr(predicate::str::contains("Chat request failed"));
}

#[tokio::test]
async fn test_health_prints_models() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "lm": {
                "base_url": "http://lm:1234/v1",
                "embedding_model": "nomic-embed",
                "chat_model": "qwen"
            }
        })))
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("steve")
        .env("STEVE_HOME", home.path())
        .env("STEVE_API_URL", mock_server.uri())
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("Service: ok"))
        .stdout(predicate::str::contains("Chat model: qwen"));
}
