//! Integration tests for the wikismith binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn wikismith_cmd() -> Command {
    let mut cmd = Command::cargo_bin("wikismith").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("GEMINI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("WIKISMITH_CONFIG");
    cmd
}

const VALID_RESPONSE: &str = r#"Here is the wiki plan:
<wiki_structure model="x">
  <title>Demo Project</title>
  <description>A demo</description>
  <pages>
    <page id="intro"><title>Introduction</title><importance>essential</importance></page>
    <page id="usage"><title>Usage</title><parent_id>intro</parent_id></page>
  </pages>
</wiki_structure>"#;

#[test]
fn test_validate_prints_outline() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("response.txt");
    fs::write(&file, VALID_RESPONSE).unwrap();

    wikismith_cmd()
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo Project (wiki-demo-project)"))
        .stdout(predicate::str::contains("- Introduction (intro) [high]"))
        .stdout(predicate::str::contains("  - Usage (usage) [medium]"));
}

#[test]
fn test_validate_json_output() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("response.txt");
    fs::write(&file, VALID_RESPONSE).unwrap();

    let output = wikismith_cmd()
        .args(["--format", "json", "validate"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["title"], "Demo Project");
    assert_eq!(json["pages"][1]["parent_id"], "intro");
}

#[test]
fn test_validate_rejects_invalid_structure() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("response.txt");
    fs::write(
        &file,
        "<wiki_structure><title>T</title><pages><page id=\"a\"><title>A</title></page><page id=\"a\"><title>B</title></page></pages></wiki_structure>",
    )
    .unwrap();

    wikismith_cmd()
        .arg("validate")
        .arg(&file)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("duplicate page id 'a'"));
}

#[test]
fn test_validate_without_block() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("response.txt");
    fs::write(&file, "Sorry, I can't help with that.").unwrap();

    wikismith_cmd()
        .arg("validate")
        .arg(&file)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No <wiki_structure> block"));
}

#[test]
fn test_validate_missing_file() {
    wikismith_cmd()
        .args(["validate", "/definitely/not/here.txt"])
        .assert()
        .code(2);
}

#[test]
fn test_split_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("doc.txt");
    fs::write(&file, "alpha beta gamma delta epsilon zeta eta theta").unwrap();

    let output = wikismith_cmd()
        .args(["--format", "json", "split", "--max-tokens", "3"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let chunks: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(chunks.len() > 1);
    let joined: Vec<&str> = chunks
        .iter()
        .filter_map(|c| c["text"].as_str())
        .collect();
    assert_eq!(
        joined.join(" "),
        "alpha beta gamma delta epsilon zeta eta theta"
    );
}

#[test]
fn test_split_rejects_zero_tokens() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("doc.txt");
    fs::write(&file, "text").unwrap();

    wikismith_cmd()
        .args(["split", "--max-tokens", "0"])
        .arg(&file)
        .assert()
        .code(3);
}

#[test]
fn test_chat_without_provider_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.yml");
    fs::write(&config, "generation:\n  language: en\n").unwrap();

    wikismith_cmd()
        .arg("--config")
        .arg(&config)
        .args(["chat", "hello"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("chat provider configuration is missing"));
}

#[test]
fn test_embed_with_unknown_provider() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.yml");
    fs::write(
        &config,
        "embedding:\n  provider: cohere\n  model: embed-v3\n  api_key: k\n",
    )
    .unwrap();

    wikismith_cmd()
        .arg("--config")
        .arg(&config)
        .args(["embed", "some text"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Unsupported provider: cohere"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_stream_json_is_one_document() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"},\"finish_reason\":\"stop\"}]}\n\n",
        "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":7,\"completion_tokens\":2,\"total_tokens\":9}}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({ "stream": true })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.yml");
    fs::write(
        &config,
        format!(
            "chat:\n  provider: openai\n  model: gpt-4o-mini\n  api_key: test-key\n  base_url: {}\n",
            server.uri()
        ),
    )
    .unwrap();

    let output = tokio::task::spawn_blocking(move || {
        wikismith_cmd()
            .arg("--config")
            .arg(&config)
            .args(["--format", "json", "chat", "--stream", "hello"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["content"], "Hello");
    assert_eq!(json["usage_stats"]["total_tokens"], 9);
}
