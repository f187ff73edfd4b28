//! Hot-reload behaviour of the policy engine

use async_trait::async_trait;
use promptgate_classifiers::{EmbeddingClient, EmbeddingProvider};
use promptgate_core::{Action, Error, Result};
use promptgate_policy::PolicyEngine;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

const INITIAL: &str = r#"{
    "banned_keywords": ["kill"],
    "max_prompt_chars": 50,
    "redaction_rules": {"redact_emails": true}
}"#;

fn policy_file(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

struct DownProvider;

#[async_trait]
impl EmbeddingProvider for DownProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::provider("service unavailable"))
    }

    fn name(&self) -> &str {
        "down"
    }
}

#[tokio::test]
async fn test_successful_reload_changes_decisions() {
    let file = policy_file(INITIAL);
    let engine = PolicyEngine::open(file.path(), None).await.unwrap();

    assert_eq!(engine.evaluate("nuke it").await.action, Action::Allow);

    std::fs::write(file.path(), r#"{"banned_keywords": ["nuke"]}"#).unwrap();
    engine.reload().await.unwrap();

    let decision = engine.evaluate("nuke it").await;
    assert_eq!(decision.action, Action::Block);
    assert_eq!(decision.reason, "Found blocked keywords: nuke");
    // Redaction toggles from the old file are gone
    assert_eq!(engine.evaluate("a@b.com").await.action, Action::Allow);
}

#[tokio::test]
async fn test_failed_reload_preserves_behaviour() {
    let file = policy_file(INITIAL);
    let engine = PolicyEngine::open(file.path(), None).await.unwrap();

    let prompts = [
        "please kill the job",
        "mail me at someone@example.org",
        "a perfectly ordinary request",
        "this prompt is definitely going to be longer than fifty characters",
    ];

    let mut before = Vec::new();
    for prompt in prompts {
        before.push(engine.evaluate(prompt).await);
    }

    let broken = [
        "{ this is not json",
        r#"{"max_prompt_chars": 100}"#,
        r#"{"banned_keywords": [""]}"#,
        r#"{"banned_keywords": [], "semantic_blocking": {"enabled": true}}"#,
    ];
    for content in broken {
        std::fs::write(file.path(), content).unwrap();
        assert!(engine.reload().await.is_err(), "accepted: {}", content);

        for (prompt, expected) in prompts.iter().zip(&before) {
            assert_eq!(&engine.evaluate(prompt).await, expected);
        }
    }

    assert_eq!(engine.current().generation(), 1);
}

#[tokio::test]
async fn test_reload_after_file_removed() {
    let file = policy_file(INITIAL);
    let path = file.path().to_path_buf();
    let engine = PolicyEngine::open(&path, None).await.unwrap();

    drop(file);
    let err = engine.reload().await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(engine.evaluate("kill").await.action, Action::Block);
}

#[tokio::test]
async fn test_semantic_provider_down_fails_open() {
    let file = policy_file(
        r#"{
            "banned_keywords": [],
            "semantic_blocking": {"enabled": true, "banned_phrases": ["forbidden topic"]}
        }"#,
    );
    let embedder = EmbeddingClient::new(Arc::new(DownProvider), Duration::from_millis(200));
    let engine = PolicyEngine::open(file.path(), Some(embedder)).await.unwrap();

    let decision = engine.evaluate("forbidden topic").await;
    assert_eq!(decision.action, Action::Allow);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reload_and_evaluate() {
    let file = policy_file(INITIAL);
    let engine = Arc::new(PolicyEngine::open(file.path(), None).await.unwrap());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..50 {
                let decision = engine.evaluate("kill").await;
                assert_eq!(decision.action, Action::Block);
            }
        }));
    }
    for _ in 0..10 {
        engine.reload().await.unwrap();
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(engine.current().generation(), 11);
}
