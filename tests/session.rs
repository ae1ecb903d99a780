//! Session and pipeline integration tests
//!
//! External capabilities are mocked; no network or audio hardware needed

use voicechat::{Error, FailurePolicy, Role};

mod common;
use common::{mock_pipeline, reference_wav, session};

#[tokio::test]
async fn test_korean_submission_appends_paired_turns() {
    let sample = reference_wav();
    let mut session = session("Korean", Some(sample.path()));
    let (pipeline, _log) = mock_pipeline(Ok("안녕하세요! 무엇을 도와드릴까요?"), false);

    let turn = session.submit(&pipeline, "안녕").await.unwrap();
    assert_eq!(turn.role, Role::Assistant);
    assert!(turn.audio.is_some());

    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.get(0).unwrap().role, Role::User);
    assert_eq!(history.get(0).unwrap().text, "안녕");
    assert_eq!(history.get(1).unwrap().role, Role::Assistant);
    assert!(history.is_latest_assistant_turn(1));
    assert!(!history.is_latest_assistant_turn(0));
}

#[tokio::test]
async fn test_generation_precedes_synthesis() {
    let sample = reference_wav();
    let mut session = session("Korean", Some(sample.path()));
    let (pipeline, log) = mock_pipeline(Ok("reply"), false);

    session.submit(&pipeline, "안녕").await.unwrap();

    let calls = log.entries();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].starts_with("generate:안녕\n"));
    assert!(calls[0].contains("please answer ko"));
    assert_eq!(
        calls[1],
        format!("synthesize:ko:{}:reply", sample.path().display())
    );
}

#[tokio::test]
async fn test_missing_reference_fails_before_external_calls() {
    let mut session = session("Korean", None);
    let (pipeline, log) = mock_pipeline(Ok("reply"), false);

    let err = session.submit(&pipeline, "안녕").await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(log.entries().is_empty());
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_pipeline_rejects_missing_reference_directly() {
    let session = session("English", None);
    let (pipeline, log) = mock_pipeline(Ok("reply"), false);

    let err = pipeline
        .process_submission("hello", session.language())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn test_empty_prompt_rejected() {
    let sample = reference_wav();
    let mut session = session("English", Some(sample.path()));
    let (pipeline, log) = mock_pipeline(Ok("reply"), false);

    assert!(matches!(
        session.submit(&pipeline, "   ").await,
        Err(Error::EmptyPrompt)
    ));
    assert!(log.entries().is_empty());
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_service_error_leaves_unpaired_user_turn() {
    let sample = reference_wav();
    let mut session = session("English", Some(sample.path()));
    let (pipeline, log) = mock_pipeline(Err("quota exhausted"), false);

    let err = session.submit(&pipeline, "hello").await.unwrap_err();
    assert!(matches!(err, Error::Service(_)));

    // Synthesis never started
    assert_eq!(log.entries().len(), 1);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history().last().unwrap().role, Role::User);
    assert!(!session.history().is_latest_assistant_turn(0));
}

#[tokio::test]
async fn test_synthesis_error_keeps_reply_text() {
    let sample = reference_wav();
    let mut session = session("English", Some(sample.path()));
    let (pipeline, _log) = mock_pipeline(Ok("the reply"), true);

    let err = session.submit(&pipeline, "hello").await.unwrap_err();
    assert!(matches!(err, Error::Synthesis { .. }));
    assert_eq!(err.response_text(), Some("the reply"));
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn test_retract_policy_removes_user_turn() {
    let sample = reference_wav();
    let mut session =
        session("English", Some(sample.path())).with_failure_policy(FailurePolicy::Retract);
    let (ok_pipeline, _) = mock_pipeline(Ok("first reply"), false);
    let (failing, _) = mock_pipeline(Err("auth failed"), false);

    session.submit(&ok_pipeline, "first").await.unwrap();
    session.submit(&failing, "second").await.unwrap_err();

    let texts: Vec<&str> = session.history().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "first reply"]);
}

#[tokio::test]
async fn test_rewind_and_clear_after_conversation() {
    let sample = reference_wav();
    let mut session = session("English", Some(sample.path()));
    let (pipeline, _) = mock_pipeline(Ok("reply"), false);

    session.submit(&pipeline, "a").await.unwrap();
    session.submit(&pipeline, "c").await.unwrap();
    assert_eq!(session.history().len(), 4);

    session.rewind();
    let texts: Vec<&str> = session.history().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "reply"]);
    assert!(session.history().is_latest_assistant_turn(1));

    session.clear();
    assert!(session.history().is_empty());
    session.rewind();
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_language_switch_applies_to_next_submission() {
    let sample = reference_wav();
    let mut session = session("English", Some(sample.path()));
    let (pipeline, log) = mock_pipeline(Ok("bonjour"), false);

    session.select_language("French").unwrap();
    session.submit(&pipeline, "hello").await.unwrap();

    let calls = log.entries();
    assert!(calls[0].contains("please answer fr"));
    assert!(calls[1].starts_with("synthesize:fr:"));
}

#[tokio::test]
async fn test_reference_replacement_is_used() {
    let first = reference_wav();
    let second = reference_wav();
    let mut session = session("English", Some(first.path()));
    let (pipeline, log) = mock_pipeline(Ok("reply"), false);

    session.set_reference_path(second.path()).unwrap();
    session.submit(&pipeline, "hello").await.unwrap();

    assert!(log.entries()[1].contains(&second.path().display().to_string()));
}
