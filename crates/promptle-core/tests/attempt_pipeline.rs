mod support;

use promptle_core::errors::FailureKind;
use promptle_core::model::{Outcome, ScoringMode};
use promptle_core::timeouts::Timeouts;
use std::sync::Arc;
use std::time::Duration;
use support::*;

fn success(out: &Outcome) -> &promptle_core::model::AttemptSuccess {
    match out {
        Outcome::Success(s) => s,
        Outcome::Failure(f) => panic!("expected success, got {:?}: {}", f.kind, f.message),
    }
}

fn failure(out: &Outcome) -> &promptle_core::model::AttemptFailure {
    match out {
        Outcome::Failure(f) => f,
        Outcome::Success(s) => panic!("expected failure, got score {}", s.score),
    }
}

#[tokio::test]
async fn orthogonal_prompt_scores_50_on_first_attempt() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let embedder = Arc::new(ScriptedEmbedder::new().text("a quiet harbour", &[0.0, 1.0]));
    let orch = orchestrator(&store, embedder.clone(), None, ScoringMode::DirectPromptEmbedding);

    let out = orch.submit_attempt(Some("u1"), "C1", "a quiet harbour").await;
    let s = success(&out);
    assert_eq!(s.score, 50);
    assert_eq!(s.attempt_number, 1);
    assert_eq!(s.attempts_left, 2);
    assert_eq!(s.message, "Great attempt! You have 2 attempts left.");
    assert_eq!(s.image_url, None);

    let guesses = orch.list_attempts("u1", "C1").await?;
    assert_eq!(guesses.len(), 1);
    assert_eq!(guesses[0].attempt_number, 1);
    assert_eq!(guesses[0].score, 50.0);
    assert_eq!(guesses[0].prompt, "a quiet harbour");
    // cached target: no image embedding call
    assert_eq!(embedder.image_calls_for(C1_IMAGE), 0);
    Ok(())
}

#[tokio::test]
async fn fourth_attempt_is_exhausted() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let embedder = Arc::new(
        ScriptedEmbedder::new()
            .text("first", &[0.0, 1.0])
            .text("second", &[1.0, 0.0])
            .text("third", &[-1.0, 0.0])
            .text("fourth", &[1.0, 0.0]),
    );
    let orch = orchestrator(&store, embedder.clone(), None, ScoringMode::DirectPromptEmbedding);

    let a1 = orch.submit_attempt(Some("u1"), "C1", "first").await;
    let a2 = orch.submit_attempt(Some("u1"), "C1", "second").await;
    let a3 = orch.submit_attempt(Some("u1"), "C1", "third").await;
    assert_eq!(success(&a1).score, 50);
    assert_eq!(success(&a2).score, 100);
    assert_eq!(success(&a2).message, "Great attempt! You have 1 attempt left.");
    assert_eq!(success(&a3).score, 0);
    assert_eq!(success(&a3).attempts_left, 0);
    assert!(success(&a3).message.starts_with("That was your last attempt!"));

    let calls_before = embedder.total_calls();
    let a4 = orch.submit_attempt(Some("u1"), "C1", "fourth").await;
    let f = failure(&a4);
    assert_eq!(f.kind, FailureKind::AttemptsExhausted);
    assert!(f.kind.is_informational());
    assert_eq!(f.attempts_left, Some(0));
    assert_eq!(a4.attempts_left(), Some(0));
    // short-circuits before any embedding work
    assert_eq!(embedder.total_calls(), calls_before);

    let numbers: Vec<u32> = orch
        .list_attempts("u1", "C1")
        .await?
        .iter()
        .map(|g| g.attempt_number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(orch.best_score("u1", "C1").await?, Some(100.0));
    Ok(())
}

#[tokio::test]
async fn users_do_not_share_attempts() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let embedder = Arc::new(ScriptedEmbedder::new().text("p", &[1.0, 1.0]));
    let orch = orchestrator(&store, embedder, None, ScoringMode::DirectPromptEmbedding);

    for _ in 0..3 {
        assert!(orch.submit_attempt(Some("alice"), "C1", "p").await.is_success());
    }
    let bob = orch.submit_attempt(Some("bob"), "C1", "p").await;
    assert_eq!(success(&bob).attempt_number, 1);
    assert_eq!(orch.best_score("carol", "C1").await?, None);
    Ok(())
}

#[tokio::test]
async fn invalid_prompts_write_nothing() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let embedder = Arc::new(ScriptedEmbedder::new());
    let orch = orchestrator(&store, embedder.clone(), None, ScoringMode::DirectPromptEmbedding);

    for prompt in [String::new(), "x".repeat(101), "   ".to_string()] {
        let out = orch.submit_attempt(Some("u1"), "C1", &prompt).await;
        assert_eq!(out.failure_kind(), Some(FailureKind::InvalidPrompt));
    }
    assert!(orch.list_attempts("u1", "C1").await?.is_empty());
    assert_eq!(embedder.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_user_is_unauthenticated() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let orch = orchestrator(
        &store,
        Arc::new(ScriptedEmbedder::new()),
        None,
        ScoringMode::DirectPromptEmbedding,
    );
    // checked before prompt validation
    let out = orch.submit_attempt(None, "C1", "").await;
    assert_eq!(out.failure_kind(), Some(FailureKind::Unauthenticated));
    let out = orch.submit_attempt(Some("  "), "C1", "fine").await;
    assert_eq!(out.failure_kind(), Some(FailureKind::Unauthenticated));
    Ok(())
}

#[tokio::test]
async fn unknown_challenge_is_unavailable() -> anyhow::Result<()> {
    let store = store_with_challenge(None)?;
    let generator = Arc::new(StubGenerator::ok());
    let orch = orchestrator(
        &store,
        Arc::new(ScriptedEmbedder::new()),
        Some(generator.clone()),
        ScoringMode::GeneratedImageEmbedding,
    );
    let out = orch.submit_attempt(Some("u1"), "C404", "a cat").await;
    assert_eq!(out.failure_kind(), Some(FailureKind::ChallengeUnavailable));
    // nothing generated for a challenge that does not exist
    assert_eq!(generator.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn count_failure_is_reported_not_zeroed() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let embedder = Arc::new(ScriptedEmbedder::new().text("p", &[1.0, 0.0]));
    let orch = orchestrator_with(
        Arc::new(store.clone()),
        Arc::new(DownGuesses),
        embedder.clone(),
        None,
        ScoringMode::DirectPromptEmbedding,
        Timeouts::default(),
    );
    let out = orch.submit_attempt(Some("u1"), "C1", "p").await;
    let f = failure(&out);
    assert_eq!(f.kind, FailureKind::CountUnavailable);
    assert_eq!(f.attempts_left, None);
    assert_eq!(embedder.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn generated_image_is_scored_against_target() -> anyhow::Result<()> {
    let store = store_with_challenge(None)?;
    let embedder = Arc::new(
        ScriptedEmbedder::new()
            .image(C1_IMAGE, &[0.0, 2.0])
            .image(&StubGenerator::url_for(1), &[0.0, 5.0]),
    );
    let generator = Arc::new(StubGenerator::ok());
    let orch = orchestrator(
        &store,
        embedder.clone(),
        Some(generator),
        ScoringMode::GeneratedImageEmbedding,
    );

    let out = orch.submit_attempt(Some("u1"), "C1", "a lighthouse").await;
    let s = success(&out);
    assert_eq!(s.score, 100);
    assert_eq!(s.image_url.as_deref(), Some("https://gen.example/1.png"));
    // prompt text is never embedded in this mode
    assert_eq!(embedder.text_calls.load(std::sync::atomic::Ordering::SeqCst), 0);

    let g = &orch.list_attempts("u1", "C1").await?[0];
    assert_eq!(g.generated_image_url.as_deref(), Some("https://gen.example/1.png"));
    Ok(())
}

#[tokio::test]
async fn generation_failure_writes_nothing() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let embedder = Arc::new(ScriptedEmbedder::new());
    let orch = orchestrator(
        &store,
        embedder.clone(),
        Some(Arc::new(StubGenerator::failing())),
        ScoringMode::GeneratedImageEmbedding,
    );
    let out = orch.submit_attempt(Some("u1"), "C1", "a lighthouse").await;
    assert_eq!(out.failure_kind(), Some(FailureKind::GenerationFailed));
    assert!(orch.list_attempts("u1", "C1").await?.is_empty());
    assert_eq!(embedder.total_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn generation_timeout_is_a_generation_failure() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let timeouts = Timeouts {
        generation_ms: 20,
        ..Timeouts::default()
    };
    let orch = orchestrator_with(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(ScriptedEmbedder::new()),
        Some(Arc::new(StubGenerator::slow(Duration::from_millis(500)))),
        ScoringMode::GeneratedImageEmbedding,
        timeouts,
    );
    let out = orch.submit_attempt(Some("u1"), "C1", "slow").await;
    let f = failure(&out);
    assert_eq!(f.kind, FailureKind::GenerationFailed);
    assert_eq!(f.message, "Failed to generate image. Please try again.");
    Ok(())
}

#[tokio::test]
async fn scoring_failure_keeps_image_and_never_fabricates_a_score() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    // no embedding scripted for the generated image
    let embedder = Arc::new(ScriptedEmbedder::new());
    let orch = orchestrator(
        &store,
        embedder,
        Some(Arc::new(StubGenerator::ok())),
        ScoringMode::GeneratedImageEmbedding,
    );
    let out = orch.submit_attempt(Some("u1"), "C1", "a lighthouse").await;
    let f = failure(&out);
    assert_eq!(f.kind, FailureKind::ScoringFailed);
    assert_eq!(f.image_url.as_deref(), Some("https://gen.example/1.png"));
    assert!(orch.list_attempts("u1", "C1").await?.is_empty());
    assert_eq!(orch.best_score("u1", "C1").await?, None);

    // a failed attempt does not consume the allowance
    let status = orch.attempt_status("u1", "C1").await?;
    assert_eq!(status.next_attempt_number, 1);
    Ok(())
}

#[tokio::test]
async fn dimension_mismatch_is_a_scoring_failure() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let embedder = Arc::new(ScriptedEmbedder::new().text("three dims", &[1.0, 0.0, 0.0]));
    let orch = orchestrator(&store, embedder, None, ScoringMode::DirectPromptEmbedding);
    let out = orch.submit_attempt(Some("u1"), "C1", "three dims").await;
    assert_eq!(out.failure_kind(), Some(FailureKind::ScoringFailed));
    assert!(orch.list_attempts("u1", "C1").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn persist_failure_is_reported() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let embedder = Arc::new(ScriptedEmbedder::new().text("p", &[1.0, 0.0]));
    let orch = orchestrator_with(
        Arc::new(store.clone()),
        Arc::new(ReadOnlyGuesses(store.clone())),
        embedder,
        None,
        ScoringMode::DirectPromptEmbedding,
        Timeouts::default(),
    );
    let out = orch.submit_attempt(Some("u1"), "C1", "p").await;
    let f = failure(&out);
    assert_eq!(f.kind, FailureKind::PersistFailed);
    assert!(!f.conflict);
    assert_eq!(f.message, "Failed to save your guess. Please try again.");
    Ok(())
}

#[tokio::test]
async fn racing_attempt_number_surfaces_as_conflict() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let embedder = Arc::new(ScriptedEmbedder::new().text("p", &[1.0, 0.0]));
    let orch = orchestrator_with(
        Arc::new(store.clone()),
        Arc::new(StaleCount(store.clone())),
        embedder,
        None,
        ScoringMode::DirectPromptEmbedding,
        Timeouts::default(),
    );

    assert!(orch.submit_attempt(Some("u1"), "C1", "p").await.is_success());
    // the gate still reads zero, so this run also claims attempt 1
    let out = orch.submit_attempt(Some("u1"), "C1", "p").await;
    let f = failure(&out);
    assert_eq!(f.kind, FailureKind::PersistFailed);
    assert!(f.conflict);

    let guesses = store.guesses_for("u1", "C1")?;
    assert_eq!(guesses.len(), 1);
    assert_eq!(guesses[0].attempt_number, 1);
    Ok(())
}

#[tokio::test]
async fn resubmission_after_failure_is_a_new_attempt() -> anyhow::Result<()> {
    let store = store_with_challenge(Some(&[1.0, 0.0]))?;
    let embedder = Arc::new(ScriptedEmbedder::new().text("works", &[1.0, 0.0]));
    let orch = orchestrator(&store, embedder, None, ScoringMode::DirectPromptEmbedding);

    let out = orch.submit_attempt(Some("u1"), "C1", "unscripted").await;
    assert_eq!(out.failure_kind(), Some(FailureKind::ScoringFailed));

    let out = orch.submit_attempt(Some("u1"), "C1", "works").await;
    assert_eq!(success(&out).attempt_number, 1);
    Ok(())
}

#[tokio::test]
async fn todays_challenge_is_looked_up_by_date() -> anyhow::Result<()> {
    let store = store_with_challenge(None)?;
    let orch = orchestrator(
        &store,
        Arc::new(ScriptedEmbedder::new()),
        None,
        ScoringMode::DirectPromptEmbedding,
    );
    let day = chrono::NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
    let c = orch.todays_challenge(day).await?.expect("scheduled");
    assert_eq!(c.id, "C1");
    assert_eq!(c.photographer_name.as_deref(), Some("Jo Lens"));
    assert!(orch.todays_challenge(day.succ_opt().unwrap()).await?.is_none());
    Ok(())
}
