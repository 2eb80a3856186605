use tokio::time::Instant;

use super::common::*;
use redis_operator_harness::harness::CasePhase;
use redis_operator_harness::Error;

/// If the operator never acts, verification fails with a timeout after
/// the configured timeout, not earlier and not later.
#[tokio::test(start_paused = true)]
async fn stalled_reconciler_times_out() -> anyhow::Result<()> {
    let ctx = TestContext::with_behaviour(Behaviour::Stalled);
    let verifier = ctx.suite.verifier();
    let mut run = ctx.suite.open_standalone_case().await?;

    let start = Instant::now();
    let err = verifier.verify_created(&mut run).await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_timeout(), "{err}");
    assert!(elapsed >= TIMEOUT, "gave up early after {elapsed:?}");
    assert!(elapsed < TIMEOUT + POLL, "gave up late after {elapsed:?}");

    let report = err.timeout_report().unwrap();
    assert_eq!(report.what, "statefulset redis-1");
    assert_eq!(report.last_observation, "not found");
    assert_eq!(report.elapsed, elapsed);
    assert_eq!(run.phase(), CasePhase::Converging);
    Ok(())
}

/// A label set with one label too many is never accepted.
#[tokio::test(start_paused = true)]
async fn partial_match_never_passes() -> anyhow::Result<()> {
    let ctx = TestContext::with_behaviour(Behaviour::ExtraWorkloadLabel);
    let verifier = ctx.suite.verifier();
    let mut run = ctx.suite.open_standalone_case().await?;

    let err = verifier.verify_created(&mut run).await.unwrap_err();
    let report = err.timeout_report().expect("timeout report");
    assert!(report.reason.starts_with("/metadata/labels"), "{}", report.reason);
    assert!(report.last_observation.contains("team: cache"));
    Ok(())
}

/// Fetch errors during polling are absorbed like absence.
#[tokio::test(start_paused = true)]
async fn transient_fetch_errors_are_absorbed() -> anyhow::Result<()> {
    let ctx = TestContext::new();
    let verifier = ctx.suite.verifier();
    let mut run = ctx.suite.open_standalone_case().await?;

    ctx.store.fail_next_gets(20);
    verifier.verify_created(&mut run).await?;
    assert_eq!(run.phase(), CasePhase::Verified);
    Ok(())
}

/// A rejected declaration fails the case straight away, without polling.
#[tokio::test(start_paused = true)]
async fn submission_failure_is_fatal() {
    let ctx = TestContext::new();
    ctx.store.reject_creates(true);

    let start = Instant::now();
    let err = ctx.suite.open_standalone_case().await.unwrap_err();
    assert_eq!(start.elapsed(), std::time::Duration::ZERO);
    match err {
        Error::Submission { key, .. } => assert_eq!(key, "Redis redis-e2e/redis-1"),
        other => panic!("expected submission error, got {other}"),
    }
}

/// Submitting the same declaration twice is rejected by the store.
#[tokio::test(start_paused = true)]
async fn duplicate_declaration_is_rejected() -> anyhow::Result<()> {
    let ctx = TestContext::new();
    let verifier = ctx.suite.verifier();
    verifier.create(ctx.suite.standalone("redis-1")).await?;

    let err = verifier
        .create(ctx.suite.standalone("redis-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Submission { .. }));
    Ok(())
}
