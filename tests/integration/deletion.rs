use tokio::time::Instant;

use super::common::*;
use redis_operator_harness::crd::redis::Redis;
use redis_operator_harness::harness::{CasePhase, DerivedResource};
use redis_operator_harness::store::ObjectKey;

/// Deleting a verified declaration reclaims its StatefulSet.
#[tokio::test(start_paused = true)]
async fn delete_reclaims_the_statefulset() -> anyhow::Result<()> {
    let ctx = TestContext::new();
    let verifier = ctx.suite.verifier();
    let (mut run, _) = verifier
        .create_and_verify(ctx.suite.standalone("redis-1"))
        .await?;

    let start = Instant::now();
    verifier.delete_and_verify(&mut run).await?;

    // Success only once the reconciler removed it, never while present.
    assert!(start.elapsed() >= RECONCILE_DELAY);
    assert_eq!(run.phase(), CasePhase::Reclaimed);
    assert!(!ctx.store.contains(&DerivedResource::Workload.key(NS, "redis-1")));
    assert!(!ctx.store.contains(&ObjectKey::of::<Redis>(NS, "redis-1")));
    Ok(())
}

/// If the StatefulSet outlives its declaration the delete scenario fails
/// on timeout, reporting the object it kept seeing.
#[tokio::test(start_paused = true)]
async fn orphaned_statefulset_times_out() -> anyhow::Result<()> {
    let ctx = TestContext::with_behaviour(Behaviour::OrphansWorkload);
    let verifier = ctx.suite.verifier();
    let (mut run, _) = verifier
        .create_and_verify(ctx.suite.standalone("redis-1"))
        .await?;

    let start = Instant::now();
    let err = verifier.delete_and_verify(&mut run).await.unwrap_err();
    assert_eq!(start.elapsed(), TIMEOUT);

    let report = err.timeout_report().expect("timeout report");
    assert_eq!(report.reason, "present");
    assert!(report.last_observation.contains("redis-1-headless"));
    assert_eq!(run.phase(), CasePhase::Reclaiming);
    Ok(())
}

/// A case that never converged cannot enter the delete scenario.
#[tokio::test(start_paused = true)]
async fn delete_requires_a_verified_case() -> anyhow::Result<()> {
    let ctx = TestContext::with_behaviour(Behaviour::Stalled);
    let verifier = ctx.suite.verifier();
    let mut run = ctx.suite.open_standalone_case().await?;

    assert!(verifier.verify_created(&mut run).await.is_err());
    assert_eq!(run.phase(), CasePhase::Converging);

    let err = verifier.delete_and_verify(&mut run).await.unwrap_err();
    assert!(matches!(err, redis_operator_harness::Error::Lifecycle(_)), "{err}");
    assert!(ctx.store.contains(run.key()));
    Ok(())
}
