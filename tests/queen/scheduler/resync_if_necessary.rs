use std::sync::Arc;

use apiary::data::NewAnalysis;
use apiary::meadow::Valley;
use apiary_test_utils::prelude::*;
use chrono::{Duration, Utc};
use entity::analysis_stats::AnalysisStatus;
use entity::job::JobStatus;
use entity::worker::WorkerStatus;
use sea_orm::{ActiveValue, IntoActiveModel};

/// Expect the idle-deadlock breaker to collect the dead, resync, and come
/// back with a non-empty schedule
#[tokio::test]
async fn breaks_stale_statistics_deadlock() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, stats) = test
        .hive()
        .insert_analysis(NewAnalysis {
            hive_capacity: Some(5),
            ..NewAnalysis::new("blast", rc.resource_class_id)
        })
        .await?;

    for _ in 0..10 {
        test.hive()
            .insert_job(analysis.analysis_id, JobStatus::Ready, None)
            .await?;
    }

    // Three workers died without anyone noticing; one took a job with it.
    let born = Utc::now().naive_utc() - Duration::hours(2);
    let died = Utc::now().naive_utc() - Duration::hours(1);
    let casualty = test
        .hive()
        .insert_worker_lifespan(rc.resource_class_id, analysis.analysis_id, born, Some(died))
        .await?;
    for _ in 0..2 {
        test.hive()
            .insert_worker_lifespan(rc.resource_class_id, analysis.analysis_id, born, Some(died))
            .await?;
    }
    let orphaned = test
        .hive()
        .insert_job(
            analysis.analysis_id,
            JobStatus::Run,
            Some(casualty.worker_id),
        )
        .await?;

    // Stale aggregates: the stats still believe three workers are running
    // and nobody is required.
    let mut stale = stats.into_active_model();
    stale.status = ActiveValue::Set(AnalysisStatus::Working);
    stale.num_running_workers = ActiveValue::Set(3);
    stale.num_required_workers = ActiveValue::Set(0);
    stale.when_updated = ActiveValue::Set(Some(Utc::now().naive_utc()));
    test.hive().save_stats(stale).await?;

    let valley = Valley::new(Arc::new(MockMeadow::new("LOCAL"))).with_submit_workers_max(50);

    let queen = test.queen();
    let plan = queen
        .schedule_workers_resync_if_necessary(&valley, None)
        .await?;

    // The resync released the orphaned job, recounted the running workers
    // and rebuilt the demand up to the capacity.
    assert_eq!(plan.total_workers, 5);

    let released = test.hive().fetch_job(orphaned.job_id).await?;
    assert_eq!(released.status, JobStatus::Ready);

    let stats = test.hive().fetch_stats(analysis.analysis_id).await?;
    assert_eq!(stats.num_running_workers, 0);
    assert_eq!(stats.num_required_workers, 5);

    Ok(())
}

/// Expect no garbage collection while any worker row is still alive
#[tokio::test]
async fn does_not_resync_while_workers_are_alive() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, stats) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    // One live (capacity-unbounded) worker, no demand anywhere.
    let survivor = test
        .hive()
        .insert_worker(rc.resource_class_id, Some(analysis.analysis_id))
        .await?;

    let mut idle = stats.into_active_model();
    idle.status = ActiveValue::Set(AnalysisStatus::Working);
    idle.when_updated = ActiveValue::Set(Some(Utc::now().naive_utc()));
    test.hive().save_stats(idle).await?;

    // The meadow would report this worker lost if the sweep ever ran.
    let valley = Valley::new(Arc::new(MockMeadow::new("LOCAL")));

    let queen = test.queen();
    let plan = queen
        .schedule_workers_resync_if_necessary(&valley, None)
        .await?;

    assert_eq!(plan.total_workers, 0);

    let untouched = test.hive().fetch_worker(survivor.worker_id).await?;
    assert_ne!(untouched.status, WorkerStatus::Dead);

    Ok(())
}
