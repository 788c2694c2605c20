use apiary::data::{AnalysisStatsRepository, NewAnalysis};
use apiary_test_utils::prelude::*;
use chrono::{Duration, Utc};
use entity::analysis_stats::AnalysisStatus;
use entity::job::JobStatus;
use sea_orm::{ActiveValue, IntoActiveModel};

/// Expect the conditional lock claim to have exactly one winner
#[tokio::test]
async fn lock_claim_has_exactly_one_winner() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, _) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    let repo = AnalysisStatsRepository::new(&test.db);

    assert!(repo.claim_sync_lock(analysis.analysis_id, 600).await?);
    assert!(!repo.claim_sync_lock(analysis.analysis_id, 600).await?);

    let stats = test.hive().fetch_stats(analysis.analysis_id).await?;
    assert!(stats.sync_lock);
    assert_eq!(stats.status, AnalysisStatus::Synching);

    Ok(())
}

/// Expect a held lock to make other coordinators skip the sync pass
#[tokio::test]
async fn held_lock_skips_the_sync() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, stats) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    test.hive()
        .insert_job(analysis.analysis_id, JobStatus::Ready, None)
        .await?;

    let mut locked = stats.into_active_model();
    locked.sync_lock = ActiveValue::Set(true);
    locked.when_updated = ActiveValue::Set(Some(Utc::now().naive_utc()));
    let locked = test.hive().save_stats(locked).await?;

    let queen = test.queen();
    let returned = queen.safe_synchronize_stats(locked).await?;

    // Nothing was rebuilt: the snapshot came back as-is and the row still
    // carries the seed counts.
    assert_eq!(returned.ready_job_count, 0);
    let stored = test.hive().fetch_stats(analysis.analysis_id).await?;
    assert_eq!(stored.ready_job_count, 0);
    assert!(stored.sync_lock);

    Ok(())
}

/// Expect an expired lock to be reaped and the sync to run
#[tokio::test]
async fn expired_lock_is_reaped() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, stats) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    for _ in 0..2 {
        test.hive()
            .insert_job(analysis.analysis_id, JobStatus::Ready, None)
            .await?;
    }

    let mut abandoned = stats.into_active_model();
    abandoned.status = ActiveValue::Set(AnalysisStatus::Synching);
    abandoned.sync_lock = ActiveValue::Set(true);
    abandoned.when_updated =
        ActiveValue::Set(Some(Utc::now().naive_utc() - Duration::minutes(20)));
    let abandoned = test.hive().save_stats(abandoned).await?;

    let queen = test.queen();
    let rebuilt = queen.safe_synchronize_stats(abandoned).await?;

    assert_eq!(rebuilt.ready_job_count, 2);
    assert!(!rebuilt.sync_lock);
    assert_ne!(rebuilt.status, AnalysisStatus::Synching);

    Ok(())
}

/// Expect an analysis already SYNCHING under a live lock to fast-return
#[tokio::test]
async fn synching_analysis_fast_returns() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, stats) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    test.hive()
        .insert_job(analysis.analysis_id, JobStatus::Ready, None)
        .await?;

    let mut synching = stats.into_active_model();
    synching.status = ActiveValue::Set(AnalysisStatus::Synching);
    synching.sync_lock = ActiveValue::Set(true);
    synching.when_updated = ActiveValue::Set(Some(Utc::now().naive_utc()));
    let synching = test.hive().save_stats(synching).await?;

    let queen = test.queen();
    let returned = queen.safe_synchronize_stats(synching).await?;

    assert_eq!(returned.status, AnalysisStatus::Synching);
    assert_eq!(returned.ready_job_count, 0);

    Ok(())
}

/// Expect a DONE analysis to never be re-synced
#[tokio::test]
async fn done_analysis_is_never_resynced() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, stats) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    test.hive()
        .insert_job(analysis.analysis_id, JobStatus::Ready, None)
        .await?;

    let mut done = stats.into_active_model();
    done.status = ActiveValue::Set(AnalysisStatus::Done);
    let done = test.hive().save_stats(done).await?;

    let queen = test.queen();
    let returned = queen.safe_synchronize_stats(done).await?;

    assert_eq!(returned.status, AnalysisStatus::Done);
    let stored = test.hive().fetch_stats(analysis.analysis_id).await?;
    assert_eq!(stored.ready_job_count, 0);

    Ok(())
}

/// Expect a WORKING analysis refreshed moments ago to be left alone
#[tokio::test]
async fn fresh_working_analysis_is_skipped() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, stats) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    test.hive()
        .insert_job(analysis.analysis_id, JobStatus::Ready, None)
        .await?;

    let mut working = stats.into_active_model();
    working.status = ActiveValue::Set(AnalysisStatus::Working);
    working.when_updated = ActiveValue::Set(Some(Utc::now().naive_utc()));
    let working = test.hive().save_stats(working).await?;

    let queen = test.queen();
    let returned = queen.safe_synchronize_stats(working).await?;

    assert_eq!(returned.ready_job_count, 0);
    let stored = test.hive().fetch_stats(analysis.analysis_id).await?;
    assert_eq!(stored.ready_job_count, 0);

    Ok(())
}

/// Expect a stale WORKING analysis to be re-synced
#[tokio::test]
async fn stale_working_analysis_is_resynced() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, stats) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    test.hive()
        .insert_job(analysis.analysis_id, JobStatus::Ready, None)
        .await?;

    let mut working = stats.into_active_model();
    working.status = ActiveValue::Set(AnalysisStatus::Working);
    working.when_updated =
        ActiveValue::Set(Some(Utc::now().naive_utc() - Duration::minutes(10)));
    let working = test.hive().save_stats(working).await?;

    let queen = test.queen();
    let rebuilt = queen.safe_synchronize_stats(working).await?;

    assert_eq!(rebuilt.ready_job_count, 1);

    Ok(())
}
