use std::collections::HashMap;

use apiary::data::NewAnalysis;
use apiary::queen::{PendingLedger, SchedulingContext};
use apiary_test_utils::prelude::*;
use entity::analysis_stats::AnalysisStatus;
use entity::job::JobStatus;
use sea_orm::{ActiveValue, IntoActiveModel};

fn context(meadow_type: &str, submit_limit: i64, slots: Option<i64>) -> SchedulingContext {
    SchedulingContext {
        submit_limit,
        slots_by_meadow: HashMap::from([(meadow_type.to_string(), slots)]),
        default_meadow_type: meadow_type.to_string(),
    }
}

/// Expect queued workers to be deducted from the submission and the ledger
/// to be charged with what actually gets submitted
#[tokio::test]
async fn respects_pending_workers() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("rc1").await?;
    let (analysis, stats) = test
        .hive()
        .insert_analysis(NewAnalysis {
            meadow_type: Some("LSF".to_string()),
            ..NewAnalysis::new("blast", rc.resource_class_id)
        })
        .await?;

    let mut demand = stats.into_active_model();
    demand.num_required_workers = ActiveValue::Set(5);
    demand.status = ActiveValue::Set(AnalysisStatus::Ready);
    test.hive().save_stats(demand).await?;

    let context = context("LSF", 10, Some(100));
    let mut pending: PendingLedger = HashMap::from([(
        "LSF".to_string(),
        HashMap::from([("rc1".to_string(), 3)]),
    )]);

    let queen = test.queen();
    let plan = queen
        .schedule_workers(Some(analysis.analysis_id), &context, &mut pending)
        .await?;

    assert_eq!(plan.total_workers, 2);
    assert_eq!(plan.submissions["LSF"]["rc1"], 2);
    assert_eq!(pending["LSF"]["rc1"], 1);

    Ok(())
}

/// Expect the per-pass submit limit to cap the submission
#[tokio::test]
async fn caps_by_submit_limit() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (_, stats) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    let mut demand = stats.into_active_model();
    demand.num_required_workers = ActiveValue::Set(5);
    demand.status = ActiveValue::Set(AnalysisStatus::Ready);
    test.hive().save_stats(demand).await?;

    let context = context("LOCAL", 3, None);
    let mut pending = PendingLedger::new();

    let queen = test.queen();
    let plan = queen.schedule_workers(None, &context, &mut pending).await?;

    assert_eq!(plan.total_workers, 3);
    assert_eq!(plan.submissions["LOCAL"]["default"], 3);

    Ok(())
}

/// Expect a meadow without free slots to stop the pass
#[tokio::test]
async fn stops_when_meadow_has_no_slots() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (_, stats) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    let mut demand = stats.into_active_model();
    demand.num_required_workers = ActiveValue::Set(5);
    demand.status = ActiveValue::Set(AnalysisStatus::Ready);
    test.hive().save_stats(demand).await?;

    let context = context("LOCAL", 10, Some(0));
    let mut pending = PendingLedger::new();

    let queen = test.queen();
    let plan = queen.schedule_workers(None, &context, &mut pending).await?;

    assert_eq!(plan.total_workers, 0);
    assert!(plan.submissions.is_empty());

    Ok(())
}

/// Expect a blocked analysis to be skipped even when it claims demand
#[tokio::test]
async fn skips_blocked_analysis() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, stats) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    test.hive()
        .insert_job(analysis.analysis_id, JobStatus::Ready, None)
        .await?;

    let mut blocked = stats.into_active_model();
    blocked.num_required_workers = ActiveValue::Set(5);
    blocked.status = ActiveValue::Set(AnalysisStatus::Blocked);
    test.hive().save_stats(blocked).await?;

    let context = context("LOCAL", 10, None);
    let mut pending = PendingLedger::new();

    let queen = test.queen();
    let plan = queen.schedule_workers(None, &context, &mut pending).await?;

    assert_eq!(plan.total_workers, 0);

    Ok(())
}

/// Expect the load budget to split submissions across capacity-bounded
/// analyses within one pass
#[tokio::test]
async fn shares_load_budget_across_analyses() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (_, first_stats) = test
        .hive()
        .insert_analysis(NewAnalysis {
            priority: 1,
            hive_capacity: Some(10),
            ..NewAnalysis::new("first_stage", rc.resource_class_id)
        })
        .await?;
    let (_, second_stats) = test
        .hive()
        .insert_analysis(NewAnalysis {
            hive_capacity: Some(10),
            ..NewAnalysis::new("second_stage", rc.resource_class_id)
        })
        .await?;

    for stats in [first_stats, second_stats] {
        let mut demand = stats.into_active_model();
        demand.num_required_workers = ActiveValue::Set(8);
        demand.status = ActiveValue::Set(AnalysisStatus::Ready);
        test.hive().save_stats(demand).await?;
    }

    let context = context("LOCAL", 100, None);
    let mut pending = PendingLedger::new();

    let queen = test.queen();
    let plan = queen.schedule_workers(None, &context, &mut pending).await?;

    // The first analysis takes its full 8 (0.8 of the load budget); the
    // second only gets floor(0.2 * 10) = 2.
    assert_eq!(plan.total_workers, 10);
    assert_eq!(plan.submissions["LOCAL"]["default"], 10);

    Ok(())
}

/// Expect nothing to be scheduled when no analysis requires workers
#[tokio::test]
async fn schedules_nothing_without_demand() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    test.hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    let context = context("LOCAL", 10, None);
    let mut pending = PendingLedger::new();

    let queen = test.queen();
    let plan = queen.schedule_workers(None, &context, &mut pending).await?;

    assert_eq!(plan.total_workers, 0);

    Ok(())
}
