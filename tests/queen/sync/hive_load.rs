use apiary::data::NewAnalysis;
use apiary_test_utils::prelude::*;
use chrono::{Duration, Utc};

/// Expect zero load while no workers are alive
#[tokio::test]
async fn empty_hive_carries_no_load() -> Result<(), TestError> {
    let test = TestBuilder::new()
        .with_hive_tables()
        .with_resource_class("default")
        .build()
        .await?;

    let queen = test.queen();

    assert_eq!(queen.get_hive_current_load().await?, 0.0);

    Ok(())
}

/// Expect the load to sum the inverse capacities of live workers
#[tokio::test]
async fn sums_inverse_capacities_of_live_workers() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (quarters, _) = test
        .hive()
        .insert_analysis(NewAnalysis {
            hive_capacity: Some(4),
            ..NewAnalysis::new("quarter_stage", rc.resource_class_id)
        })
        .await?;
    let (halves, _) = test
        .hive()
        .insert_analysis(NewAnalysis {
            hive_capacity: Some(2),
            ..NewAnalysis::new("half_stage", rc.resource_class_id)
        })
        .await?;

    test.hive()
        .insert_worker(rc.resource_class_id, Some(quarters.analysis_id))
        .await?;
    test.hive()
        .insert_worker(rc.resource_class_id, Some(quarters.analysis_id))
        .await?;
    test.hive()
        .insert_worker(rc.resource_class_id, Some(halves.analysis_id))
        .await?;

    let queen = test.queen();
    let load = queen.get_hive_current_load().await?;

    // 2/4 + 1/2
    assert!((load - 1.0).abs() < 1e-9);

    Ok(())
}

/// Expect dead workers and capacity-unbounded analyses to contribute nothing
#[tokio::test]
async fn ignores_dead_workers_and_unbounded_analyses() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (bounded, _) = test
        .hive()
        .insert_analysis(NewAnalysis {
            hive_capacity: Some(2),
            ..NewAnalysis::new("bounded_stage", rc.resource_class_id)
        })
        .await?;
    let (unbounded, _) = test
        .hive()
        .insert_analysis(NewAnalysis::new("unbounded_stage", rc.resource_class_id))
        .await?;

    let born = Utc::now().naive_utc() - Duration::minutes(10);
    let died = Utc::now().naive_utc() - Duration::minutes(1);
    test.hive()
        .insert_worker_lifespan(rc.resource_class_id, bounded.analysis_id, born, Some(died))
        .await?;
    test.hive()
        .insert_worker(rc.resource_class_id, Some(unbounded.analysis_id))
        .await?;

    let queen = test.queen();

    assert_eq!(queen.get_hive_current_load().await?, 0.0);

    Ok(())
}
