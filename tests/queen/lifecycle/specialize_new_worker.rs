use apiary::data::NewAnalysis;
use apiary::error::{Error, SpecializationError};
use apiary::queen::{Specialization, SpecializationTarget};
use apiary_test_utils::prelude::*;
use entity::analysis_stats::AnalysisStatus;
use entity::job::JobStatus;
use entity::worker::CauseOfDeath;
use sea_orm::{ActiveValue, IntoActiveModel};

/// Expect a saturated analysis (capacity reached) to refuse another worker
/// while keeping its running count intact
#[tokio::test]
async fn refuses_worker_when_capacity_is_full() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, _) = test
        .hive()
        .insert_analysis(NewAnalysis {
            hive_capacity: Some(1),
            ..NewAnalysis::new("blast", rc.resource_class_id)
        })
        .await?;

    test.hive()
        .insert_worker(rc.resource_class_id, Some(analysis.analysis_id))
        .await?;
    for _ in 0..5 {
        test.hive()
            .insert_job(analysis.analysis_id, JobStatus::Ready, None)
            .await?;
    }

    let candidate = test.hive().insert_worker(rc.resource_class_id, None).await?;

    let queen = test.queen();
    let result = queen
        .specialize_new_worker(
            &candidate,
            SpecializationTarget::Analysis(analysis.analysis_id),
            false,
        )
        .await;

    let Err(Error::Specialization(error)) = result else {
        panic!("expected a specialization refusal");
    };
    assert!(matches!(
        error,
        SpecializationError::NoWorkersRequired { .. }
    ));
    assert_eq!(error.cause_of_death(), CauseOfDeath::NoWork);

    let stats = test.hive().fetch_stats(analysis.analysis_id).await?;
    assert_eq!(stats.num_running_workers, 1);

    Ok(())
}

/// Expect an overloaded hive to refuse specialization with HIVE_OVERLOAD
#[tokio::test]
async fn refuses_worker_when_hive_is_overloaded() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, _) = test
        .hive()
        .insert_analysis(NewAnalysis {
            hive_capacity: Some(1),
            ..NewAnalysis::new("blast", rc.resource_class_id)
        })
        .await?;

    // Two live workers on a capacity-1 analysis put the load at 2.0.
    test.hive()
        .insert_worker(rc.resource_class_id, Some(analysis.analysis_id))
        .await?;
    test.hive()
        .insert_worker(rc.resource_class_id, Some(analysis.analysis_id))
        .await?;
    test.hive()
        .insert_job(analysis.analysis_id, JobStatus::Ready, None)
        .await?;

    let candidate = test.hive().insert_worker(rc.resource_class_id, None).await?;

    let queen = test.queen();
    let result = queen
        .specialize_new_worker(
            &candidate,
            SpecializationTarget::Analysis(analysis.analysis_id),
            false,
        )
        .await;

    let Err(Error::Specialization(error)) = result else {
        panic!("expected a specialization refusal");
    };
    assert!(matches!(error, SpecializationError::HiveOverloaded { .. }));
    assert_eq!(error.cause_of_death(), CauseOfDeath::HiveOverload);

    Ok(())
}

/// Expect a blocked analysis to refuse specialization
#[tokio::test]
async fn refuses_blocked_analysis() -> Result<(), TestError> {
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
    blocked.status = ActiveValue::Set(AnalysisStatus::Blocked);
    test.hive().save_stats(blocked).await?;

    let candidate = test.hive().insert_worker(rc.resource_class_id, None).await?;

    let queen = test.queen();
    let result = queen
        .specialize_new_worker(
            &candidate,
            SpecializationTarget::LogicName("blast".to_string()),
            false,
        )
        .await;

    assert!(matches!(
        result,
        Err(Error::Specialization(
            SpecializationError::AnalysisBlocked { .. }
        ))
    ));

    Ok(())
}

/// Expect a resource class mismatch to be fatal even with force
#[tokio::test]
async fn rejects_resource_class_mismatch() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let other_rc = test.hive().insert_resource_class("himem").await?;
    let (analysis, _) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    let candidate = test
        .hive()
        .insert_worker(other_rc.resource_class_id, None)
        .await?;

    let queen = test.queen();
    let result = queen
        .specialize_new_worker(
            &candidate,
            SpecializationTarget::Analysis(analysis.analysis_id),
            true,
        )
        .await;

    assert!(matches!(
        result,
        Err(Error::Specialization(
            SpecializationError::ResourceClassMismatch { .. }
        ))
    ));

    Ok(())
}

/// Expect force to override the demand check
#[tokio::test]
async fn force_overrides_demand_check() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, _) = test
        .hive()
        .insert_analysis(NewAnalysis {
            hive_capacity: Some(1),
            ..NewAnalysis::new("blast", rc.resource_class_id)
        })
        .await?;

    test.hive()
        .insert_worker(rc.resource_class_id, Some(analysis.analysis_id))
        .await?;
    let candidate = test.hive().insert_worker(rc.resource_class_id, None).await?;

    let queen = test.queen();
    let specialization = queen
        .specialize_new_worker(
            &candidate,
            SpecializationTarget::Analysis(analysis.analysis_id),
            true,
        )
        .await?;

    assert!(matches!(
        specialization,
        Specialization::Scheduled { analysis_id } if analysis_id == analysis.analysis_id
    ));

    let bound = test.hive().fetch_worker(candidate.worker_id).await?;
    assert_eq!(bound.analysis_id, Some(analysis.analysis_id));

    Ok(())
}

/// Expect a job target to return the job as a special batch, claimed
#[tokio::test]
async fn job_target_returns_special_batch() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, _) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;
    let job = test
        .hive()
        .insert_job(analysis.analysis_id, JobStatus::Ready, None)
        .await?;

    let candidate = test.hive().insert_worker(rc.resource_class_id, None).await?;

    let queen = test.queen();
    let specialization = queen
        .specialize_new_worker(&candidate, SpecializationTarget::Job(job.job_id), false)
        .await?;

    let Specialization::SpecialBatch { job: grabbed } = specialization else {
        panic!("expected a special batch");
    };
    assert_eq!(grabbed.job_id, job.job_id);
    assert_eq!(grabbed.status, JobStatus::Claimed);
    assert_eq!(grabbed.worker_id, Some(candidate.worker_id));

    let bound = test.hive().fetch_worker(candidate.worker_id).await?;
    assert_eq!(bound.analysis_id, Some(analysis.analysis_id));

    let stats = test.hive().fetch_stats(analysis.analysis_id).await?;
    assert_eq!(stats.num_running_workers, 1);

    Ok(())
}

/// Expect a job already being executed to be rejected
#[tokio::test]
async fn rejects_job_in_flight() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, _) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;
    let runner = test
        .hive()
        .insert_worker(rc.resource_class_id, Some(analysis.analysis_id))
        .await?;
    let job = test
        .hive()
        .insert_job(analysis.analysis_id, JobStatus::Run, Some(runner.worker_id))
        .await?;

    let candidate = test.hive().insert_worker(rc.resource_class_id, None).await?;

    let queen = test.queen();
    let result = queen
        .specialize_new_worker(&candidate, SpecializationTarget::Job(job.job_id), true)
        .await;

    assert!(matches!(
        result,
        Err(Error::Specialization(
            SpecializationError::JobAlreadyInFlight { .. }
        ))
    ));

    Ok(())
}

/// Expect a DONE job to require force before it can be re-run
#[tokio::test]
async fn rejects_done_job_without_force() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, _) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;
    let job = test
        .hive()
        .insert_job(analysis.analysis_id, JobStatus::Done, None)
        .await?;

    let candidate = test.hive().insert_worker(rc.resource_class_id, None).await?;

    let queen = test.queen();
    let result = queen
        .specialize_new_worker(&candidate, SpecializationTarget::Job(job.job_id), false)
        .await;

    assert!(matches!(
        result,
        Err(Error::Specialization(
            SpecializationError::JobNotResettable { .. }
        ))
    ));

    Ok(())
}

/// Expect a forced re-run of a DONE job to re-increment the parent semaphore
/// so the parent stays blocked while the child runs again
#[tokio::test]
async fn forced_rerun_reincrements_parent_semaphore() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (analysis, _) = test
        .hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    let parent = test
        .hive()
        .insert_semaphored_job(analysis.analysis_id, JobStatus::Ready, 0, None)
        .await?;
    let child = test
        .hive()
        .insert_semaphored_job(
            analysis.analysis_id,
            JobStatus::Done,
            0,
            Some(parent.job_id),
        )
        .await?;

    let candidate = test.hive().insert_worker(rc.resource_class_id, None).await?;

    let queen = test.queen();
    let specialization = queen
        .specialize_new_worker(&candidate, SpecializationTarget::Job(child.job_id), true)
        .await?;

    assert!(matches!(specialization, Specialization::SpecialBatch { .. }));

    let parent = test.hive().fetch_job(parent.job_id).await?;
    assert_eq!(parent.semaphore_count, 1);
    assert_eq!(parent.status, JobStatus::Semaphored);

    let child = test.hive().fetch_job(child.job_id).await?;
    assert_eq!(child.status, JobStatus::Claimed);
    assert_eq!(child.worker_id, Some(candidate.worker_id));

    Ok(())
}

/// Expect the automatic path to pick the most suitable analysis with demand
#[tokio::test]
async fn automatic_picks_most_suitable_analysis() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    let (idle, _) = test
        .hive()
        .insert_analysis(NewAnalysis::new("idle_stage", rc.resource_class_id))
        .await?;
    let (busy, _) = test
        .hive()
        .insert_analysis(NewAnalysis {
            priority: 5,
            ..NewAnalysis::new("busy_stage", rc.resource_class_id)
        })
        .await?;

    for _ in 0..3 {
        test.hive()
            .insert_job(busy.analysis_id, JobStatus::Ready, None)
            .await?;
    }

    let candidate = test.hive().insert_worker(rc.resource_class_id, None).await?;

    let queen = test.queen();
    let specialization = queen
        .specialize_new_worker(&candidate, SpecializationTarget::Automatic, false)
        .await?;

    assert!(matches!(
        specialization,
        Specialization::Scheduled { analysis_id } if analysis_id == busy.analysis_id
    ));

    let idle_stats = test.hive().fetch_stats(idle.analysis_id).await?;
    assert_eq!(idle_stats.num_running_workers, 0);

    let busy_stats = test.hive().fetch_stats(busy.analysis_id).await?;
    assert_eq!(busy_stats.num_running_workers, 1);
    assert_eq!(busy_stats.status, AnalysisStatus::Working);
    assert_eq!(busy_stats.num_required_workers, 2);

    Ok(())
}

/// Expect the automatic path to fail when no analysis needs workers
#[tokio::test]
async fn automatic_fails_without_suitable_analysis() -> Result<(), TestError> {
    let test = TestBuilder::new().with_hive_tables().build().await?;
    let rc = test.hive().insert_resource_class("default").await?;
    test.hive()
        .insert_analysis(NewAnalysis::new("blast", rc.resource_class_id))
        .await?;

    let candidate = test.hive().insert_worker(rc.resource_class_id, None).await?;

    let queen = test.queen();
    let result = queen
        .specialize_new_worker(&candidate, SpecializationTarget::Automatic, false)
        .await;

    let Err(Error::Specialization(error)) = result else {
        panic!("expected a specialization refusal");
    };
    assert!(matches!(
        error,
        SpecializationError::NoSuitableAnalysis { .. }
    ));
    assert_eq!(error.cause_of_death(), CauseOfDeath::NoWork);

    Ok(())
}
