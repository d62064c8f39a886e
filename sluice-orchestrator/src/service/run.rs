//! Run Service
//!
//! The pipeline engine. It drives a run through BUILD -> TEST -> DEPLOY and
//! resumes failed runs from TEST on request.
//!
//! Starting and retrying a run only register or validate it; execution is
//! handed to a spawned task and the call returns right away. Every state change
//! is applied to a copy of the run and swapped in under the run's write lock,
//! so pollers never observe a half-applied update.

use sluice_core::domain::run::{Run, RunStatus};
use sluice_core::domain::stage::{StageName, StageStatus, TransitionError};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::repository::{RunHandle, RunRepository};
use crate::service::work::StageWork;

/// Service error type
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Pipeline {0} not found")]
    NotFound(Uuid),

    #[error("Pipeline {id} is not failed (current: {status})")]
    InvalidState { id: Uuid, status: RunStatus },
}

pub type Result<T> = std::result::Result<T, RunError>;

/// A run whose execution has been scheduled
#[derive(Debug)]
pub struct Submission {
    /// Snapshot taken right after the run was registered or reset
    pub run: Run,
    /// Execution task; dropping it leaves the task running
    pub task: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy)]
enum Protocol {
    Initial,
    Retry,
}

/// Drives runs stored in a [`RunRepository`]
pub struct PipelineEngine {
    repository: Arc<RunRepository>,
    work: Arc<dyn StageWork>,
}

impl PipelineEngine {
    pub fn new(repository: Arc<RunRepository>, work: Arc<dyn StageWork>) -> Self {
        Self { repository, work }
    }

    /// Create a run and schedule its initial execution
    pub async fn start_run(&self, fail_test: bool) -> Submission {
        let handle = self.repository.create(fail_test).await;
        let run = handle.read().await.clone();

        info!("Run created: {} (fail_test: {})", run.id, run.fail_test);

        let task = self.spawn(run.id, handle, Protocol::Initial);
        Submission { run, task }
    }

    /// Create a run and wait until its initial execution has finished
    pub async fn start_run_and_wait(&self, fail_test: bool) -> Result<Run> {
        let Submission { run, task } = self.start_run(fail_test).await;

        if let Err(e) = task.await {
            error!("Run {} execution task aborted: {}", run.id, e);
        }

        self.get_run(run.id).await
    }

    /// Reset a failed run and schedule execution from TEST
    ///
    /// Validation and reset happen under the run's write lock, so of two
    /// concurrent retries only one is accepted.
    pub async fn retry_run(&self, id: Uuid) -> Result<Submission> {
        let handle = self
            .repository
            .handle(id)
            .await
            .ok_or(RunError::NotFound(id))?;

        let run = {
            let mut run = handle.write().await;

            if run.status != RunStatus::Failed {
                warn!("Rejecting retry of run {} in status {}", id, run.status);
                return Err(RunError::InvalidState {
                    id,
                    status: run.status,
                });
            }

            run.status = RunStatus::Running;
            run.attempt += 1;
            run.stage_mut(StageName::Test).reset();
            run.stage_mut(StageName::Deploy).reset();
            run.touch();
            run.clone()
        };

        info!("Retry accepted for run {} (attempt {})", id, run.attempt);

        let task = self.spawn(id, handle, Protocol::Retry);
        Ok(Submission { run, task })
    }

    /// Get a snapshot of a run
    pub async fn get_run(&self, id: Uuid) -> Result<Run> {
        debug!("Getting run: {}", id);

        self.repository
            .find_by_id(id)
            .await
            .ok_or(RunError::NotFound(id))
    }

    /// List snapshots of all runs, newest first
    pub async fn list_runs(&self) -> Vec<Run> {
        self.repository.list_all().await
    }

    fn spawn(&self, id: Uuid, handle: RunHandle, protocol: Protocol) -> JoinHandle<()> {
        let work = Arc::clone(&self.work);
        let span = info_span!("run", run_id = %id, ?protocol);

        tokio::spawn(
            async move {
                let result = match protocol {
                    Protocol::Initial => execute_initial(&handle, work.as_ref()).await,
                    Protocol::Retry => execute_retry(&handle, work.as_ref()).await,
                };

                match result {
                    Ok(status) => info!("Run {} finished with status {}", id, status),
                    Err(e) => error!("Run {} stopped: {}", id, e),
                }
            }
            .instrument(span),
        )
    }
}

// =============================================================================
// Execution Protocols
// =============================================================================

async fn execute_initial(
    handle: &RunHandle,
    work: &dyn StageWork,
) -> std::result::Result<RunStatus, TransitionError> {
    let (id, fail_test) = {
        let run = handle.read().await;
        (run.id, run.fail_test)
    };

    begin_stage(handle, StageName::Build, "Starting build...").await?;
    work.perform(id, StageName::Build).await;
    finish_stage(handle, StageName::Build, "Build completed successfully").await?;

    begin_stage(handle, StageName::Test, "Running tests...").await?;
    work.perform(id, StageName::Test).await;

    if fail_test {
        apply(handle, |run| {
            let test = run.stage_mut(StageName::Test);
            test.log("Tests failed ❌");
            test.transition(StageStatus::Failed)?;

            let deploy = run.stage_mut(StageName::Deploy);
            deploy.transition(StageStatus::Skipped)?;
            deploy.log("Skipped due to test failure");

            run.status = RunStatus::Failed;
            Ok(())
        })
        .await?;

        info!("Stage TEST failed, DEPLOY skipped");
        return Ok(RunStatus::Failed);
    }

    finish_stage(handle, StageName::Test, "All tests passed").await?;

    deploy(handle, work, id).await
}

async fn execute_retry(
    handle: &RunHandle,
    work: &dyn StageWork,
) -> std::result::Result<RunStatus, TransitionError> {
    let id = handle.read().await.id;

    begin_stage(handle, StageName::Test, "Retrying tests...").await?;
    work.perform(id, StageName::Test).await;
    finish_stage(handle, StageName::Test, "Tests passed on retry").await?;

    deploy(handle, work, id).await
}

async fn deploy(
    handle: &RunHandle,
    work: &dyn StageWork,
    id: Uuid,
) -> std::result::Result<RunStatus, TransitionError> {
    begin_stage(handle, StageName::Deploy, "Deploying application...").await?;
    work.perform(id, StageName::Deploy).await;

    apply(handle, |run| {
        let deploy = run.stage_mut(StageName::Deploy);
        deploy.log("Deployment successful");
        deploy.transition(StageStatus::Success)?;

        run.status = RunStatus::Success;
        Ok(())
    })
    .await?;

    info!("Stage DEPLOY succeeded");
    Ok(RunStatus::Success)
}

// =============================================================================
// State Updates
// =============================================================================

async fn begin_stage(
    handle: &RunHandle,
    name: StageName,
    message: &str,
) -> std::result::Result<(), TransitionError> {
    apply(handle, |run| {
        let stage = run.stage_mut(name);
        stage.transition(StageStatus::Running)?;
        stage.log(message);
        Ok(())
    })
    .await?;

    info!("Stage {} running", name);
    Ok(())
}

async fn finish_stage(
    handle: &RunHandle,
    name: StageName,
    message: &str,
) -> std::result::Result<(), TransitionError> {
    apply(handle, |run| {
        let stage = run.stage_mut(name);
        stage.log(message);
        stage.transition(StageStatus::Success)
    })
    .await?;

    info!("Stage {} succeeded", name);
    Ok(())
}

/// Apply `update` to the run as a single all-or-nothing step
async fn apply<F>(handle: &RunHandle, update: F) -> std::result::Result<(), TransitionError>
where
    F: FnOnce(&mut Run) -> std::result::Result<(), TransitionError>,
{
    let mut run = handle.write().await;

    let mut next = run.clone();
    update(&mut next)?;
    next.touch();
    *run = next;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::{Semaphore, mpsc};

    /// Work that completes immediately
    struct InstantWork;

    #[async_trait]
    impl StageWork for InstantWork {
        async fn perform(&self, _run_id: Uuid, _stage: StageName) {}
    }

    /// Work that reports each stage it enters and waits for a permit
    struct GatedWork {
        gate: Semaphore,
        entered: mpsc::UnboundedSender<StageName>,
    }

    impl GatedWork {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<StageName>) {
            let (entered, rx) = mpsc::unbounded_channel();
            let work = Arc::new(Self {
                gate: Semaphore::new(0),
                entered,
            });
            (work, rx)
        }

        fn release(&self) {
            self.gate.add_permits(1);
        }
    }

    #[async_trait]
    impl StageWork for GatedWork {
        async fn perform(&self, _run_id: Uuid, stage: StageName) {
            let _ = self.entered.send(stage);
            self.gate.acquire().await.unwrap().forget();
        }
    }

    /// Work that records a snapshot of the run each time a stage works
    struct ObservingWork {
        repository: Arc<RunRepository>,
        seen: Mutex<Vec<(StageName, Run)>>,
    }

    #[async_trait]
    impl StageWork for ObservingWork {
        async fn perform(&self, run_id: Uuid, stage: StageName) {
            let run = self.repository.find_by_id(run_id).await.unwrap();
            self.seen.lock().unwrap().push((stage, run));
        }
    }

    fn engine_with(work: Arc<dyn StageWork>) -> (PipelineEngine, Arc<RunRepository>) {
        let repository = Arc::new(RunRepository::new());
        (PipelineEngine::new(Arc::clone(&repository), work), repository)
    }

    fn statuses(run: &Run) -> Vec<StageStatus> {
        run.stages.iter().map(|stage| stage.status).collect()
    }

    fn logs(run: &Run, name: StageName) -> Vec<&str> {
        run.stage(name).logs.iter().map(String::as_str).collect()
    }

    #[tokio::test]
    async fn test_passing_run_succeeds() {
        let (engine, _) = engine_with(Arc::new(InstantWork));

        let submission = engine.start_run(false).await;
        submission.task.await.unwrap();

        let run = engine.get_run(submission.run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(
            statuses(&run),
            vec![StageStatus::Success, StageStatus::Success, StageStatus::Success]
        );
        assert_eq!(
            logs(&run, StageName::Build),
            vec!["Starting build...", "Build completed successfully"]
        );
        assert_eq!(
            logs(&run, StageName::Test),
            vec!["Running tests...", "All tests passed"]
        );
        assert_eq!(
            logs(&run, StageName::Deploy),
            vec!["Deploying application...", "Deployment successful"]
        );
        assert_eq!(run.attempt, 1);
    }

    #[tokio::test]
    async fn test_start_and_wait_returns_terminal_run() {
        let (engine, _) = engine_with(Arc::new(InstantWork));

        let passed = engine.start_run_and_wait(false).await.unwrap();
        assert_eq!(passed.status, RunStatus::Success);
        assert!(passed.stages.iter().all(|s| s.status == StageStatus::Success));

        let failed = engine.start_run_and_wait(true).await.unwrap();
        assert_eq!(failed.status, RunStatus::Failed);
        assert_eq!(
            statuses(&failed),
            vec![StageStatus::Success, StageStatus::Failed, StageStatus::Skipped]
        );
        assert_ne!(passed.id, failed.id);
    }

    #[tokio::test]
    async fn test_failing_run_skips_deploy() {
        let (engine, _) = engine_with(Arc::new(InstantWork));

        let submission = engine.start_run(true).await;
        submission.task.await.unwrap();

        let run = engine.get_run(submission.run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(
            statuses(&run),
            vec![StageStatus::Success, StageStatus::Failed, StageStatus::Skipped]
        );
        assert_eq!(
            logs(&run, StageName::Test),
            vec!["Running tests...", "Tests failed ❌"]
        );
        assert_eq!(
            logs(&run, StageName::Deploy),
            vec!["Skipped due to test failure"]
        );

        let deploy = run.stage(StageName::Deploy);
        assert!(deploy.started_at.is_none());
        assert!(deploy.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_start_returns_before_execution() {
        let (work, mut entered) = GatedWork::new();
        let (engine, _) = engine_with(work.clone());

        let submission = engine.start_run(false).await;
        assert_eq!(submission.run.status, RunStatus::Running);
        assert!(
            submission
                .run
                .stages
                .iter()
                .all(|stage| stage.status == StageStatus::Pending)
        );

        assert_eq!(entered.recv().await, Some(StageName::Build));
        let run = engine.get_run(submission.run.id).await.unwrap();
        assert!(!run.status.is_terminal());

        for _ in 0..3 {
            work.release();
        }
        submission.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_progress_is_visible_stage_by_stage() {
        let (work, mut entered) = GatedWork::new();
        let (engine, _) = engine_with(work.clone());

        let submission = engine.start_run(false).await;
        let id = submission.run.id;

        assert_eq!(entered.recv().await, Some(StageName::Build));
        let run = engine.get_run(id).await.unwrap();
        assert_eq!(
            statuses(&run),
            vec![StageStatus::Running, StageStatus::Pending, StageStatus::Pending]
        );
        assert_eq!(logs(&run, StageName::Build), vec!["Starting build..."]);

        work.release();
        assert_eq!(entered.recv().await, Some(StageName::Test));
        let run = engine.get_run(id).await.unwrap();
        assert_eq!(
            statuses(&run),
            vec![StageStatus::Success, StageStatus::Running, StageStatus::Pending]
        );
        assert_eq!(logs(&run, StageName::Test), vec!["Running tests..."]);

        work.release();
        assert_eq!(entered.recv().await, Some(StageName::Deploy));
        let run = engine.get_run(id).await.unwrap();
        assert_eq!(
            statuses(&run),
            vec![StageStatus::Success, StageStatus::Success, StageStatus::Running]
        );
        assert_eq!(run.status, RunStatus::Running);

        work.release();
        submission.task.await.unwrap();
        assert_eq!(engine.get_run(id).await.unwrap().status, RunStatus::Success);
    }

    #[tokio::test]
    async fn test_stages_never_overlap() {
        let repository = Arc::new(RunRepository::new());
        let work = Arc::new(ObservingWork {
            repository: Arc::clone(&repository),
            seen: Mutex::new(Vec::new()),
        });
        let engine = PipelineEngine::new(Arc::clone(&repository), work.clone());

        let passing = engine.start_run(false).await;
        let failing = engine.start_run(true).await;
        passing.task.await.unwrap();
        failing.task.await.unwrap();

        let seen = work.seen.lock().unwrap();
        assert_eq!(seen.len(), 5);

        for (stage, run) in seen.iter() {
            let running: Vec<_> = run
                .stages
                .iter()
                .filter(|s| s.status == StageStatus::Running)
                .collect();
            assert_eq!(running.len(), 1);
            assert_eq!(running[0].name, *stage);

            for earlier in &run.stages[..stage.index()] {
                assert!(earlier.status.is_terminal());
            }
            for later in &run.stages[stage.index() + 1..] {
                assert_eq!(later.status, StageStatus::Pending);
            }
        }

        let failing_stages: Vec<_> = seen
            .iter()
            .filter(|(_, run)| run.id == failing.run.id)
            .map(|(stage, _)| *stage)
            .collect();
        assert_eq!(failing_stages, vec![StageName::Build, StageName::Test]);
    }

    #[tokio::test]
    async fn test_retry_resumes_at_test() {
        let (engine, _) = engine_with(Arc::new(InstantWork));

        let submission = engine.start_run(true).await;
        submission.task.await.unwrap();
        let failed = engine.get_run(submission.run.id).await.unwrap();

        let retry = engine.retry_run(failed.id).await.unwrap();
        assert_eq!(retry.run.status, RunStatus::Running);
        assert_eq!(retry.run.attempt, 2);
        assert_eq!(
            statuses(&retry.run),
            vec![StageStatus::Success, StageStatus::Pending, StageStatus::Pending]
        );
        assert!(retry.run.stage(StageName::Test).logs.is_empty());
        assert!(retry.run.stage(StageName::Deploy).logs.is_empty());

        retry.task.await.unwrap();

        let run = engine.get_run(failed.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(
            statuses(&run),
            vec![StageStatus::Success, StageStatus::Success, StageStatus::Success]
        );
        assert_eq!(
            logs(&run, StageName::Test),
            vec!["Retrying tests...", "Tests passed on retry"]
        );
        assert_eq!(
            logs(&run, StageName::Deploy),
            vec!["Deploying application...", "Deployment successful"]
        );
        assert_eq!(run.stage(StageName::Build), failed.stage(StageName::Build));
        assert!(run.fail_test);
    }

    #[tokio::test]
    async fn test_retry_of_running_run_is_rejected() {
        let (work, mut entered) = GatedWork::new();
        let (engine, _) = engine_with(work.clone());

        let submission = engine.start_run(true).await;
        assert_eq!(entered.recv().await, Some(StageName::Build));

        let before = engine.get_run(submission.run.id).await.unwrap();
        let err = engine.retry_run(submission.run.id).await.unwrap_err();
        assert!(matches!(
            err,
            RunError::InvalidState {
                status: RunStatus::Running,
                ..
            }
        ));
        assert_eq!(engine.get_run(submission.run.id).await.unwrap(), before);

        work.release();
        work.release();
        submission.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_retry_of_successful_run_is_rejected() {
        let (engine, _) = engine_with(Arc::new(InstantWork));

        let submission = engine.start_run(false).await;
        submission.task.await.unwrap();
        let before = engine.get_run(submission.run.id).await.unwrap();

        let err = engine.retry_run(submission.run.id).await.unwrap_err();
        assert!(matches!(
            err,
            RunError::InvalidState {
                status: RunStatus::Success,
                ..
            }
        ));
        assert_eq!(engine.get_run(submission.run.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_concurrent_retries_accept_one() {
        let (engine, _) = engine_with(Arc::new(InstantWork));

        let submission = engine.start_run(true).await;
        submission.task.await.unwrap();
        let id = submission.run.id;

        let (first, second) = tokio::join!(engine.retry_run(id), engine.retry_run(id));
        let accepted: Vec<_> = [first, second].into_iter().filter_map(|r| r.ok()).collect();
        assert_eq!(accepted.len(), 1);

        for submission in accepted {
            submission.task.await.unwrap();
        }
        let run = engine.get_run(id).await.unwrap();
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.attempt, 2);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (engine, repository) = engine_with(Arc::new(InstantWork));
        let id = Uuid::new_v4();

        assert!(matches!(
            engine.get_run(id).await,
            Err(RunError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(
            engine.retry_run(id).await,
            Err(RunError::NotFound(_))
        ));
        assert_eq!(repository.list_all().await.len(), 0);
    }

    #[tokio::test]
    async fn test_runs_are_independent() {
        let (engine, _) = engine_with(Arc::new(InstantWork));

        let mut submissions = Vec::new();
        for i in 0..20 {
            submissions.push(engine.start_run(i % 2 == 0).await);
        }

        let ids: Vec<(Uuid, bool)> = submissions
            .iter()
            .map(|s| (s.run.id, s.run.fail_test))
            .collect();
        for submission in submissions {
            submission.task.await.unwrap();
        }

        for (id, fail_test) in ids {
            let run = engine.get_run(id).await.unwrap();
            let expected = if fail_test {
                RunStatus::Failed
            } else {
                RunStatus::Success
            };
            assert_eq!(run.status, expected);
        }
        assert_eq!(engine.list_runs().await.len(), 20);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_run_untouched() {
        let repository = RunRepository::new();
        let handle = repository.create(false).await;
        let before = handle.read().await.clone();

        let result = apply(&handle, |run| {
            run.status = RunStatus::Failed;
            run.stage_mut(StageName::Deploy)
                .transition(StageStatus::Success)
        })
        .await;

        assert!(result.is_err());
        assert_eq!(*handle.read().await, before);
    }
}
