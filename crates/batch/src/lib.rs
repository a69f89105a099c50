// Rust guideline compliant 2026-10-16

//! Mass prediction over the recipient population on a background task.
//!
//! [`JobManager`] owns the single pollable job state and guarantees at most one
//! run is processing at a time. [`BatchPredictionJob`] is the worker: it scores
//! and classifies every requested recipient in ascending-id order and persists
//! all results with one bulk write.
//!
//! Entry points: [`JobManager::start`], [`JobManager::snapshot`],
//! [`JobManager::cancel`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use classifier::KnnModel;
use domain::{RecipientId, RecipientRepository, RegionLookup, RepositoryError};
use predictor::PredictionService;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// JobError
// ---------------------------------------------------------------------------

/// Errors raised when starting or running a batch.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Another run is still processing.
    #[error("a batch run is already in progress")]
    AlreadyRunning,
    /// Reading recipients or writing results failed.
    #[error("repository error: {source}")]
    Repository {
        /// The underlying repository error.
        #[from]
        source: RepositoryError,
    },
}

// ---------------------------------------------------------------------------
// Job state
// ---------------------------------------------------------------------------

/// Lifecycle status of the most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// No run has started yet.
    #[default]
    Idle,
    Processing,
    Completed,
    Error,
    Cancelled,
}

/// Point-in-time copy of the job state, safe to hand to pollers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub run_id: Option<Uuid>,
    pub status: JobStatus,
    pub running: bool,
    pub total: usize,
    pub processed: usize,
    /// Recipients whose score and label were (or will be) written.
    pub updated: usize,
    /// Requested ids with no matching recipient.
    pub skipped: usize,
    /// `processed * 100 / total`, integer; 100 for an empty run.
    pub percentage: u8,
    pub started_at: Option<DateTime<Local>>,
    pub elapsed_secs: f64,
    pub estimated_remaining_secs: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct JobState {
    run_id: Option<Uuid>,
    status: JobStatus,
    running: bool,
    total: usize,
    processed: usize,
    updated: usize,
    skipped: usize,
    percentage: u8,
    started: Option<Instant>,
    started_at: Option<DateTime<Local>>,
    elapsed: Duration,
    remaining: Option<Duration>,
    error: Option<String>,
    cancel: Option<CancellationToken>,
}

impl JobState {
    fn snapshot(&self) -> JobSnapshot {
        let elapsed = match (self.running, self.started) {
            (true, Some(started)) => started.elapsed(),
            _ => self.elapsed,
        };
        JobSnapshot {
            run_id: self.run_id,
            status: self.status,
            running: self.running,
            total: self.total,
            processed: self.processed,
            updated: self.updated,
            skipped: self.skipped,
            percentage: self.percentage,
            started_at: self.started_at,
            elapsed_secs: elapsed.as_secs_f64(),
            estimated_remaining_secs: self.remaining.map(|d| d.as_secs_f64()),
            error: self.error.clone(),
        }
    }

    fn advance(&mut self, found: bool) {
        self.processed += 1;
        if found {
            self.updated += 1;
        } else {
            self.skipped += 1;
        }
        self.elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        let (percentage, remaining) = progress(self.processed, self.total, self.elapsed);
        self.percentage = percentage;
        self.remaining = remaining;
    }

    fn finish(&mut self, status: JobStatus, error: Option<String>) {
        self.status = status;
        self.error = error;
        self.elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        if status == JobStatus::Completed {
            self.percentage = 100;
            self.remaining = Some(Duration::ZERO);
        } else {
            self.remaining = None;
        }
    }
}

/// Integer percentage and linear remaining-time estimate.
#[expect(
    clippy::cast_precision_loss,
    reason = "recipient counts stay far below 2^52"
)]
fn progress(processed: usize, total: usize, elapsed: Duration) -> (u8, Option<Duration>) {
    if total == 0 {
        return (100, Some(Duration::ZERO));
    }
    let percentage = u8::try_from(processed.min(total) * 100 / total).unwrap_or(100);
    let remaining = (processed > 0).then(|| {
        let per_item = elapsed.as_secs_f64() / processed as f64;
        Duration::from_secs_f64(per_item * total.saturating_sub(processed) as f64)
    });
    (percentage, remaining)
}

fn lock(state: &Mutex<JobState>) -> MutexGuard<'_, JobState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the run as no longer running when the supervisor task ends, however
/// it ends.
struct RunningGuard(Arc<Mutex<JobState>>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.0);
        if state.status == JobStatus::Processing {
            state.finish(JobStatus::Error, Some("batch run aborted".to_owned()));
        }
        state.running = false;
        state.cancel = None;
    }
}

// ---------------------------------------------------------------------------
// BatchPredictionJob
// ---------------------------------------------------------------------------

/// How a worker run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every item was processed and results were written.
    Completed,
    /// The cancellation token fired; nothing was written.
    Cancelled,
}

/// Worker that evaluates a set of recipients and persists the results.
///
/// Shares one [`PredictionService`] (and therefore one region cache) across
/// all items and all runs.
#[derive(Debug)]
pub struct BatchPredictionJob<R, L> {
    repo: Arc<R>,
    service: Arc<PredictionService<L>>,
}

impl<R, L> Clone for BatchPredictionJob<R, L> {
    fn clone(&self) -> Self {
        Self { repo: Arc::clone(&self.repo), service: Arc::clone(&self.service) }
    }
}

impl<R, L> BatchPredictionJob<R, L>
where
    R: RecipientRepository + 'static,
    L: RegionLookup + 'static,
{
    /// Create a job over `repo` using `service` for each item.
    #[must_use]
    pub const fn new(repo: Arc<R>, service: Arc<PredictionService<L>>) -> Self {
        Self { repo, service }
    }

    /// `ids` must already be sorted and deduplicated.
    async fn run(
        self,
        ids: Vec<RecipientId>,
        passing_grade: f64,
        model: Option<Arc<KnnModel>>,
        cancel: CancellationToken,
        state: Arc<Mutex<JobState>>,
    ) -> Result<RunOutcome, JobError> {
        let recipients: HashMap<RecipientId, _> =
            self.repo.by_ids(&ids).await?.into_iter().map(|r| (r.id, r)).collect();
        tracing::info!(
            "batch.run.started: total={} found={} classified={}",
            ids.len(),
            recipients.len(),
            model.is_some()
        );

        let mut updates = Vec::with_capacity(recipients.len());
        for id in &ids {
            if cancel.is_cancelled() {
                tracing::info!("batch.run.cancelled: processed={}", updates.len());
                return Ok(RunOutcome::Cancelled);
            }
            let found = if let Some(recipient) = recipients.get(id) {
                let result = self.service.evaluate(recipient, model.as_deref(), passing_grade).await;
                updates.push(result.score_update());
                true
            } else {
                tracing::warn!("batch.run: recipient missing id={id}");
                false
            };
            lock(&state).advance(found);
            tokio::task::yield_now().await;
        }

        if cancel.is_cancelled() {
            tracing::info!("batch.run.cancelled: processed={}", updates.len());
            return Ok(RunOutcome::Cancelled);
        }
        let written = updates.len();
        if !updates.is_empty() {
            self.repo.bulk_update(updates).await?;
        }
        tracing::info!("batch.run.completed: written={written}");
        Ok(RunOutcome::Completed)
    }
}

// ---------------------------------------------------------------------------
// JobManager
// ---------------------------------------------------------------------------

/// Handle on a started run.
#[derive(Debug)]
pub struct RunHandle {
    /// Identifier reported in every snapshot of this run.
    pub run_id: Uuid,
    handle: JoinHandle<()>,
}

impl RunHandle {
    /// Wait until the run has finalized its status.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            tracing::error!("batch.supervisor: join failed error={e}");
        }
    }

    /// Whether the run has finalized its status.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Owner of the job state; cheap to clone and share.
///
/// All reads and writes of the state, including the start guard, go through
/// one mutex.
#[derive(Debug, Clone, Default)]
pub struct JobManager {
    state: Arc<Mutex<JobState>>,
}

impl JobManager {
    /// Create a manager in the `idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run over `ids` on a background task.
    ///
    /// Duplicate ids are dropped and the rest processed in ascending order.
    /// The state is reset before the task is spawned. A worker failure or
    /// panic is recorded as status `error`; the `running` flag is cleared
    /// however the run ends.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::AlreadyRunning`] when a run is still processing.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start<R, L>(
        &self,
        job: BatchPredictionJob<R, L>,
        mut ids: Vec<RecipientId>,
        passing_grade: f64,
        model: Option<Arc<KnnModel>>,
    ) -> Result<RunHandle, JobError>
    where
        R: RecipientRepository + 'static,
        L: RegionLookup + 'static,
    {
        ids.sort_unstable();
        ids.dedup();
        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        {
            let mut state = lock(&self.state);
            if state.running {
                return Err(JobError::AlreadyRunning);
            }
            *state = JobState {
                run_id: Some(run_id),
                status: JobStatus::Processing,
                running: true,
                total: ids.len(),
                started: Some(Instant::now()),
                started_at: Some(Local::now()),
                cancel: Some(cancel.clone()),
                ..JobState::default()
            };
        }

        let state = Arc::clone(&self.state);
        let span = tracing::info_span!("batch", %run_id);
        let handle = tokio::spawn(
            async move {
                let guard = RunningGuard(Arc::clone(&state));
                let worker = tokio::spawn(
                    job.run(ids, passing_grade, model, cancel, Arc::clone(&state))
                        .in_current_span(),
                );
                let (status, error) = match worker.await {
                    Ok(Ok(RunOutcome::Completed)) => (JobStatus::Completed, None),
                    Ok(Ok(RunOutcome::Cancelled)) => (JobStatus::Cancelled, None),
                    Ok(Err(e)) => {
                        tracing::error!("batch.run.failed: error={e}");
                        (JobStatus::Error, Some(e.to_string()))
                    }
                    Err(e) => {
                        tracing::error!("batch.run.failed: worker panicked error={e}");
                        (JobStatus::Error, Some(format!("batch worker panicked: {e}")))
                    }
                };
                lock(&state).finish(status, error);
                drop(guard);
            }
            .instrument(span),
        );
        Ok(RunHandle { run_id, handle })
    }

    /// Current state of the most recent run.
    #[must_use]
    pub fn snapshot(&self) -> JobSnapshot {
        lock(&self.state).snapshot()
    }

    /// Whether a run is processing.
    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Request cancellation of the processing run. Returns `false` when no run
    /// is processing.
    pub fn cancel(&self) -> bool {
        let state = lock(&self.state);
        match (&state.cancel, state.running) {
            (Some(token), true) => {
                tracing::info!("batch.cancel: requested run_id={:?}", state.run_id);
                token.cancel();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{
        Criteria, EligibilityLabel, FEATURE_COUNT, Location, LookupError, Recipient,
        RecipientQuery, Region, ScoreUpdate,
    };

    // ------------------------------------------------------------------
    // Mock adapters
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MockRepo {
        recipients: Vec<Recipient>,
        written: Mutex<Vec<ScoreUpdate>>,
        bulk_calls: Mutex<usize>,
        fail_write: bool,
        panic_on_read: bool,
    }

    impl RecipientRepository for MockRepo {
        async fn find_by_name(
            &self,
            query: &RecipientQuery,
        ) -> Result<Vec<Recipient>, RepositoryError> {
            Ok(self.recipients.iter().filter(|r| query.matches(r)).cloned().collect())
        }

        async fn all(&self) -> Result<Vec<Recipient>, RepositoryError> {
            Ok(self.recipients.clone())
        }

        async fn by_ids(&self, ids: &[RecipientId]) -> Result<Vec<Recipient>, RepositoryError> {
            assert!(!self.panic_on_read, "simulated worker crash");
            Ok(self.recipients.iter().filter(|r| ids.contains(&r.id)).cloned().collect())
        }

        async fn bulk_update(&self, updates: Vec<ScoreUpdate>) -> Result<(), RepositoryError> {
            *self.bulk_calls.lock().unwrap() += 1;
            if self.fail_write {
                return Err(RepositoryError::Unavailable { reason: "disk full".to_owned() });
            }
            self.written.lock().unwrap().extend(updates);
            Ok(())
        }
    }

    struct MockLookup;

    impl RegionLookup for MockLookup {
        async fn fetch(&self, _endpoint: &str) -> Result<Vec<Region>, LookupError> {
            Err(LookupError::Unavailable { reason: "offline".to_owned() })
        }
    }

    fn recipient(id: i64, criteria: Criteria) -> Recipient {
        Recipient {
            id: RecipientId(id),
            name: format!("R{id}"),
            national_id: None,
            location: Location::default(),
            occupation: String::new(),
            criteria,
            saw_score: None,
            label: None,
        }
    }

    fn population() -> Vec<Recipient> {
        vec![
            recipient(3, Criteria { dtks: true, extreme_poverty: true, ..Criteria::default() }),
            recipient(1, Criteria::default()),
            recipient(2, Criteria { unemployed: true, pkh: true, ..Criteria::default() }),
        ]
    }

    fn job(repo: MockRepo) -> (BatchPredictionJob<MockRepo, MockLookup>, Arc<MockRepo>) {
        let repo = Arc::new(repo);
        let service = Arc::new(PredictionService::new(MockLookup));
        (BatchPredictionJob::new(Arc::clone(&repo), service), repo)
    }

    fn ids(raw: &[i64]) -> Vec<RecipientId> {
        raw.iter().copied().map(RecipientId).collect()
    }

    // ------------------------------------------------------------------
    // progress
    // ------------------------------------------------------------------

    #[test]
    fn progress_integer_percentage_and_estimate() {
        let (pct, remaining) = progress(1, 3, Duration::from_secs(3));
        assert_eq!(pct, 33);
        assert_eq!(remaining, Some(Duration::from_secs(6)));
        let (pct, remaining) = progress(3, 3, Duration::from_secs(3));
        assert_eq!(pct, 100);
        assert_eq!(remaining, Some(Duration::ZERO));
    }

    #[test]
    fn progress_before_first_item_has_no_estimate() {
        assert_eq!(progress(0, 4, Duration::from_secs(1)), (0, None));
    }

    #[test]
    fn progress_empty_run_is_complete() {
        assert_eq!(progress(0, 0, Duration::ZERO), (100, Some(Duration::ZERO)));
    }

    // ------------------------------------------------------------------
    // JobManager lifecycle
    // ------------------------------------------------------------------

    #[test]
    fn new_manager_is_idle() {
        let snap = JobManager::new().snapshot();
        assert_eq!(snap.status, JobStatus::Idle);
        assert!(!snap.running);
        assert!(snap.run_id.is_none());
    }

    #[tokio::test]
    async fn completed_run_writes_every_recipient_once() {
        let (job, repo) = job(MockRepo { recipients: population(), ..MockRepo::default() });
        let manager = JobManager::new();
        let handle = manager.start(job, ids(&[3, 1, 2, 2]), 0.5, None).unwrap();
        let run_id = handle.run_id;
        handle.wait().await;

        let snap = manager.snapshot();
        assert_eq!(snap.run_id, Some(run_id));
        assert_eq!(snap.status, JobStatus::Completed);
        assert!(!snap.running);
        assert_eq!(snap.total, 3);
        assert_eq!(snap.processed, 3);
        assert_eq!(snap.updated, 3);
        assert_eq!(snap.percentage, 100);
        assert!(snap.error.is_none());

        let written = repo.written.lock().unwrap();
        let written_ids: Vec<RecipientId> = written.iter().map(|u| u.id).collect();
        assert_eq!(written_ids, ids(&[1, 2, 3]));
        assert_eq!(*repo.bulk_calls.lock().unwrap(), 1);
        // 10 + 1 out of 16.
        assert!((written[2].saw_score - 0.6875).abs() < 1e-9);
    }

    #[tokio::test]
    async fn total_counts_distinct_ids_from_the_start() {
        let (job, _repo) = job(MockRepo { recipients: population(), ..MockRepo::default() });
        let manager = JobManager::new();
        let handle = manager.start(job, ids(&[3, 1, 2, 2, 3]), 0.5, None).unwrap();
        assert_eq!(manager.snapshot().total, 3);
        handle.wait().await;
        assert_eq!(manager.snapshot().total, 3);
    }

    #[tokio::test]
    async fn processed_rises_monotonically_to_total() {
        const N: i64 = 300;
        let recipients = (1..=N).map(|i| recipient(i, Criteria::default())).collect();
        let (job, _repo) = job(MockRepo { recipients, ..MockRepo::default() });
        let manager = JobManager::new();
        let handle = manager.start(job, (1..=N).map(RecipientId).collect(), 0.5, None).unwrap();

        let mut last = 0;
        while !handle.is_finished() {
            let snap = manager.snapshot();
            assert!(snap.processed >= last, "processed went from {last} to {}", snap.processed);
            assert!(snap.processed <= snap.total);
            assert_eq!(snap.total, 300);
            last = snap.processed;
            tokio::task::yield_now().await;
        }
        handle.wait().await;

        let snap = manager.snapshot();
        assert!(snap.processed >= last);
        assert_eq!(snap.processed, 300);
        assert_eq!(snap.percentage, 100);
        assert_eq!(snap.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn run_without_model_stores_unscored_label() {
        let (job, repo) = job(MockRepo { recipients: population(), ..MockRepo::default() });
        let manager = JobManager::new();
        manager.start(job, ids(&[1]), 0.5, None).unwrap().wait().await;
        assert_eq!(repo.written.lock().unwrap()[0].label, EligibilityLabel::Unscored);
    }

    #[tokio::test]
    async fn run_with_model_stores_classifier_label() {
        let model = KnnModel::fit(vec![vec![0.0; FEATURE_COUNT]], vec![1], 1).unwrap();
        let (job, repo) = job(MockRepo { recipients: population(), ..MockRepo::default() });
        let manager = JobManager::new();
        manager.start(job, ids(&[1, 2]), 0.5, Some(Arc::new(model))).unwrap().wait().await;
        let written = repo.written.lock().unwrap();
        assert!(written.iter().all(|u| u.label == EligibilityLabel::Eligible));
    }

    #[tokio::test]
    async fn missing_ids_are_skipped() {
        let (job, repo) = job(MockRepo { recipients: population(), ..MockRepo::default() });
        let manager = JobManager::new();
        manager.start(job, ids(&[1, 99]), 0.5, None).unwrap().wait().await;

        let snap = manager.snapshot();
        assert_eq!(snap.status, JobStatus::Completed);
        assert_eq!(snap.processed, 2);
        assert_eq!(snap.updated, 1);
        assert_eq!(snap.skipped, 1);
        assert_eq!(repo.written.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_run_completes_at_full_percentage() {
        let (job, repo) = job(MockRepo::default());
        let manager = JobManager::new();
        manager.start(job, vec![], 0.5, None).unwrap().wait().await;

        let snap = manager.snapshot();
        assert_eq!(snap.status, JobStatus::Completed);
        assert_eq!(snap.percentage, 100);
        assert_eq!(*repo.bulk_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn second_start_while_running_is_rejected() {
        let (job, _repo) = job(MockRepo { recipients: population(), ..MockRepo::default() });
        let manager = JobManager::new();
        let handle = manager.start(job.clone(), ids(&[1, 2, 3]), 0.5, None).unwrap();
        assert!(manager.is_running());
        assert!(matches!(
            manager.start(job.clone(), ids(&[1]), 0.5, None),
            Err(JobError::AlreadyRunning)
        ));
        handle.wait().await;

        // A finished run frees the slot.
        manager.start(job, ids(&[1]), 0.5, None).unwrap().wait().await;
        assert_eq!(manager.snapshot().total, 1);
    }

    #[tokio::test]
    async fn cancelled_run_writes_nothing() {
        let (job, repo) = job(MockRepo { recipients: population(), ..MockRepo::default() });
        let manager = JobManager::new();
        let handle = manager.start(job, ids(&[1, 2, 3]), 0.5, None).unwrap();
        assert!(manager.cancel());
        handle.wait().await;

        let snap = manager.snapshot();
        assert_eq!(snap.status, JobStatus::Cancelled);
        assert!(!snap.running);
        assert_eq!(*repo.bulk_calls.lock().unwrap(), 0);
        assert!(!manager.cancel());
    }

    #[tokio::test]
    async fn write_failure_sets_error_status() {
        let (job, _repo) = job(MockRepo {
            recipients: population(),
            fail_write: true,
            ..MockRepo::default()
        });
        let manager = JobManager::new();
        manager.start(job, ids(&[1, 2]), 0.5, None).unwrap().wait().await;

        let snap = manager.snapshot();
        assert_eq!(snap.status, JobStatus::Error);
        assert!(!snap.running);
        assert!(snap.error.unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn worker_panic_sets_error_status_and_clears_running() {
        let (job, _repo) = job(MockRepo { panic_on_read: true, ..MockRepo::default() });
        let manager = JobManager::new();
        manager.start(job, ids(&[1]), 0.5, None).unwrap().wait().await;

        let snap = manager.snapshot();
        assert_eq!(snap.status, JobStatus::Error);
        assert!(!snap.running);
        assert!(snap.error.unwrap().contains("panicked"));
    }

    #[tokio::test]
    async fn region_lookup_failure_does_not_fail_the_run() {
        let mut located = recipient(4, Criteria { dtks: true, ..Criteria::default() });
        located.location.province = "11".to_owned();
        let (job, repo) = job(MockRepo { recipients: vec![located], ..MockRepo::default() });
        let service = Arc::clone(&job.service);
        let manager = JobManager::new();
        manager.start(job, ids(&[4]), 0.5, None).unwrap().wait().await;

        assert_eq!(manager.snapshot().status, JobStatus::Completed);
        assert_eq!(repo.written.lock().unwrap().len(), 1);
        assert_eq!(service.resolver().cached_endpoints(), 0);
    }

    #[test]
    fn snapshot_serializes_lowercase_status() {
        let json = serde_json::to_value(JobManager::new().snapshot()).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["percentage"], 0);
    }
}
