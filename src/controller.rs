// src/controller.rs
//! Lifecycle of the single evaluation job tracked by the dashboard.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::client::JobApi;
use crate::errors::{GraderError, Result};
use crate::models::{Job, JobStatus};

/// Message surfaced when the backend fails a job without saying why.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Reset message for a start whose caller went away before the backend answered.
pub const START_CANCELLED: &str = "Evaluation start was cancelled";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Starting,
    Running,
    Complete,
    Error,
}

/// Copy of the controller state handed to readers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub phase: Phase,
    pub job: Option<Job>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Transitions published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LifecycleEvent {
    Starting,
    Started { job_id: String },
    Progress { job_id: String, progress: u32, results: usize },
    Completed { job_id: String, results: usize },
    Failed { job_id: String, message: String },
    /// The start request itself failed; no job exists.
    Reset { message: String },
}

struct ControllerState {
    phase: Phase,
    job: Option<Job>,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    /// Bumped whenever the current poller is invalidated. A poll result is
    /// only applied if it carries the current value.
    generation: u64,
    poller: Option<JoinHandle<()>>,
    disposed: bool,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            job: None,
            error: None,
            started_at: None,
            updated_at: None,
            generation: 0,
            poller: None,
            disposed: false,
        }
    }

    fn cancel_poller(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.poller.take() {
            handle.abort();
        }
    }

    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            phase: self.phase,
            job: self.job.clone(),
            error: self.error.clone(),
            started_at: self.started_at,
            updated_at: self.updated_at,
        }
    }
}

struct Shared {
    state: Mutex<ControllerState>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Applies one poll outcome. Returns whether polling should continue.
    fn apply_poll(&self, generation: u64, job_id: &str, outcome: Result<Job>) -> bool {
        let mut state = self.lock();
        if state.generation != generation || state.phase != Phase::Running {
            log::debug!("Discarding stale status for job {}", job_id);
            return false;
        }
        state.updated_at = Some(Utc::now());

        let (event, keep_polling) = match outcome {
            Ok(job) => match job.status {
                JobStatus::Running => {
                    let event = LifecycleEvent::Progress {
                        job_id: job_id.to_string(),
                        progress: job.progress,
                        results: job.results.len(),
                    };
                    state.job = Some(job);
                    (event, true)
                }
                JobStatus::Complete => {
                    log::info!("Job {} complete with {} results", job_id, job.results.len());
                    let event = LifecycleEvent::Completed {
                        job_id: job_id.to_string(),
                        results: job.results.len(),
                    };
                    state.phase = Phase::Complete;
                    state.job = Some(job);
                    (event, false)
                }
                JobStatus::Error => {
                    let message = job
                        .error
                        .clone()
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                    log::warn!("Job {} failed: {}", job_id, message);
                    state.phase = Phase::Error;
                    state.error = Some(message.clone());
                    state.job = Some(job);
                    (LifecycleEvent::Failed { job_id: job_id.to_string(), message }, false)
                }
            },
            Err(e) => {
                let message = e.to_string();
                log::error!("Polling job {} failed: {}", job_id, message);
                state.phase = Phase::Error;
                state.error = Some(message.clone());
                if let Some(job) = state.job.as_mut() {
                    job.status = JobStatus::Error;
                    job.error = Some(message.clone());
                }
                (LifecycleEvent::Failed { job_id: job_id.to_string(), message }, false)
            }
        };

        if !keep_polling {
            // Detach our own handle; the loop exits after this returns.
            state.poller = None;
        }
        drop(state);
        self.emit(event);
        keep_polling
    }
}

/// Held across the start request. If the `start` future is dropped before
/// the backend answers, the controller falls back to idle so a later start
/// is not rejected forever.
struct PendingStart<'a> {
    shared: &'a Shared,
    generation: u64,
    armed: bool,
}

impl PendingStart<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingStart<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.shared.lock();
        if state.generation != self.generation || state.phase != Phase::Starting {
            return;
        }
        state.phase = Phase::Idle;
        state.started_at = None;
        state.updated_at = Some(Utc::now());
        drop(state);
        log::warn!("Evaluation start abandoned before the backend answered");
        self.shared.emit(LifecycleEvent::Reset { message: START_CANCELLED.to_string() });
    }
}

/// Owns the current job: starts it, polls it while it runs and stops
/// polling as soon as it reaches a terminal state or the controller goes
/// away.
pub struct JobController<A: JobApi> {
    api: Arc<A>,
    poll_interval: Duration,
    shared: Arc<Shared>,
}

impl<A: JobApi> JobController<A> {
    pub fn new(api: Arc<A>, poll_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            poll_interval,
            shared: Arc::new(Shared {
                state: Mutex::new(ControllerState::new()),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.shared.events.subscribe()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().phase
    }

    /// Starts a new evaluation, replacing whatever job was tracked before.
    ///
    /// Fails with `Validation` and leaves the state untouched when either
    /// input is empty or another start is still in flight. A backend failure
    /// returns the controller to idle with no job, and so does dropping the
    /// returned future before the backend answers.
    pub async fn start(&self, organization_ids: &BTreeSet<String>, questions: &[String]) -> Result<String> {
        if organization_ids.is_empty() {
            return Err(GraderError::validation("Please select at least one organization"));
        }
        if questions.is_empty() {
            return Err(GraderError::validation("Please add at least one question"));
        }

        let generation = {
            let mut state = self.shared.lock();
            if state.disposed {
                return Err(GraderError::Disposed);
            }
            if state.phase == Phase::Starting {
                return Err(GraderError::validation("An evaluation is already starting"));
            }
            state.cancel_poller();
            let now = Utc::now();
            state.phase = Phase::Starting;
            state.job = None;
            state.error = None;
            state.started_at = Some(now);
            state.updated_at = Some(now);
            state.generation
        };
        self.shared.emit(LifecycleEvent::Starting);
        log::info!(
            "Starting evaluation of {} organizations with {} questions",
            organization_ids.len(),
            questions.len()
        );

        let pending = PendingStart { shared: &self.shared, generation, armed: true };
        let outcome = self.api.start_evaluation(organization_ids, questions, false).await;
        pending.disarm();

        let mut state = self.shared.lock();
        if state.generation != generation {
            return Err(GraderError::Disposed);
        }
        state.updated_at = Some(Utc::now());
        match outcome {
            Ok(response) => {
                let job_id = response.job_id;
                state.phase = Phase::Running;
                state.job = Some(Job::started(job_id.clone()));
                state.poller = Some(self.spawn_poller(generation, job_id.clone()));
                drop(state);
                log::info!("Evaluation job {} started", job_id);
                self.shared.emit(LifecycleEvent::Started { job_id: job_id.clone() });
                Ok(job_id)
            }
            Err(e) => {
                state.phase = Phase::Idle;
                state.started_at = None;
                drop(state);
                log::error!("Failed to start evaluation: {}", e);
                self.shared.emit(LifecycleEvent::Reset { message: e.to_string() });
                Err(e)
            }
        }
    }

    /// Stops polling for good. Later `start` calls fail with `Disposed`.
    pub fn dispose(&self) {
        let mut state = self.shared.lock();
        if state.disposed {
            return;
        }
        state.disposed = true;
        state.cancel_poller();
        if matches!(state.phase, Phase::Starting | Phase::Running) {
            state.phase = Phase::Idle;
        }
        log::debug!("Job controller disposed");
    }

    fn spawn_poller(&self, generation: u64, job_id: String) -> JoinHandle<()> {
        let api = Arc::clone(&self.api);
        let shared = Arc::clone(&self.shared);
        let period = self.poll_interval;

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // The next tick is only awaited once this response is handled.
                let outcome = api.fetch_job_status(&job_id).await;
                if !shared.apply_poll(generation, &job_id, outcome) {
                    break;
                }
            }
        })
    }
}

impl<A: JobApi> Drop for JobController<A> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendHealth, Organization, StartEvaluationResponse};
    use serde_json::json;
    use std::sync::OnceLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every poll with a finished job, but a restart invalidates the
    /// poller after the response has arrived and before it is applied.
    #[derive(Default)]
    struct RestartDuringPoll {
        shared: OnceLock<Arc<Shared>>,
        polls: AtomicUsize,
    }

    impl JobApi for RestartDuringPoll {
        async fn list_organizations(&self) -> Result<Vec<Organization>> {
            Ok(Vec::new())
        }

        async fn start_evaluation(
            &self,
            _organization_ids: &BTreeSet<String>,
            _questions: &[String],
            _force: bool,
        ) -> Result<StartEvaluationResponse> {
            Ok(StartEvaluationResponse { job_id: "j1".to_string() })
        }

        async fn fetch_job_status(&self, job_id: &str) -> Result<Job> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if let Some(shared) = self.shared.get() {
                shared.lock().cancel_poller();
            }
            let mut job = Job::started(job_id);
            job.status = JobStatus::Complete;
            job.progress = 100;
            Ok(job)
        }

        async fn health(&self) -> Result<BackendHealth> {
            Ok(BackendHealth { status: "healthy".to_string(), details: Default::default() })
        }
    }

    #[test]
    fn test_events_serialize_with_tag() {
        let event = LifecycleEvent::Progress { job_id: "j1".to_string(), progress: 40, results: 3 };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"event": "progress", "jobId": "j1", "progress": 40, "results": 3})
        );
        assert_eq!(serde_json::to_value(LifecycleEvent::Starting).unwrap(), json!({"event": "starting"}));
    }

    #[test]
    fn test_cancel_poller_bumps_generation() {
        let mut state = ControllerState::new();
        state.cancel_poller();
        state.cancel_poller();
        assert_eq!(state.generation, 2);
        assert!(state.poller.is_none());
    }

    #[test]
    fn test_stale_poll_is_discarded() {
        let (events, _) = broadcast::channel(4);
        let shared = Shared { state: Mutex::new(ControllerState::new()), events };
        {
            let mut state = shared.lock();
            state.phase = Phase::Running;
            state.generation = 3;
            state.job = Some(Job::started("j1"));
        }

        let mut late = Job::started("j1");
        late.status = JobStatus::Complete;
        assert!(!shared.apply_poll(2, "j1", Ok(late)));

        let state = shared.lock();
        assert_eq!(state.phase, Phase::Running);
        assert_eq!(state.job.as_ref().unwrap().status, JobStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_arriving_after_cancel_is_not_applied() {
        let api = Arc::new(RestartDuringPoll::default());
        let controller = JobController::new(Arc::clone(&api), Duration::from_secs(2));
        assert!(api.shared.set(Arc::clone(&controller.shared)).is_ok());
        let mut events = controller.subscribe();

        let orgs = BTreeSet::from(["1".to_string()]);
        controller.start(&orgs, &["What time is service?".to_string()]).await.unwrap();
        time::sleep(Duration::from_secs(7)).await;

        assert_eq!(api.polls.load(Ordering::SeqCst), 1);
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.phase, Phase::Running);
        let job = snapshot.job.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 0);

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen, vec![LifecycleEvent::Starting, LifecycleEvent::Started { job_id: "j1".to_string() }]);
    }
}
