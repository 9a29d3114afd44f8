use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::{sleep, timeout};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::schedule::Schedule;
use super::{Elapsed, RunHandle, RunSignal, RunSummary, SchedulerStatus};
use crate::config::SchedulerConfig;
use crate::constants;
use crate::errors::{RunInProgress, ScheduleError};
use crate::status::{PersistedStatus, RunRecord, StatusStore};
use crate::tasks::{TaskExecutor, TaskOutcome};

/// Releases the run flag when dropped, including during unwinding.
struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl RunGuard {
    fn claim(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy)]
struct TimerFire {
    generation: u64,
    due: DateTime<Utc>,
}

struct TimerState {
    expression: String,
    schedule: Option<Schedule>,
    started: bool,
    next_run: Option<DateTime<Utc>>,
    job_id: Option<Uuid>,
}

/// Owns the run timer and the run guard, and sequences the task executors.
pub struct UpdateScheduler {
    executors: Vec<Arc<dyn TaskExecutor>>,
    store: StatusStore,
    timezone: String,
    state: RwLock<TimerState>,
    record: RwLock<RunRecord>,
    running: Arc<AtomicBool>,
    /// Bumped whenever the timer is re-armed or cancelled; stale fires are dropped.
    generation: AtomicU64,
    engine: Mutex<Option<JobScheduler>>,
    fire_tx: mpsc::UnboundedSender<TimerFire>,
}

impl UpdateScheduler {
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &SchedulerConfig, executors: Vec<Arc<dyn TaskExecutor>>) -> Arc<Self> {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();

        let schedule = match Schedule::parse(&config.schedule, &config.timezone) {
            Ok(schedule) => Some(schedule),
            Err(e) => {
                warn!("Configured schedule is not usable yet: {}", e);
                None
            }
        };

        let scheduler = Arc::new(Self {
            executors,
            store: StatusStore::new(config.status_file.clone()),
            timezone: config.timezone.clone(),
            state: RwLock::new(TimerState {
                expression: config.schedule.clone(),
                schedule,
                started: false,
                next_run: None,
                job_id: None,
            }),
            record: RwLock::new(RunRecord::default()),
            running: Arc::new(AtomicBool::new(false)),
            generation: AtomicU64::new(0),
            engine: Mutex::new(None),
            fire_tx,
        });

        tokio::spawn(Self::drive_timer(Arc::downgrade(&scheduler), fire_rx));
        scheduler
    }

    async fn drive_timer(scheduler: Weak<Self>, mut fires: mpsc::UnboundedReceiver<TimerFire>) {
        while let Some(fire) = fires.recv().await {
            match scheduler.upgrade() {
                Some(scheduler) => scheduler.on_timer_fired(fire).await,
                None => break,
            }
        }
        debug!("Timer driver exiting");
    }

    /// Loads the persisted snapshot; the configured schedule wins over the stored one.
    #[instrument(skip(self))]
    pub async fn init(&self) {
        match self.store.load().await {
            Ok(Some(persisted)) => {
                let configured = self.state.read().await.expression.clone();
                if !persisted.schedule.is_empty() && persisted.schedule != configured {
                    info!(
                        "Persisted schedule '{}' differs from configured '{}', using configured",
                        persisted.schedule, configured
                    );
                }
                if persisted.is_running {
                    warn!(
                        "Previous process stopped during run {:?}, it will not be resumed",
                        persisted.run_id
                    );
                }
                info!(
                    "Loaded previous run status from {} (last run: {:?})",
                    self.store.path().display(),
                    persisted.last_run
                );
                *self.record.write().await = persisted.into_record();
            }
            Ok(None) => info!(
                "No previous run status at {}, starting fresh",
                self.store.path().display()
            ),
            Err(e) => warn!("Ignoring unreadable run status: {}", e),
        }
    }

    /// Validates `expression`, replaces any armed timer and returns the next fire instant.
    #[instrument(skip(self))]
    pub async fn start(&self, expression: &str) -> Result<DateTime<Utc>, ScheduleError> {
        let schedule = Schedule::parse(expression, &self.timezone)?;
        let now = Utc::now();
        let next = schedule
            .next_after(now)
            .ok_or_else(|| ScheduleError::Invalid {
                expression: expression.to_string(),
                reason: "expression never fires".to_string(),
            })?;

        {
            let mut state = self.state.write().await;
            let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            if let Some(job_id) = state.job_id.take() {
                self.remove_job(job_id).await;
            }

            state.expression = schedule.expression().to_string();
            state.schedule = Some(schedule);

            match self.arm(next, generation).await {
                Ok(job_id) => {
                    state.job_id = Some(job_id);
                    state.started = true;
                    state.next_run = Some(next);
                }
                Err(e) => {
                    state.started = false;
                    state.next_run = None;
                    error!("✗ Failed to arm timer: {}", e);
                    return Err(e);
                }
            }
        }

        info!(
            "✓ Scheduler started with '{}' ({}), next run at {}",
            expression, self.timezone, next
        );
        self.persist().await;
        Ok(next)
    }

    /// Cancels the timer. Never interrupts a run in flight.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> bool {
        {
            let mut state = self.state.write().await;
            if !state.started {
                debug!("Scheduler not started, nothing to stop");
                return false;
            }

            self.generation.fetch_add(1, Ordering::AcqRel);
            if let Some(job_id) = state.job_id.take() {
                self.remove_job(job_id).await;
            }
            state.started = false;
            state.next_run = None;
        }

        info!("Scheduler stopped");
        self.persist().await;
        true
    }

    /// Runs every task once. Returns `Skipped` if a run is already in flight.
    #[instrument(skip(self))]
    pub async fn run_updates(&self) -> RunSignal {
        let Some(guard) = RunGuard::claim(&self.running) else {
            warn!("Update run already in progress, skipping");
            return RunSignal::Skipped;
        };

        let (run_id, started_at) = self.begin_run().await;
        RunSignal::Completed(self.execute_run(guard, run_id, started_at).await)
    }

    /// Claims the run guard now and executes the run in the background.
    pub async fn trigger_run(self: &Arc<Self>) -> Result<RunHandle, RunInProgress> {
        let Some(guard) = RunGuard::claim(&self.running) else {
            let record = self.record.read().await;
            return Err(RunInProgress {
                run_id: record.run_id,
                started_at: record.last_run_started_at,
            });
        };

        let (run_id, started_at) = self.begin_run().await;
        info!("Manual run {} triggered", run_id);

        let scheduler = self.clone();
        let join =
            tokio::spawn(async move { scheduler.execute_run(guard, run_id, started_at).await });

        Ok(RunHandle {
            run_id,
            started_at,
            join,
        })
    }

    pub async fn get_next_run_time(&self) -> Option<DateTime<Utc>> {
        let state = self.state.read().await;
        if state.started {
            state.next_run
        } else {
            None
        }
    }

    pub async fn schedule_expression(&self) -> String {
        self.state.read().await.expression.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn last_record(&self) -> RunRecord {
        let mut record = self.record.read().await.clone();
        record.is_running = self.is_running();
        record
    }

    pub async fn status(&self) -> SchedulerStatus {
        let now = Utc::now();
        let (expression, active, next_run) = {
            let state = self.state.read().await;
            (state.expression.clone(), state.started, state.next_run)
        };
        let record = self.last_record().await;

        SchedulerStatus {
            schedule: expression,
            timezone: self.timezone.clone(),
            active,
            is_running: record.is_running,
            run_id: record.run_id,
            last_run: record.last_run_started_at,
            last_run_finished_at: record.last_run_finished_at,
            time_until_next_run: next_run.map(|next| Elapsed::between(now, next)),
            time_since_last_run: record
                .last_run_started_at
                .map(|last| Elapsed::between(last, now)),
            next_run,
            last_status: record.per_task,
        }
    }

    /// Stops the timer engine and waits for an in-flight run.
    pub async fn shutdown(&self) {
        self.shutdown_with_grace(Duration::from_secs(constants::scheduler::SHUTDOWN_GRACE_SECONDS))
            .await
    }

    pub async fn shutdown_with_grace(&self, grace: Duration) {
        self.stop().await;

        if let Some(mut engine) = self.engine.lock().await.take() {
            if let Err(e) = engine.shutdown().await {
                warn!("Timer engine did not shut down cleanly: {}", e);
            }
        }

        if self.is_running() {
            info!("Waiting up to {:?} for the current run to finish", grace);
            let finished = timeout(grace, async {
                while self.is_running() {
                    sleep(Duration::from_millis(100)).await;
                }
            })
            .await;
            if finished.is_err() {
                warn!("Run still in progress after {:?}, shutting down anyway", grace);
            }
        }

        info!("Scheduler shut down");
    }

    async fn begin_run(&self) -> (Uuid, DateTime<Utc>) {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        {
            let mut record = self.record.write().await;
            record.run_id = Some(run_id);
            record.last_run_started_at = Some(started_at);
            record.last_run_finished_at = None;
            record.per_task.clear();
            record.is_running = true;
        }

        info!("🚀 Starting update run {}", run_id);
        self.persist().await;
        (run_id, started_at)
    }

    async fn execute_run(
        &self,
        guard: RunGuard,
        run_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> RunSummary {
        let mut outcomes = BTreeMap::new();
        let (mut succeeded, mut failed) = (0, 0);

        for executor in &self.executors {
            let name = executor.name();
            info!("Running task {}", name);

            let outcome = match AssertUnwindSafe(executor.run()).catch_unwind().await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    error!("✗ Task {} failed: {:#}", name, e);
                    TaskOutcome::failed(format!("{:#}", e))
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!("✗ Task {} panicked: {}", name, message);
                    TaskOutcome::failed(format!("task panicked: {}", message))
                }
            };

            if outcome.success {
                succeeded += 1;
                info!("✓ Task {} succeeded", name);
            } else {
                failed += 1;
                warn!("✗ Task {} reported failure", name);
            }

            self.record
                .write()
                .await
                .per_task
                .insert(name.to_string(), outcome.clone());
            outcomes.insert(name.to_string(), outcome);
        }

        let finished_at = Utc::now();
        self.refresh_next_run(finished_at).await;
        {
            let mut record = self.record.write().await;
            record.last_run_finished_at = Some(finished_at);
            record.is_running = false;
        }
        self.persist().await;
        drop(guard);

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at,
            succeeded,
            failed,
            outcomes,
        };
        info!("Update run {} finished: {}", run_id, summary.message());
        summary
    }

    /// Keeps the armed instant while it is still ahead.
    async fn refresh_next_run(&self, after: DateTime<Utc>) {
        let mut state = self.state.write().await;
        if !state.started {
            return;
        }
        let recomputed = state.schedule.as_ref().and_then(|s| s.next_after(after));
        state.next_run = match state.next_run {
            Some(armed) if armed > after => Some(armed),
            _ => recomputed,
        };
    }

    async fn on_timer_fired(&self, fire: TimerFire) {
        if fire.generation != self.generation.load(Ordering::Acquire) {
            debug!("Ignoring stale timer fire for {}", fire.due);
            return;
        }

        info!("⏰ Scheduled run due at {} firing", fire.due);
        if let RunSignal::Skipped = self.run_updates().await {
            info!("Scheduled run skipped, previous run still in progress");
        }

        let mut state = self.state.write().await;
        if !state.started || fire.generation != self.generation.load(Ordering::Acquire) {
            return;
        }

        let after = Utc::now().max(fire.due);
        let Some(next) = state.schedule.as_ref().and_then(|s| s.next_after(after)) else {
            warn!("Schedule has no further fire times, timer not re-armed");
            state.started = false;
            state.next_run = None;
            return;
        };

        match self.arm(next, fire.generation).await {
            Ok(job_id) => {
                state.job_id = Some(job_id);
                state.next_run = Some(next);
                debug!("Timer re-armed for {}", next);
            }
            Err(e) => {
                error!("✗ Failed to re-arm timer: {}", e);
                state.started = false;
                state.next_run = None;
            }
        }
        drop(state);
        self.persist().await;
    }

    async fn arm(&self, due: DateTime<Utc>, generation: u64) -> Result<Uuid, ScheduleError> {
        let engine = self.engine().await?;
        let delay = (due - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let fire = TimerFire { generation, due };
        let fire_tx = self.fire_tx.clone();

        let job = Job::new_one_shot_async(delay, move |_uuid, _scheduler| {
            let fire_tx = fire_tx.clone();
            Box::pin(async move {
                if fire_tx.send(fire).is_err() {
                    debug!("Scheduler dropped before timer fired");
                }
            })
        })
        .map_err(|e| ScheduleError::TimerUnavailable {
            reason: format!("failed to create job: {}", e),
        })?;

        engine
            .add(job)
            .await
            .map_err(|e| ScheduleError::TimerUnavailable {
                reason: format!("failed to add job: {}", e),
            })
    }

    async fn remove_job(&self, job_id: Uuid) {
        let engine = self.engine.lock().await.clone();
        if let Some(engine) = engine {
            if let Err(e) = engine.remove(&job_id).await {
                debug!("Timer job {} already gone: {}", job_id, e);
            }
        }
    }

    async fn engine(&self) -> Result<JobScheduler, ScheduleError> {
        let mut engine = self.engine.lock().await;
        if let Some(existing) = engine.as_ref() {
            return Ok(existing.clone());
        }

        let created = JobScheduler::new()
            .await
            .map_err(|e| ScheduleError::TimerUnavailable {
                reason: format!("failed to create JobScheduler: {}", e),
            })?;
        created
            .start()
            .await
            .map_err(|e| ScheduleError::TimerUnavailable {
                reason: format!("failed to start JobScheduler: {}", e),
            })?;

        *engine = Some(created.clone());
        Ok(created)
    }

    async fn persist(&self) {
        let snapshot = {
            let state = self.state.read().await;
            let record = self.record.read().await;
            PersistedStatus::new(
                &state.expression,
                &self.timezone,
                &record,
                if state.started { state.next_run } else { None },
            )
        };

        if let Err(e) = self.store.save(&snapshot).await {
            error!("Failed to persist run status: {}", e);
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
