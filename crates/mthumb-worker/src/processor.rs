//! Job processor: triggers, admission, claim, and the per-job pipeline.
//!
//! One code path turns a trigger into work: `try_attempt` admits, claims,
//! then runs Fetch -> Render -> Encode -> Upload -> Complete. Notifications
//! and the polling ticker both feed it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mthumb_client::{ClientError, FetchedModel, JobStore, ModelFetcher};
use mthumb_media::Encoder;
use mthumb_models::{ArtifactMeta, EncodingResult, Frame, Job, JobId, WorkerStatus};
use mthumb_queue::NotificationChannel;
use mthumb_render::{FrameSequencer, RenderEngine, SceneLoaderRegistry};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn, Instrument};

use crate::config::WorkerConfig;
use crate::error::{Stage, WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics::{
    record_admission_rejected, record_claim_lost, record_claimed, record_completed,
    record_failed, record_stage_duration, record_trigger,
};
use crate::pool::{Rejection, WorkerPool};
use crate::trigger::JobTrigger;
use crate::workspace::AttemptWorkspace;

/// Collaborators of the pipeline, each behind a trait.
#[derive(Clone)]
pub struct PipelineDeps {
    pub job_store: Arc<dyn JobStore>,
    pub fetcher: Arc<dyn ModelFetcher>,
    pub loaders: Arc<SceneLoaderRegistry>,
    pub engine: Arc<dyn RenderEngine>,
    pub encoder: Arc<dyn Encoder>,
}

/// How one attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// No slot was reserved; nothing was claimed
    Rejected(Rejection),
    /// The claim returned no job: another worker won, or nothing is Pending
    ClaimLost,
    /// The claim call itself failed
    ClaimFailed,
    Completed(JobId),
    /// The job was reported Failed
    Failed { job_id: JobId, stage: Stage },
}

/// The worker's orchestration core.
pub struct JobProcessor {
    config: Arc<WorkerConfig>,
    pool: Arc<WorkerPool>,
    deps: PipelineDeps,
    notifications: Option<Arc<dyn NotificationChannel>>,
    notification_buffer: usize,
    shutdown_tx: watch::Sender<bool>,
}

impl JobProcessor {
    /// Build a processor. Configuration errors surface here, before any job
    /// is claimed.
    pub fn new(
        config: WorkerConfig,
        pool: Arc<WorkerPool>,
        deps: PipelineDeps,
    ) -> WorkerResult<Self> {
        config.validate()?;
        if pool.capacity() != config.max_concurrent_jobs {
            return Err(WorkerError::config_error(format!(
                "pool capacity {} does not match max_concurrent_jobs {}",
                pool.capacity(),
                config.max_concurrent_jobs
            )));
        }

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            config: Arc::new(config),
            pool,
            deps,
            notifications: None,
            notification_buffer: 1,
            shutdown_tx,
        })
    }

    /// Listen on `channel` in addition to polling. Events arriving while
    /// `buffer` events are already waiting are dropped.
    pub fn with_notifications(
        mut self,
        channel: Arc<dyn NotificationChannel>,
        buffer: usize,
    ) -> Self {
        self.notifications = Some(channel);
        self.notification_buffer = buffer.max(1);
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            worker_id: self.config.worker_id.clone(),
            active_jobs: self.pool.active(),
            max_concurrent_jobs: self.pool.capacity(),
            shutting_down: self.pool.is_shutting_down(),
            notification_connected: self
                .notifications
                .as_ref()
                .is_some_and(|channel| channel.is_connected()),
        }
    }

    /// Start the notification listener and the polling ticker.
    ///
    /// The returned handle resolves once `shutdown` has been called and the
    /// trigger loop has stopped.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_triggers().await })
    }

    async fn run_triggers(self: Arc<Self>) {
        let mut shutdown = self.shutdown_tx.subscribe();
        let (event_tx, mut events) = mpsc::channel(self.notification_buffer);

        let listener = self.notifications.clone().map(|channel| {
            let shutdown = self.shutdown_tx.subscribe();
            tokio::spawn(async move { channel.run(event_tx, shutdown).await })
        });

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            worker_id = %self.config.worker_id,
            max_concurrent_jobs = self.pool.capacity(),
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            notifications = listener.is_some(),
            "Worker started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(event) = events.recv() => self.dispatch(JobTrigger::Notification(event)),
                _ = ticker.tick() => self.dispatch(JobTrigger::Poll),
            }
        }

        if let Some(listener) = listener {
            if let Err(e) = listener.await {
                warn!(error = %e, "Notification listener ended abnormally");
            }
        }
        info!(worker_id = %self.config.worker_id, "Trigger loop stopped");
    }

    fn dispatch(self: &Arc<Self>, trigger: JobTrigger) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.try_attempt(trigger).await;
        });
    }

    /// Admit, claim, and run one job attempt.
    ///
    /// Never returns an error: per-job failures are reported to the job store
    /// and folded into the outcome.
    pub async fn try_attempt(&self, trigger: JobTrigger) -> AttemptOutcome {
        record_trigger(trigger.as_str());

        let permit = match self.pool.try_admit() {
            Ok(permit) => permit,
            Err(reason) => {
                record_admission_rejected();
                debug!(trigger = %trigger, reason = reason.as_str(), "Attempt not admitted");
                return AttemptOutcome::Rejected(reason);
            }
        };

        let job = match self.deps.job_store.claim_next(&self.config.worker_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                record_claim_lost();
                debug!(trigger = %trigger, "No job claimed");
                return AttemptOutcome::ClaimLost;
            }
            Err(e) => {
                warn!(
                    trigger = %trigger,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Claim request failed"
                );
                return AttemptOutcome::ClaimFailed;
            }
        };
        record_claimed();

        let logger = JobLogger::new(&job, "thumbnail");
        let outcome = self.process(&job, &logger).instrument(logger.create_span()).await;
        drop(permit);
        outcome
    }

    async fn process(&self, job: &Job, logger: &JobLogger) -> AttemptOutcome {
        logger.log_start(&format!(
            "attempt {} on {}",
            job.attempt_count, self.config.worker_id
        ));

        match self.execute(job, logger).await {
            Ok(meta) => {
                record_completed();
                logger.log_completion(&format!(
                    "{} frames, {} bytes at {}",
                    meta.frame_count, meta.size_bytes, meta.thumbnail_path
                ));
                AttemptOutcome::Completed(job.id)
            }
            Err(e) => {
                let stage = e.stage().unwrap_or(Stage::Setup);
                record_failed(stage);
                if e.needs_reconciliation() {
                    logger.log_warning(
                        "artifacts were uploaded but completion was not recorded; backend must reconcile",
                    );
                }
                logger.log_error(&e.to_string());
                self.report_failure(job, &e).await;
                AttemptOutcome::Failed {
                    job_id: job.id,
                    stage,
                }
            }
        }
    }

    /// The single `fail` call for an attempt. Not retried.
    async fn report_failure(&self, job: &Job, err: &WorkerError) {
        if let Err(e) = self
            .deps
            .job_store
            .fail(job.id, &err.failure_message())
            .await
        {
            error!(
                job_id = %job.id,
                error = %e,
                "Failed to report job failure; job stays InProgress until the backend reclaims it"
            );
        }
    }

    async fn execute(&self, job: &Job, logger: &JobLogger) -> WorkerResult<ArtifactMeta> {
        let workspace = AttemptWorkspace::create(&self.config.work_dir, job.id)
            .await
            .map_err(WorkerError::Workspace)?;

        let result = self.run_stages(job, &workspace, logger).await;
        workspace.close().await;
        result
    }

    async fn run_stages(
        &self,
        job: &Job,
        workspace: &AttemptWorkspace,
        logger: &JobLogger,
    ) -> WorkerResult<ArtifactMeta> {
        let model = timed(
            Stage::Fetch,
            logger,
            self.deps.fetcher.fetch(job.model_id, &workspace.model_dir()),
        )
        .await
        .map_err(WorkerError::Fetch)?;
        debug!(
            file = %model.original_file_name,
            format = %model.format,
            bytes = model.size_bytes,
            "Model fetched"
        );

        // The model file is only needed to build the scene.
        let frames = timed(Stage::Render, logger, self.render(&model)).await;
        self.deps.fetcher.release(model).await;
        let frames = frames?;

        let encoded = timed(Stage::Encode, logger, self.encode(&frames, workspace)).await?;
        drop(frames);

        let meta = timed(Stage::Upload, logger, async {
            let animated = self
                .deps
                .job_store
                .upload_artifact(job.model_id, &encoded.animated)
                .await?;
            let poster = self
                .deps
                .job_store
                .upload_artifact(job.model_id, &encoded.poster)
                .await?;
            Ok::<_, ClientError>(ArtifactMeta::from_upload(&encoded, &animated, &poster))
        })
        .await
        .map_err(WorkerError::Upload)?;

        timed(
            Stage::Complete,
            logger,
            self.deps.job_store.complete(job.id, &meta),
        )
        .await
        .map_err(WorkerError::Complete)?;

        Ok(meta)
    }

    /// Load and render on the blocking pool.
    ///
    /// On timeout the render thread is told to stop and joined before this
    /// returns, so it never outlives the attempt's pool slot or the model file.
    async fn render(&self, model: &FetchedModel) -> WorkerResult<Vec<Frame>> {
        let loaders = Arc::clone(&self.deps.loaders);
        let sequencer = FrameSequencer::new(Arc::clone(&self.deps.engine));
        let orbit = self.config.orbit.clone();
        let path = model.path.clone();
        let format = model.format;
        let cancel = Arc::new(AtomicBool::new(false));

        let mut task = tokio::task::spawn_blocking({
            let cancel = Arc::clone(&cancel);
            move || {
                let scene = loaders.load(&path, format)?;
                sequencer.sequence_until(&scene, &orbit, &cancel)
            }
        });

        match tokio::time::timeout(self.config.stage_timeout, &mut task).await {
            Ok(Ok(result)) => result.map_err(WorkerError::Render),
            Ok(Err(e)) => Err(WorkerError::aborted(Stage::Render, e.to_string())),
            Err(_) => {
                cancel.store(true, Ordering::Release);
                if let Err(e) = task.await {
                    warn!(error = %e, "Render task ended abnormally after cancel");
                }
                Err(self.stage_timeout(Stage::Render))
            }
        }
    }

    async fn encode(
        &self,
        frames: &[Frame],
        workspace: &AttemptWorkspace,
    ) -> WorkerResult<EncodingResult> {
        let output_dir = workspace.output_dir();
        let encode = self
            .deps
            .encoder
            .encode(frames, &self.config.encoding, &output_dir);

        match tokio::time::timeout(self.config.stage_timeout, encode).await {
            Ok(result) => result.map_err(WorkerError::Encoding),
            Err(_) => Err(self.stage_timeout(Stage::Encode)),
        }
    }

    fn stage_timeout(&self, stage: Stage) -> WorkerError {
        WorkerError::Timeout {
            stage,
            secs: self.config.stage_timeout.as_secs(),
        }
    }

    /// Stop admitting, stop the triggers, and wait up to `timeout` for
    /// in-flight pipelines.
    ///
    /// Returns `true` if every pipeline finished in time. Otherwise the
    /// remaining jobs stay InProgress in the backend.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        info!(
            worker_id = %self.config.worker_id,
            active = self.pool.active(),
            timeout_secs = timeout.as_secs(),
            "Shutting down worker"
        );
        self.pool.begin_shutdown();
        self.shutdown_tx.send_replace(true);

        let drained = self.pool.drain(timeout).await;
        if drained {
            info!("All in-flight jobs finished");
        } else {
            warn!(
                active = self.pool.active(),
                "Shutdown grace period elapsed; in-flight jobs may be left InProgress"
            );
        }
        drained
    }
}

async fn timed<T, E, F>(stage: Stage, logger: &JobLogger, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    logger.log_progress(stage.as_str());
    let start = Instant::now();
    let result = fut.await;
    record_stage_duration(stage, start.elapsed().as_secs_f64());
    result
}
