//! In-memory doubles for the pipeline collaborators.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mthumb_client::{ClientError, ClientResult, FetchedModel, JobStore, ModelFetcher};
use mthumb_media::{validate_sequence, Encoder, MediaResult};
use mthumb_models::{
    ArtifactKind, ArtifactMeta, EncodedArtifact, EncodingConfig, EncodingResult, Frame, Job,
    JobId, JobStatus, ModelFormat, ModelId, OrbitConfig, RenderPose, StoredArtifact, WorkerId,
};
use mthumb_render::{RenderEngine, RenderError, RenderResult, Scene, SceneLoaderRegistry};
use mthumb_worker::{JobProcessor, PipelineDeps, WorkerConfig, WorkerPool};
use tokio::sync::Semaphore;

pub const CUBE_OBJ: &str = "\
v -0.5 -0.5 -0.5
v 0.5 -0.5 -0.5
v 0.5 0.5 -0.5
v -0.5 0.5 -0.5
v -0.5 -0.5 0.5
v 0.5 -0.5 0.5
v 0.5 0.5 0.5
v -0.5 0.5 0.5
f 1 3 2
f 1 4 3
f 5 6 7
f 5 7 8
f 1 2 6
f 1 6 5
f 4 7 3
f 4 8 7
";

/// Job store with an atomic pop-front claim.
#[derive(Default)]
pub struct FakeJobStore {
    pending: Mutex<VecDeque<Job>>,
    pub claim_calls: AtomicUsize,
    pub claimed: Mutex<Vec<(JobId, WorkerId)>>,
    pub completed: Mutex<Vec<(JobId, ArtifactMeta)>>,
    pub failed: Mutex<Vec<(JobId, String)>>,
    pub uploads: Mutex<Vec<(ModelId, ArtifactKind, Vec<u8>)>>,
    pub fail_uploads: bool,
    pub fail_complete: bool,
}

impl FakeJobStore {
    pub fn with_jobs(count: i64) -> Self {
        let store = Self::default();
        {
            let mut pending = store.pending.lock().unwrap();
            for id in 1..=count {
                pending.push_back(Job::pending(JobId(id), ModelId(id * 10), format!("hash-{id}")));
            }
        }
        store
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn failing_complete(mut self) -> Self {
        self.fail_complete = true;
        self
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn fail_messages(&self) -> Vec<String> {
        self.failed.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.lock().unwrap().len()
    }
}

#[async_trait]
impl JobStore for FakeJobStore {
    async fn claim_next(&self, worker_id: &WorkerId) -> ClientResult<Option<Job>> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.pending.lock().unwrap().pop_front();
        Ok(next.map(|mut job| {
            job.status = JobStatus::InProgress;
            job.attempt_count += 1;
            job.assigned_worker_id = Some(worker_id.clone());
            self.claimed
                .lock()
                .unwrap()
                .push((job.id, worker_id.clone()));
            job
        }))
    }

    async fn complete(&self, job_id: JobId, meta: &ArtifactMeta) -> ClientResult<()> {
        if self.fail_complete {
            return Err(ClientError::ServerError(500, "complete rejected".into()));
        }
        self.completed.lock().unwrap().push((job_id, meta.clone()));
        Ok(())
    }

    async fn fail(&self, job_id: JobId, message: &str) -> ClientResult<()> {
        self.failed.lock().unwrap().push((job_id, message.to_string()));
        Ok(())
    }

    async fn upload_artifact(
        &self,
        model_id: ModelId,
        artifact: &EncodedArtifact,
    ) -> ClientResult<StoredArtifact> {
        if self.fail_uploads {
            return Err(ClientError::ServerError(503, "storage unavailable".into()));
        }
        let bytes = tokio::fs::read(&artifact.path).await?;
        let size_bytes = bytes.len() as u64;
        self.uploads
            .lock()
            .unwrap()
            .push((model_id, artifact.kind, bytes));
        Ok(StoredArtifact {
            stored_path: format!("thumbnails/{}/{}", model_id, artifact.kind.file_name()),
            size_bytes,
        })
    }
}

/// Fetcher that writes a cube OBJ and tracks every acquire/release.
#[derive(Default)]
pub struct TrackingFetcher {
    pub fetched: Mutex<Vec<PathBuf>>,
    pub released: Mutex<Vec<PathBuf>>,
    pub fail: bool,
    /// Fetches wait here for a permit when set.
    pub gate: Option<Arc<Semaphore>>,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl TrackingFetcher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Every fetched model has been released.
    pub fn all_released(&self) -> bool {
        let mut fetched = self.fetched.lock().unwrap().clone();
        let mut released = self.released.lock().unwrap().clone();
        fetched.sort();
        released.sort();
        fetched == released
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelFetcher for TrackingFetcher {
    async fn fetch(&self, model_id: ModelId, dest_dir: &Path) -> ClientResult<FetchedModel> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate closed");
        }

        let result = if self.fail {
            Err(ClientError::NotFound(format!("model {model_id}")))
        } else {
            let path = dest_dir.join("model.obj");
            match tokio::fs::write(&path, CUBE_OBJ).await {
                Ok(()) => {
                    self.fetched.lock().unwrap().push(path.clone());
                    Ok(FetchedModel {
                        model_id,
                        path,
                        original_file_name: "cube.obj".to_string(),
                        format: ModelFormat::Obj,
                        size_bytes: CUBE_OBJ.len() as u64,
                    })
                }
                Err(e) => Err(ClientError::Io(e)),
            }
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn release(&self, model: FetchedModel) {
        let _ = tokio::fs::remove_file(&model.path).await;
        self.released.lock().unwrap().push(model.path);
    }
}

/// Engine that tags each pixel with the pose index and angle, and counts calls.
#[derive(Default)]
pub struct TaggingEngine {
    pub calls: AtomicUsize,
    pub fail_at: Option<u32>,
    /// Blocking delay per frame
    pub frame_delay: Option<Duration>,
}

impl TaggingEngine {
    pub fn slow(frame_delay: Duration) -> Self {
        Self {
            frame_delay: Some(frame_delay),
            ..Self::default()
        }
    }

    pub fn failing_at(index: u32) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RenderEngine for TaggingEngine {
    fn render_frame(&self, _scene: &Scene, pose: &RenderPose) -> RenderResult<Frame> {
        if let Some(delay) = self.frame_delay {
            std::thread::sleep(delay);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(pose.index) {
            return Err(RenderError::frame_failed(pose.index, "injected failure"));
        }
        let angle_tag = (pose.angle / 15.0).round() as u8;
        Ok(Frame::filled(pose.index, 4, 4, [pose.index as u8, angle_tag, 0, 255]))
    }
}

/// Encoder that records the sequence it was given and writes small files.
#[derive(Default)]
pub struct RecordingEncoder {
    /// Pixel tags of each encoded frame, in order
    pub sequences: Mutex<Vec<Vec<[u8; 4]>>>,
    pub poster_tag: Mutex<Option<[u8; 4]>>,
    /// Drop every frame before encoding, as a broken renderer hand-off would.
    pub drop_frames: bool,
}

impl RecordingEncoder {
    pub fn dropping_frames() -> Self {
        Self {
            drop_frames: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.sequences.lock().unwrap().len()
    }
}

#[async_trait]
impl Encoder for RecordingEncoder {
    async fn encode(
        &self,
        frames: &[Frame],
        _config: &EncodingConfig,
        out_dir: &Path,
    ) -> MediaResult<EncodingResult> {
        let frames = if self.drop_frames { &frames[..0] } else { frames };
        let (width, height) = validate_sequence(frames)?;

        let tags: Vec<[u8; 4]> = frames.iter().filter_map(|f| f.pixel(0, 0)).collect();
        let poster_tag = frames[0].pixel(0, 0);
        self.sequences.lock().unwrap().push(tags.clone());
        *self.poster_tag.lock().unwrap() = poster_tag;

        let animated_path = out_dir.join(ArtifactKind::Animated.file_name());
        let animated_bytes: Vec<u8> = tags.iter().flat_map(|t| t.iter().copied()).collect();
        tokio::fs::write(&animated_path, &animated_bytes).await?;

        let poster_path = out_dir.join(ArtifactKind::Poster.file_name());
        tokio::fs::write(&poster_path, &frames[0].data).await?;

        Ok(EncodingResult {
            animated: EncodedArtifact {
                kind: ArtifactKind::Animated,
                path: animated_path,
                size_bytes: animated_bytes.len() as u64,
                width,
                height,
            },
            poster: EncodedArtifact {
                kind: ArtifactKind::Poster,
                path: poster_path,
                size_bytes: frames[0].data.len() as u64,
                width,
                height,
            },
            frame_count: frames.len(),
        })
    }
}

/// Everything one test needs to inspect after running attempts.
pub struct Harness {
    pub store: Arc<FakeJobStore>,
    pub fetcher: Arc<TrackingFetcher>,
    pub engine: Arc<TaggingEngine>,
    pub encoder: Arc<RecordingEncoder>,
    pub work_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new(
        store: FakeJobStore,
        fetcher: TrackingFetcher,
        engine: TaggingEngine,
        encoder: RecordingEncoder,
    ) -> Self {
        Self {
            store: Arc::new(store),
            fetcher: Arc::new(fetcher),
            engine: Arc::new(engine),
            encoder: Arc::new(encoder),
            work_dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn with_jobs(count: i64) -> Self {
        Self::new(
            FakeJobStore::with_jobs(count),
            TrackingFetcher::default(),
            TaggingEngine::default(),
            RecordingEncoder::default(),
        )
    }

    pub fn deps(&self) -> PipelineDeps {
        PipelineDeps {
            job_store: self.store.clone(),
            fetcher: self.fetcher.clone(),
            loaders: Arc::new(SceneLoaderRegistry::with_defaults()),
            engine: self.engine.clone(),
            encoder: self.encoder.clone(),
        }
    }

    pub fn config(&self, max_jobs: usize) -> WorkerConfig {
        WorkerConfig::default()
            .with_max_concurrent_jobs(max_jobs)
            .with_work_dir(self.work_dir.path())
            .with_orbit(OrbitConfig::default().with_angles(0.0, 360.0, 15.0))
    }

    pub fn processor(&self, max_jobs: usize) -> Arc<JobProcessor> {
        self.processor_with(self.config(max_jobs))
    }

    pub fn processor_with(&self, config: WorkerConfig) -> Arc<JobProcessor> {
        let pool = Arc::new(WorkerPool::new(config.max_concurrent_jobs));
        Arc::new(JobProcessor::new(config, pool, self.deps()).unwrap())
    }

    /// No attempt workspace is left behind.
    pub fn work_dir_is_empty(&self) -> bool {
        std::fs::read_dir(self.work_dir.path()).unwrap().next().is_none()
    }

    /// Every temporary resource of every attempt has been released.
    pub fn all_resources_released(&self) -> bool {
        self.work_dir_is_empty() && self.fetcher.all_released()
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
