//! Job store: claim, complete, fail, and artifact upload.

use async_trait::async_trait;
use mthumb_models::{ArtifactMeta, EncodedArtifact, Job, JobId, ModelId, StoredArtifact, WorkerId};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::http::BackendClient;

/// The authoritative job queue.
///
/// `claim_next` must be atomic across workers: of N concurrent callers racing
/// for one Pending job, exactly one receives it and the rest get `None`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Claim the next Pending job for `worker_id`, or `None` if nothing is available.
    async fn claim_next(&self, worker_id: &WorkerId) -> ClientResult<Option<Job>>;

    /// Mark a claimed job Completed. Idempotent for repeated calls.
    async fn complete(&self, job_id: JobId, meta: &ArtifactMeta) -> ClientResult<()>;

    /// Mark a claimed job Failed. The backend owns retry policy.
    async fn fail(&self, job_id: JobId, message: &str) -> ClientResult<()>;

    /// Upload one encoded artifact for `model_id`.
    async fn upload_artifact(
        &self,
        model_id: ModelId,
        artifact: &EncodedArtifact,
    ) -> ClientResult<StoredArtifact>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRequest<'a> {
    worker_id: &'a WorkerId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailRequest<'a> {
    error_message: &'a str,
}

/// `JobStore` over the backend REST API.
#[derive(Clone)]
pub struct HttpJobStore {
    client: BackendClient,
}

impl HttpJobStore {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobStore for HttpJobStore {
    async fn claim_next(&self, worker_id: &WorkerId) -> ClientResult<Option<Job>> {
        let timeout = self.client.config().read_timeout;
        self.client
            .execute("claim_next", async {
                let response = self
                    .client
                    .request(Method::POST, "/thumbnail-jobs/dequeue", timeout)
                    .json(&ClaimRequest { worker_id })
                    .send()
                    .await?;

                match response.status() {
                    StatusCode::OK => {
                        let job: Job = response.json().await?;
                        debug!(job_id = %job.id, model_id = %job.model_id, "Claimed job");
                        Ok(Some(job))
                    }
                    StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
                    _ => Err(BackendClient::error_response(response).await),
                }
            })
            .await
    }

    async fn complete(&self, job_id: JobId, meta: &ArtifactMeta) -> ClientResult<()> {
        let timeout = self.client.config().read_timeout;
        let path = format!("/thumbnail-jobs/{}/complete", job_id);
        self.client
            .execute("complete", async {
                let response = self
                    .client
                    .request(Method::POST, &path, timeout)
                    .json(meta)
                    .send()
                    .await?;

                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(BackendClient::error_response(response).await)
                }
            })
            .await
    }

    async fn fail(&self, job_id: JobId, message: &str) -> ClientResult<()> {
        let timeout = self.client.config().read_timeout;
        let path = format!("/thumbnail-jobs/{}/fail", job_id);
        self.client
            .execute("fail", async {
                let response = self
                    .client
                    .request(Method::POST, &path, timeout)
                    .json(&FailRequest {
                        error_message: message,
                    })
                    .send()
                    .await?;

                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(BackendClient::error_response(response).await)
                }
            })
            .await
    }

    async fn upload_artifact(
        &self,
        model_id: ModelId,
        artifact: &EncodedArtifact,
    ) -> ClientResult<StoredArtifact> {
        let file_name = artifact.kind.file_name();
        let bytes = tokio::fs::read(&artifact.path).await?;
        if bytes.is_empty() {
            return Err(ClientError::EmptyUpload(file_name.to_string()));
        }

        let timeout = self.client.config().upload_timeout;
        let path = format!("/models/{}/thumbnail/upload", model_id);
        let size = bytes.len();

        self.client
            .execute("upload_artifact", async {
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(artifact.kind.content_type())?;
                let form = Form::new()
                    .part("file", part)
                    .text("kind", artifact.kind.as_str())
                    .text("width", artifact.width.to_string())
                    .text("height", artifact.height.to_string());

                let response = self
                    .client
                    .request(Method::POST, &path, timeout)
                    .multipart(form)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(BackendClient::error_response(response).await);
                }

                let stored: StoredArtifact = response.json().await?;
                info!(
                    model_id = %model_id,
                    kind = artifact.kind.as_str(),
                    bytes = size,
                    stored_path = %stored.stored_path,
                    "Uploaded artifact"
                );
                Ok(stored)
            })
            .await
    }
}
