//! Backend REST client.
//!
//! Production-grade client with:
//! - Atomic job claiming, completion and failure reporting
//! - Streaming model downloads into a scoped directory
//! - Multipart artifact uploads
//! - Per-call timeouts, bearer auth and request metrics

pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod job_store;
pub mod metrics;

pub use config::BackendConfig;
pub use error::{ClientError, ClientResult};
pub use fetcher::{FetchedModel, HttpModelFetcher, ModelFetcher};
pub use http::BackendClient;
pub use job_store::{HttpJobStore, JobStore};
