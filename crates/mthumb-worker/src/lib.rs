//! Thumbnail worker.
//!
//! Turns job-available triggers into finished thumbnails:
//! admission, atomic claim, fetch, orbit render, encode, upload, complete.

pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod pool;
pub mod processor;
pub mod trigger;
pub mod workspace;

pub use config::WorkerConfig;
pub use error::{Stage, WorkerError, WorkerResult};
pub use health::{HealthResponse, HealthState};
pub use logging::JobLogger;
pub use pool::{PoolPermit, Rejection, WorkerPool};
pub use processor::{AttemptOutcome, JobProcessor, PipelineDeps};
pub use trigger::JobTrigger;
pub use workspace::AttemptWorkspace;
