//! Shared data models for the thumbnail worker.
//!
//! This crate provides Serde-serializable types for:
//! - Thumbnail jobs and their lifecycle
//! - "Job available" notifications
//! - Model file formats
//! - Orbit render configuration and camera poses
//! - Rendered frames and encoding results
//! - Worker status reporting

pub mod encoding;
pub mod env;
pub mod error;
pub mod event;
pub mod format;
pub mod frame;
pub mod job;
pub mod orbit;
pub mod status;

// Re-export common types
pub use encoding::{ArtifactKind, ArtifactMeta, EncodedArtifact, EncodingConfig, EncodingResult, StoredArtifact};
pub use error::{ModelError, ModelResult};
pub use event::JobAvailable;
pub use format::ModelFormat;
pub use frame::Frame;
pub use job::{Job, JobId, JobStatus, ModelId, WorkerId};
pub use orbit::{OrbitConfig, RenderPose};
pub use status::WorkerStatus;
