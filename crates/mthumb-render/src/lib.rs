//! Orbit frame rendering for model thumbnails.
//!
//! This crate provides:
//! - A minimal in-memory scene representation
//! - Pluggable scene loaders keyed by model format
//! - The `RenderEngine` seam plus a deterministic software rasteriser
//! - `FrameSequencer`, which drives an engine across an orbit of camera poses

pub mod engine;
pub mod error;
pub mod loader;
pub mod math;
pub mod raster;
pub mod scene;
pub mod sequencer;

pub use engine::{RenderEngine, RenderSettings};
pub use error::{RenderError, RenderResult};
pub use loader::{ObjLoader, SceneLoader, SceneLoaderRegistry};
pub use raster::SoftwareRenderer;
pub use scene::{Bounds, Mesh, Scene};
pub use sequencer::FrameSequencer;
