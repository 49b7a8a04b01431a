//! The render engine seam.

use mthumb_models::{Frame, OrbitConfig, RenderPose};

use crate::error::RenderResult;
use crate::scene::Scene;

/// Output settings shared by every frame of an orbit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub background: [u8; 4],
    /// Vertical field of view in degrees
    pub fov_degrees: f64,
}

impl From<&OrbitConfig> for RenderSettings {
    fn from(config: &OrbitConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            background: config.background,
            fov_degrees: 40.0,
        }
    }
}

/// Renders one still frame of a scene from a camera pose.
///
/// Implementations must be a pure function of `(scene, pose)` with respect to
/// pixel output: nothing rendered for frame N may influence frame N+1. The
/// returned frame carries `pose.index` as its ordinal.
pub trait RenderEngine: Send + Sync {
    fn render_frame(&self, scene: &Scene, pose: &RenderPose) -> RenderResult<Frame>;
}
