//! Orbit frame sequencing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mthumb_models::{Frame, OrbitConfig};
use tracing::debug;

use crate::engine::RenderEngine;
use crate::error::{RenderError, RenderResult};
use crate::scene::Scene;

/// Drives a `RenderEngine` across an orbit of camera poses.
#[derive(Clone)]
pub struct FrameSequencer {
    engine: Arc<dyn RenderEngine>,
}

impl FrameSequencer {
    pub fn new(engine: Arc<dyn RenderEngine>) -> Self {
        Self { engine }
    }

    /// Render one frame per orbit pose, in increasing angle order.
    ///
    /// The configuration is validated before the engine is touched. Any
    /// failed frame fails the whole sequence; partial orbits are never
    /// returned.
    pub fn sequence(&self, scene: &Scene, config: &OrbitConfig) -> RenderResult<Vec<Frame>> {
        self.sequence_until(scene, config, &AtomicBool::new(false))
    }

    /// Like `sequence`, but checks `cancel` before every frame and stops with
    /// `RenderError::Cancelled` once it is set.
    pub fn sequence_until(
        &self,
        scene: &Scene,
        config: &OrbitConfig,
        cancel: &AtomicBool,
    ) -> RenderResult<Vec<Frame>> {
        let poses = config.poses()?;
        debug!(frames = poses.len(), "Rendering orbit sequence");

        let mut frames = Vec::with_capacity(poses.len());
        for pose in &poses {
            if cancel.load(Ordering::Acquire) {
                debug!(index = pose.index, "Orbit sequence cancelled");
                return Err(RenderError::Cancelled { index: pose.index });
            }
            let frame = self.engine.render_frame(scene, pose).map_err(|e| match e {
                RenderError::FrameFailed { .. } => e,
                other => RenderError::frame_failed(pose.index, other.to_string()),
            })?;

            if frame.index != pose.index {
                return Err(RenderError::frame_failed(
                    pose.index,
                    format!("engine returned frame tagged {}", frame.index),
                ));
            }
            if !frame.is_well_formed() {
                return Err(RenderError::frame_failed(
                    pose.index,
                    format!(
                        "engine returned {} bytes for a {}x{} frame",
                        frame.data.len(),
                        frame.width,
                        frame.height
                    ),
                ));
            }
            frames.push(frame);
        }

        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use mthumb_models::RenderPose;

    use crate::engine::RenderSettings;
    use crate::raster::SoftwareRenderer;

    /// Engine that records calls and optionally fails at one ordinal.
    struct CountingEngine {
        calls: AtomicUsize,
        fail_at: Option<u32>,
    }

    impl CountingEngine {
        fn new(fail_at: Option<u32>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_at,
            }
        }
    }

    impl RenderEngine for CountingEngine {
        fn render_frame(&self, _scene: &Scene, pose: &RenderPose) -> RenderResult<Frame> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(pose.index) {
                return Err(RenderError::frame_failed(pose.index, "boom"));
            }
            Ok(Frame::filled(pose.index, 2, 2, [pose.index as u8, 0, 0, 255]))
        }
    }

    #[test]
    fn test_sequence_preserves_order() {
        let engine = Arc::new(CountingEngine::new(None));
        let sequencer = FrameSequencer::new(engine.clone());
        let config = OrbitConfig::default().with_angles(0.0, 360.0, 15.0);

        let frames = sequencer.sequence(&Scene::unit_cube(), &config).unwrap();
        assert_eq!(frames.len(), 24);
        for (k, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index as usize, k);
            assert_eq!(frame.data[0], k as u8);
        }
        assert_eq!(engine.calls.load(Ordering::SeqCst), 24);
    }

    #[test]
    fn test_invalid_config_fails_before_rendering() {
        let engine = Arc::new(CountingEngine::new(None));
        let sequencer = FrameSequencer::new(engine.clone());

        for config in [
            OrbitConfig::default().with_angles(0.0, 360.0, 0.0),
            OrbitConfig::default().with_angles(180.0, 180.0, 15.0),
            OrbitConfig::default().with_angles(200.0, 10.0, 15.0),
        ] {
            let err = sequencer.sequence(&Scene::unit_cube(), &config).unwrap_err();
            assert!(err.is_config(), "expected config error, got {err}");
        }
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_single_failed_frame_fails_sequence() {
        let engine = Arc::new(CountingEngine::new(Some(5)));
        let sequencer = FrameSequencer::new(engine.clone());
        let config = OrbitConfig::default().with_angles(0.0, 180.0, 15.0);

        let err = sequencer.sequence(&Scene::unit_cube(), &config).unwrap_err();
        assert!(matches!(err, RenderError::FrameFailed { index: 5, .. }));
        // Stops at the failing frame.
        assert_eq!(engine.calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_cancel_stops_before_next_frame() {
        let engine = Arc::new(CountingEngine::new(None));
        let sequencer = FrameSequencer::new(engine.clone());
        let config = OrbitConfig::default().with_angles(0.0, 360.0, 15.0);

        let err = sequencer
            .sequence_until(&Scene::unit_cube(), &config, &AtomicBool::new(true))
            .unwrap_err();
        assert!(matches!(err, RenderError::Cancelled { index: 0 }));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_software_renderer_orbit() {
        let config = OrbitConfig::default()
            .with_angles(0.0, 180.0, 15.0)
            .with_size(32, 32);
        let engine = Arc::new(SoftwareRenderer::new(RenderSettings::from(&config)));
        let frames = FrameSequencer::new(engine)
            .sequence(&Scene::unit_cube(), &config)
            .unwrap();

        assert_eq!(frames.len(), 12);
        assert!(frames.iter().all(|f| f.width == 32 && f.height == 32));
    }
}
