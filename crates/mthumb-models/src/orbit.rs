//! Orbit render configuration and camera poses.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::env::env_parse;
use crate::error::{ModelError, ModelResult};

/// Upper bound on frames in one orbit; anything above is a configuration mistake.
pub const MAX_ORBIT_FRAMES: usize = 3600;

pub const DEFAULT_START_ANGLE: f64 = 0.0;
pub const DEFAULT_END_ANGLE: f64 = 360.0;
pub const DEFAULT_ANGLE_STEP: f64 = 15.0;
pub const DEFAULT_DISTANCE: f64 = 3.0;
pub const DEFAULT_HEIGHT_OFFSET: f64 = 0.5;
pub const DEFAULT_FRAME_SIZE: u32 = 256;

/// Orbit render configuration.
///
/// `distance` and `height_offset` are expressed in multiples of the model's
/// bounding radius, so the same config frames any model size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrbitConfig {
    /// First orbit angle in degrees (inclusive)
    pub start_angle: f64,
    /// Last orbit angle in degrees (exclusive)
    pub end_angle: f64,
    /// Angle increment between frames in degrees
    pub angle_step: f64,
    /// Camera distance from the model centre
    pub distance: f64,
    /// Camera height above the model centre
    pub height_offset: f64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Background colour (RGBA)
    pub background: [u8; 4],
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            start_angle: DEFAULT_START_ANGLE,
            end_angle: DEFAULT_END_ANGLE,
            angle_step: DEFAULT_ANGLE_STEP,
            distance: DEFAULT_DISTANCE,
            height_offset: DEFAULT_HEIGHT_OFFSET,
            width: DEFAULT_FRAME_SIZE,
            height: DEFAULT_FRAME_SIZE,
            background: [245, 245, 245, 255],
        }
    }
}

impl OrbitConfig {
    /// Create config from environment variables.
    ///
    /// Unset variables keep their defaults; malformed ones are an error.
    pub fn from_env() -> ModelResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            start_angle: env_parse("RENDER_START_ANGLE")?.unwrap_or(defaults.start_angle),
            end_angle: env_parse("RENDER_END_ANGLE")?.unwrap_or(defaults.end_angle),
            angle_step: env_parse("RENDER_ANGLE_STEP")?.unwrap_or(defaults.angle_step),
            distance: env_parse("RENDER_DISTANCE")?.unwrap_or(defaults.distance),
            height_offset: env_parse("RENDER_HEIGHT_OFFSET")?.unwrap_or(defaults.height_offset),
            width: env_parse("RENDER_WIDTH")?.unwrap_or(defaults.width),
            height: env_parse("RENDER_HEIGHT")?.unwrap_or(defaults.height),
            background: defaults.background,
        })
    }

    /// Orbit from `start` to `end` (exclusive) in `step` degree increments.
    pub fn with_angles(mut self, start: f64, end: f64, step: f64) -> Self {
        self.start_angle = start;
        self.end_angle = end;
        self.angle_step = step;
        self
    }

    /// Set the frame size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Validate the configuration.
    ///
    /// Must be called before any rendering starts; an invalid orbit never
    /// produces a partial frame sequence.
    pub fn validate(&self) -> ModelResult<()> {
        if !self.angle_step.is_finite() || self.angle_step <= 0.0 {
            return Err(ModelError::config(format!(
                "angle step must be positive, got {}",
                self.angle_step
            )));
        }
        if !self.start_angle.is_finite() || !self.end_angle.is_finite() {
            return Err(ModelError::config("orbit angles must be finite"));
        }
        if self.end_angle <= self.start_angle {
            return Err(ModelError::config(format!(
                "end angle ({}) must be greater than start angle ({})",
                self.end_angle, self.start_angle
            )));
        }
        if !self.distance.is_finite() || self.distance <= 0.0 {
            return Err(ModelError::config(format!(
                "camera distance must be positive, got {}",
                self.distance
            )));
        }
        if !self.height_offset.is_finite() {
            return Err(ModelError::config("height offset must be finite"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ModelError::config("frame width/height must be non-zero"));
        }
        let count = self.frame_count_unchecked();
        if count > MAX_ORBIT_FRAMES {
            return Err(ModelError::config(format!(
                "orbit would produce {} frames (max {})",
                count, MAX_ORBIT_FRAMES
            )));
        }
        Ok(())
    }

    /// Number of frames in the orbit: `ceil((end - start) / step)`.
    pub fn frame_count(&self) -> ModelResult<usize> {
        self.validate()?;
        Ok(self.frame_count_unchecked())
    }

    /// Compute the ordered pose list, validating first.
    pub fn poses(&self) -> ModelResult<Vec<RenderPose>> {
        self.validate()?;
        Ok((0..self.frame_count_unchecked())
            .map(|k| RenderPose {
                index: k as u32,
                angle: self.angle_at(k),
                height_offset: self.height_offset,
                distance: self.distance,
            })
            .collect())
    }

    fn angle_at(&self, k: usize) -> f64 {
        // Multiply rather than accumulate so rounding never adds a frame.
        self.start_angle + k as f64 * self.angle_step
    }

    fn frame_count_unchecked(&self) -> usize {
        let span = (self.end_angle - self.start_angle) / self.angle_step;
        let estimate = span.ceil().max(0.0).min((MAX_ORBIT_FRAMES + 1) as f64) as usize;
        // Guard against float error at the boundary.
        let mut count = estimate;
        while count > 0 && self.angle_at(count - 1) >= self.end_angle {
            count -= 1;
        }
        while count <= MAX_ORBIT_FRAMES && self.angle_at(count) < self.end_angle {
            count += 1;
        }
        count
    }
}

/// Extrinsic camera parameters for one orbit frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderPose {
    /// Ordinal in the orbit sequence
    pub index: u32,
    /// Orbit angle in degrees, within `[start_angle, end_angle)`
    pub angle: f64,
    /// Camera height above the model centre
    pub height_offset: f64,
    /// Camera distance from the model centre
    pub distance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_orbit_yields_24_frames() {
        let config = OrbitConfig::default().with_angles(0.0, 360.0, 15.0);
        assert_eq!(config.frame_count().unwrap(), 24);

        let poses = config.poses().unwrap();
        let angles: Vec<f64> = poses.iter().map(|p| p.angle).collect();
        let expected: Vec<f64> = (0..24).map(|k| k as f64 * 15.0).collect();
        assert_eq!(angles, expected);
    }

    #[test]
    fn test_half_orbit_yields_12_frames() {
        let config = OrbitConfig::default().with_angles(0.0, 180.0, 15.0);
        assert_eq!(config.frame_count().unwrap(), 12);
    }

    #[test]
    fn test_uneven_span_rounds_up() {
        let config = OrbitConfig::default().with_angles(0.0, 100.0, 30.0);
        let poses = config.poses().unwrap();
        assert_eq!(poses.len(), 4);
        assert_eq!(poses.last().unwrap().angle, 90.0);
    }

    #[test]
    fn test_fractional_step_has_no_extra_frame() {
        let config = OrbitConfig::default().with_angles(0.0, 1.0, 0.1);
        let poses = config.poses().unwrap();
        assert_eq!(poses.len(), 10);
        assert!(poses.iter().all(|p| p.angle < 1.0));
    }

    #[test]
    fn test_ordinals_are_contiguous() {
        let poses = OrbitConfig::default().poses().unwrap();
        for (k, pose) in poses.iter().enumerate() {
            assert_eq!(pose.index as usize, k);
        }
        assert!(poses.windows(2).all(|w| w[0].angle < w[1].angle));
    }

    #[test]
    fn test_from_env_rejects_malformed_step() {
        std::env::set_var("RENDER_ANGLE_STEP", "fifteen");
        let result = OrbitConfig::from_env();
        std::env::remove_var("RENDER_ANGLE_STEP");

        let err = result.unwrap_err();
        assert!(matches!(err, ModelError::Config(_)));
        assert!(err.to_string().contains("RENDER_ANGLE_STEP"));
    }

    #[test]
    fn test_zero_step_is_config_error() {
        let config = OrbitConfig::default().with_angles(0.0, 360.0, 0.0);
        assert!(matches!(config.validate(), Err(ModelError::Config(_))));
        assert!(config.poses().is_err());
    }

    #[test]
    fn test_negative_step_is_config_error() {
        let config = OrbitConfig::default().with_angles(0.0, 360.0, -15.0);
        assert!(matches!(config.validate(), Err(ModelError::Config(_))));
    }

    #[test]
    fn test_inverted_range_is_config_error() {
        let config = OrbitConfig::default().with_angles(90.0, 90.0, 15.0);
        assert!(matches!(config.validate(), Err(ModelError::Config(_))));

        let config = OrbitConfig::default().with_angles(180.0, 0.0, 15.0);
        assert!(matches!(config.validate(), Err(ModelError::Config(_))));
    }

    #[test]
    fn test_too_many_frames_is_config_error() {
        let config = OrbitConfig::default().with_angles(0.0, 360.0, 0.01);
        assert!(matches!(config.validate(), Err(ModelError::Config(_))));
    }

    #[test]
    fn test_zero_size_is_config_error() {
        let config = OrbitConfig::default().with_size(0, 256);
        assert!(config.validate().is_err());
    }
}
