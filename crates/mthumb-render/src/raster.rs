//! Deterministic CPU triangle rasteriser.
//!
//! Flat-shaded, two-sided triangles with a depth buffer and a head-light at the
//! camera. No GPU or display server is needed, so it runs inside any container.

use mthumb_models::{Frame, RenderPose};

use crate::engine::{RenderEngine, RenderSettings};
use crate::error::{RenderError, RenderResult};
use crate::math::Vec3;
use crate::scene::Scene;

const BASE_COLOR: [f64; 3] = [150.0, 165.0, 185.0];
const AMBIENT: f64 = 0.25;

/// Software render engine.
#[derive(Debug, Clone)]
pub struct SoftwareRenderer {
    settings: RenderSettings,
}

impl SoftwareRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }
}

struct Camera {
    eye: Vec3,
    right: Vec3,
    up: Vec3,
    forward: Vec3,
    focal: f64,
    aspect: f64,
    near: f64,
    width: f64,
    height: f64,
}

impl Camera {
    fn orbit(scene: &Scene, pose: &RenderPose, settings: &RenderSettings) -> Option<Self> {
        let bounds = scene.bounds();
        let center = bounds.center();
        let radius = bounds.radius().max(1e-6);

        let theta = pose.angle.to_radians();
        let offset = Vec3::new(
            theta.sin() * pose.distance * radius,
            pose.height_offset * radius,
            theta.cos() * pose.distance * radius,
        );
        let eye = center + offset;
        let forward = (center - eye).normalized()?;
        // Fall back to +Z as "up" when looking straight down the Y axis.
        let right = forward
            .cross(Vec3::Y)
            .normalized()
            .or_else(|| forward.cross(Vec3::Z).normalized())?;
        let up = right.cross(forward);

        Some(Self {
            eye,
            right,
            up,
            forward,
            focal: 1.0 / (settings.fov_degrees.to_radians() * 0.5).tan(),
            aspect: settings.width as f64 / settings.height as f64,
            near: radius * 1e-3,
            width: settings.width as f64,
            height: settings.height as f64,
        })
    }

    /// Project to (screen x, screen y, view depth); `None` behind the near plane.
    fn project(&self, p: Vec3) -> Option<(f64, f64, f64)> {
        let rel = p - self.eye;
        let z = rel.dot(self.forward);
        if z <= self.near {
            return None;
        }
        let ndc_x = rel.dot(self.right) * self.focal / (self.aspect * z);
        let ndc_y = rel.dot(self.up) * self.focal / z;
        Some((
            (ndc_x + 1.0) * 0.5 * self.width,
            (1.0 - ndc_y) * 0.5 * self.height,
            z,
        ))
    }
}

impl RenderEngine for SoftwareRenderer {
    fn render_frame(&self, scene: &Scene, pose: &RenderPose) -> RenderResult<Frame> {
        let RenderSettings {
            width,
            height,
            background,
            ..
        } = self.settings;
        if width == 0 || height == 0 {
            return Err(RenderError::frame_failed(pose.index, "zero-sized frame"));
        }
        if !pose.angle.is_finite() || !pose.distance.is_finite() || pose.distance <= 0.0 {
            return Err(RenderError::frame_failed(pose.index, "invalid camera pose"));
        }

        let camera = Camera::orbit(scene, pose, &self.settings)
            .ok_or_else(|| RenderError::frame_failed(pose.index, "degenerate camera"))?;

        let mut frame = Frame::filled(pose.index, width, height, background);
        let mut depth = vec![f64::INFINITY; width as usize * height as usize];

        for mesh in scene.meshes() {
            for [a, b, c] in mesh.triangle_positions() {
                let Some(normal) = (b - a).cross(c - a).normalized() else {
                    continue;
                };
                let Some(to_eye) = (camera.eye - a).normalized() else {
                    continue;
                };
                let shade = AMBIENT + (1.0 - AMBIENT) * normal.dot(to_eye).abs();
                let color = [
                    (BASE_COLOR[0] * shade).round().clamp(0.0, 255.0) as u8,
                    (BASE_COLOR[1] * shade).round().clamp(0.0, 255.0) as u8,
                    (BASE_COLOR[2] * shade).round().clamp(0.0, 255.0) as u8,
                    255,
                ];

                let (Some(pa), Some(pb), Some(pc)) =
                    (camera.project(a), camera.project(b), camera.project(c))
                else {
                    continue;
                };
                fill_triangle(&mut frame, &mut depth, [pa, pb, pc], color);
            }
        }

        Ok(frame)
    }
}

fn edge(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn fill_triangle(
    frame: &mut Frame,
    depth: &mut [f64],
    [a, b, c]: [(f64, f64, f64); 3],
    color: [u8; 4],
) {
    let area = edge((a.0, a.1), (b.0, b.1), (c.0, c.1));
    if area.abs() < 1e-12 {
        return;
    }

    let w = frame.width as i64;
    let h = frame.height as i64;
    let min_x = a.0.min(b.0).min(c.0).floor().max(0.0) as i64;
    let max_x = (a.0.max(b.0).max(c.0).ceil() as i64).min(w - 1);
    let min_y = a.1.min(b.1).min(c.1).floor().max(0.0) as i64;
    let max_y = (a.1.max(b.1).max(c.1).ceil() as i64).min(h - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = (x as f64 + 0.5, y as f64 + 0.5);
            let w0 = edge((b.0, b.1), (c.0, c.1), p) / area;
            let w1 = edge((c.0, c.1), (a.0, a.1), p) / area;
            let w2 = edge((a.0, a.1), (b.0, b.1), p) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let z = w0 * a.2 + w1 * b.2 + w2 * c.2;
            let idx = (y * w + x) as usize;
            if z >= depth[idx] {
                continue;
            }
            depth[idx] = z;
            frame.data[idx * 4..idx * 4 + 4].copy_from_slice(&color);
        }
    }
}
