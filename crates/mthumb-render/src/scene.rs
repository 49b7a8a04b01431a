//! In-memory scene representation.

use crate::error::{RenderError, RenderResult};
use crate::math::Vec3;

/// Triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub positions: Vec<Vec3>,
    /// Vertex indices into `positions`, three per triangle
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Iterate triangle corner positions, skipping out-of-range indices.
    pub fn triangle_positions(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.triangles.iter().filter_map(|[a, b, c]| {
            Some([
                *self.positions.get(*a as usize)?,
                *self.positions.get(*b as usize)?,
                *self.positions.get(*c as usize)?,
            ])
        })
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Radius of the bounding sphere around `center`.
    pub fn radius(&self) -> f64 {
        (self.max - self.min).length() * 0.5
    }
}

/// A loaded model ready for rendering.
///
/// Immutable once built; rendering never mutates the scene, so frames are a
/// pure function of (scene, pose).
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    meshes: Vec<Mesh>,
    bounds: Bounds,
}

impl Scene {
    /// Build a scene, rejecting geometry with nothing to draw.
    pub fn new(meshes: Vec<Mesh>) -> RenderResult<Self> {
        let meshes: Vec<Mesh> = meshes.into_iter().filter(|m| !m.is_empty()).collect();

        let mut min = Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut any = false;
        for mesh in &meshes {
            for tri in mesh.triangle_positions() {
                for p in tri {
                    min = min.min(p);
                    max = max.max(p);
                    any = true;
                }
            }
        }

        if !any || !min.is_finite() || !max.is_finite() {
            return Err(RenderError::EmptyScene);
        }

        Ok(Self {
            meshes,
            bounds: Bounds { min, max },
        })
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.triangles.len()).sum()
    }

    /// Unit cube centred on the origin. Handy for self-checks and tests.
    pub fn unit_cube() -> Self {
        let p = |x, y, z| Vec3::new(x, y, z);
        let positions = vec![
            p(-0.5, -0.5, -0.5),
            p(0.5, -0.5, -0.5),
            p(0.5, 0.5, -0.5),
            p(-0.5, 0.5, -0.5),
            p(-0.5, -0.5, 0.5),
            p(0.5, -0.5, 0.5),
            p(0.5, 0.5, 0.5),
            p(-0.5, 0.5, 0.5),
        ];
        let triangles = vec![
            [0, 2, 1], [0, 3, 2], // back
            [4, 5, 6], [4, 6, 7], // front
            [0, 1, 5], [0, 5, 4], // bottom
            [3, 6, 2], [3, 7, 6], // top
            [0, 4, 7], [0, 7, 3], // left
            [1, 2, 6], [1, 6, 5], // right
        ];
        Self {
            meshes: vec![Mesh {
                name: Some("cube".to_string()),
                positions,
                triangles,
            }],
            bounds: Bounds {
                min: p(-0.5, -0.5, -0.5),
                max: p(0.5, 0.5, 0.5),
            },
        }
    }
}
