//! Scene loaders.
//!
//! Concrete format decoders plug in behind `SceneLoader`; the registry picks
//! the first loader that accepts the declared format.

use std::path::Path;

use mthumb_models::ModelFormat;
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::math::Vec3;
use crate::scene::{Mesh, Scene};

/// Decodes one or more model formats into a `Scene`.
pub trait SceneLoader: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Whether this loader decodes `format`.
    fn supports(&self, format: ModelFormat) -> bool;

    /// Load the model at `path`. Blocking.
    fn load(&self, path: &Path, format: ModelFormat) -> RenderResult<Scene>;
}

/// Registry of available scene loaders.
pub struct SceneLoaderRegistry {
    loaders: Vec<Box<dyn SceneLoader>>,
}

impl Default for SceneLoaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SceneLoaderRegistry {
    /// Registry with no loaders.
    pub fn empty() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    /// Registry with the built-in loaders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(ObjLoader));
        registry
    }

    pub fn register(&mut self, loader: Box<dyn SceneLoader>) {
        self.loaders.push(loader);
    }

    pub fn supports(&self, format: ModelFormat) -> bool {
        self.loaders.iter().any(|l| l.supports(format))
    }

    /// Load `path` with the first loader that supports `format`.
    pub fn load(&self, path: &Path, format: ModelFormat) -> RenderResult<Scene> {
        let loader = self
            .loaders
            .iter()
            .find(|l| l.supports(format))
            .ok_or(RenderError::UnsupportedFormat(format))?;

        debug!(loader = loader.name(), path = %path.display(), "Loading scene");
        let scene = loader.load(path, format)?;
        debug!(triangles = scene.triangle_count(), "Scene loaded");
        Ok(scene)
    }
}

/// Wavefront OBJ geometry loader (positions and polygon faces).
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjLoader;

impl SceneLoader for ObjLoader {
    fn name(&self) -> &'static str {
        "obj"
    }

    fn supports(&self, format: ModelFormat) -> bool {
        format == ModelFormat::Obj
    }

    fn load(&self, path: &Path, _format: ModelFormat) -> RenderResult<Scene> {
        let text = std::fs::read_to_string(path)?;
        let mesh = ObjLoader::parse_mesh(&text, path)?;
        Scene::new(vec![mesh])
    }
}

impl ObjLoader {
    /// Parse OBJ text into a single mesh. Faces are fan-triangulated.
    pub fn parse_mesh(text: &str, path: &Path) -> RenderResult<Mesh> {
        let mut positions: Vec<Vec3> = Vec::new();
        let mut triangles: Vec<[u32; 3]> = Vec::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            let mut tokens = line.split_whitespace();
            let Some(tag) = tokens.next() else {
                continue;
            };

            let parse_err = |message: String| RenderError::Parse {
                path: path.to_path_buf(),
                line: line_no + 1,
                message,
            };

            match tag {
                "v" => {
                    let coords: Vec<f64> = tokens
                        .take(3)
                        .map(|t| t.parse::<f64>())
                        .collect::<Result<_, _>>()
                        .map_err(|e| parse_err(format!("bad vertex coordinate: {}", e)))?;
                    if coords.len() != 3 {
                        return Err(parse_err("vertex needs three coordinates".to_string()));
                    }
                    positions.push(Vec3::new(coords[0], coords[1], coords[2]));
                }
                "f" => {
                    let corners: Vec<u32> = tokens
                        .map(|t| resolve_index(t, positions.len()))
                        .collect::<Result<_, _>>()
                        .map_err(&parse_err)?;
                    if corners.len() < 3 {
                        return Err(parse_err("face needs at least three vertices".to_string()));
                    }
                    for i in 1..corners.len() - 1 {
                        triangles.push([corners[0], corners[i], corners[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string());

        Ok(Mesh {
            name,
            positions,
            triangles,
        })
    }
}

/// Resolve an OBJ face token (`i`, `i/t`, `i//n`, `i/t/n`, negatives relative).
fn resolve_index(token: &str, vertex_count: usize) -> Result<u32, String> {
    let raw = token.split('/').next().unwrap_or("");
    let index: i64 = raw
        .parse()
        .map_err(|_| format!("bad face index '{}'", token))?;

    let resolved = match index {
        0 => return Err("face index 0 is invalid".to_string()),
        i if i > 0 => i - 1,
        i => vertex_count as i64 + i,
    };

    if resolved < 0 || resolved >= vertex_count as i64 {
        return Err(format!(
            "face index {} out of range ({} vertices)",
            index, vertex_count
        ));
    }
    Ok(resolved as u32)
}
