//! Thumbnail encoding configuration and results.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::env::{env_flag, env_parse};
use crate::error::{ModelError, ModelResult};

/// Default animated preview framerate.
pub const DEFAULT_FRAMERATE: u32 = 10;
/// Default animated WebP quality (0-100).
pub const DEFAULT_ANIMATED_QUALITY: u8 = 75;
/// Default poster JPEG quality (1-100).
pub const DEFAULT_POSTER_QUALITY: u8 = 85;

/// Encoding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EncodingConfig {
    /// Target framerate of the animated preview
    #[serde(default = "default_framerate")]
    pub framerate: u32,

    /// Animated WebP quality (0-100, higher is better)
    #[serde(default = "default_animated_quality")]
    pub animated_quality: u8,

    /// Poster JPEG quality (1-100, higher is better)
    #[serde(default = "default_poster_quality")]
    pub poster_quality: u8,

    /// Loop the animation forever
    #[serde(default = "default_loop_forever")]
    pub loop_forever: bool,
}

fn default_framerate() -> u32 {
    DEFAULT_FRAMERATE
}
fn default_animated_quality() -> u8 {
    DEFAULT_ANIMATED_QUALITY
}
fn default_poster_quality() -> u8 {
    DEFAULT_POSTER_QUALITY
}
fn default_loop_forever() -> bool {
    true
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            framerate: DEFAULT_FRAMERATE,
            animated_quality: DEFAULT_ANIMATED_QUALITY,
            poster_quality: DEFAULT_POSTER_QUALITY,
            loop_forever: true,
        }
    }
}

impl EncodingConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ModelResult<Self> {
        Ok(Self {
            framerate: env_parse("ENCODE_FRAMERATE")?.unwrap_or(DEFAULT_FRAMERATE),
            animated_quality: env_parse("ENCODE_ANIMATED_QUALITY")?
                .unwrap_or(DEFAULT_ANIMATED_QUALITY),
            poster_quality: env_parse("ENCODE_POSTER_QUALITY")?.unwrap_or(DEFAULT_POSTER_QUALITY),
            loop_forever: env_flag("ENCODE_LOOP")?.unwrap_or(true),
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ModelResult<()> {
        if self.framerate == 0 || self.framerate > 120 {
            return Err(ModelError::config(format!(
                "framerate must be within 1..=120, got {}",
                self.framerate
            )));
        }
        if self.animated_quality > 100 {
            return Err(ModelError::config(format!(
                "animated quality must be within 0..=100, got {}",
                self.animated_quality
            )));
        }
        if self.poster_quality == 0 || self.poster_quality > 100 {
            return Err(ModelError::config(format!(
                "poster quality must be within 1..=100, got {}",
                self.poster_quality
            )));
        }
        Ok(())
    }
}

/// Kind of encoded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    /// Animated orbit preview
    Animated,
    /// Single still image (frame 0)
    Poster,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Animated => "animated",
            ArtifactKind::Poster => "poster",
        }
    }

    /// File name used inside the attempt workspace.
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Animated => "thumbnail.webp",
            ArtifactKind::Poster => "poster.jpg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::Animated => "image/webp",
            ArtifactKind::Poster => "image/jpeg",
        }
    }
}

/// One encoded output on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedArtifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub width: u32,
    pub height: u32,
}

/// Result of encoding one orbit sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingResult {
    pub animated: EncodedArtifact,
    pub poster: EncodedArtifact,
    pub frame_count: usize,
}

/// Backend response to an artifact upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredArtifact {
    pub stored_path: String,
    pub size_bytes: u64,
}

/// Metadata reported with `CompleteJob`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMeta {
    pub thumbnail_path: String,
    pub size_bytes: u64,
    pub width: u32,
    pub height: u32,
    pub poster_path: String,
    pub poster_size_bytes: u64,
    pub frame_count: usize,
}

impl ArtifactMeta {
    /// Combine the encoding result with the backend's stored locations.
    pub fn from_upload(
        result: &EncodingResult,
        animated: &StoredArtifact,
        poster: &StoredArtifact,
    ) -> Self {
        Self {
            thumbnail_path: animated.stored_path.clone(),
            size_bytes: animated.size_bytes,
            width: result.animated.width,
            height: result.animated.height,
            poster_path: poster.stored_path.clone(),
            poster_size_bytes: poster.size_bytes,
            frame_count: result.frame_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EncodingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = EncodingConfig::default();
        config.framerate = 0;
        assert!(config.validate().is_err());

        let mut config = EncodingConfig::default();
        config.poster_quality = 0;
        assert!(config.validate().is_err());

        let mut config = EncodingConfig::default();
        config.animated_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_defaults_when_deserializing() {
        let config: EncodingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EncodingConfig::default());
    }

    #[test]
    fn test_artifact_meta_from_upload() {
        let result = EncodingResult {
            animated: EncodedArtifact {
                kind: ArtifactKind::Animated,
                path: PathBuf::from("/tmp/a/thumbnail.webp"),
                size_bytes: 1000,
                width: 256,
                height: 256,
            },
            poster: EncodedArtifact {
                kind: ArtifactKind::Poster,
                path: PathBuf::from("/tmp/a/poster.jpg"),
                size_bytes: 200,
                width: 256,
                height: 256,
            },
            frame_count: 24,
        };
        let animated = StoredArtifact {
            stored_path: "thumbnails/7/thumbnail.webp".to_string(),
            size_bytes: 1000,
        };
        let poster = StoredArtifact {
            stored_path: "thumbnails/7/poster.jpg".to_string(),
            size_bytes: 200,
        };

        let meta = ArtifactMeta::from_upload(&result, &animated, &poster);
        assert_eq!(meta.thumbnail_path, "thumbnails/7/thumbnail.webp");
        assert_eq!(meta.poster_size_bytes, 200);
        assert_eq!(meta.width, 256);
        assert_eq!(meta.frame_count, 24);
    }
}
