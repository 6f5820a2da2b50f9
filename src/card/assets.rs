//! Card artwork loaded once per session.
//!
//! Every asset is optional. A missing or undecodable file is logged and the
//! renderer substitutes a flat fill (background) or skips the layer (sticker).

use crate::config::AssetsConfig;
use image::{ImageReader, RgbaImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },
}

/// Decoded background and sticker, straight RGBA.
#[derive(Debug, Clone, Default)]
pub struct CardAssets {
    pub background: Option<RgbaImage>,
    pub sticker: Option<RgbaImage>,
}

impl CardAssets {
    /// Decode whatever the config points at. Paths must already be resolved.
    pub fn load(config: &AssetsConfig) -> Self {
        Self {
            background: config.background.as_deref().and_then(load_optional),
            sticker: config.sticker.as_deref().and_then(load_optional),
        }
    }
}

/// Load and decode an image from disk, sniffing the format from content.
pub fn load_image(path: &Path) -> Result<RgbaImage, AssetError> {
    let decoded = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| AssetError::Decode {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    Ok(decoded.to_rgba8())
}

fn load_optional(path: &Path) -> Option<RgbaImage> {
    match load_image(path) {
        Ok(img) => {
            tracing::debug!(path = %path.display(), width = img.width(), height = img.height(), "asset loaded");
            Some(img)
        }
        Err(e) => {
            tracing::warn!(error = %e, "asset unavailable, using fallback");
            None
        }
    }
}
