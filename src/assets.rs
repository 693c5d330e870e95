//! Texture loading from the working directory.
//!
//! Every texture is decoded, scaled and uploaded once at startup; a missing or
//! undecodable file is reported as an [`AssetError`] naming the full path.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use log::{error, info};

use crate::constants::*;
use crate::rendering::RenderService;
use crate::types::Texture;

#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("Failed to get current working directory: {0}")]
    WorkingDir(#[source] io::Error),

    #[error("File does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to load image from file {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Asset paths are written rooted (`/graphics/...`) but always resolve inside `base_dir`.
pub fn resolve(base_dir: &Path, relative: &str) -> PathBuf {
    base_dir.join(relative.trim_start_matches(['/', '\\']))
}

fn scaled(dimension: u32, scale: f32) -> u32 {
    ((dimension as f32 * scale) as u32).max(1)
}

pub fn load_texture(
    render: &mut impl RenderService,
    base_dir: &Path,
    relative: &str,
    scale: f32,
) -> Result<Texture, AssetError> {
    let path = resolve(base_dir, relative);
    if !path.is_file() {
        error!("File does not exist: {}", path.display());
        return Err(AssetError::NotFound { path });
    }

    let decoded = match image::open(&path) {
        Ok(decoded) => decoded.to_rgba8(),
        Err(source) => {
            error!("Failed to load image from file {}: {}", path.display(), source);
            return Err(AssetError::Decode { path, source });
        }
    };

    let (width, height) = decoded.dimensions();
    let resized = imageops::resize(&decoded, scaled(width, scale), scaled(height, scale), FilterType::Triangle);
    drop(decoded);

    let texture = render.load_texture_from_image(resized);
    info!(
        "Loaded texture {} ({}x{} -> {}x{}) from {}",
        texture.id,
        width,
        height,
        texture.width,
        texture.height,
        path.display()
    );
    Ok(texture)
}

/// The four textures the game draws.
#[derive(Debug, Clone, Copy)]
pub struct Assets {
    pub spaceship: Texture,
    pub spaceship_off: Texture,
    pub cloud: Texture,
    pub dust_cloud: Texture,
}

impl Assets {
    pub fn load(render: &mut impl RenderService) -> Result<Self, AssetError> {
        let cwd = env::current_dir().map_err(|e| {
            error!("Failed to get current working directory: {}", e);
            AssetError::WorkingDir(e)
        })?;
        Self::load_from(render, &cwd)
    }

    pub fn load_from(render: &mut impl RenderService, base_dir: &Path) -> Result<Self, AssetError> {
        Ok(Assets {
            spaceship: load_texture(render, base_dir, SPACESHIP_TEXTURE, SHIP_SCALE)?,
            spaceship_off: load_texture(render, base_dir, SPACESHIP_OFF_TEXTURE, SHIP_SCALE)?,
            cloud: load_texture(render, base_dir, CLOUD_TEXTURE, CLOUD_SCALE)?,
            dust_cloud: load_texture(render, base_dir, DUST_CLOUD_TEXTURE, DUST_CLOUD_SCALE)?,
        })
    }
}
