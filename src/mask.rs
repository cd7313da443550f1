//! Transition mask textures.
//!
//! A mask is a grayscale image read by the `camswap/fade_mask` program: texels with a low
//! value switch to the destination camera early in the transition, bright texels late.

use std::path::Path;

use glam::UVec2;

use crate::backend::{EffectBackend, TextureId, rgba_len};
use crate::error::TransitionError;

/// Procedurally generated mask layouts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaskPattern {
    /// Left to right wipe.
    HorizontalWipe,
    /// Opens from the center outwards.
    Radial,
    /// Blocky dissolve. Same seed, same mask.
    Noise { seed: u32 },
}

impl MaskPattern {
    /// Generate RGBA8 pixels for a mask of the given size.
    pub fn rgba(&self, size: UVec2) -> Vec<u8> {
        let mut data = vec![0u8; rgba_len(size)];
        let max_x = size.x.saturating_sub(1).max(1) as f32;
        let max_y = size.y.saturating_sub(1).max(1) as f32;

        for y in 0..size.y {
            for x in 0..size.x {
                let idx = (y as usize * size.x as usize + x as usize) * 4;
                let value = match self {
                    MaskPattern::HorizontalWipe => x as f32 / max_x,
                    MaskPattern::Radial => {
                        let dx = x as f32 / max_x - 0.5;
                        let dy = y as f32 / max_y - 0.5;
                        // Corners sit at distance sqrt(0.5)
                        ((dx * dx + dy * dy).sqrt() / std::f32::consts::FRAC_1_SQRT_2).min(1.0)
                    }
                    MaskPattern::Noise { seed } => {
                        (hash(x / 8, y / 8, *seed) % 256) as f32 / 255.0
                    }
                };
                let v = (value * 255.0).round() as u8;
                data[idx] = v;
                data[idx + 1] = v;
                data[idx + 2] = v;
                data[idx + 3] = 255;
            }
        }
        data
    }

    /// Generate the mask and upload it to `backend`.
    pub fn upload(
        &self,
        backend: &mut dyn EffectBackend,
        size: UVec2,
    ) -> Result<TextureId, TransitionError> {
        let data = self.rgba(size);
        Ok(backend.create_texture(size, &data)?)
    }
}

/// Load a mask from an image file and upload it to `backend`.
pub fn load_mask_texture(
    backend: &mut dyn EffectBackend,
    path: impl AsRef<Path>,
) -> Result<TextureId, TransitionError> {
    let img = image::open(path)?.to_rgba8();
    let (width, height) = img.dimensions();
    Ok(backend.create_texture(UVec2::new(width, height), &img)?)
}

/// Load a mask from encoded image bytes (PNG, JPEG, ...) and upload it to `backend`.
pub fn mask_texture_from_bytes(
    backend: &mut dyn EffectBackend,
    bytes: &[u8],
) -> Result<TextureId, TransitionError> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = img.dimensions();
    Ok(backend.create_texture(UVec2::new(width, height), &img)?)
}

fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(y.wrapping_mul(668265263));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}
