//! Rendering backend abstraction for transition effects.
//!
//! The transition controller never touches GPU objects directly. Everything it needs
//! (blend programs, materials, textures, offscreen render targets) goes through the
//! [`EffectBackend`] trait and is referred to by small copyable handles.
//!
//! Two implementations ship with the crate:
//!
//! - [`WgpuBackend`]: renders with wgpu, either on its own headless device or on a
//!   device owned by the host application.
//! - [`HeadlessBackend`]: keeps everything in memory. Useful for simulations, servers
//!   replaying cutscene logic, and tests.

mod headless;
mod wgpu_backend;

pub use headless::{BlitRecord, HeadlessBackend, HeadlessMaterial};
#[cfg(test)]
pub(crate) use headless::FlakyTargets;
pub use wgpu_backend::WgpuBackend;

use glam::UVec2;
use thiserror::Error;

/// Backend error type.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize GPU: {0}")]
    InitializationFailed(String),
    #[error("Blend program '{name}' failed to compile: {message}")]
    ProgramCompilation { name: String, message: String },
    #[error("Unknown blend program {0:?}")]
    UnknownProgram(ProgramId),
    #[error("Unknown material {0:?}")]
    UnknownMaterial(MaterialId),
    #[error("Unknown texture {0:?}")]
    UnknownTexture(TextureId),
    #[error("Unknown render target {0:?}")]
    UnknownTarget(TargetId),
    #[error("Texture data has {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    InvalidTextureData {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("Render target size must be non-zero, got {0}x{1}")]
    EmptyTarget(u32, u32),
    #[error("Render target {0:?} is both sampled and written by the same blit")]
    TargetFeedback(TargetId),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a compiled blend program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub(crate) usize);

/// Handle to a material: a blend program plus its bound parameters.
///
/// Materials are cheap handles; the backend owns the actual resources until
/// [`EffectBackend::destroy_material`] is called.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) usize);

/// Handle to a sampled texture (for example a transition mask).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) usize);

/// Handle to an offscreen render target a camera can render into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetId(pub(crate) usize);

/// Resource operations required by transition effects.
///
/// Handles from one backend must never be passed to another. Destroying or releasing an
/// unknown handle is a no-op.
pub trait EffectBackend {
    /// Look up a registered blend program by name.
    fn find_program(&self, name: &str) -> Option<ProgramId>;

    /// Create a fresh material using `program`, progress 0 and no textures bound.
    fn create_material(&mut self, program: ProgramId) -> BackendResult<MaterialId>;

    /// Create an independent copy of `material`, including its bound parameters.
    fn clone_material(&mut self, material: MaterialId) -> BackendResult<MaterialId>;

    fn destroy_material(&mut self, material: MaterialId);

    fn contains_material(&self, material: MaterialId) -> bool;

    /// Bind `target` as the outgoing camera image of `material`.
    fn set_source_texture(&mut self, material: MaterialId, target: TargetId) -> BackendResult<()>;

    fn set_mask_texture(&mut self, material: MaterialId, texture: TextureId) -> BackendResult<()>;

    /// Write the blend progress. Callers clamp to `[0, 1]` beforehand.
    fn set_progress(&mut self, material: MaterialId, progress: f32) -> BackendResult<()>;

    /// Upload an RGBA8 texture of the given size.
    fn create_texture(&mut self, size: UVec2, rgba: &[u8]) -> BackendResult<TextureId>;

    fn destroy_texture(&mut self, texture: TextureId);

    fn contains_texture(&self, texture: TextureId) -> bool;

    /// Allocate a color render target with a depth attachment (no stencil).
    fn create_render_target(&mut self, size: UVec2) -> BackendResult<TargetId>;

    fn release_render_target(&mut self, target: TargetId);

    fn render_target_size(&self, target: TargetId) -> Option<UVec2>;

    /// Run `material` over `scene` (the destination camera's image) and write the
    /// blended result into `output`.
    fn blit(
        &mut self,
        material: MaterialId,
        scene: TargetId,
        output: TargetId,
    ) -> BackendResult<()>;
}

/// Bytes of RGBA8 data covering `size`, computed without `u32` overflow.
pub(crate) fn rgba_len(size: UVec2) -> usize {
    size.x as usize * size.y as usize * 4
}

/// Checks that `rgba` holds exactly one RGBA8 pixel per texel of `size`.
pub(crate) fn check_rgba_len(size: UVec2, rgba: &[u8]) -> BackendResult<()> {
    let expected = rgba_len(size);
    if rgba.len() != expected {
        return Err(BackendError::InvalidTextureData {
            width: size.x,
            height: size.y,
            expected,
            actual: rgba.len(),
        });
    }
    Ok(())
}

/// A blit may not sample the target it writes to.
pub(crate) fn check_no_feedback(
    output: TargetId,
    scene: TargetId,
    source: Option<TargetId>,
) -> BackendResult<()> {
    if scene == output || source == Some(output) {
        return Err(BackendError::TargetFeedback(output));
    }
    Ok(())
}

pub(crate) fn check_target_size(size: UVec2) -> BackendResult<()> {
    if size.x == 0 || size.y == 0 {
        return Err(BackendError::EmptyTarget(size.x, size.y));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn rgba_len_does_not_overflow_u32() {
        assert_eq!(rgba_len(UVec2::new(40_000, 40_000)), 6_400_000_000);
        assert_eq!(rgba_len(UVec2::new(3, 2)), 24);
    }
}
