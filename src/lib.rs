//! # Camswap
//!
//! **Timed transitions between cameras, rendered with wgpu.**
//!
//! Switch the view from one camera to another over a duration while a blend effect
//! mixes both images: a crossfade, an opening diamond, vertical stripes, or any mask
//! texture you like.
//!
//! ## Quick Start
//!
//! ```no_run
//! use camswap::*;
//!
//! # fn main() -> Result<(), TransitionError> {
//! let gpu = GpuContext::new_headless()?;
//! let mut backend = WgpuBackend::with_builtin_programs(gpu)?;
//! let mut world = World::new();
//! let mut controller = TransitionController::default();
//!
//! let wide = world.spawn((Camera::new().with_pixel_size(1280, 720), AudioListener));
//! let close = world.spawn((Camera::new().with_pixel_size(1280, 720).disabled(),));
//!
//! let mut ctx = TransitionContext::new(&mut world, &mut backend, 0.0);
//! let request = TransitionRequest::new(wide, close, 1.5).reassign_audio_listener(true);
//! controller.activate_effect(&mut ctx, request, EffectKind::AlphaFade)?;
//!
//! // Every frame: update, render `wide` into its target, render `close`, then blend
//! ctx.time = 0.75;
//! controller.update(&mut ctx)?;
//! # controller.shutdown(&mut ctx);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pieces
//!
//! - [`TransitionController`] runs at most one transition and owns every effect.
//! - [`EffectBackend`] is the seam to the renderer. [`WgpuBackend`] draws on the GPU,
//!   [`HeadlessBackend`] only tracks resources.
//! - [`Camera`] components on [`hecs`] entities identify the cameras.

mod backend;
mod camera;
mod config;
mod effect;
mod error;
mod gpu;
mod mask;
pub mod programs;
mod render_target;
mod texture;
pub mod transition;

#[cfg(test)]
mod test_log;

pub use backend::{
    BackendError, BackendResult, BlitRecord, EffectBackend, HeadlessBackend, HeadlessMaterial,
    MaterialId, ProgramId, TargetId, TextureId, WgpuBackend,
};
pub use camera::{AudioListener, Camera};
pub use config::TransitionConfig;
pub use effect::{EffectKind, GenericEffect, HostMode, NamedEffect, TransitionEffect};
pub use error::TransitionError;
pub use gpu::GpuContext;
pub use mask::{MaskPattern, load_mask_texture, mask_texture_from_bytes};
pub use render_target::SourceTarget;
pub use transition::{
    EffectSource, TransitionContext, TransitionController, TransitionRequest, TransitionSession,
    TransitionStatus,
};

// Re-export the types that appear in the public API
pub use glam::UVec2;
pub use hecs::{Entity, World};
