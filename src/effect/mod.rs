//! Transition effects attached to the destination camera.
//!
//! A transition effect owns (or borrows) a material and feeds it the two inputs every
//! blend program needs: the outgoing camera's image and the progress value. It comes in
//! two flavours:
//!
//! - [`NamedEffect`]: one of the built-in [`EffectKind`]s. Builds its own material from
//!   the kind's program the first time it is used and always releases it.
//! - [`GenericEffect`]: drives a material handed in from outside. Whether it releases
//!   that material is decided by an ownership flag.
//!
//! [`TransitionEffect`] is the sum of both and is what the controller stores per camera.

mod generic;
mod named;

pub use generic::GenericEffect;
pub use named::NamedEffect;

use crate::backend::{EffectBackend, MaterialId, TargetId};
use crate::error::TransitionError;
use crate::programs;

/// The built-in effects with a fixed blend program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Crossfade between both cameras.
    AlphaFade,
    /// Diamond opening from the center of the screen.
    Diamond,
    /// Vertical stripes filling in.
    VerticalLines,
}

impl EffectKind {
    pub const ALL: [EffectKind; 3] = [
        EffectKind::AlphaFade,
        EffectKind::Diamond,
        EffectKind::VerticalLines,
    ];

    /// Name of the blend program this effect renders with.
    pub fn program_name(&self) -> &'static str {
        match self {
            EffectKind::AlphaFade => programs::ALPHA_FADE,
            EffectKind::Diamond => programs::DIAMOND,
            EffectKind::VerticalLines => programs::VERTICAL_LINES,
        }
    }
}

/// Whether the host is running the application or authoring it.
///
/// Materials assigned while authoring (for example a preview set up in a level editor)
/// belong to the authored data and must survive the effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HostMode {
    #[default]
    Running,
    Authoring,
}

/// An effect object bound to a camera.
#[derive(Debug)]
pub enum TransitionEffect {
    Named(NamedEffect),
    Generic(GenericEffect),
}

impl TransitionEffect {
    /// Bind `target` as the outgoing camera image. The last call wins.
    pub fn assign_source_texture(
        &mut self,
        backend: &mut dyn EffectBackend,
        target: TargetId,
    ) -> Result<(), TransitionError> {
        match self {
            TransitionEffect::Named(effect) => effect.assign_source_texture(backend, target),
            TransitionEffect::Generic(effect) => Ok(effect.assign_source_texture(backend, target)?),
        }
    }

    /// Write `progress`, clamped to `[0, 1]`.
    pub fn set_progress(
        &mut self,
        backend: &mut dyn EffectBackend,
        progress: f32,
    ) -> Result<(), TransitionError> {
        match self {
            TransitionEffect::Named(effect) => effect.set_progress(backend, progress),
            TransitionEffect::Generic(effect) => Ok(effect.set_progress(backend, progress)?),
        }
    }

    /// The material currently driving this effect, if one has been created or assigned.
    pub fn material(&self) -> Option<MaterialId> {
        match self {
            TransitionEffect::Named(effect) => effect.material(),
            TransitionEffect::Generic(effect) => effect.material(),
        }
    }

    /// Blend `scene` (the destination camera's image) into `output`.
    ///
    /// Returns `false` when a generic effect has no material and nothing was drawn.
    pub fn render(
        &mut self,
        backend: &mut dyn EffectBackend,
        scene: TargetId,
        output: TargetId,
    ) -> Result<bool, TransitionError> {
        match self {
            TransitionEffect::Named(effect) => {
                effect.render(backend, scene, output)?;
                Ok(true)
            }
            TransitionEffect::Generic(effect) => Ok(effect.render(backend, scene, output)?),
        }
    }

    /// Destroy the effect, releasing whatever material it owns.
    pub fn release(self, backend: &mut dyn EffectBackend, mode: HostMode) {
        match self {
            TransitionEffect::Named(effect) => effect.release(backend),
            TransitionEffect::Generic(effect) => effect.release(backend, mode),
        }
    }
}

impl From<NamedEffect> for TransitionEffect {
    fn from(effect: NamedEffect) -> Self {
        TransitionEffect::Named(effect)
    }
}

impl From<GenericEffect> for TransitionEffect {
    fn from(effect: GenericEffect) -> Self {
        TransitionEffect::Generic(effect)
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
pub(crate) fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
