use hecs::Entity;
use thiserror::Error;

use crate::backend::BackendError;

/// Errors reported by transition activation, ticking and effect resolution.
#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("{role} camera {entity:?} does not exist or has no Camera component")]
    MissingCamera { role: &'static str, entity: Entity },
    #[error("source and destination camera are the same entity {0:?}")]
    SameCamera(Entity),
    #[error("material argument is not a live material")]
    MissingMaterial,
    #[error("mask texture argument is not a live texture")]
    MissingMaskTexture,
    #[error("{role} camera {entity:?} has an empty viewport")]
    EmptyViewport { role: &'static str, entity: Entity },
    #[error(
        "blend program '{0}' not found, register it with the backend before starting a transition"
    )]
    ProgramNotFound(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to load mask image: {0}")]
    Image(#[from] image::ImageError),
}

impl TransitionError {
    /// Whether this error comes from an invalid argument rather than a broken setup.
    ///
    /// Parameter errors leave the controller untouched: any transition that was already
    /// running keeps running.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            TransitionError::MissingCamera { .. }
                | TransitionError::SameCamera(_)
                | TransitionError::MissingMaterial
                | TransitionError::MissingMaskTexture
                | TransitionError::EmptyViewport { .. }
        )
    }
}
