//! Transition requests and the state of a running transition.

use hecs::Entity;

use crate::backend::{MaterialId, TargetId, TextureId};
use crate::effect::{EffectKind, clamp01};

/// Which cameras to blend between, and for how long.
///
/// # Example
///
/// ```ignore
/// // Half a second, moving the audio listener over to the new camera
/// TransitionRequest::new(overview, closeup, 0.5).reassign_audio_listener(true)
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TransitionRequest {
    /// The camera currently on screen. Renders offscreen during the transition and is
    /// disabled once it ends.
    pub from: Entity,
    /// The camera being transitioned to. Carries the effect.
    pub to: Entity,
    /// Duration in seconds. Clamped to [`TransitionConfig::min_duration`].
    ///
    /// [`TransitionConfig::min_duration`]: crate::TransitionConfig::min_duration
    pub duration: f32,
    /// Move the [`AudioListener`](crate::AudioListener) from `from` to `to`.
    pub reassign_audio_listener: bool,
}

impl TransitionRequest {
    pub fn new(from: Entity, to: Entity, duration: f32) -> Self {
        Self {
            from,
            to,
            duration,
            reassign_audio_listener: false,
        }
    }

    pub fn reassign_audio_listener(mut self, reassign: bool) -> Self {
        self.reassign_audio_listener = reassign;
        self
    }
}

/// How the destination camera's effect is obtained.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EffectSource {
    /// A built-in effect with its own material.
    Kind(EffectKind),
    /// A caller supplied material. With `copy_material` the effect works on (and owns) a
    /// copy, leaving the caller's material untouched.
    Material {
        material: MaterialId,
        copy_material: bool,
    },
    /// A fresh material from the mask program, sampling this texture.
    Mask(TextureId),
}

/// State of the transition in progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransitionSession {
    pub(crate) source: Entity,
    pub(crate) destination: Entity,
    pub(crate) duration: f32,
    pub(crate) start_time: f32,
    pub(crate) original_target: Option<TargetId>,
}

impl TransitionSession {
    pub fn source(&self) -> Entity {
        self.source
    }

    pub fn destination(&self) -> Entity {
        self.destination
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    pub fn end_time(&self) -> f32 {
        self.start_time + self.duration
    }

    /// What the source camera rendered into before the transition began.
    pub fn original_target(&self) -> Option<TargetId> {
        self.original_target
    }

    /// Progress at `time`, in `[0, 1]`.
    pub fn progress_at(&self, time: f32) -> f32 {
        clamp01((time - self.start_time) / self.duration)
    }
}

/// Outcome of a [`TransitionController::update`](crate::TransitionController::update).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransitionStatus {
    /// No transition is running.
    Idle,
    /// A transition is running and its effect shows `progress`.
    Running { progress: f32 },
    /// The transition reached its end time during this update and was torn down.
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;

    fn session(start_time: f32, duration: f32) -> TransitionSession {
        let mut world = World::new();
        TransitionSession {
            source: world.spawn(()),
            destination: world.spawn(()),
            duration,
            start_time,
            original_target: None,
        }
    }

    #[test]
    fn progress_is_clamped_outside_the_window() {
        let s = session(2.0, 4.0);
        assert_eq!(s.end_time(), 6.0);
        assert_eq!(s.progress_at(0.0), 0.0);
        assert_eq!(s.progress_at(3.0), 0.25);
        assert_eq!(s.progress_at(10.0), 1.0);
    }

    #[test]
    fn request_defaults_to_keeping_the_listener() {
        let mut world = World::new();
        let request = TransitionRequest::new(world.spawn(()), world.spawn(()), 1.0);
        assert!(!request.reassign_audio_listener);
        assert!(request.reassign_audio_listener(true).reassign_audio_listener);
    }
}
