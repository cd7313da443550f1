//! The offscreen buffer the outgoing camera renders into during a transition.

use glam::UVec2;

use crate::backend::{EffectBackend, TargetId};
use crate::camera::Camera;
use crate::effect::TransitionEffect;
use crate::error::TransitionError;

/// Owner of the source camera's offscreen render target.
///
/// The target is sized to the camera it was last validated against and is reused across
/// transitions. It is only released by [`release`](Self::release), which the controller
/// calls on shutdown.
#[derive(Debug, Default)]
pub struct SourceTarget {
    target: Option<TargetId>,
    size: UVec2,
}

impl SourceTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current target, if one has been allocated.
    pub fn current(&self) -> Option<TargetId> {
        self.target
    }

    /// Size of the current target.
    pub fn size(&self) -> Option<UVec2> {
        self.target.map(|_| self.size)
    }

    /// Make sure `camera` renders into a target matching its pixel size.
    ///
    /// When the target is missing or the camera was resized, the old target is released,
    /// a new one allocated, handed to `effect` as its source texture and set as the
    /// camera's output. Otherwise the camera is only pointed back at the target if it was
    /// rendering elsewhere.
    ///
    /// The camera must have a non-empty viewport; the backend rejects zero-sized targets.
    pub fn ensure_valid(
        &mut self,
        backend: &mut dyn EffectBackend,
        camera: &mut Camera,
        effect: &mut TransitionEffect,
    ) -> Result<TargetId, TransitionError> {
        match self.target {
            Some(target) if self.size == camera.pixel_size => {
                if camera.target != Some(target) {
                    camera.target = Some(target);
                }
                Ok(target)
            }
            _ => {
                // Allocate first: on failure the old target stays valid and bound
                let target = backend.create_render_target(camera.pixel_size)?;
                log::debug!(
                    "Allocated transition render target {:?} ({}x{})",
                    target,
                    camera.pixel_size.x,
                    camera.pixel_size.y
                );
                if let Some(old) = self.target.replace(target) {
                    backend.release_render_target(old);
                }
                self.size = camera.pixel_size;
                camera.target = Some(target);

                effect.assign_source_texture(backend, target)?;
                Ok(target)
            }
        }
    }

    /// Release the target, if any.
    pub fn release(&mut self, backend: &mut dyn EffectBackend) {
        if let Some(target) = self.target.take() {
            backend.release_render_target(target);
            log::debug!("Released transition render target {:?}", target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FlakyTargets, HeadlessBackend};
    use crate::effect::{EffectKind, NamedEffect};

    fn setup() -> (HeadlessBackend, TransitionEffect, Camera) {
        let backend = HeadlessBackend::with_builtin_programs();
        let effect = TransitionEffect::from(NamedEffect::new(EffectKind::AlphaFade));
        let camera = Camera::new().with_pixel_size(640, 480);
        (backend, effect, camera)
    }

    #[test]
    fn first_call_allocates_and_binds() {
        let (mut backend, mut effect, mut camera) = setup();
        let mut source = SourceTarget::new();

        let target = source
            .ensure_valid(&mut backend, &mut camera, &mut effect)
            .unwrap();

        assert_eq!(camera.target, Some(target));
        assert_eq!(backend.render_target_size(target), Some(camera.pixel_size));
        let material = effect.material().unwrap();
        assert_eq!(backend.material(material).unwrap().source, Some(target));
    }

    #[test]
    fn matching_size_reuses_target_and_repoints_camera() {
        let (mut backend, mut effect, mut camera) = setup();
        let mut source = SourceTarget::new();
        let target = source
            .ensure_valid(&mut backend, &mut camera, &mut effect)
            .unwrap();

        camera.target = None;
        let again = source
            .ensure_valid(&mut backend, &mut camera, &mut effect)
            .unwrap();

        assert_eq!(again, target);
        assert_eq!(camera.target, Some(target));
        assert_eq!(backend.target_allocations(), 1);
    }

    #[test]
    fn resize_reallocates_and_releases_old_target() {
        let (mut backend, mut effect, mut camera) = setup();
        let mut source = SourceTarget::new();
        let old = source
            .ensure_valid(&mut backend, &mut camera, &mut effect)
            .unwrap();

        camera.pixel_size = UVec2::new(1280, 720);
        let new = source
            .ensure_valid(&mut backend, &mut camera, &mut effect)
            .unwrap();

        assert_ne!(old, new);
        assert_eq!(backend.render_target_size(old), None);
        assert_eq!(backend.render_target_size(new), Some(UVec2::new(1280, 720)));
        assert_eq!(source.size(), Some(UVec2::new(1280, 720)));
        assert_eq!(backend.live_render_targets(), 1);
        let material = effect.material().unwrap();
        assert_eq!(backend.material(material).unwrap().source, Some(new));
    }

    #[test]
    fn release_frees_target() {
        let (mut backend, mut effect, mut camera) = setup();
        let mut source = SourceTarget::new();
        source
            .ensure_valid(&mut backend, &mut camera, &mut effect)
            .unwrap();

        source.release(&mut backend);
        source.release(&mut backend);
        assert!(source.current().is_none());
        assert_eq!(backend.live_render_targets(), 0);
    }

    #[test]
    fn failed_reallocation_keeps_the_old_target() {
        let mut backend = FlakyTargets::new();
        let mut effect = TransitionEffect::from(NamedEffect::new(EffectKind::AlphaFade));
        let mut camera = Camera::new().with_pixel_size(640, 480);
        let mut source = SourceTarget::new();
        let old = source
            .ensure_valid(&mut backend, &mut camera, &mut effect)
            .unwrap();

        backend.refuse_targets = true;
        camera.pixel_size = UVec2::new(1280, 720);
        assert!(source
            .ensure_valid(&mut backend, &mut camera, &mut effect)
            .is_err());

        assert_eq!(source.current(), Some(old));
        assert_eq!(source.size(), Some(UVec2::new(640, 480)));
        assert_eq!(camera.target, Some(old));
        assert_eq!(backend.render_target_size(old), Some(UVec2::new(640, 480)));

        // Retried on the next call once allocation works again
        backend.refuse_targets = false;
        let new = source
            .ensure_valid(&mut backend, &mut camera, &mut effect)
            .unwrap();
        assert_ne!(new, old);
        assert_eq!(backend.render_target_size(old), None);
    }
}
