use super::{HostMode, clamp01};
use crate::backend::{BackendResult, EffectBackend, MaterialId, TargetId};

/// An effect driven by a material supplied from outside.
///
/// Also works on its own, outside any transition: attach it to a camera with
/// [`TransitionController::attach_effect`](crate::TransitionController::attach_effect)
/// and it blends that camera's image with its material every frame, which makes it
/// handy for previewing a material while tuning it.
#[derive(Debug, Default)]
pub struct GenericEffect {
    material: Option<MaterialId>,
    owns_material: bool,
}

impl GenericEffect {
    /// An effect without a material. It draws nothing until one is set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive `material` without taking ownership of it.
    pub fn with_material(material: MaterialId) -> Self {
        Self {
            material: Some(material),
            owns_material: false,
        }
    }

    /// Drive `material` and destroy it when the effect is released.
    pub fn owning(material: MaterialId) -> Self {
        Self {
            material: Some(material),
            owns_material: true,
        }
    }

    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    pub fn owns_material(&self) -> bool {
        self.owns_material
    }

    /// Replace the material. A previously owned, different material is destroyed.
    pub fn set_material(
        &mut self,
        backend: &mut dyn EffectBackend,
        material: MaterialId,
        owned: bool,
    ) {
        if let Some(previous) = self.material {
            if self.owns_material && previous != material {
                backend.destroy_material(previous);
            }
        }
        self.material = Some(material);
        self.owns_material = owned;
    }

    pub fn assign_source_texture(
        &mut self,
        backend: &mut dyn EffectBackend,
        target: TargetId,
    ) -> BackendResult<()> {
        match self.material {
            Some(material) => backend.set_source_texture(material, target),
            None => Ok(()),
        }
    }

    pub fn set_progress(
        &mut self,
        backend: &mut dyn EffectBackend,
        progress: f32,
    ) -> BackendResult<()> {
        match self.material {
            Some(material) => backend.set_progress(material, clamp01(progress)),
            None => Ok(()),
        }
    }

    /// Blend `scene` into `output` with the current material.
    ///
    /// Returns `false` without drawing when no material is set.
    pub fn render(
        &self,
        backend: &mut dyn EffectBackend,
        scene: TargetId,
        output: TargetId,
    ) -> BackendResult<bool> {
        match self.material {
            Some(material) => backend.blit(material, scene, output).map(|()| true),
            None => Ok(false),
        }
    }

    /// Destroy the effect. An owned material is only destroyed while the host is running.
    pub fn release(self, backend: &mut dyn EffectBackend, mode: HostMode) {
        if mode != HostMode::Running || !self.owns_material {
            return;
        }
        if let Some(material) = self.material {
            backend.destroy_material(material);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::programs;
    use glam::UVec2;

    fn material(backend: &mut HeadlessBackend) -> MaterialId {
        let program = backend.find_program(programs::ALPHA_FADE).unwrap();
        backend.create_material(program).unwrap()
    }

    #[test]
    fn without_material_everything_is_a_no_op() {
        let mut backend = HeadlessBackend::with_builtin_programs();
        let scene = backend.create_render_target(UVec2::new(4, 4)).unwrap();
        let output = backend.create_render_target(UVec2::new(4, 4)).unwrap();
        let mut effect = GenericEffect::new();

        effect.assign_source_texture(&mut backend, scene).unwrap();
        effect.set_progress(&mut backend, 0.5).unwrap();
        assert!(!effect.render(&mut backend, scene, output).unwrap());
        assert_eq!(backend.blit_count(), 0);
    }

    #[test]
    fn borrowed_material_survives_release() {
        let mut backend = HeadlessBackend::with_builtin_programs();
        let m = material(&mut backend);
        GenericEffect::with_material(m).release(&mut backend, HostMode::Running);
        assert!(backend.contains_material(m));
    }

    #[test]
    fn owned_material_is_released_only_while_running() {
        let mut backend = HeadlessBackend::with_builtin_programs();
        let authored = material(&mut backend);
        GenericEffect::owning(authored).release(&mut backend, HostMode::Authoring);
        assert!(backend.contains_material(authored));

        let runtime = material(&mut backend);
        GenericEffect::owning(runtime).release(&mut backend, HostMode::Running);
        assert!(!backend.contains_material(runtime));
    }

    #[test]
    fn replacing_an_owned_material_destroys_it() {
        let mut backend = HeadlessBackend::with_builtin_programs();
        let first = material(&mut backend);
        let second = material(&mut backend);
        let mut effect = GenericEffect::owning(first);

        effect.set_material(&mut backend, second, false);
        assert!(!backend.contains_material(first));
        assert_eq!(effect.material(), Some(second));
        assert!(!effect.owns_material());
    }

    #[test]
    fn reassigning_the_same_owned_material_keeps_it() {
        let mut backend = HeadlessBackend::with_builtin_programs();
        let m = material(&mut backend);
        let mut effect = GenericEffect::owning(m);
        effect.set_material(&mut backend, m, true);
        assert!(backend.contains_material(m));
    }

    #[test]
    fn preview_renders_every_call() {
        let mut backend = HeadlessBackend::with_builtin_programs();
        let m = material(&mut backend);
        let scene = backend.create_render_target(UVec2::new(4, 4)).unwrap();
        let output = backend.create_render_target(UVec2::new(4, 4)).unwrap();
        let effect = GenericEffect::with_material(m);

        for _ in 0..3 {
            assert!(effect.render(&mut backend, scene, output).unwrap());
        }
        assert_eq!(backend.blit_count(), 3);
    }
}
