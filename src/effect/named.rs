use super::{EffectKind, clamp01};
use crate::backend::{EffectBackend, MaterialId, TargetId};
use crate::error::TransitionError;

/// A built-in effect rendering with the program named by its [`EffectKind`].
///
/// The material is created lazily on first use. If the program is not registered with
/// the backend the effect cannot work at all, so every operation fails with
/// [`TransitionError::ProgramNotFound`] instead of silently drawing nothing.
#[derive(Debug)]
pub struct NamedEffect {
    kind: EffectKind,
    material: Option<MaterialId>,
}

impl NamedEffect {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            material: None,
        }
    }

    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// The material, if it has been created yet.
    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    /// Return the material, creating it from the kind's program on first call.
    pub fn ensure_material(
        &mut self,
        backend: &mut dyn EffectBackend,
    ) -> Result<MaterialId, TransitionError> {
        if let Some(material) = self.material {
            return Ok(material);
        }

        let name = self.kind.program_name();
        let Some(program) = backend.find_program(name) else {
            let err = TransitionError::ProgramNotFound(name.to_string());
            log::error!("{:?} effect: {}", self.kind, err);
            return Err(err);
        };
        let material = backend.create_material(program)?;
        self.material = Some(material);
        Ok(material)
    }

    pub fn assign_source_texture(
        &mut self,
        backend: &mut dyn EffectBackend,
        target: TargetId,
    ) -> Result<(), TransitionError> {
        let material = self.ensure_material(backend)?;
        backend.set_source_texture(material, target)?;
        Ok(())
    }

    pub fn set_progress(
        &mut self,
        backend: &mut dyn EffectBackend,
        progress: f32,
    ) -> Result<(), TransitionError> {
        let material = self.ensure_material(backend)?;
        backend.set_progress(material, clamp01(progress))?;
        Ok(())
    }

    pub fn render(
        &mut self,
        backend: &mut dyn EffectBackend,
        scene: TargetId,
        output: TargetId,
    ) -> Result<(), TransitionError> {
        let material = self.ensure_material(backend)?;
        backend.blit(material, scene, output)?;
        Ok(())
    }

    /// Destroy the effect and its material, in any host mode.
    pub fn release(self, backend: &mut dyn EffectBackend) {
        if let Some(material) = self.material {
            backend.destroy_material(material);
        }
    }
}
