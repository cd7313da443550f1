//! In-memory backend that tracks resources without touching a GPU.

use std::collections::HashMap;

use glam::UVec2;

use super::{
    BackendError, BackendResult, EffectBackend, MaterialId, ProgramId, TargetId, TextureId,
    check_no_feedback, check_rgba_len, check_target_size,
};
use crate::programs;

/// Parameters bound to a material in the [`HeadlessBackend`].
#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessMaterial {
    pub program: ProgramId,
    pub progress: f32,
    pub source: Option<TargetId>,
    pub mask: Option<TextureId>,
}

/// A recorded [`EffectBackend::blit`] call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlitRecord {
    pub material: MaterialId,
    pub scene: TargetId,
    pub output: TargetId,
    pub progress: f32,
}

/// Backend that keeps all resources in memory.
///
/// Every operation is validated the same way [`WgpuBackend`](super::WgpuBackend)
/// validates it, so handle misuse surfaces here as well. The inspection methods make it
/// convenient to assert on what a transition did.
///
/// Blits are only counted by default. Individual [`BlitRecord`]s are kept only after
/// [`recording_blits`](Self::recording_blits) is switched on, so a long-running host
/// does not accumulate them.
///
/// # Example
///
/// ```
/// use camswap::{EffectBackend, HeadlessBackend, UVec2};
///
/// let mut backend = HeadlessBackend::with_builtin_programs();
/// let target = backend.create_render_target(UVec2::new(320, 240)).unwrap();
/// assert_eq!(backend.render_target_size(target), Some(UVec2::new(320, 240)));
/// ```
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    programs: Vec<String>,
    materials: HashMap<MaterialId, HeadlessMaterial>,
    textures: HashMap<TextureId, UVec2>,
    targets: HashMap<TargetId, UVec2>,
    next_handle: usize,
    blits: Vec<BlitRecord>,
    record_blits: bool,
    blit_count: usize,
    target_allocations: usize,
}

impl HeadlessBackend {
    /// Create an empty backend with no programs registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with the built-in transition programs registered.
    pub fn with_builtin_programs() -> Self {
        let mut backend = Self::new();
        for (name, _) in programs::BUILTIN_PROGRAMS {
            backend.register_program(name);
        }
        backend
    }

    /// Register a program name. Registering the same name twice returns the same handle.
    pub fn register_program(&mut self, name: impl Into<String>) -> ProgramId {
        let name = name.into();
        if let Some(existing) = self.find_program(&name) {
            return existing;
        }
        self.programs.push(name);
        ProgramId(self.programs.len() - 1)
    }

    pub fn material(&self, material: MaterialId) -> Option<&HeadlessMaterial> {
        self.materials.get(&material)
    }

    /// Name of the program a material was created from.
    pub fn material_program_name(&self, material: MaterialId) -> Option<&str> {
        self.materials
            .get(&material)
            .and_then(|m| self.programs.get(m.program.0))
            .map(String::as_str)
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn live_render_targets(&self) -> usize {
        self.targets.len()
    }

    /// Total number of render targets ever allocated.
    pub fn target_allocations(&self) -> usize {
        self.target_allocations
    }

    /// Keep a [`BlitRecord`] for every blit from now on.
    pub fn recording_blits(mut self, record: bool) -> Self {
        self.record_blits = record;
        self
    }

    /// Records kept since recording was switched on or last drained.
    pub fn blits(&self) -> &[BlitRecord] {
        &self.blits
    }

    /// Drain the kept records.
    pub fn take_blits(&mut self) -> Vec<BlitRecord> {
        std::mem::take(&mut self.blits)
    }

    /// Total number of successful blits, recorded or not.
    pub fn blit_count(&self) -> usize {
        self.blit_count
    }

    fn next_handle(&mut self) -> usize {
        self.next_handle += 1;
        self.next_handle
    }

    fn material_mut(&mut self, material: MaterialId) -> BackendResult<&mut HeadlessMaterial> {
        self.materials
            .get_mut(&material)
            .ok_or(BackendError::UnknownMaterial(material))
    }
}

impl EffectBackend for HeadlessBackend {
    fn find_program(&self, name: &str) -> Option<ProgramId> {
        self.programs.iter().position(|p| p == name).map(ProgramId)
    }

    fn create_material(&mut self, program: ProgramId) -> BackendResult<MaterialId> {
        if program.0 >= self.programs.len() {
            return Err(BackendError::UnknownProgram(program));
        }
        let id = MaterialId(self.next_handle());
        self.materials.insert(
            id,
            HeadlessMaterial {
                program,
                progress: 0.0,
                source: None,
                mask: None,
            },
        );
        Ok(id)
    }

    fn clone_material(&mut self, material: MaterialId) -> BackendResult<MaterialId> {
        let copy = self
            .materials
            .get(&material)
            .cloned()
            .ok_or(BackendError::UnknownMaterial(material))?;
        let id = MaterialId(self.next_handle());
        self.materials.insert(id, copy);
        Ok(id)
    }

    fn destroy_material(&mut self, material: MaterialId) {
        self.materials.remove(&material);
    }

    fn contains_material(&self, material: MaterialId) -> bool {
        self.materials.contains_key(&material)
    }

    fn set_source_texture(&mut self, material: MaterialId, target: TargetId) -> BackendResult<()> {
        if !self.targets.contains_key(&target) {
            return Err(BackendError::UnknownTarget(target));
        }
        self.material_mut(material)?.source = Some(target);
        Ok(())
    }

    fn set_mask_texture(&mut self, material: MaterialId, texture: TextureId) -> BackendResult<()> {
        if !self.textures.contains_key(&texture) {
            return Err(BackendError::UnknownTexture(texture));
        }
        self.material_mut(material)?.mask = Some(texture);
        Ok(())
    }

    fn set_progress(&mut self, material: MaterialId, progress: f32) -> BackendResult<()> {
        self.material_mut(material)?.progress = progress;
        Ok(())
    }

    fn create_texture(&mut self, size: UVec2, rgba: &[u8]) -> BackendResult<TextureId> {
        check_rgba_len(size, rgba)?;
        check_target_size(size)?;
        let id = TextureId(self.next_handle());
        self.textures.insert(id, size);
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn contains_texture(&self, texture: TextureId) -> bool {
        self.textures.contains_key(&texture)
    }

    fn create_render_target(&mut self, size: UVec2) -> BackendResult<TargetId> {
        check_target_size(size)?;
        let id = TargetId(self.next_handle());
        self.targets.insert(id, size);
        self.target_allocations += 1;
        Ok(id)
    }

    fn release_render_target(&mut self, target: TargetId) {
        self.targets.remove(&target);
    }

    fn render_target_size(&self, target: TargetId) -> Option<UVec2> {
        self.targets.get(&target).copied()
    }

    fn blit(
        &mut self,
        material: MaterialId,
        scene: TargetId,
        output: TargetId,
    ) -> BackendResult<()> {
        for target in [scene, output] {
            if !self.targets.contains_key(&target) {
                return Err(BackendError::UnknownTarget(target));
            }
        }
        let bound = self
            .materials
            .get(&material)
            .ok_or(BackendError::UnknownMaterial(material))?;
        check_no_feedback(output, scene, bound.source)?;
        let progress = bound.progress;
        self.blit_count += 1;
        if self.record_blits {
            self.blits.push(BlitRecord {
                material,
                scene,
                output,
                progress,
            });
        }
        Ok(())
    }
}

/// Headless backend whose render target allocations can be made to fail.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct FlakyTargets {
    pub(crate) inner: HeadlessBackend,
    pub(crate) refuse_targets: bool,
}

#[cfg(test)]
impl FlakyTargets {
    pub(crate) fn new() -> Self {
        Self {
            inner: HeadlessBackend::with_builtin_programs(),
            refuse_targets: false,
        }
    }
}

#[cfg(test)]
impl EffectBackend for FlakyTargets {
    fn find_program(&self, name: &str) -> Option<ProgramId> {
        self.inner.find_program(name)
    }

    fn create_material(&mut self, program: ProgramId) -> BackendResult<MaterialId> {
        self.inner.create_material(program)
    }

    fn clone_material(&mut self, material: MaterialId) -> BackendResult<MaterialId> {
        self.inner.clone_material(material)
    }

    fn destroy_material(&mut self, material: MaterialId) {
        self.inner.destroy_material(material)
    }

    fn contains_material(&self, material: MaterialId) -> bool {
        self.inner.contains_material(material)
    }

    fn set_source_texture(&mut self, material: MaterialId, target: TargetId) -> BackendResult<()> {
        self.inner.set_source_texture(material, target)
    }

    fn set_mask_texture(&mut self, material: MaterialId, texture: TextureId) -> BackendResult<()> {
        self.inner.set_mask_texture(material, texture)
    }

    fn set_progress(&mut self, material: MaterialId, progress: f32) -> BackendResult<()> {
        self.inner.set_progress(material, progress)
    }

    fn create_texture(&mut self, size: UVec2, rgba: &[u8]) -> BackendResult<TextureId> {
        self.inner.create_texture(size, rgba)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.inner.destroy_texture(texture)
    }

    fn contains_texture(&self, texture: TextureId) -> bool {
        self.inner.contains_texture(texture)
    }

    fn create_render_target(&mut self, size: UVec2) -> BackendResult<TargetId> {
        if self.refuse_targets {
            return Err(BackendError::InitializationFailed(
                "render target allocation refused".to_string(),
            ));
        }
        self.inner.create_render_target(size)
    }

    fn release_render_target(&mut self, target: TargetId) {
        self.inner.release_render_target(target)
    }

    fn render_target_size(&self, target: TargetId) -> Option<UVec2> {
        self.inner.render_target_size(target)
    }

    fn blit(
        &mut self,
        material: MaterialId,
        scene: TargetId,
        output: TargetId,
    ) -> BackendResult<()> {
        self.inner.blit(material, scene, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_programs_are_registered() {
        let backend = HeadlessBackend::with_builtin_programs();
        assert!(backend.find_program(programs::ALPHA_FADE).is_some());
        assert!(backend.find_program(programs::FADE_MASK).is_some());
        assert!(backend.find_program("camswap/does_not_exist").is_none());
    }

    #[test]
    fn register_program_is_idempotent() {
        let mut backend = HeadlessBackend::new();
        let a = backend.register_program("custom/wipe");
        let b = backend.register_program("custom/wipe");
        assert_eq!(a, b);
    }

    #[test]
    fn cloned_material_is_independent() {
        let mut backend = HeadlessBackend::with_builtin_programs();
        let program = backend.find_program(programs::DIAMOND).unwrap();
        let original = backend.create_material(program).unwrap();
        backend.set_progress(original, 0.25).unwrap();

        let copy = backend.clone_material(original).unwrap();
        assert_ne!(copy, original);
        assert_eq!(backend.material(copy).unwrap().progress, 0.25);

        backend.set_progress(copy, 0.75).unwrap();
        assert_eq!(backend.material(original).unwrap().progress, 0.25);
    }

    #[test]
    fn texture_data_length_is_checked() {
        let mut backend = HeadlessBackend::new();
        let err = backend
            .create_texture(UVec2::new(2, 2), &[0u8; 15])
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::InvalidTextureData { expected: 16, actual: 15, .. }
        ));
    }

    #[test]
    fn zero_sized_render_target_is_rejected() {
        let mut backend = HeadlessBackend::new();
        assert!(backend.create_render_target(UVec2::new(0, 10)).is_err());
        assert_eq!(backend.target_allocations(), 0);
    }

    #[test]
    fn blit_records_current_progress() {
        let mut backend = HeadlessBackend::with_builtin_programs().recording_blits(true);
        let program = backend.find_program(programs::ALPHA_FADE).unwrap();
        let material = backend.create_material(program).unwrap();
        let scene = backend.create_render_target(UVec2::new(4, 4)).unwrap();
        let output = backend.create_render_target(UVec2::new(4, 4)).unwrap();
        backend.set_progress(material, 0.5).unwrap();

        backend.blit(material, scene, output).unwrap();
        assert_eq!(backend.blits().len(), 1);
        assert_eq!(backend.blits()[0].progress, 0.5);

        assert_eq!(backend.take_blits().len(), 1);
        assert!(backend.blits().is_empty());
        assert_eq!(backend.blit_count(), 1);
    }

    #[test]
    fn blits_are_only_counted_unless_recording() {
        let mut backend = HeadlessBackend::with_builtin_programs();
        let program = backend.find_program(programs::ALPHA_FADE).unwrap();
        let material = backend.create_material(program).unwrap();
        let scene = backend.create_render_target(UVec2::new(4, 4)).unwrap();
        let output = backend.create_render_target(UVec2::new(4, 4)).unwrap();

        for _ in 0..100 {
            backend.blit(material, scene, output).unwrap();
        }
        assert_eq!(backend.blit_count(), 100);
        assert!(backend.blits().is_empty());
    }

    #[test]
    fn blit_cannot_write_what_it_samples() {
        let mut backend = HeadlessBackend::with_builtin_programs();
        let program = backend.find_program(programs::ALPHA_FADE).unwrap();
        let material = backend.create_material(program).unwrap();
        let origin = backend.create_render_target(UVec2::new(4, 4)).unwrap();
        let scene = backend.create_render_target(UVec2::new(4, 4)).unwrap();
        backend.set_source_texture(material, origin).unwrap();

        assert!(matches!(
            backend.blit(material, scene, scene),
            Err(BackendError::TargetFeedback(t)) if t == scene
        ));
        assert!(matches!(
            backend.blit(material, scene, origin),
            Err(BackendError::TargetFeedback(t)) if t == origin
        ));
        assert!(backend.blits().is_empty());
        assert_eq!(backend.blit_count(), 0);
    }
}
