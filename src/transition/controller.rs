//! The transition controller: activation, per-frame update and teardown.

use std::collections::HashMap;

use hecs::{Entity, World};

use super::session::{EffectSource, TransitionRequest, TransitionSession, TransitionStatus};
use crate::backend::{EffectBackend, MaterialId, TargetId, TextureId};
use crate::camera::{AudioListener, Camera};
use crate::config::TransitionConfig;
use crate::effect::{EffectKind, GenericEffect, HostMode, NamedEffect, TransitionEffect};
use crate::error::TransitionError;
use crate::render_target::SourceTarget;

/// Everything a controller call needs from the host for one frame.
///
/// Mirrors the render context handed to render nodes: it is built fresh each frame and
/// only borrows the host's world and backend.
pub struct TransitionContext<'a> {
    /// World holding the [`Camera`] entities.
    pub cameras: &'a mut World,
    /// Backend owning programs, materials and render targets.
    pub backend: &'a mut dyn EffectBackend,
    /// Seconds since the current level was loaded.
    pub time: f32,
}

impl<'a> TransitionContext<'a> {
    pub fn new(cameras: &'a mut World, backend: &'a mut dyn EffectBackend, time: f32) -> Self {
        Self {
            cameras,
            backend,
            time,
        }
    }
}

/// Drives one camera transition at a time.
///
/// The controller is the only owner of the transition render target and of every effect
/// attached to a camera. It is created once at startup and must be
/// [`shutdown`](Self::shutdown) with the backend that created its resources.
pub struct TransitionController {
    config: TransitionConfig,
    session: Option<TransitionSession>,
    effects: HashMap<Entity, TransitionEffect>,
    source_target: SourceTarget,
}

impl Default for TransitionController {
    fn default() -> Self {
        Self::new(TransitionConfig::default())
    }
}

impl TransitionController {
    pub fn new(mut config: TransitionConfig) -> Self {
        if !(config.min_duration > 0.0) {
            log::warn!(
                "Invalid minimum transition duration {}, using the default",
                config.min_duration
            );
            config.min_duration = TransitionConfig::default().min_duration;
        }
        Self {
            config,
            session: None,
            effects: HashMap::new(),
            source_target: SourceTarget::new(),
        }
    }

    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    // ========================================================================
    // Observable state
    // ========================================================================

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&TransitionSession> {
        self.session.as_ref()
    }

    pub fn source_camera(&self) -> Option<Entity> {
        self.session.map(|s| s.source)
    }

    pub fn destination_camera(&self) -> Option<Entity> {
        self.session.map(|s| s.destination)
    }

    pub fn duration(&self) -> Option<f32> {
        self.session.map(|s| s.duration)
    }

    pub fn start_time(&self) -> Option<f32> {
        self.session.map(|s| s.start_time)
    }

    pub fn end_time(&self) -> Option<f32> {
        self.session.map(|s| s.end_time())
    }

    /// Progress the running transition has at `time`.
    pub fn progress(&self, time: f32) -> Option<f32> {
        self.session.map(|s| s.progress_at(time))
    }

    /// The offscreen target the source camera renders into. Kept between transitions.
    pub fn render_target(&self) -> Option<TargetId> {
        self.source_target.current()
    }

    /// The effect attached to `camera`, if any.
    pub fn effect(&self, camera: Entity) -> Option<&TransitionEffect> {
        self.effects.get(&camera)
    }

    /// The effect driving the running transition.
    pub fn bound_effect(&self) -> Option<&TransitionEffect> {
        self.session.and_then(|s| self.effects.get(&s.destination))
    }

    // ========================================================================
    // Activation
    // ========================================================================

    /// Transition using one of the built-in effects.
    pub fn activate_effect(
        &mut self,
        ctx: &mut TransitionContext<'_>,
        request: TransitionRequest,
        kind: EffectKind,
    ) -> Result<(), TransitionError> {
        self.activate(ctx, request, EffectSource::Kind(kind))
    }

    /// Transition using a caller supplied material.
    ///
    /// With `copy_material` the effect renders with its own copy, which it destroys when
    /// the transition ends. Otherwise it renders with `material` itself and leaves it
    /// alive afterwards.
    pub fn activate_material(
        &mut self,
        ctx: &mut TransitionContext<'_>,
        request: TransitionRequest,
        material: MaterialId,
        copy_material: bool,
    ) -> Result<(), TransitionError> {
        self.activate(
            ctx,
            request,
            EffectSource::Material {
                material,
                copy_material,
            },
        )
    }

    /// Transition using the mask program with `mask` deciding which pixels switch first.
    pub fn activate_mask(
        &mut self,
        ctx: &mut TransitionContext<'_>,
        request: TransitionRequest,
        mask: TextureId,
    ) -> Result<(), TransitionError> {
        self.activate(ctx, request, EffectSource::Mask(mask))
    }

    /// Start a transition whose effect comes from `source`.
    ///
    /// Arguments and program availability are checked before anything changes: on error
    /// the call is logged and returns without touching a transition already running.
    pub fn activate(
        &mut self,
        ctx: &mut TransitionContext<'_>,
        request: TransitionRequest,
        source: EffectSource,
    ) -> Result<(), TransitionError> {
        if let Err(err) = self.validate(ctx, &request, &source) {
            log::error!("Camera transition aborted: {}", err);
            return Err(err);
        }

        if self.is_active() {
            self.end_active_transition(ctx);
        }

        let TransitionRequest {
            from,
            to,
            duration,
            reassign_audio_listener,
        } = request;

        // Restored if setup fails below
        let from_before = camera_of(ctx.cameras, from, "source")?;
        let to_before = camera_of(ctx.cameras, to, "destination")?;
        let listeners_before = [from, to].map(|e| ctx.cameras.get::<&AudioListener>(e).is_ok());

        if reassign_audio_listener {
            move_audio_listener(ctx.cameras, from, to)?;
        }

        let original_target = from_before.target;
        let duration = duration.max(self.config.min_duration);
        let start_time = ctx.time;

        for entity in [from, to] {
            if let Ok(mut camera) = ctx.cameras.get::<&mut Camera>(entity) {
                camera.active = true;
                camera.enabled = true;
            }
        }

        if let Err(err) = self.bind_effect(ctx, from, to, source) {
            for (entity, before, had_listener) in [
                (from, from_before, listeners_before[0]),
                (to, to_before, listeners_before[1]),
            ] {
                if let Ok(mut camera) = ctx.cameras.get::<&mut Camera>(entity) {
                    *camera = before;
                }
                restore_audio_listener(ctx.cameras, entity, had_listener);
            }
            if let Some(effect) = self.effects.remove(&to) {
                effect.release(ctx.backend, HostMode::Running);
            }
            log::error!("Camera transition aborted during setup: {}", err);
            return Err(err);
        }

        self.session = Some(TransitionSession {
            source: from,
            destination: to,
            duration,
            start_time,
            original_target,
        });
        log::debug!(
            "Camera transition {:?} -> {:?} started at {:.3}s for {:.3}s",
            from,
            to,
            start_time,
            duration
        );
        Ok(())
    }

    fn validate(
        &self,
        ctx: &TransitionContext<'_>,
        request: &TransitionRequest,
        source: &EffectSource,
    ) -> Result<(), TransitionError> {
        let from = camera_of(ctx.cameras, request.from, "source")?;
        camera_of(ctx.cameras, request.to, "destination")?;
        if request.from == request.to {
            return Err(TransitionError::SameCamera(request.from));
        }
        if !from.has_viewport() {
            return Err(TransitionError::EmptyViewport {
                role: "source",
                entity: request.from,
            });
        }

        match *source {
            EffectSource::Kind(kind) => require_program(&*ctx.backend, kind.program_name()),
            EffectSource::Material { material, .. } => {
                if ctx.backend.contains_material(material) {
                    Ok(())
                } else {
                    Err(TransitionError::MissingMaterial)
                }
            }
            EffectSource::Mask(mask) => {
                if !ctx.backend.contains_texture(mask) {
                    return Err(TransitionError::MissingMaskTexture);
                }
                require_program(&*ctx.backend, &self.config.mask_program)
            }
        }
    }

    /// Attach the destination effect and point the source camera at the render target.
    fn bind_effect(
        &mut self,
        ctx: &mut TransitionContext<'_>,
        from: Entity,
        to: Entity,
        source: EffectSource,
    ) -> Result<(), TransitionError> {
        let effect = resolve_effect(
            &mut self.effects,
            ctx.backend,
            to,
            source,
            &self.config.mask_program,
        )?;

        let mut camera = ctx
            .cameras
            .get::<&mut Camera>(from)
            .map_err(|_| TransitionError::MissingCamera {
                role: "source",
                entity: from,
            })?;
        let target = self
            .source_target
            .ensure_valid(ctx.backend, &mut camera, effect)?;

        // A target that already had the right size was not rebound above, and this
        // effect may never have seen it.
        effect.assign_source_texture(ctx.backend, target)?;
        effect.set_progress(ctx.backend, 0.0)?;
        Ok(())
    }

    // ========================================================================
    // Per-frame update and teardown
    // ========================================================================

    /// Advance the running transition to `ctx.time`.
    ///
    /// Pushes the current progress to the effect, follows source camera resizes and
    /// tears the transition down once its end time is reached. Backend errors are
    /// returned with the transition still running.
    pub fn update(
        &mut self,
        ctx: &mut TransitionContext<'_>,
    ) -> Result<TransitionStatus, TransitionError> {
        let Some(session) = self.session else {
            return Ok(TransitionStatus::Idle);
        };
        let progress = session.progress_at(ctx.time);
        log::trace!("Camera transition progress {:.3}", progress);

        if let Some(effect) = self.effects.get_mut(&session.destination) {
            effect.set_progress(ctx.backend, progress)?;

            match ctx.cameras.get::<&mut Camera>(session.source) {
                // Minimized: keep the old target until the camera has pixels again
                Ok(mut camera) => {
                    if camera.has_viewport() {
                        self.source_target
                            .ensure_valid(ctx.backend, &mut camera, effect)?;
                    }
                }
                Err(_) => log::warn!(
                    "Source camera {:?} of the running transition no longer exists",
                    session.source
                ),
            }
        }

        if ctx.time >= session.end_time() {
            self.end_active_transition(ctx);
            return Ok(TransitionStatus::Finished);
        }
        Ok(TransitionStatus::Running { progress })
    }

    /// End the running transition now. Does nothing when idle.
    ///
    /// The source camera gets its original target back and is disabled; the effect on
    /// the destination camera is released. The render target is kept for the next
    /// transition.
    pub fn end_active_transition(&mut self, ctx: &mut TransitionContext<'_>) {
        let Some(session) = self.session.take() else {
            return;
        };

        match ctx.cameras.get::<&mut Camera>(session.source) {
            Ok(mut camera) => {
                camera.target = session.original_target;
                camera.enabled = false;
            }
            Err(_) => log::warn!(
                "Source camera {:?} was removed before its transition ended",
                session.source
            ),
        }

        if let Some(effect) = self.effects.remove(&session.destination) {
            effect.release(ctx.backend, HostMode::Running);
        }

        log::debug!(
            "Camera transition {:?} -> {:?} ended",
            session.source,
            session.destination
        );
    }

    /// End any transition, release every effect and the render target.
    pub fn shutdown(mut self, ctx: &mut TransitionContext<'_>) {
        self.end_active_transition(ctx);
        for (_, effect) in self.effects.drain() {
            effect.release(ctx.backend, HostMode::Running);
        }
        self.source_target.release(ctx.backend);
    }

    // ========================================================================
    // Effects outside of transitions
    // ========================================================================

    /// Attach `effect` to `camera`, returning the effect it replaces.
    ///
    /// A later activation targeting `camera` reuses an attached effect of the matching
    /// type instead of creating a new one. Attaching to the destination of the running
    /// transition replaces the effect that transition drives.
    pub fn attach_effect(
        &mut self,
        camera: Entity,
        effect: impl Into<TransitionEffect>,
    ) -> Option<TransitionEffect> {
        self.effects.insert(camera, effect.into())
    }

    /// Detach and return the effect on `camera`. The caller becomes responsible for
    /// releasing it.
    pub fn detach_effect(&mut self, camera: Entity) -> Option<TransitionEffect> {
        self.effects.remove(&camera)
    }

    /// Apply the effect attached to `camera` to its rendered image.
    ///
    /// `scene` holds what `camera` rendered this frame; the blended result is written to
    /// `output`. Returns `false` when nothing was drawn and the host should present
    /// `scene` as is.
    pub fn render_camera(
        &mut self,
        backend: &mut dyn EffectBackend,
        camera: Entity,
        scene: TargetId,
        output: TargetId,
    ) -> Result<bool, TransitionError> {
        match self.effects.get_mut(&camera) {
            Some(effect) => effect.render(backend, scene, output),
            None => Ok(false),
        }
    }
}

impl Drop for TransitionController {
    fn drop(&mut self) {
        if self.source_target.current().is_some() || !self.effects.is_empty() {
            log::warn!(
                "TransitionController dropped without shutdown(); its render target and effects were not released"
            );
        }
    }
}

fn camera_of(
    cameras: &World,
    entity: Entity,
    role: &'static str,
) -> Result<Camera, TransitionError> {
    cameras
        .get::<&Camera>(entity)
        .map(|camera| *camera)
        .map_err(|_| TransitionError::MissingCamera { role, entity })
}

fn require_program(backend: &dyn EffectBackend, name: &str) -> Result<(), TransitionError> {
    match backend.find_program(name) {
        Some(_) => Ok(()),
        None => Err(TransitionError::ProgramNotFound(name.to_string())),
    }
}

fn move_audio_listener(
    cameras: &mut World,
    from: Entity,
    to: Entity,
) -> Result<(), TransitionError> {
    if cameras.remove_one::<AudioListener>(from).is_ok() {
        log::debug!("Removed audio listener from camera {:?}", from);
    }
    if cameras.get::<&AudioListener>(to).is_err() {
        cameras
            .insert_one(to, AudioListener)
            .map_err(|_| TransitionError::MissingCamera {
                role: "destination",
                entity: to,
            })?;
    }
    Ok(())
}

fn restore_audio_listener(cameras: &mut World, entity: Entity, had_listener: bool) {
    let has_listener = cameras.get::<&AudioListener>(entity).is_ok();
    if had_listener && !has_listener {
        let _ = cameras.insert_one(entity, AudioListener);
    } else if !had_listener && has_listener {
        let _ = cameras.remove_one::<AudioListener>(entity);
    }
}

/// Find or create the effect on `camera` for `source` and configure it.
///
/// An attached effect of the matching type is reused; an effect of another type is
/// released and replaced.
fn resolve_effect<'e>(
    effects: &'e mut HashMap<Entity, TransitionEffect>,
    backend: &mut dyn EffectBackend,
    camera: Entity,
    source: EffectSource,
    mask_program: &str,
) -> Result<&'e mut TransitionEffect, TransitionError> {
    let effect = match source {
        EffectSource::Kind(kind) => {
            let mut named = match effects.remove(&camera) {
                Some(TransitionEffect::Named(existing)) if existing.kind() == kind => existing,
                other => {
                    if let Some(other) = other {
                        other.release(backend, HostMode::Running);
                    }
                    NamedEffect::new(kind)
                }
            };
            named.ensure_material(backend)?;
            TransitionEffect::Named(named)
        }
        EffectSource::Material {
            material,
            copy_material,
        } => {
            let material = if copy_material {
                backend.clone_material(material)?
            } else {
                material
            };
            let mut generic = take_generic(effects, backend, camera);
            generic.set_material(backend, material, copy_material);
            TransitionEffect::Generic(generic)
        }
        EffectSource::Mask(mask) => {
            let program = backend
                .find_program(mask_program)
                .ok_or_else(|| TransitionError::ProgramNotFound(mask_program.to_string()))?;
            let material = backend.create_material(program)?;
            if let Err(err) = backend.set_mask_texture(material, mask) {
                backend.destroy_material(material);
                return Err(err.into());
            }
            let mut generic = take_generic(effects, backend, camera);
            generic.set_material(backend, material, true);
            TransitionEffect::Generic(generic)
        }
    };
    Ok(effects.entry(camera).or_insert(effect))
}

fn take_generic(
    effects: &mut HashMap<Entity, TransitionEffect>,
    backend: &mut dyn EffectBackend,
    camera: Entity,
) -> GenericEffect {
    match effects.remove(&camera) {
        Some(TransitionEffect::Generic(existing)) => existing,
        Some(other) => {
            other.release(backend, HostMode::Running);
            GenericEffect::new()
        }
        None => GenericEffect::new(),
    }
}
