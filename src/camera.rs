use glam::UVec2;

use crate::backend::TargetId;

/// A camera taking part in transitions.
///
/// Cameras live as components on `hecs` entities; the entity is the camera's identity.
/// The host renders every active, enabled camera into its [`target`](Self::target), or
/// onto the screen when the target is `None`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Size of the image this camera produces, in pixels.
    pub pixel_size: UVec2,
    /// Offscreen output. `None` renders to the screen.
    pub target: Option<TargetId>,
    /// Whether the camera's entity takes part in the frame at all.
    pub active: bool,
    /// Whether the camera renders this frame.
    pub enabled: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pixel_size: UVec2::new(800, 600),
            target: None,
            active: true,
            enabled: true,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pixel_size(mut self, width: u32, height: u32) -> Self {
        self.pixel_size = UVec2::new(width, height);
        self
    }

    pub fn rendering_to(mut self, target: TargetId) -> Self {
        self.target = Some(target);
        self
    }

    /// Start disabled and inactive, as a camera waiting to be transitioned to.
    pub fn disabled(mut self) -> Self {
        self.active = false;
        self.enabled = false;
        self
    }

    /// Whether both pixel dimensions are non-zero.
    ///
    /// A minimized window reports a zero-sized viewport; render targets are never
    /// allocated for it.
    pub fn has_viewport(&self) -> bool {
        self.pixel_size.x > 0 && self.pixel_size.y > 0
    }
}

/// Marker component: the camera entity that hears the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AudioListener;
