use crate::programs;

/// Tunables for a [`TransitionController`](crate::TransitionController).
///
/// # Example
/// ```
/// use camswap::TransitionConfig;
///
/// let config = TransitionConfig::new()
///     .min_duration(0.05)
///     .mask_program("my_game/ink_mask");
/// assert_eq!(config.min_duration, 0.05);
/// ```
#[derive(Clone, Debug)]
pub struct TransitionConfig {
    /// Durations below this are clamped up to it, so progress never divides by zero.
    pub min_duration: f32,
    /// Program used by [`activate_mask`](crate::TransitionController::activate_mask).
    pub mask_program: String,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            min_duration: 0.01,
            mask_program: programs::FADE_MASK.to_string(),
        }
    }
}

impl TransitionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_duration(mut self, seconds: f32) -> Self {
        self.min_duration = seconds;
        self
    }

    pub fn mask_program(mut self, name: impl Into<String>) -> Self {
        self.mask_program = name.into();
        self
    }
}
