//! Camera-to-camera transitions.
//!
//! A [`TransitionController`] blends from one camera to another over a fixed duration.
//! While the transition runs, the outgoing camera renders into an offscreen target and
//! an effect attached to the incoming camera mixes that image with its own.
//!
//! # Overview
//!
//! - Start a transition with one of the `activate_*` methods. Starting a new one while
//!   another is running ends the old one first.
//! - Call [`TransitionController::update`] once per frame with the current level time.
//! - When the duration has elapsed the outgoing camera is disabled and pointed back at
//!   whatever it rendered into before.
//!
//! # Example
//!
//! ```
//! use camswap::{
//!     Camera, EffectKind, HeadlessBackend, TransitionContext, TransitionController,
//!     TransitionRequest, TransitionStatus, World,
//! };
//!
//! let mut world = World::new();
//! let mut backend = HeadlessBackend::with_builtin_programs();
//! let mut controller = TransitionController::default();
//!
//! let overview = world.spawn((Camera::new(),));
//! let closeup = world.spawn((Camera::new().disabled(),));
//!
//! let mut ctx = TransitionContext::new(&mut world, &mut backend, 0.0);
//! let request = TransitionRequest::new(overview, closeup, 0.5);
//! controller.activate_effect(&mut ctx, request, EffectKind::Diamond)?;
//!
//! // Once per frame
//! ctx.time = 0.25;
//! assert_eq!(controller.update(&mut ctx)?, TransitionStatus::Running { progress: 0.5 });
//! ctx.time = 0.5;
//! assert_eq!(controller.update(&mut ctx)?, TransitionStatus::Finished);
//!
//! controller.shutdown(&mut ctx);
//! # Ok::<(), camswap::TransitionError>(())
//! ```

mod controller;
mod session;

pub use controller::{TransitionContext, TransitionController};
pub use session::{EffectSource, TransitionRequest, TransitionSession, TransitionStatus};
