//! Blinc Visibility Tracking
//!
//! Detects when elements scroll into or out of their viewport and
//! dispatches enter/leave callbacks on each transition.
//!
//! - **Visibility test**: span overlap with a configurable threshold and
//!   detection margin ([`is_visible`])
//! - **Watch registry**: per-watch last-known visibility, edge-triggered
//!   callbacks ([`VisibilityContext::poll`])
//! - **Throttled re-evaluation**: scroll/resize bursts coalesced into one
//!   pass per window, one binding per viewport ([`Throttle`])
//! - **Viewport resolution**: nearest scrollable ancestor or the window
//!   ([`resolve_viewport`])
//!
//! The host toolkit supplies geometry through [`GeometryAdapter`] and
//! forwards scroll/resize notifications for viewports it was asked to
//! [`subscribe`](SignalBinder::subscribe) to.
//!
//! # Example
//!
//! ```ignore
//! use blinc_visibility::prelude::*;
//!
//! let mut visibility = VisibilityContext::new();
//!
//! let observation = visibility.observe(
//!     &mut host,
//!     image_node,
//!     WatchOptions::new()
//!         .on_enter(|event| start_fade_in(event.element()))
//!         .on_leave(|event| pause_video(event.element()))
//!         .visibility_threshold(0.5),
//! )?;
//!
//! // Host event loop
//! visibility.handle_signal(Viewport::Window, ViewportSignal::Scroll, Instant::now());
//! visibility.tick(&mut host, Instant::now())?;
//! ```

pub mod context;
pub mod detect;
pub mod error;
pub mod geometry;
pub mod options;
pub mod registry;
pub mod throttle;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{Observation, PollReport, VisibilityContext, VisibilityStats};
pub use detect::{is_visible, VisibilityQuery};
pub use error::{CallbackFailure, Result, VisibilityError};
pub use geometry::{
    resolve_viewport, GeometryAdapter, Overflow, SignalBinder, Viewport, ViewportSignal,
};
pub use options::{VisibilityCallback, VisibilityConfig, VisibilityEvent, WatchOptions};
pub use registry::{LastVisible, WatchId};
pub use throttle::{Throttle, DEFAULT_DELAY};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{Observation, VisibilityContext};
    pub use crate::error::{Result, VisibilityError};
    pub use crate::geometry::{GeometryAdapter, Overflow, SignalBinder, Viewport, ViewportSignal};
    pub use crate::options::{VisibilityConfig, VisibilityEvent, WatchOptions};
    pub use crate::registry::WatchId;
}
