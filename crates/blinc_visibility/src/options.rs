//! Watch configuration and callback types

use std::fmt;
use std::time::Duration;

use crate::error::{Result, VisibilityError};
use crate::geometry::Viewport;
use crate::registry::WatchId;
use crate::throttle::DEFAULT_DELAY;

/// Callback invoked when a watched element enters or leaves its viewport
///
/// Callbacks run while the context is borrowed for the poll pass, so they
/// cannot call back into it. The only registry change available from inside
/// a callback is removing its own watch with [`VisibilityEvent::unobserve`],
/// applied once the pass finishes. To add watches in response to an event,
/// record what is needed (for example in an `Rc<RefCell<_>>` shared with the
/// callback) and call `observe` after `poll` or `tick` returns.
pub type VisibilityCallback<E> = Box<dyn FnMut(&mut VisibilityEvent<E>)>;

/// Event passed to enter/leave callbacks
#[derive(Debug)]
pub struct VisibilityEvent<E> {
    element: E,
    watch: WatchId,
    viewport: Viewport<E>,
    entered: bool,
    unobserve: bool,
}

impl<E: Copy> VisibilityEvent<E> {
    pub(crate) fn new(element: E, watch: WatchId, viewport: Viewport<E>, entered: bool) -> Self {
        Self {
            element,
            watch,
            viewport,
            entered,
            unobserve: false,
        }
    }

    /// The watched element
    pub fn element(&self) -> E {
        self.element
    }

    /// The watch that fired
    pub fn watch(&self) -> WatchId {
        self.watch
    }

    /// The viewport the element was tested against
    pub fn viewport(&self) -> Viewport<E> {
        self.viewport
    }

    /// `true` for enter, `false` for leave
    pub fn entered(&self) -> bool {
        self.entered
    }

    /// Stop watching after this pass completes
    ///
    /// Typical for one-shot effects such as lazy loading.
    pub fn unobserve(&mut self) {
        self.unobserve = true;
    }

    pub(crate) fn unobserve_requested(&self) -> bool {
        self.unobserve
    }
}

/// Options for a single watch
///
/// # Example
///
/// ```ignore
/// let options = WatchOptions::enter(|event| load_image(event.element()))
///     .distance(200.0)
///     .visibility_threshold(0.25);
/// ```
pub struct WatchOptions<E> {
    /// Called when the element becomes visible
    pub on_enter: Option<VisibilityCallback<E>>,
    /// Called when the element stops being visible
    pub on_leave: Option<VisibilityCallback<E>>,
    /// Extra margin in pixels around the viewport (default from config)
    pub distance: Option<f32>,
    /// Fraction of the element height that must be inside (default from config)
    pub visibility_threshold: Option<f32>,
    /// Throttle window used when this watch binds a new viewport
    pub delay: Option<Duration>,
    /// Explicit viewport; resolved from the element's ancestors when `None`
    pub viewport: Option<Viewport<E>>,
}

impl<E> Default for WatchOptions<E> {
    fn default() -> Self {
        Self {
            on_enter: None,
            on_leave: None,
            distance: None,
            visibility_threshold: None,
            delay: None,
            viewport: None,
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for WatchOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchOptions")
            .field("on_enter", &self.on_enter.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .field("distance", &self.distance)
            .field("visibility_threshold", &self.visibility_threshold)
            .field("delay", &self.delay)
            .field("viewport", &self.viewport)
            .finish()
    }
}

impl<E> WatchOptions<E> {
    /// Options with no callbacks (a one-shot visibility query)
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with a single enter callback
    pub fn enter<F>(callback: F) -> Self
    where
        F: FnMut(&mut VisibilityEvent<E>) + 'static,
    {
        Self::new().on_enter(callback)
    }

    pub fn on_enter<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut VisibilityEvent<E>) + 'static,
    {
        self.on_enter = Some(Box::new(callback));
        self
    }

    pub fn on_leave<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut VisibilityEvent<E>) + 'static,
    {
        self.on_leave = Some(Box::new(callback));
        self
    }

    pub fn distance(mut self, distance: f32) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn visibility_threshold(mut self, threshold: f32) -> Self {
        self.visibility_threshold = Some(threshold);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn viewport(mut self, viewport: Viewport<E>) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Whether this watch needs to be registered for polling
    pub fn has_callbacks(&self) -> bool {
        self.on_enter.is_some() || self.on_leave.is_some()
    }
}

/// Context-wide defaults for watches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityConfig {
    /// Throttle window for newly bound viewports
    pub default_delay: Duration,
    /// Margin applied when a watch does not set `distance`
    pub default_distance: f32,
    /// Threshold applied when a watch does not set `visibility_threshold`
    pub default_visibility_threshold: f32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            default_delay: DEFAULT_DELAY,
            default_distance: 0.0,
            default_visibility_threshold: 0.0,
        }
    }
}

impl VisibilityConfig {
    /// Prefetch-oriented defaults: elements count as visible a screen early
    pub fn prefetch(distance: f32) -> Self {
        Self {
            default_distance: distance,
            ..Default::default()
        }
    }

    /// Re-evaluate on every signal batch the host delivers
    pub fn unthrottled() -> Self {
        Self {
            default_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Apply defaults to a watch's options and validate the result
    pub(crate) fn resolve<E>(&self, options: &WatchOptions<E>) -> Result<WatchParams> {
        let distance = options.distance.unwrap_or(self.default_distance);
        if !distance.is_finite() {
            return Err(VisibilityError::InvalidDistance(distance));
        }

        let visibility_threshold = options
            .visibility_threshold
            .unwrap_or(self.default_visibility_threshold);
        if !(0.0..=1.0).contains(&visibility_threshold) {
            return Err(VisibilityError::InvalidThreshold(visibility_threshold));
        }

        Ok(WatchParams {
            distance,
            visibility_threshold,
            delay: options.delay.unwrap_or(self.default_delay),
        })
    }
}

/// Validated numeric parameters of a watch
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WatchParams {
    pub distance: f32,
    pub visibility_threshold: f32,
    pub delay: Duration,
}
