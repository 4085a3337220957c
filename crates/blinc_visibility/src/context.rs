//! Visibility context
//!
//! [`VisibilityContext`] owns every piece of tracker state: the watch
//! registry, the element offset cache and one throttle per bound viewport.
//! The host owns the element tree and passes itself in on each call.
//!
//! # Driving the context
//!
//! ```ignore
//! let mut visibility = VisibilityContext::new();
//!
//! visibility.observe(&mut host, node, WatchOptions::enter(|event| {
//!     load_image(event.element());
//!     event.unobserve();
//! }))?;
//!
//! // In the host's scroll/resize handlers for a subscribed viewport:
//! visibility.handle_signal(viewport, ViewportSignal::Scroll, Instant::now());
//!
//! // Once per frame (or when `next_deadline()` elapses):
//! visibility.tick(&mut host, Instant::now())?;
//! ```

use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::detect::GeometryCache;
use crate::error::{CallbackFailure, Result, VisibilityError};
use crate::geometry::{resolve_viewport, GeometryAdapter, SignalBinder, Viewport, ViewportSignal};
use crate::options::{VisibilityConfig, VisibilityEvent, WatchOptions};
use crate::registry::{LastVisible, WatchEntry, WatchId, WatchRegistry};
use crate::throttle::Throttle;

/// Result of [`VisibilityContext::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// Visibility of the element right now
    pub visible: bool,
    /// The registered watch, if callbacks were supplied and it is still active
    pub watch: Option<WatchId>,
}

/// Transitions detected by one poll pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Watches that became visible, in evaluation order
    pub entered: SmallVec<[WatchId; 4]>,
    /// Watches that stopped being visible, in evaluation order
    pub left: SmallVec<[WatchId; 4]>,
    /// Number of watches evaluated
    pub evaluated: usize,
}

impl PollReport {
    /// Check if the pass detected no transitions
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.left.is_empty()
    }
}

/// Statistics about the context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityStats {
    pub watch_count: usize,
    pub bound_viewports: usize,
    pub cached_offsets: usize,
    /// Poll passes run since creation
    pub passes: u64,
    /// Element offsets computed through the host (cache misses)
    pub offset_recomputations: u64,
}

/// Tracks watched elements and dispatches enter/leave callbacks
pub struct VisibilityContext<E> {
    config: VisibilityConfig,
    registry: WatchRegistry<E>,
    cache: GeometryCache<E>,
    /// One throttle per bound viewport; presence is the "bound" flag
    bindings: FxHashMap<Viewport<E>, Throttle>,
    passes: u64,
}

impl<E> fmt::Debug for VisibilityContext<E>
where
    E: Copy + Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityContext")
            .field("config", &self.config)
            .field("watches", &self.registry.len())
            .field("bindings", &self.bindings)
            .field("passes", &self.passes)
            .finish()
    }
}

impl<E> Default for VisibilityContext<E>
where
    E: Copy + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> VisibilityContext<E>
where
    E: Copy + Eq + Hash + fmt::Debug,
{
    /// Create a context with default configuration
    pub fn new() -> Self {
        Self::with_config(VisibilityConfig::default())
    }

    /// Create a context with custom defaults
    pub fn with_config(config: VisibilityConfig) -> Self {
        Self {
            config,
            registry: WatchRegistry::new(),
            cache: GeometryCache::new(),
            bindings: FxHashMap::default(),
            passes: 0,
        }
    }

    pub fn config(&self) -> &VisibilityConfig {
        &self.config
    }

    // =========================================================================
    // Binding
    // =========================================================================

    /// Watch an element and report its current visibility
    ///
    /// When `options` carries an enter or leave callback the watch is
    /// registered, one poll pass runs immediately (so an element that is
    /// already visible fires `on_enter` before this returns) and the
    /// viewport is bound to the host's scroll/resize signals if it was not
    /// already. Without callbacks this is a side-effect free query.
    ///
    /// The viewport is `options.viewport` if set, otherwise the nearest
    /// scrollable ancestor of `element`, otherwise the window.
    pub fn observe<H>(
        &mut self,
        host: &mut H,
        element: E,
        options: WatchOptions<E>,
    ) -> Result<Observation>
    where
        H: SignalBinder<Element = E> + ?Sized,
    {
        let params = self.config.resolve(&options)?;
        let viewport = match options.viewport {
            Some(viewport) => viewport,
            None => resolve_viewport(&*host, element),
        };
        let WatchOptions {
            on_enter, on_leave, ..
        } = options;

        let mut watch = None;
        let mut pass = Ok(());
        if on_enter.is_some() || on_leave.is_some() {
            let id = self.registry.insert(WatchEntry {
                element,
                viewport,
                distance: params.distance,
                visibility_threshold: params.visibility_threshold,
                on_enter,
                on_leave,
                last_visible: LastVisible::Unknown,
            });
            tracing::debug!("Watching {:?} in {:?} as {:?}", element, viewport, id);

            self.bind(host, viewport, params.delay);
            pass = self.poll(host).map(|_| ());
            watch = Some(id).filter(|id| self.registry.contains(*id));
        }

        let visible = self.current_visibility(
            &*host,
            element,
            viewport,
            params.distance,
            params.visibility_threshold,
        );
        pass?;

        Ok(Observation { visible, watch })
    }

    /// Current visibility of an element, without registering anything
    pub fn is_visible<H>(
        &mut self,
        host: &H,
        element: E,
        options: &WatchOptions<E>,
    ) -> Result<bool>
    where
        H: GeometryAdapter<Element = E> + ?Sized,
    {
        let params = self.config.resolve(options)?;
        let viewport = options
            .viewport
            .unwrap_or_else(|| resolve_viewport(host, element));
        Ok(self.current_visibility(
            host,
            element,
            viewport,
            params.distance,
            params.visibility_threshold,
        ))
    }

    /// Only pairs covered by a live watch keep a cache entry
    fn current_visibility<H>(
        &mut self,
        host: &H,
        element: E,
        viewport: Viewport<E>,
        distance: f32,
        visibility_threshold: f32,
    ) -> bool
    where
        H: GeometryAdapter<Element = E> + ?Sized,
    {
        if self.registry.watches_pair(element, viewport) {
            self.cache
                .detect(host, element, viewport, distance, visibility_threshold)
        } else {
            self.cache
                .detect_uncached(host, element, viewport, distance, visibility_threshold)
        }
    }

    /// Remove a watch
    ///
    /// Unsubscribes the viewport when this was its last watch.
    pub fn unobserve<H>(&mut self, host: &mut H, watch: WatchId) -> Result<()>
    where
        H: SignalBinder<Element = E> + ?Sized,
    {
        self.remove_watch(host, watch)
            .map(|_| ())
            .ok_or(VisibilityError::UnknownWatch(watch))
    }

    /// Remove every watch on an element, returning how many were removed
    pub fn unobserve_element<H>(&mut self, host: &mut H, element: E) -> usize
    where
        H: SignalBinder<Element = E> + ?Sized,
    {
        let ids = self.registry.ids_for_element(element);
        for id in &ids {
            self.remove_watch(host, *id);
        }
        ids.len()
    }

    /// Check if a viewport is subscribed to host signals
    pub fn is_bound(&self, viewport: Viewport<E>) -> bool {
        self.bindings.contains_key(&viewport)
    }

    fn bind<H>(&mut self, host: &mut H, viewport: Viewport<E>, delay: Duration)
    where
        H: SignalBinder<Element = E> + ?Sized,
    {
        if self.bindings.contains_key(&viewport) {
            return;
        }
        self.bindings.insert(viewport, Throttle::new(delay));
        host.subscribe(viewport);
        tracing::debug!("Bound {:?} (throttle {:?})", viewport, delay);
    }

    fn remove_watch<H>(&mut self, host: &mut H, id: WatchId) -> Option<WatchEntry<E>>
    where
        H: SignalBinder<Element = E> + ?Sized,
    {
        let entry = self.registry.remove(id)?;
        tracing::debug!("Removed watch {:?} on {:?}", id, entry.element);

        if !self.registry.watches_pair(entry.element, entry.viewport) {
            self.cache.evict(entry.element, entry.viewport);
        }
        if !self.registry.watches_viewport(entry.viewport)
            && self.bindings.remove(&entry.viewport).is_some()
        {
            host.unsubscribe(entry.viewport);
            tracing::debug!("Unbound {:?}", entry.viewport);
        }
        Some(entry)
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Re-evaluate every watch and fire callbacks on transitions
    ///
    /// Watches are evaluated in registration order. A watch fires when its
    /// visibility differs from the last recorded value (the first
    /// classification always fires); the new value is recorded whether or
    /// not the matching callback exists.
    ///
    /// A panicking callback does not stop the pass. Panics are collected and
    /// returned as [`VisibilityError::CallbackPanicked`] once every watch has
    /// been evaluated.
    pub fn poll<H>(&mut self, host: &mut H) -> Result<PollReport>
    where
        H: SignalBinder<Element = E> + ?Sized,
    {
        self.passes += 1;
        let mut report = PollReport::default();
        let mut failures = Vec::new();
        let mut released: SmallVec<[WatchId; 4]> = SmallVec::new();

        for id in self.registry.ids() {
            let Some(entry) = self.registry.get(id) else {
                continue;
            };
            if !entry.has_callbacks() {
                continue;
            }
            let (element, viewport) = (entry.element, entry.viewport);
            let detected = self.cache.detect(
                &*host,
                element,
                viewport,
                entry.distance,
                entry.visibility_threshold,
            );
            report.evaluated += 1;

            let Some(entry) = self.registry.get_mut(id) else {
                continue;
            };
            if !entry.last_visible.changed(detected) {
                continue;
            }

            let callback = if detected {
                entry.on_enter.as_mut()
            } else {
                entry.on_leave.as_mut()
            };
            if let Some(callback) = callback {
                let mut event = VisibilityEvent::new(element, id, viewport, detected);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(&mut event)));
                if let Err(payload) = outcome {
                    let message = panic_message(payload.as_ref());
                    tracing::warn!("Visibility callback for {:?} panicked: {}", id, message);
                    failures.push(CallbackFailure {
                        watch: id,
                        entered: detected,
                        message,
                    });
                }
                if event.unobserve_requested() {
                    released.push(id);
                }
            }

            entry.last_visible = LastVisible::from(detected);
            if detected {
                report.entered.push(id);
            } else {
                report.left.push(id);
            }
        }

        for id in released {
            self.remove_watch(host, id);
        }

        tracing::trace!(
            "Poll #{}: {} evaluated, {} entered, {} left",
            self.passes,
            report.evaluated,
            report.entered.len(),
            report.left.len()
        );

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(VisibilityError::CallbackPanicked { failures })
        }
    }

    // =========================================================================
    // Signals
    // =========================================================================

    /// Feed a scroll or resize notification from a bound viewport
    ///
    /// Returns `true` if this signal scheduled a new deferred poll. Signals
    /// arriving while a poll is already pending for the viewport, or for
    /// viewports that are not bound, are dropped.
    pub fn handle_signal(
        &mut self,
        viewport: Viewport<E>,
        signal: ViewportSignal,
        now: Instant,
    ) -> bool {
        match self.bindings.get_mut(&viewport) {
            Some(throttle) => {
                let scheduled = throttle.trigger(now);
                if scheduled {
                    tracing::trace!("{:?} on {:?} scheduled a poll", signal, viewport);
                }
                scheduled
            }
            None => {
                tracing::trace!("Ignoring {:?} for unbound {:?}", signal, viewport);
                false
            }
        }
    }

    /// Run the deferred poll if any viewport's throttle window has elapsed
    ///
    /// All due throttles are cleared and a single pass covers them.
    pub fn tick<H>(&mut self, host: &mut H, now: Instant) -> Result<Option<PollReport>>
    where
        H: SignalBinder<Element = E> + ?Sized,
    {
        let mut due = false;
        for throttle in self.bindings.values_mut() {
            due |= throttle.take_due(now);
        }
        if !due {
            return Ok(None);
        }
        self.poll(host).map(Some)
    }

    /// Earliest pending poll deadline across all viewports
    ///
    /// Hosts without a per-frame tick can arm a timer for this instant.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.bindings.values().filter_map(|t| t.deadline()).min()
    }

    // =========================================================================
    // Geometry cache
    // =========================================================================

    /// Drop all cached element offsets
    ///
    /// Call after layout changes that leave container heights untouched.
    pub fn invalidate_geometry(&mut self) {
        self.cache.clear();
    }

    /// Drop cached offsets for one element
    pub fn invalidate_element(&mut self, element: E) {
        self.cache.evict_element(element);
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Last recorded visibility of a watch
    pub fn last_visible(&self, watch: WatchId) -> Option<LastVisible> {
        self.registry.get(watch).map(|entry| entry.last_visible)
    }

    /// Number of registered watches
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn stats(&self) -> VisibilityStats {
        VisibilityStats {
            watch_count: self.registry.len(),
            bound_viewports: self.bindings.len(),
            cached_offsets: self.cache.len(),
            passes: self.passes,
            offset_recomputations: self.cache.recomputations(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
