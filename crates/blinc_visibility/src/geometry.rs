//! Host geometry and signal abstractions
//!
//! The visibility tracker never measures anything itself. The host UI
//! toolkit implements [`GeometryAdapter`] to answer layout queries and
//! [`SignalBinder`] to forward scroll/resize notifications for a viewport
//! into [`VisibilityContext::handle_signal`](crate::VisibilityContext::handle_signal).
//!
//! A single adapter covers both the root window and arbitrary scroll
//! containers; the [`Viewport`] argument selects which one is meant.

use std::fmt::Debug;
use std::hash::Hash;

/// The scrolling region an element is tested against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Viewport<E> {
    /// The root viewport (the window itself)
    Window,
    /// A scrolling ancestor element
    Container(E),
}

impl<E> Default for Viewport<E> {
    fn default() -> Self {
        Viewport::Window
    }
}

impl<E: Copy> Viewport<E> {
    /// The container element, if this is not the root viewport
    pub fn container(&self) -> Option<E> {
        match self {
            Viewport::Window => None,
            Viewport::Container(element) => Some(*element),
        }
    }

    /// Check if this is the root viewport
    pub fn is_window(&self) -> bool {
        matches!(self, Viewport::Window)
    }
}

/// Computed overflow mode of an element
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Overflow {
    /// Content is not clipped
    #[default]
    Visible,
    /// Content is clipped without scrolling
    Hidden,
    /// Content is clipped, no programmatic scrolling either
    Clip,
    /// Scrolls when content overflows
    Auto,
    /// Always scrollable
    Scroll,
}

impl Overflow {
    /// Whether an element with this overflow mode acts as a scroll viewport
    pub fn is_scrollable(self) -> bool {
        matches!(self, Overflow::Auto | Overflow::Scroll)
    }
}

/// Notification kinds forwarded from a bound viewport
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewportSignal {
    /// The viewport's scroll offset changed
    Scroll,
    /// The viewport was resized
    Resize,
}

/// Layout queries answered by the host UI toolkit
///
/// All measurements are in logical pixels along the scroll axis. A query
/// that cannot be answered (for example an element that is not attached to
/// a laid-out tree) returns `None` and is treated as `0.0`.
pub trait GeometryAdapter {
    /// Element handle type (node id, entity, etc.)
    type Element: Copy + Eq + Hash + Debug;

    /// Cumulative offset of `element` from the scroll origin of `viewport`
    ///
    /// This typically walks the ancestor chain and may be expensive; results
    /// are cached by the tracker.
    fn element_offset(&self, element: Self::Element, viewport: Viewport<Self::Element>)
        -> Option<f32>;

    /// Height of the element's box
    fn element_height(&self, element: Self::Element) -> Option<f32>;

    /// Visible (client) height of the viewport
    fn viewport_height(&self, viewport: Viewport<Self::Element>) -> Option<f32>;

    /// Current scroll offset of the viewport
    fn scroll_offset(&self, viewport: Viewport<Self::Element>) -> Option<f32>;

    /// Total content height of the viewport
    ///
    /// Used only to decide when cached element offsets are stale: a changed
    /// value means layout may have moved things.
    fn container_height(&self, viewport: Viewport<Self::Element>) -> Option<f32>;

    /// Parent of an element, `None` at the root
    fn parent(&self, element: Self::Element) -> Option<Self::Element>;

    /// Computed overflow mode of an element
    fn overflow(&self, _element: Self::Element) -> Overflow {
        Overflow::Visible
    }
}

/// Scroll/resize subscription management on the host
///
/// After `subscribe`, the host forwards every scroll and resize
/// notification of that viewport to the tracker. The tracker calls
/// `subscribe` at most once per viewport until the matching `unsubscribe`.
pub trait SignalBinder: GeometryAdapter {
    /// Start forwarding scroll and resize signals for `viewport`
    fn subscribe(&mut self, viewport: Viewport<Self::Element>);

    /// Stop forwarding signals for `viewport`
    fn unsubscribe(&mut self, viewport: Viewport<Self::Element>);
}

/// Find the viewport an element scrolls within
///
/// Walks the ancestor chain and returns the first ancestor whose overflow is
/// `Auto` or `Scroll`, falling back to the window.
pub fn resolve_viewport<H>(host: &H, element: H::Element) -> Viewport<H::Element>
where
    H: GeometryAdapter + ?Sized,
{
    let mut current = element;
    while let Some(parent) = host.parent(current) {
        if host.overflow(parent).is_scrollable() {
            return Viewport::Container(parent);
        }
        current = parent;
    }
    Viewport::Window
}
