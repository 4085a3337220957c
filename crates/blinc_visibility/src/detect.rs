//! Visibility detection
//!
//! [`is_visible`] is the pure intersection test. [`GeometryCache`] keeps the
//! expensive part of the input, the element's cumulative offset, between
//! polls.
//!
//! # Offset cache invalidation
//!
//! A cached offset is reused until the viewport's container height differs
//! from the value recorded alongside it. Layout changes that move an element
//! without changing the container height are not noticed; call
//! [`VisibilityContext::invalidate_geometry`](crate::VisibilityContext::invalidate_geometry)
//! after such changes.

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::geometry::{GeometryAdapter, Viewport};

/// Inputs to a single visibility test
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VisibilityQuery {
    /// Element offset from the viewport's scroll origin
    pub elem_top: f32,
    /// Element height
    pub elem_height: f32,
    /// Viewport scroll offset
    pub scroll_offset: f32,
    /// Visible height of the viewport
    pub viewport_height: f32,
    /// Extra margin added to both ends of the viewport span (may be negative)
    pub distance: f32,
    /// Fraction of the element height that must overlap (0.0 = any overlap)
    pub visibility_threshold: f32,
}

/// Test whether an element overlaps the viewport span
///
/// The element span is shrunk by `visibility_threshold * elem_height` on both
/// ends and the viewport span is grown by `distance` on both ends. The element
/// is hidden if its adjusted bottom lies above the viewport top, or its
/// adjusted top lies below the viewport bottom. Touching edges count as
/// visible.
pub fn is_visible(query: &VisibilityQuery) -> bool {
    let inset = query.visibility_threshold * query.elem_height;
    let bottom = query.elem_top + query.elem_height - inset;
    let top = query.elem_top + inset;

    let view_top = query.scroll_offset - query.distance;
    let view_bottom = query.scroll_offset + query.viewport_height + query.distance;

    !(bottom < view_top || top > view_bottom)
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct CachedOffset {
    top: f32,
    container_height: f32,
}

/// Side-table of element offsets keyed by (element, viewport)
#[derive(Debug)]
pub(crate) struct GeometryCache<E> {
    offsets: FxHashMap<(E, Viewport<E>), CachedOffset>,
    recomputations: u64,
}

impl<E> Default for GeometryCache<E> {
    fn default() -> Self {
        Self {
            offsets: FxHashMap::default(),
            recomputations: 0,
        }
    }
}

impl<E: Copy + Eq + Hash + fmt::Debug> GeometryCache<E> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cached offset of `element` in `viewport`, recomputed when stale
    pub(crate) fn element_top<H>(&mut self, host: &H, element: E, viewport: Viewport<E>) -> f32
    where
        H: GeometryAdapter<Element = E> + ?Sized,
    {
        let container_height = host.container_height(viewport).unwrap_or(0.0);
        if let Some(top) = self.fresh(element, viewport, container_height) {
            return top;
        }

        let top = query_offset(host, element, viewport);
        self.recomputations += 1;
        self.offsets.insert(
            (element, viewport),
            CachedOffset {
                top,
                container_height,
            },
        );
        top
    }

    fn fresh(&self, element: E, viewport: Viewport<E>, container_height: f32) -> Option<f32> {
        self.offsets
            .get(&(element, viewport))
            .filter(|cached| cached.container_height == container_height)
            .map(|cached| cached.top)
    }

    /// Gather the full query for an element, using the cached offset
    pub(crate) fn measure<H>(
        &mut self,
        host: &H,
        element: E,
        viewport: Viewport<E>,
        distance: f32,
        visibility_threshold: f32,
    ) -> VisibilityQuery
    where
        H: GeometryAdapter<Element = E> + ?Sized,
    {
        let elem_top = self.element_top(host, element, viewport);
        query_at(host, element, viewport, elem_top, distance, visibility_threshold)
    }

    /// Measure and test in one step
    pub(crate) fn detect<H>(
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
        is_visible(&self.measure(host, element, viewport, distance, visibility_threshold))
    }

    /// Measure and test without storing a new cache entry
    ///
    /// A fresh entry left by a live watch is still reused.
    pub(crate) fn detect_uncached<H>(
        &self,
        host: &H,
        element: E,
        viewport: Viewport<E>,
        distance: f32,
        visibility_threshold: f32,
    ) -> bool
    where
        H: GeometryAdapter<Element = E> + ?Sized,
    {
        let container_height = host.container_height(viewport).unwrap_or(0.0);
        let elem_top = self
            .fresh(element, viewport, container_height)
            .unwrap_or_else(|| query_offset(host, element, viewport));
        is_visible(&query_at(host, element, viewport, elem_top, distance, visibility_threshold))
    }

    pub(crate) fn evict(&mut self, element: E, viewport: Viewport<E>) {
        self.offsets.remove(&(element, viewport));
    }

    pub(crate) fn evict_element(&mut self, element: E) {
        self.offsets.retain(|(cached, _), _| *cached != element);
    }

    pub(crate) fn clear(&mut self) {
        self.offsets.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.offsets.len()
    }

    pub(crate) fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

fn query_offset<H>(host: &H, element: H::Element, viewport: Viewport<H::Element>) -> f32
where
    H: GeometryAdapter + ?Sized,
{
    host.element_offset(element, viewport).unwrap_or_else(|| {
        tracing::trace!("No offset for {:?} in {:?}, using 0", element, viewport);
        0.0
    })
}

fn query_at<H>(
    host: &H,
    element: H::Element,
    viewport: Viewport<H::Element>,
    elem_top: f32,
    distance: f32,
    visibility_threshold: f32,
) -> VisibilityQuery
where
    H: GeometryAdapter + ?Sized,
{
    VisibilityQuery {
        elem_top,
        elem_height: host.element_height(element).unwrap_or(0.0),
        scroll_offset: host.scroll_offset(viewport).unwrap_or(0.0),
        viewport_height: host.viewport_height(viewport).unwrap_or(0.0),
        distance,
        visibility_threshold,
    }
}
