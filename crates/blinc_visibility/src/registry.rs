//! Watch registry
//!
//! Ordered storage for registered watches. Iteration follows registration
//! order; removal keeps the order of the remaining entries.

use std::fmt;

use slotmap::{new_key_type, SlotMap};

use crate::geometry::Viewport;
use crate::options::VisibilityCallback;

new_key_type! {
    /// Handle to a registered watch
    pub struct WatchId;
}

/// Last computed visibility of a watch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LastVisible {
    /// Not classified yet; differs from both other states
    #[default]
    Unknown,
    /// Overlapped the viewport at the last pass
    Visible,
    /// Outside the viewport at the last pass
    Hidden,
}

impl LastVisible {
    /// Whether `detected` is a transition from this state
    pub fn changed(self, detected: bool) -> bool {
        self != LastVisible::from(detected)
    }

    /// The known visibility, if classified
    pub fn as_bool(self) -> Option<bool> {
        match self {
            LastVisible::Unknown => None,
            LastVisible::Visible => Some(true),
            LastVisible::Hidden => Some(false),
        }
    }
}

impl From<bool> for LastVisible {
    fn from(visible: bool) -> Self {
        if visible {
            LastVisible::Visible
        } else {
            LastVisible::Hidden
        }
    }
}

/// One registered observation
pub(crate) struct WatchEntry<E> {
    pub element: E,
    pub viewport: Viewport<E>,
    pub distance: f32,
    pub visibility_threshold: f32,
    pub on_enter: Option<VisibilityCallback<E>>,
    pub on_leave: Option<VisibilityCallback<E>>,
    pub last_visible: LastVisible,
}

impl<E> WatchEntry<E> {
    pub fn has_callbacks(&self) -> bool {
        self.on_enter.is_some() || self.on_leave.is_some()
    }
}

impl<E: fmt::Debug> fmt::Debug for WatchEntry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchEntry")
            .field("element", &self.element)
            .field("viewport", &self.viewport)
            .field("distance", &self.distance)
            .field("visibility_threshold", &self.visibility_threshold)
            .field("on_enter", &self.on_enter.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .field("last_visible", &self.last_visible)
            .finish()
    }
}

/// Registered watches in registration order
pub(crate) struct WatchRegistry<E> {
    entries: SlotMap<WatchId, WatchEntry<E>>,
    order: Vec<WatchId>,
}

impl<E> Default for WatchRegistry<E> {
    fn default() -> Self {
        Self {
            entries: SlotMap::with_key(),
            order: Vec::new(),
        }
    }
}

impl<E: Copy + PartialEq + fmt::Debug> fmt::Debug for WatchRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<E: Copy + PartialEq> WatchRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: WatchEntry<E>) -> WatchId {
        let id = self.entries.insert(entry);
        self.order.push(id);
        id
    }

    pub fn remove(&mut self, id: WatchId) -> Option<WatchEntry<E>> {
        let entry = self.entries.remove(id)?;
        self.order.retain(|existing| *existing != id);
        Some(entry)
    }

    pub fn get(&self, id: WatchId) -> Option<&WatchEntry<E>> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: WatchId) -> Option<&mut WatchEntry<E>> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: WatchId) -> bool {
        self.entries.contains_key(id)
    }

    /// Snapshot of the current ids in registration order
    pub fn ids(&self) -> Vec<WatchId> {
        self.order.clone()
    }

    /// Watches on `element`, in registration order
    pub fn ids_for_element(&self, element: E) -> Vec<WatchId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.entries[*id].element == element)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchEntry<E>> + '_ {
        self.order.iter().map(move |id| &self.entries[*id])
    }

    /// Whether any watch still targets `viewport`
    pub fn watches_viewport(&self, viewport: Viewport<E>) -> bool {
        self.entries.values().any(|entry| entry.viewport == viewport)
    }

    /// Whether any watch still targets `element` within `viewport`
    pub fn watches_pair(&self, element: E, viewport: Viewport<E>) -> bool {
        self.entries
            .values()
            .any(|entry| entry.element == element && entry.viewport == viewport)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(element: u32, viewport: Viewport<u32>) -> WatchEntry<u32> {
        WatchEntry {
            element,
            viewport,
            distance: 0.0,
            visibility_threshold: 0.0,
            on_enter: Some(Box::new(|_| {})),
            on_leave: None,
            last_visible: LastVisible::Unknown,
        }
    }

    #[test]
    fn test_last_visible_transitions() {
        assert!(LastVisible::Unknown.changed(true));
        assert!(LastVisible::Unknown.changed(false));
        assert!(LastVisible::Visible.changed(false));
        assert!(LastVisible::Hidden.changed(true));
        assert!(!LastVisible::Visible.changed(true));
        assert!(!LastVisible::Hidden.changed(false));
        assert_eq!(LastVisible::Unknown.as_bool(), None);
        assert_eq!(LastVisible::from(true).as_bool(), Some(true));
    }

    #[test]
    fn test_registration_order_survives_removal() {
        let mut registry = WatchRegistry::new();
        let a = registry.insert(entry(1, Viewport::Window));
        let b = registry.insert(entry(2, Viewport::Window));
        let c = registry.insert(entry(3, Viewport::Container(9)));

        assert_eq!(registry.ids(), vec![a, b, c]);

        registry.remove(b);
        let d = registry.insert(entry(4, Viewport::Window));
        assert_eq!(registry.ids(), vec![a, c, d]);
        assert_eq!(
            registry.iter().map(|e| e.element).collect::<Vec<_>>(),
            vec![1, 3, 4]
        );
        assert!(!registry.contains(b));
        assert!(registry.remove(b).is_none());
    }

    #[test]
    fn test_viewport_and_pair_lookup() {
        let mut registry = WatchRegistry::new();
        let a = registry.insert(entry(1, Viewport::Window));
        let b = registry.insert(entry(1, Viewport::Container(9)));
        registry.insert(entry(2, Viewport::Container(9)));

        assert_eq!(registry.ids_for_element(1), vec![a, b]);
        assert!(registry.watches_pair(1, Viewport::Container(9)));

        registry.remove(a);
        assert!(!registry.watches_viewport(Viewport::Window));
        assert!(registry.watches_viewport(Viewport::Container(9)));
        assert_eq!(registry.len(), 2);
    }
}
