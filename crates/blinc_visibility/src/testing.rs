//! In-memory host used by unit tests

use std::cell::Cell;

use crate::geometry::{GeometryAdapter, Overflow, SignalBinder, Viewport};

#[derive(Debug, Clone)]
struct MockNode {
    parent: Option<u32>,
    /// Offset from the parent's content origin
    top: f32,
    height: f32,
    /// Content height when the node scrolls
    content_height: f32,
    overflow: Overflow,
    scroll: f32,
    attached: bool,
}

/// A flat node tree with a scrollable window
#[derive(Debug)]
pub(crate) struct MockHost {
    nodes: Vec<MockNode>,
    window_height: f32,
    window_scroll: f32,
    document_height: f32,
    pub subscribed: Vec<Viewport<u32>>,
    pub unsubscribed: Vec<Viewport<u32>>,
    pub offset_queries: Cell<usize>,
}

impl MockHost {
    pub fn new(window_height: f32, document_height: f32) -> Self {
        Self {
            nodes: Vec::new(),
            window_height,
            window_scroll: 0.0,
            document_height,
            subscribed: Vec::new(),
            unsubscribed: Vec::new(),
            offset_queries: Cell::new(0),
        }
    }

    /// Add a plain (non-scrolling) node
    pub fn add(&mut self, parent: Option<u32>, top: f32, height: f32) -> u32 {
        self.add_scroller(parent, top, height, height, Overflow::Visible)
    }

    /// Add a node with an explicit overflow mode and content height
    pub fn add_scroller(
        &mut self,
        parent: Option<u32>,
        top: f32,
        height: f32,
        content_height: f32,
        overflow: Overflow,
    ) -> u32 {
        self.nodes.push(MockNode {
            parent,
            top,
            height,
            content_height,
            overflow,
            scroll: 0.0,
            attached: true,
        });
        (self.nodes.len() - 1) as u32
    }

    pub fn scroll_to(&mut self, viewport: Viewport<u32>, offset: f32) {
        match viewport {
            Viewport::Window => self.window_scroll = offset,
            Viewport::Container(id) => self.nodes[id as usize].scroll = offset,
        }
    }

    pub fn set_top(&mut self, id: u32, top: f32) {
        self.nodes[id as usize].top = top;
    }

    pub fn set_document_height(&mut self, height: f32) {
        self.document_height = height;
    }

    pub fn set_window_height(&mut self, height: f32) {
        self.window_height = height;
    }

    /// Simulate an element that is no longer laid out
    pub fn detach(&mut self, id: u32) {
        self.nodes[id as usize].attached = false;
    }

    fn node(&self, id: u32) -> Option<&MockNode> {
        self.nodes.get(id as usize).filter(|node| node.attached)
    }
}

impl GeometryAdapter for MockHost {
    type Element = u32;

    fn element_offset(&self, element: u32, viewport: Viewport<u32>) -> Option<f32> {
        self.offset_queries.set(self.offset_queries.get() + 1);
        let stop = viewport.container();
        let mut top = 0.0;
        let mut current = Some(element);
        while let Some(id) = current {
            if Some(id) == stop {
                break;
            }
            let node = self.node(id)?;
            top += node.top;
            current = node.parent;
        }
        Some(top)
    }

    fn element_height(&self, element: u32) -> Option<f32> {
        self.node(element).map(|node| node.height)
    }

    fn viewport_height(&self, viewport: Viewport<u32>) -> Option<f32> {
        match viewport {
            Viewport::Window => Some(self.window_height),
            Viewport::Container(id) => self.node(id).map(|node| node.height),
        }
    }

    fn scroll_offset(&self, viewport: Viewport<u32>) -> Option<f32> {
        match viewport {
            Viewport::Window => Some(self.window_scroll),
            Viewport::Container(id) => self.node(id).map(|node| node.scroll),
        }
    }

    fn container_height(&self, viewport: Viewport<u32>) -> Option<f32> {
        match viewport {
            Viewport::Window => Some(self.document_height),
            Viewport::Container(id) => self.node(id).map(|node| node.content_height),
        }
    }

    fn parent(&self, element: u32) -> Option<u32> {
        self.nodes.get(element as usize)?.parent
    }

    fn overflow(&self, element: u32) -> Overflow {
        self.nodes
            .get(element as usize)
            .map(|node| node.overflow)
            .unwrap_or_default()
    }
}

impl SignalBinder for MockHost {
    fn subscribe(&mut self, viewport: Viewport<u32>) {
        self.subscribed.push(viewport);
    }

    fn unsubscribe(&mut self, viewport: Viewport<u32>) {
        self.unsubscribed.push(viewport);
    }
}
