//! Lazy Loading Example
//!
//! Simulates a long feed of image cards inside a scroll container and
//! loads each image the first time it comes within one screen of the
//! viewport. A banner in the window tracks enter/leave for analytics.
//!
//! Features demonstrated:
//! - Implementing `GeometryAdapter` / `SignalBinder` for a host tree
//! - Auto-detected scroll container viewport
//! - One-shot watches via `event.unobserve()`
//! - Throttled re-evaluation driven from a frame loop
//!
//! Run with: RUST_LOG=blinc_visibility=trace cargo run -p blinc_visibility --example lazy_load

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use blinc_visibility::prelude::*;

const CARD_HEIGHT: f32 = 240.0;
const CARD_GAP: f32 = 16.0;
const CARD_COUNT: usize = 40;
const FEED_HEIGHT: f32 = 600.0;

#[derive(Debug, Clone)]
struct Node {
    parent: Option<usize>,
    top: f32,
    height: f32,
    overflow: Overflow,
}

/// A tiny retained tree: window > feed (scrolls) > cards, plus a banner
struct DemoHost {
    nodes: Vec<Node>,
    window_height: f32,
    window_scroll: f32,
    feed: usize,
    feed_scroll: f32,
    subscribed: Vec<Viewport<usize>>,
}

impl DemoHost {
    fn new() -> Self {
        let mut host = Self {
            nodes: Vec::new(),
            window_height: 800.0,
            window_scroll: 0.0,
            feed: 0,
            feed_scroll: 0.0,
            subscribed: Vec::new(),
        };
        host.feed = host.push(None, 120.0, FEED_HEIGHT, Overflow::Auto);
        host
    }

    fn push(&mut self, parent: Option<usize>, top: f32, height: f32, overflow: Overflow) -> usize {
        self.nodes.push(Node {
            parent,
            top,
            height,
            overflow,
        });
        self.nodes.len() - 1
    }

    fn feed_content_height(&self) -> f32 {
        self.nodes
            .iter()
            .filter(|node| node.parent == Some(self.feed))
            .map(|node| node.top + node.height)
            .fold(0.0, f32::max)
    }
}

impl GeometryAdapter for DemoHost {
    type Element = usize;

    fn element_offset(&self, element: usize, viewport: Viewport<usize>) -> Option<f32> {
        let stop = viewport.container();
        let mut top = 0.0;
        let mut current = Some(element);
        while let Some(id) = current {
            if Some(id) == stop {
                break;
            }
            let node = self.nodes.get(id)?;
            top += node.top;
            current = node.parent;
        }
        Some(top)
    }

    fn element_height(&self, element: usize) -> Option<f32> {
        self.nodes.get(element).map(|node| node.height)
    }

    fn viewport_height(&self, viewport: Viewport<usize>) -> Option<f32> {
        match viewport {
            Viewport::Window => Some(self.window_height),
            Viewport::Container(id) => self.element_height(id),
        }
    }

    fn scroll_offset(&self, viewport: Viewport<usize>) -> Option<f32> {
        match viewport {
            Viewport::Window => Some(self.window_scroll),
            Viewport::Container(id) if id == self.feed => Some(self.feed_scroll),
            Viewport::Container(_) => None,
        }
    }

    fn container_height(&self, viewport: Viewport<usize>) -> Option<f32> {
        match viewport {
            Viewport::Window => Some(self.window_height.max(1200.0)),
            Viewport::Container(id) if id == self.feed => Some(self.feed_content_height()),
            Viewport::Container(_) => None,
        }
    }

    fn parent(&self, element: usize) -> Option<usize> {
        self.nodes.get(element)?.parent
    }

    fn overflow(&self, element: usize) -> Overflow {
        self.nodes
            .get(element)
            .map(|node| node.overflow)
            .unwrap_or_default()
    }
}

impl SignalBinder for DemoHost {
    fn subscribe(&mut self, viewport: Viewport<usize>) {
        tracing::info!("Host: forwarding scroll/resize for {:?}", viewport);
        self.subscribed.push(viewport);
    }

    fn unsubscribe(&mut self, viewport: Viewport<usize>) {
        tracing::info!("Host: stopped forwarding for {:?}", viewport);
        self.subscribed.retain(|bound| *bound != viewport);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut host = DemoHost::new();
    let mut visibility = VisibilityContext::new();
    let loaded = Rc::new(RefCell::new(Vec::new()));

    let banner = host.push(None, 0.0, 100.0, Overflow::Visible);
    visibility.observe(
        &mut host,
        banner,
        WatchOptions::new()
            .on_enter(|_| tracing::info!("Banner impression"))
            .on_leave(|_| tracing::info!("Banner hidden")),
    )?;

    let feed = host.feed;
    for index in 0..CARD_COUNT {
        let top = index as f32 * (CARD_HEIGHT + CARD_GAP);
        let card = host.push(Some(feed), top, CARD_HEIGHT, Overflow::Hidden);
        let loaded = Rc::clone(&loaded);
        visibility.observe(
            &mut host,
            card,
            WatchOptions::enter(move |event| {
                tracing::info!("Loading image for card {}", index);
                loaded.borrow_mut().push(event.element());
                event.unobserve();
            })
            .distance(FEED_HEIGHT),
        )?;
    }
    tracing::info!(
        "{} cards loaded up front, {} watches pending",
        loaded.borrow().len(),
        visibility.len()
    );

    // Fling the feed: one scroll signal per 4ms frame, 60px per frame
    let start = Instant::now();
    let frame = Duration::from_millis(4);
    let mut now = start;
    while host.feed_scroll < host.feed_content_height() - FEED_HEIGHT {
        host.feed_scroll += 60.0;
        now += frame;
        visibility.handle_signal(Viewport::Container(feed), ViewportSignal::Scroll, now);
        visibility.tick(&mut host, now)?;
    }

    // Scroll the window so the banner leaves
    host.window_scroll = 200.0;
    now += frame;
    visibility.handle_signal(Viewport::Window, ViewportSignal::Scroll, now);
    if let Some(deadline) = visibility.next_deadline() {
        visibility.tick(&mut host, deadline)?;
    }

    let stats = visibility.stats();
    tracing::info!(
        "Loaded {} of {} images in {} passes ({} offset computations)",
        loaded.borrow().len(),
        CARD_COUNT,
        stats.passes,
        stats.offset_recomputations
    );
    tracing::info!("Still bound: {:?}", host.subscribed);

    Ok(())
}
