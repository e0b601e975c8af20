//! Interaction pass and the event-matching seam.
//!
//! Input is not interpreted here. The engine only asks a [`Matcher`]
//! whether some opaque pattern matched over a rectangle at a z-stamp, and
//! reads back a description of the last match. Conditional callbacks and
//! drag-and-drop bookkeeping are driven from those answers.

use std::cell::Cell;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::frame::Frame;
use crate::node::{DragRole, Key};
use crate::pool::Slot;
use crate::primitives::{Point, Rect};

/// Description of the most recent successful match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchInfo {
    /// Time since the matched gesture began.
    pub elapsed: Duration,
    /// Rectangle the match was made against.
    pub bounds: Rect,
    /// Where the gesture first touched down.
    pub first_touch: Point,
}

/// Oracle over input patterns.
///
/// `z` is the node's position in the frame's draw order; higher values draw
/// on top. How overlapping matches are arbitrated is up to the matcher.
pub trait Matcher {
    fn matches(&self, pattern: &str, rect: Rect, z: usize) -> bool;

    fn last_match(&self) -> Option<MatchInfo>;

    /// Current pointer location, when the input source has one.
    fn pointer(&self) -> Option<Point> {
        None
    }
}

/// Matcher that never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl Matcher for NoInput {
    fn matches(&self, _pattern: &str, _rect: Rect, _z: usize) -> bool {
        false
    }

    fn last_match(&self) -> Option<MatchInfo> {
        None
    }
}

/// Pointer-position matcher: a pattern matches when it is active this frame
/// and the pointer is inside the rectangle.
#[derive(Debug, Default)]
pub struct Pointer {
    position: Point,
    first_touch: Option<Point>,
    elapsed: Duration,
    active: Vec<String>,
    last: Cell<Option<MatchInfo>>,
}

impl Pointer {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Point::new(x, y),
            ..Self::default()
        }
    }

    /// Mark `pattern` as active this frame.
    pub fn with(mut self, pattern: &str) -> Self {
        self.active.push(pattern.to_string());
        self
    }

    /// Gesture started at `(x, y)`, `elapsed` ago.
    pub fn pressed_at(mut self, x: f32, y: f32, elapsed: Duration) -> Self {
        self.first_touch = Some(Point::new(x, y));
        self.elapsed = elapsed;
        self
    }

    pub fn position(&self) -> Point {
        self.position
    }
}

impl Matcher for Pointer {
    fn matches(&self, pattern: &str, rect: Rect, _z: usize) -> bool {
        let hit = self.active.iter().any(|p| p == pattern) && rect.contains(self.position);
        if hit {
            self.last.set(Some(MatchInfo {
                elapsed: self.elapsed,
                bounds: rect,
                first_touch: self.first_touch.unwrap_or(self.position),
            }));
        }
        hit
    }

    fn last_match(&self) -> Option<MatchInfo> {
        self.last.get()
    }

    fn pointer(&self) -> Option<Point> {
        Some(self.position)
    }
}

/// What a conditional callback sees: the node's final rectangle, its
/// draw-order stamp, and the matcher.
pub struct Query<'a> {
    rect: Rect,
    z: usize,
    matcher: &'a dyn Matcher,
}

impl<'a> Query<'a> {
    pub fn new(rect: Rect, z: usize, matcher: &'a dyn Matcher) -> Self {
        Self { rect, z, matcher }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn z(&self) -> usize {
        self.z
    }

    /// Whether `pattern` matched over this node.
    pub fn matches(&self, pattern: &str) -> bool {
        self.matcher.matches(pattern, self.rect, self.z)
    }

    pub fn last_match(&self) -> Option<MatchInfo> {
        self.matcher.last_match()
    }
}

/// In-flight drag, persisted by the engine across frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragState {
    pub payload: Option<Key>,
    /// Rectangle of the source the drag started on.
    pub origin: Rect,
    /// Last known pointer location; the ghost draws here.
    pub position: Point,
}

impl DragState {
    pub fn is_active(&self) -> bool {
        self.payload.is_some()
    }
}

/// Run conditional callbacks and drag bookkeeping over `order`, bottom of
/// the draw order first.
///
/// Returns `true` when a conditional paint rewrote some node's paint and
/// effective paint must be recomputed.
pub(crate) fn interact(
    frame: &mut Frame,
    order: &[Slot],
    matcher: &dyn Matcher,
    config: &EngineConfig,
    drag: &mut DragState,
) -> bool {
    let mut repaint = false;

    for (z, &slot) in order.iter().enumerate() {
        let node = frame.pools.node(slot);
        if node.flags.clipped || !node.is_sized() {
            continue;
        }
        if node.conditional.is_empty() && matches!(node.drag, DragRole::None) {
            continue;
        }
        let rect = node.rect();
        let conditional = node.conditional.clone();
        let role = node.drag.clone();
        let query = Query::new(rect, z, matcher);

        if let Some(cond) = &conditional.cond {
            cond(&query);
        }
        if let Some(color) = conditional.fill.as_ref().and_then(|f| f(&query)) {
            frame.pools.node_mut(slot).paint.fill = Some(color);
            repaint = true;
        }
        if let Some(color) = conditional.stroke.as_ref().and_then(|f| f(&query)) {
            frame.pools.node_mut(slot).paint.stroke = Some(color);
            repaint = true;
        }

        match role {
            DragRole::Source(payload) => {
                if !drag.is_active() && matcher.matches(&config.drag_pattern, rect, z) {
                    tracing::debug!(?payload, "drag started");
                    drag.payload = Some(payload);
                    drag.origin = rect;
                    drag.position = matcher.pointer().unwrap_or(rect.origin());
                }
            }
            DragRole::Sink(deliver) => {
                let dropped = drag
                    .payload
                    .filter(|_| matcher.matches(&config.drop_pattern, rect, z));
                if let Some(payload) = dropped {
                    tracing::debug!(?payload, "drag delivered");
                    drag.payload = None;
                    deliver(payload);
                }
            }
            DragRole::None => {}
        }
    }

    if drag.is_active() {
        if let Some(at) = matcher.pointer() {
            drag.position = at;
        }
        let window = Rect::from_origin_size(Point::ORIGIN, frame.window_size());
        if matcher.matches(&config.cancel_pattern, window, order.len()) {
            tracing::debug!(payload = ?drag.payload, "drag cancelled");
            drag.payload = None;
        }
    }

    repaint
}
