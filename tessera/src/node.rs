//! Node model.
//!
//! A [`Node`] is a fixed-size value. Nodes never own or point at each other:
//! a compound refers to its children, modifiers and premodifiers through
//! three `[start, end)` [`Span`]s into the pool it was built in.
//!
//! # Tags
//!
//! Every node has a signed tag (see [`Kind::tag`]):
//!
//! ```text
//!   0            compound
//!   1 ..= 10     shapes        (drawable leaves, lazy sequences)
//!  -1 ..= -99    modifiers     (applied after layout, in argument order)
//!  <= -100       premodifiers  (applied before layout, by priority)
//! ```
//!
//! The sign decides where a node lands when a compound partitions its
//! argument list.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, Range};
use std::rc::Rc;

use crate::frame::Frame;
use crate::interaction::Query;
use crate::pool::PoolId;
use crate::primitives::{Color, Point, Rect, Size, Transform};
use crate::sequence::Sequence;

// =========================================================================
// Callback handles
// =========================================================================

/// Implicit curve `f(x, y)`; the curve is the zero set, evaluated in local
/// coordinates of the node's rectangle.
pub type ImplicitFn = dyn Fn(f32, f32) -> f32;
/// Canvas callback, invoked by the backend with the resolved rectangle.
pub type CanvasFn = dyn Fn(Rect);
/// Conditional callback evaluated once per frame after layout.
pub type CondFn = dyn Fn(&Query<'_>);
/// Conditional paint; `Some` overrides the fill/stroke for this frame.
pub type PaintFn = dyn Fn(&Query<'_>) -> Option<Color>;
/// Drop target callback, receives the drag payload.
pub type SinkFn = dyn Fn(Key);
/// Separator constructor used by `between`.
pub type SeparatorFn = dyn Fn(&mut Frame) -> Node;

/// Shared handle to a caller-supplied callback or producer.
pub struct Handle<T: ?Sized>(pub(crate) Rc<T>);

impl<T: ?Sized> Handle<T> {
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

// =========================================================================
// Identity, paint, spans
// =========================================================================

/// An opaque identity value.
///
/// Used for persistent state lookup, drag payloads and cross-frame
/// identity matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub u64);

impl Key {
    /// Derive a key from any hashable value.
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Self(hasher.finish())
    }
}

impl From<u64> for Key {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::of(value)
    }
}

/// Fill, stroke and stroke width. `None` means "inherit from parent".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Paint {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f32>,
}

impl Paint {
    /// Fill any unset field from `parent`.
    pub fn inherit(&mut self, parent: &Paint) {
        self.fill = self.fill.or(parent.fill);
        self.stroke = self.stroke.or(parent.stroke);
        self.stroke_width = self.stroke_width.or(parent.stroke_width);
    }
}

/// Half-open index range `[start, end)` into one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const EMPTY: Self = Self { start: 0, end: 0 };

    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn iter(&self) -> Range<u32> {
        self.start..self.end
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// Stacking algorithm a compound uses to resolve its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlignerKind {
    /// Children overlap at the origin; stretch weights share the full limit.
    #[default]
    Stack,
    /// Children follow each other top to bottom.
    VerticalFollow,
    /// Children follow each other left to right.
    HorizontalFollow,
}

// =========================================================================
// Kinds
// =========================================================================

/// Drawable leaves and lazy sequences (positive tags).
#[derive(Debug, Clone, Default)]
pub enum Shape {
    Circle,
    Rect,
    RoundedRect { radius: f32 },
    /// Invisible spacer.
    #[default]
    Void,
    Implicit(Handle<ImplicitFn>),
    Text { content: Rc<str>, font_size: f32 },
    Canvas(Handle<CanvasFn>),
    VectorText { content: Rc<str> },
    Sequence(Handle<dyn Sequence>),
    /// Drag ghost and debug outlines, seeded by the root.
    Overlay,
}

impl Shape {
    pub fn tag(&self) -> i16 {
        match self {
            Shape::Circle => 1,
            Shape::Rect => 2,
            Shape::RoundedRect { .. } => 3,
            Shape::Void => 4,
            Shape::Implicit(_) => 5,
            Shape::Text { .. } => 6,
            Shape::Canvas(_) => 7,
            Shape::VectorText { .. } => 8,
            Shape::Sequence(_) => 9,
            Shape::Overlay => 10,
        }
    }
}

/// Post-layout behaviors, executed in argument order.
#[derive(Debug, Clone)]
pub enum Modifier {
    Fill(Color),
    Stroke(Color),
    StrokeWidth(f32),
    /// Moves the key onto the compound. Consumed on application.
    Identity(Option<Key>),
    Cond(Handle<CondFn>),
    CondFill(Handle<PaintFn>),
    CondStroke(Handle<PaintFn>),
    /// Expanded when the compound is built; inert during layout.
    Between(Handle<SeparatorFn>),
    Source(Key),
    Sink(Handle<SinkFn>),
    Hoverride,
    Voverride,
}

impl Modifier {
    pub fn tag(&self) -> i16 {
        match self {
            Modifier::Fill(_) => -1,
            Modifier::Stroke(_) => -2,
            Modifier::StrokeWidth(_) => -3,
            Modifier::Identity(_) => -4,
            Modifier::Cond(_) => -5,
            Modifier::CondFill(_) => -6,
            Modifier::CondStroke(_) => -7,
            Modifier::Between(_) => -8,
            Modifier::Source(_) => -9,
            Modifier::Sink(_) => -10,
            Modifier::Hoverride => -11,
            Modifier::Voverride => -12,
        }
    }
}

/// Pre-layout behaviors, executed by descending [`priority`](Self::priority).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Premodifier {
    /// Post-layout position delta.
    Transform { dx: f32, dy: f32 },
    /// Composes into the accumulated scale/rotation matrix.
    Pretransform(Transform),
    /// Clip descendants to this compound's limit.
    Scissor,
    /// Horizontal limit becomes the widest child.
    Hshrink,
    /// Vertical limit becomes the tallest child.
    Vshrink,
    /// Non-negative components cap the limit; negative components
    /// scale it (an "imaginary" limit).
    Limit { w: f32, h: f32 },
    Vfollow,
    Hfollow,
}

impl Premodifier {
    pub fn tag(&self) -> i16 {
        match self {
            Premodifier::Transform { .. } => -100,
            Premodifier::Pretransform(_) => -101,
            Premodifier::Scissor => -102,
            Premodifier::Hshrink => -103,
            Premodifier::Vshrink => -104,
            Premodifier::Limit { .. } => -105,
            Premodifier::Vfollow => -106,
            Premodifier::Hfollow => -107,
        }
    }

    /// Execution priority. Imaginary limits and follow directions decide
    /// the aligner and must run before everything else.
    pub fn priority(&self) -> u8 {
        match self {
            Premodifier::Limit { w, h } if *w < 0.0 || *h < 0.0 => 2,
            Premodifier::Vfollow | Premodifier::Hfollow => 1,
            _ => 0,
        }
    }

    /// Whether the alignment pre-pass executes this premodifier.
    #[inline]
    pub fn runs_in_prepass(&self) -> bool {
        self.priority() > 0
    }
}

/// Closed set of node kinds.
#[derive(Debug, Clone)]
pub enum Kind {
    Compound,
    Shape(Shape),
    Modifier(Modifier),
    Premodifier(Premodifier),
}

impl Default for Kind {
    fn default() -> Self {
        Kind::Shape(Shape::Void)
    }
}

impl Kind {
    /// Signed tag: 0 compound, positive shape, negative modifier,
    /// `<= -100` premodifier.
    pub fn tag(&self) -> i16 {
        match self {
            Kind::Compound => 0,
            Kind::Shape(shape) => shape.tag(),
            Kind::Modifier(modifier) => modifier.tag(),
            Kind::Premodifier(premodifier) => premodifier.tag(),
        }
    }

    /// Human-readable class name for diagnostics.
    pub fn class_name(&self) -> &'static str {
        match self {
            Kind::Compound => "compound",
            Kind::Shape(_) => "shape",
            Kind::Modifier(_) => "modifier",
            Kind::Premodifier(_) => "premodifier",
        }
    }
}

// =========================================================================
// Node
// =========================================================================

/// Per-node boolean state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    /// Clip descendants to this node's limit.
    pub scissor: bool,
    pub hshrink: bool,
    pub vshrink: bool,
    /// Parent adopts this node's width.
    pub hoverride: bool,
    /// Parent adopts this node's height.
    pub voverride: bool,
    /// Synthesized by `between`.
    pub separator: bool,
    /// Materialized out of a lazy sequence.
    pub sequence_member: bool,
    /// Lazy sequence already materialized this frame.
    pub materialized: bool,
    /// Main pass already ran on this container.
    pub resolved: bool,
    /// Entirely outside its scissor rectangle.
    pub clipped: bool,
    /// Reached from the root by the inheritance pass.
    pub placed: bool,
}

/// Post-layout conditional callbacks attached by modifiers.
#[derive(Debug, Clone, Default)]
pub struct Conditional {
    pub cond: Option<Handle<CondFn>>,
    pub fill: Option<Handle<PaintFn>>,
    pub stroke: Option<Handle<PaintFn>>,
}

impl Conditional {
    pub fn is_empty(&self) -> bool {
        self.cond.is_none() && self.fill.is_none() && self.stroke.is_none()
    }
}

/// Drag-and-drop role registered by `source`/`sink` modifiers.
#[derive(Debug, Clone, Default)]
pub enum DragRole {
    #[default]
    None,
    Source(Key),
    Sink(Handle<SinkFn>),
}

/// An arena-allocated layout node.
///
/// Negative `width`/`height` are stretch weights: a request for a share of
/// the parent's remaining space. The resolver replaces them with concrete
/// sizes.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub(crate) kind: Kind,
    /// Creation order; decides draw order.
    pub(crate) z: u64,
    /// Sub-order inside a materialized sequence.
    pub(crate) z2: u64,

    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) extra_width: f32,
    pub(crate) extra_height: f32,
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) limit_w: f32,
    pub(crate) limit_h: f32,
    /// Imaginary limit factors, product of every negative `Limit` component.
    /// Written by the pre-pass, applied to the inherited limit by the main
    /// pass.
    pub(crate) limit_fraction: [Option<f32>; 2],

    /// Accumulated `Transform` premodifier delta.
    pub(crate) offset: Point,
    /// Accumulated pretransform matrix.
    pub(crate) transform: Transform,
    pub(crate) scissor: Option<Rect>,
    pub(crate) aligner: AlignerKind,

    /// Paint set on this node by modifiers.
    pub(crate) paint: Paint,
    /// Own paint with unset fields filled from ancestors.
    pub(crate) effective: Paint,
    pub(crate) conditional: Conditional,
    pub(crate) drag: DragRole,
    pub(crate) key: Option<Key>,

    pub(crate) children: Span,
    pub(crate) modifiers: Span,
    pub(crate) premodifiers: Span,
    /// Pool the three spans index into.
    pub(crate) pool: PoolId,
    pub(crate) flags: NodeFlags,
}

impl Node {
    pub(crate) fn new(kind: Kind, z: u64) -> Self {
        Self {
            kind,
            z,
            ..Self::default()
        }
    }

    /// Set the declared size. Negative components are stretch weights.
    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Fixed pixel addend applied after stretch resolution.
    pub fn extra(mut self, width: f32, height: f32) -> Self {
        self.extra_width = width;
        self.extra_height = height;
        self
    }

    /// Force the creation order used for draw sorting.
    pub fn order(mut self, z: u64) -> Self {
        self.z = z;
        self
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn tag(&self) -> i16 {
        self.kind.tag()
    }

    /// Draw-order key: creation order, then sub-order.
    pub fn z(&self) -> (u64, u64) {
        (self.z, self.z2)
    }

    pub fn key(&self) -> Option<Key> {
        self.key
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn paint(&self) -> Paint {
        self.paint
    }

    /// Paint after inheritance; what the backend draws with.
    pub fn effective_paint(&self) -> Paint {
        self.effective
    }

    pub fn aligner(&self) -> AlignerKind {
        self.aligner
    }

    pub fn declared_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Resolved rectangle. Absolute after the inheritance pass.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn limit(&self) -> Size {
        Size::new(self.limit_w, self.limit_h)
    }

    pub fn scissor(&self) -> Option<Rect> {
        self.scissor
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn children(&self) -> Span {
        self.children
    }

    pub fn pool(&self) -> PoolId {
        self.pool
    }

    pub fn is_compound(&self) -> bool {
        matches!(self.kind, Kind::Compound)
    }

    /// Compounds and lazy sequences lay out children.
    pub fn is_container(&self) -> bool {
        matches!(self.kind, Kind::Compound | Kind::Shape(Shape::Sequence(_)))
    }

    /// Both size components are concrete.
    #[inline]
    pub fn is_sized(&self) -> bool {
        self.width >= 0.0 && self.height >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_signs_partition_kinds() {
        assert_eq!(Kind::Compound.tag(), 0);
        assert!(Kind::Shape(Shape::Circle).tag() > 0);
        assert!(Kind::Shape(Shape::Overlay).tag() > 0);

        let modifier = Kind::Modifier(Modifier::Fill(Color::RED)).tag();
        assert!((-99..=-1).contains(&modifier));
        assert!((-99..=-1).contains(&Kind::Modifier(Modifier::Voverride).tag()));

        assert!(Kind::Premodifier(Premodifier::Scissor).tag() <= -100);
        assert!(Kind::Premodifier(Premodifier::Hfollow).tag() <= -100);
    }

    #[test]
    fn test_premodifier_priority() {
        let imaginary = Premodifier::Limit { w: -0.5, h: 10.0 };
        let hard = Premodifier::Limit { w: 50.0, h: 10.0 };

        assert_eq!(imaginary.priority(), 2);
        assert_eq!(Premodifier::Vfollow.priority(), 1);
        assert_eq!(Premodifier::Hfollow.priority(), 1);
        assert_eq!(hard.priority(), 0);
        assert_eq!(Premodifier::Scissor.priority(), 0);

        assert!(imaginary.runs_in_prepass());
        assert!(!hard.runs_in_prepass());
    }

    #[test]
    fn test_span_iteration() {
        let span = Span::new(3, 6);
        assert_eq!(span.len(), 3);
        assert!(!span.is_empty());
        assert_eq!(span.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(span.range(), 3..6);
        assert!(Span::EMPTY.is_empty());
    }

    #[test]
    fn test_paint_inherit_keeps_own_fields() {
        let parent = Paint {
            fill: Some(Color::RED),
            stroke: Some(Color::BLUE),
            stroke_width: Some(2.0),
        };
        let mut child = Paint {
            fill: Some(Color::GREEN),
            ..Paint::default()
        };
        child.inherit(&parent);

        assert_eq!(child.fill, Some(Color::GREEN));
        assert_eq!(child.stroke, Some(Color::BLUE));
        assert_eq!(child.stroke_width, Some(2.0));
    }

    #[test]
    fn test_key_of_is_stable() {
        assert_eq!(Key::of("row-7"), Key::of("row-7"));
        assert_ne!(Key::of("row-7"), Key::of("row-8"));
        assert_eq!(Key::from("row-7"), Key::of("row-7"));
    }

    #[test]
    fn test_node_chain_helpers() {
        let node = Node::new(Kind::Shape(Shape::Rect), 4)
            .size(-1.0, 20.0)
            .extra(10.0, 0.0)
            .order(1);

        assert_eq!(node.z(), (1, 0));
        assert_eq!(node.declared_size(), Size::new(-1.0, 20.0));
        assert_eq!(node.extra_width, 10.0);
        assert!(!node.is_sized());
        assert!(!node.is_container());
    }

    #[test]
    fn test_default_node_is_void() {
        let node = Node::default();
        assert_eq!(node.tag(), Shape::Void.tag());
        assert_eq!(node.pool(), PoolId::Main);
        assert!(node.is_sized());
    }
}
