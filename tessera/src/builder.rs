//! Declarative construction API.
//!
//! Every call returns one fresh [`Node`] stamped with the next creation
//! order. Leaves are plain values until a [`compound`](Frame::compound)
//! copies them into the active pool:
//!
//! ```text
//! frame.compound([
//!     frame.hfollow(),             -> premodifiers [..]
//!     frame.fill(Color::RED),      -> modifiers    [..]
//!     frame.rect(-1.0, 20.0),      -> children     [..]
//!     frame.text("label"),
//! ])
//! ```

use std::iter;
use std::rc::Rc;

use crate::error::LayoutError;
use crate::frame::{BASE_FONT_SIZE, Frame};
use crate::interaction::Query;
use crate::node::{
    AlignerKind, CanvasFn, CondFn, Handle, ImplicitFn, Key, Kind, Modifier, Node, PaintFn,
    Premodifier, SeparatorFn, Shape, SinkFn,
};
use crate::pool::{PoolId, Slot};
use crate::primitives::{Color, Rect, Transform};
use crate::sequence::Sequence;

impl Frame {
    fn shape(&mut self, shape: Shape, width: f32, height: f32) -> Node {
        let z = self.next_z();
        Node::new(Kind::Shape(shape), z).size(width, height)
    }

    fn modifier(&mut self, modifier: Modifier) -> Node {
        let z = self.next_z();
        Node::new(Kind::Modifier(modifier), z)
    }

    fn premodifier(&mut self, premodifier: Premodifier) -> Node {
        let z = self.next_z();
        Node::new(Kind::Premodifier(premodifier), z)
    }

    // =====================================================================
    // Shapes
    // =====================================================================

    pub fn circle(&mut self, diameter: f32) -> Node {
        self.shape(Shape::Circle, diameter, diameter)
    }

    pub fn rect(&mut self, width: f32, height: f32) -> Node {
        self.shape(Shape::Rect, width, height)
    }

    pub fn rounded_rect(&mut self, width: f32, height: f32, radius: f32) -> Node {
        self.shape(Shape::RoundedRect { radius }, width, height)
    }

    /// Invisible spacer.
    pub fn void(&mut self, width: f32, height: f32) -> Node {
        self.shape(Shape::Void, width, height)
    }

    /// Curve drawn where `f(x, y)` crosses zero, in local coordinates.
    pub fn implicit(&mut self, width: f32, height: f32, f: impl Fn(f32, f32) -> f32 + 'static) -> Node {
        let f: Rc<ImplicitFn> = Rc::new(f);
        self.shape(Shape::Implicit(Handle(f)), width, height)
    }

    /// Text at the base font size, sized by the frame's text measurer.
    pub fn text(&mut self, content: &str) -> Node {
        self.text_sized(content, BASE_FONT_SIZE)
    }

    pub fn text_sized(&mut self, content: &str, font_size: f32) -> Node {
        let size = self.measure_text(content, font_size);
        self.shape(
            Shape::Text {
                content: Rc::from(content),
                font_size,
            },
            size.width,
            size.height,
        )
    }

    /// Text scaled to fill the given box.
    pub fn vector_text(&mut self, content: &str, width: f32, height: f32) -> Node {
        self.shape(Shape::VectorText { content: Rc::from(content) }, width, height)
    }

    /// Backend callback invoked with the resolved rectangle.
    pub fn canvas(&mut self, width: f32, height: f32, f: impl Fn(Rect) + 'static) -> Node {
        let f: Rc<CanvasFn> = Rc::new(f);
        self.shape(Shape::Canvas(Handle(f)), width, height)
    }

    /// Lazy child collection, laid out top to bottom.
    pub fn sequence(&mut self, producer: impl Sequence + 'static) -> Node {
        self.sequence_with(producer, AlignerKind::VerticalFollow)
    }

    /// Lazy child collection with an explicit aligner.
    ///
    /// Building a sequence from inside another sequence's producer records a
    /// [`LayoutError::NestedSequence`] fault for the frame.
    pub fn sequence_with(&mut self, producer: impl Sequence + 'static, aligner: AlignerKind) -> Node {
        if self.active_pool() == PoolId::Auxiliary {
            self.raise(LayoutError::NestedSequence);
        }
        let producer: Rc<dyn Sequence> = Rc::new(producer);
        let mut node = self.shape(Shape::Sequence(Handle(producer)), 0.0, 0.0);
        node.aligner = aligner;
        node
    }

    // =====================================================================
    // Modifiers
    // =====================================================================

    pub fn fill(&mut self, color: Color) -> Node {
        self.modifier(Modifier::Fill(color))
    }

    pub fn stroke(&mut self, color: Color) -> Node {
        self.modifier(Modifier::Stroke(color))
    }

    pub fn stroke_width(&mut self, width: f32) -> Node {
        self.modifier(Modifier::StrokeWidth(width))
    }

    /// Attach `key` to the enclosing compound.
    pub fn identity(&mut self, key: impl Into<Key>) -> Node {
        self.modifier(Modifier::Identity(Some(key.into())))
    }

    /// Callback run once after layout with the compound's query.
    pub fn cond(&mut self, f: impl Fn(&Query<'_>) + 'static) -> Node {
        let f: Rc<CondFn> = Rc::new(f);
        self.modifier(Modifier::Cond(Handle(f)))
    }

    /// Per-frame fill override; `None` keeps the static fill.
    pub fn cond_fill(&mut self, f: impl Fn(&Query<'_>) -> Option<Color> + 'static) -> Node {
        let f: Rc<PaintFn> = Rc::new(f);
        self.modifier(Modifier::CondFill(Handle(f)))
    }

    pub fn cond_stroke(&mut self, f: impl Fn(&Query<'_>) -> Option<Color> + 'static) -> Node {
        let f: Rc<PaintFn> = Rc::new(f);
        self.modifier(Modifier::CondStroke(Handle(f)))
    }

    /// Insert a separator built by `ctor` between consecutive children.
    pub fn between(&mut self, ctor: impl Fn(&mut Frame) -> Node + 'static) -> Node {
        let ctor: Rc<SeparatorFn> = Rc::new(ctor);
        self.modifier(Modifier::Between(Handle(ctor)))
    }

    /// Make the compound draggable, carrying `payload`.
    pub fn source(&mut self, payload: impl Into<Key>) -> Node {
        self.modifier(Modifier::Source(payload.into()))
    }

    /// Make the compound a drop target.
    pub fn sink(&mut self, f: impl Fn(Key) + 'static) -> Node {
        let f: Rc<SinkFn> = Rc::new(f);
        self.modifier(Modifier::Sink(Handle(f)))
    }

    /// Enclosing compounds adopt this compound's width.
    pub fn hoverride(&mut self) -> Node {
        self.modifier(Modifier::Hoverride)
    }

    /// Enclosing compounds adopt this compound's height.
    pub fn voverride(&mut self) -> Node {
        self.modifier(Modifier::Voverride)
    }

    // =====================================================================
    // Premodifiers
    // =====================================================================

    /// Shift the compound after layout.
    pub fn transform(&mut self, dx: f32, dy: f32) -> Node {
        self.premodifier(Premodifier::Transform { dx, dy })
    }

    /// Scale/rotate everything below the compound.
    pub fn pretransform(&mut self, matrix: Transform) -> Node {
        self.premodifier(Premodifier::Pretransform(matrix))
    }

    pub fn scissor(&mut self) -> Node {
        self.premodifier(Premodifier::Scissor)
    }

    pub fn hshrink(&mut self) -> Node {
        self.premodifier(Premodifier::Hshrink)
    }

    pub fn vshrink(&mut self) -> Node {
        self.premodifier(Premodifier::Vshrink)
    }

    /// Cap the limit. A negative component `-f` scales the inherited
    /// limit by `f` instead.
    pub fn limit(&mut self, width: f32, height: f32) -> Node {
        self.premodifier(Premodifier::Limit { w: width, h: height })
    }

    pub fn vfollow(&mut self) -> Node {
        self.premodifier(Premodifier::Vfollow)
    }

    pub fn hfollow(&mut self) -> Node {
        self.premodifier(Premodifier::Hfollow)
    }

    // =====================================================================
    // Compounds
    // =====================================================================

    /// Aggregate already-built nodes into a container.
    ///
    /// Arguments are partitioned by tag sign into children, modifiers and
    /// premodifiers, each copied as one contiguous span into the active
    /// pool.
    pub fn compound(&mut self, args: impl IntoIterator<Item = Node>) -> Node {
        let z = self.next_z();
        let mut children = Vec::new();
        let mut modifiers = Vec::new();
        let mut premodifiers = Vec::new();
        for node in args {
            match node.tag() {
                0.. => children.push(node),
                -99..=-1 => modifiers.push(node),
                _ => premodifiers.push(node),
            }
        }

        let separator = modifiers.iter().find_map(|m| match &m.kind {
            Kind::Modifier(Modifier::Between(ctor)) => Some(ctor.clone()),
            _ => None,
        });
        if let Some(ctor) = separator {
            children = self.interleave(children, &ctor);
        }

        let pool = self.active_pool();
        let mut node = Node::new(Kind::Compound, z);
        node.children = self.pools.allocate_from(pool, children);
        node.modifiers = self.pools.allocate_from(pool, modifiers);
        node.premodifiers = self.pools.allocate_from(pool, premodifiers);
        node.pool = pool;
        node
    }

    /// Place one synthesized separator between each pair of non-separator
    /// children. Separators are built first, in order, then interleaved.
    fn interleave(&mut self, children: Vec<Node>, ctor: &Handle<SeparatorFn>) -> Vec<Node> {
        let count = children.iter().filter(|c| !c.flags.separator).count();
        let base = self.pools.scratch.len();
        for _ in 1..count {
            let mut separator = ctor(self);
            separator.flags.separator = true;
            self.pools.scratch.push(separator);
        }
        let mut separators: Vec<Node> = self.pools.scratch.drain(base..).collect();
        separators.reverse();

        let mut out = Vec::with_capacity(children.len() + separators.len());
        let mut seen = 0;
        for child in children {
            if !child.flags.separator {
                if seen > 0 {
                    out.extend(separators.pop());
                }
                seen += 1;
            }
            out.push(child);
        }
        out
    }

    /// Build the frame root: a window-sized void and the overlay, followed
    /// by `content`, allocated in the main pool.
    pub fn root(&mut self, content: impl IntoIterator<Item = Node>) -> Slot {
        let (width, height) = (self.window.width, self.window.height);
        let void = self.void(width, height);
        let overlay = self.shape(Shape::Overlay, width, height).order(u64::MAX);

        let mut node = self.compound(iter::once(void).chain(iter::once(overlay)).chain(content));
        node.limit_w = width;
        node.limit_h = height;

        let span = self.pools.allocate_from(PoolId::Main, iter::once(node));
        let slot = Slot::new(PoolId::Main, span.start);
        self.root = Some(slot);
        slot
    }
}
