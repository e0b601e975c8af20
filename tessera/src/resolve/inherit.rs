//! Inheritance pass: parent-before-child propagation after layout.
//!
//! Layout leaves every position relative to its parent. This pass walks the
//! tree once more, top down, and writes:
//!
//! - absolute positions: `parent + relative + own offset`
//! - paint: unset fields copied from the parent
//! - scissor: the clip rectangle in effect for the node, in absolute
//!   coordinates, intersected down the tree
//!
//! Sizes are not touched.

use crate::frame::Frame;
use crate::node::Paint;
use crate::pool::Slot;
use crate::primitives::{Point, Rect};

/// Clip in effect for a subtree.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Clip {
    Unclipped,
    Rect(Rect),
    /// Two nested scissors with no overlap.
    Empty,
}

impl Clip {
    fn rect(self) -> Option<Rect> {
        match self {
            Clip::Rect(rect) => Some(rect),
            Clip::Unclipped | Clip::Empty => None,
        }
    }

    fn narrow(self, own: Rect) -> Self {
        match self {
            Clip::Unclipped => Clip::Rect(own),
            Clip::Rect(outer) => outer.intersection(&own).map_or(Clip::Empty, Clip::Rect),
            Clip::Empty => Clip::Empty,
        }
    }

    fn hides(self, rect: &Rect) -> bool {
        match self {
            Clip::Unclipped => false,
            Clip::Rect(clip) => !clip.intersects(rect),
            Clip::Empty => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    origin: Point,
    paint: Paint,
    clip: Clip,
}

/// Run the inheritance pass from `root`.
pub fn inherit(frame: &mut Frame, root: Slot) {
    let scope = Scope {
        origin: Point::ORIGIN,
        paint: Paint::default(),
        clip: Clip::Unclipped,
    };
    visit(frame, root, scope);
}

fn visit(frame: &mut Frame, slot: Slot, parent: Scope) {
    let node = frame.pools.node_mut(slot);

    let origin = parent.origin + Point::new(node.x, node.y) + node.offset;
    node.x = origin.x;
    node.y = origin.y;
    node.effective = node.paint;
    node.effective.inherit(&parent.paint);

    let local = if node.flags.scissor { node.scissor } else { None };
    node.scissor = parent.clip.rect();
    node.flags.clipped = parent.clip.hides(&node.rect());
    node.flags.placed = true;

    let clip = match local {
        Some(rect) => parent.clip.narrow(rect.translate(origin)),
        None => parent.clip,
    };
    let scope = Scope {
        origin,
        paint: node.effective,
        clip,
    };

    let (pool, children) = (node.pool, node.children);
    for index in children.iter() {
        visit(frame, Slot::new(pool, index), scope);
    }
}

/// Recompute effective paint from `root` down, positions untouched. Used
/// after conditional paint rewrote some nodes' own paint.
pub fn repaint(frame: &mut Frame, root: Slot) {
    repaint_from(frame, root, Paint::default());
}

fn repaint_from(frame: &mut Frame, slot: Slot, parent: Paint) {
    let node = frame.pools.node_mut(slot);
    node.effective = node.paint;
    node.effective.inherit(&parent);

    let (pool, children, paint) = (node.pool, node.children, node.effective);
    for index in children.iter() {
        repaint_from(frame, Slot::new(pool, index), paint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::node::Node;
    use crate::primitives::Color;
    use crate::resolve::{AlignerRegistry, Resolver};

    fn run(build: impl FnOnce(&mut Frame) -> Node) -> (Frame, Slot) {
        let mut frame = Frame::new(&EngineConfig::default().with_window_size(400.0, 300.0));
        frame.begin();
        let content = build(&mut frame);
        let root = frame.root([content]);
        let registry = AlignerRegistry::standard();
        let resolver = Resolver::new(&registry);
        resolver.resolve_aligners(&mut frame, root).unwrap();
        resolver.apply(&mut frame, root).unwrap();
        inherit(&mut frame, root);
        (frame, root)
    }

    fn nth(frame: &Frame, parent: Slot, i: u32) -> Slot {
        let node = frame.pools.node(parent);
        Slot::new(node.pool, node.children.start + i)
    }

    #[test]
    fn test_positions_become_absolute() {
        let (frame, root) = run(|f| {
            let inner_args = [f.vfollow(), f.rect(5.0, 5.0), f.rect(5.0, 5.0)];
            let inner = f.compound(inner_args);
            let args = [f.vfollow(), f.transform(10.0, 20.0), f.rect(30.0, 8.0), inner];
            f.compound(args)
        });
        let outer = nth(&frame, root, 2);
        let inner = nth(&frame, outer, 1);
        let second = frame.pools.node(nth(&frame, inner, 1));

        assert_eq!(frame.pools.node(outer).rect().origin(), Point::new(10.0, 20.0));
        assert_eq!(frame.pools.node(inner).rect().origin(), Point::new(10.0, 28.0));
        assert_eq!(second.rect(), Rect::new(10.0, 33.0, 5.0, 5.0));
    }

    #[test]
    fn test_paint_inherits_unset_fields() {
        let (frame, root) = run(|f| {
            let inner_args = [f.fill(Color::GREEN), f.rect(5.0, 5.0)];
            let inner = f.compound(inner_args);
            let args = [f.fill(Color::RED), f.stroke(Color::BLUE), f.rect(5.0, 5.0), inner];
            f.compound(args)
        });
        let outer = nth(&frame, root, 2);
        let direct = frame.pools.node(nth(&frame, outer, 0));
        let nested = frame.pools.node(nth(&frame, nth(&frame, outer, 1), 0));

        assert_eq!(direct.paint.fill, None);
        assert_eq!(direct.effective.fill, Some(Color::RED));
        assert_eq!(direct.effective.stroke, Some(Color::BLUE));
        assert_eq!(nested.effective.fill, Some(Color::GREEN));
        assert_eq!(nested.effective.stroke, Some(Color::BLUE));
    }

    #[test]
    fn test_repaint_follows_changed_ancestor() {
        let (mut frame, root) = run(|f| {
            let args = [f.fill(Color::RED), f.rect(5.0, 5.0)];
            f.compound(args)
        });
        let outer = nth(&frame, root, 2);
        frame.pools.node_mut(outer).paint.fill = Some(Color::WHITE);
        repaint(&mut frame, root);

        let leaf = frame.pools.node(nth(&frame, outer, 0));
        assert_eq!(leaf.effective.fill, Some(Color::WHITE));
    }

    #[test]
    fn test_scissor_intersects_down_the_tree() {
        let (frame, root) = run(|f| {
            let inner_args = [
                f.scissor(),
                f.limit(100.0, 100.0),
                f.transform(30.0, 30.0),
                f.rect(10.0, 10.0),
            ];
            let inner = f.compound(inner_args);
            let args = [f.scissor(), f.limit(50.0, 50.0), inner];
            f.compound(args)
        });
        let outer = nth(&frame, root, 2);
        let inner = nth(&frame, outer, 0);
        let leaf = frame.pools.node(nth(&frame, inner, 0));

        // The outer compound itself is clipped by nothing.
        assert_eq!(frame.pools.node(outer).scissor, None);
        assert_eq!(frame.pools.node(inner).scissor, Some(Rect::new(0.0, 0.0, 50.0, 50.0)));
        assert_eq!(leaf.scissor, Some(Rect::new(30.0, 30.0, 20.0, 20.0)));
        assert!(!leaf.flags.clipped);
    }

    #[test]
    fn test_leaf_outside_scissor_is_clipped() {
        let (frame, root) = run(|f| {
            let args = [
                f.vfollow(),
                f.scissor(),
                f.limit(100.0, 20.0),
                f.rect(10.0, 15.0),
                f.rect(10.0, 15.0),
                f.rect(10.0, 15.0),
            ];
            f.compound(args)
        });
        let list = nth(&frame, root, 2);
        let clipped: Vec<bool> = (0..3)
            .map(|i| frame.pools.node(nth(&frame, list, i)).flags.clipped)
            .collect();

        assert_eq!(clipped, vec![false, false, true]);
    }
}
