//! Lazy sequences.
//!
//! A [`Sequence`] produces children on demand. The first time the resolver
//! meets a sequence node in a frame, every item is fetched with the
//! auxiliary pool active and copied into one auxiliary span; the node is
//! then flagged materialized and later visits reuse that span.
//!
//! Only one level of virtualization exists. A producer that builds another
//! sequence fails the frame with [`LayoutError::NestedSequence`].

use crate::error::{LayoutError, ProducerError, Result};
use crate::frame::Frame;
use crate::node::{Kind, Node, Shape, Span};
use crate::pool::{PoolId, Slot};

/// Length-and-index producer of child nodes.
pub trait Sequence {
    fn len(&self) -> usize;

    /// Build item `index`. Called with the auxiliary pool active, so any
    /// compound built here allocates there.
    fn get(&self, index: usize, frame: &mut Frame) -> std::result::Result<Node, ProducerError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sequence backed by a closure.
pub struct FnSequence<F> {
    len: usize,
    f: F,
}

impl<F> FnSequence<F>
where
    F: Fn(usize, &mut Frame) -> std::result::Result<Node, ProducerError>,
{
    pub fn new(len: usize, f: F) -> Self {
        Self { len, f }
    }
}

impl<F> Sequence for FnSequence<F>
where
    F: Fn(usize, &mut Frame) -> std::result::Result<Node, ProducerError>,
{
    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize, frame: &mut Frame) -> std::result::Result<Node, ProducerError> {
        (self.f)(index, frame)
    }
}

/// Materialize the sequence at `slot` into the auxiliary pool.
///
/// Returns the number of items fetched: zero when the node is not a
/// sequence or was already materialized this frame.
pub(crate) fn materialize(frame: &mut Frame, slot: Slot) -> Result<usize> {
    let node = frame.pools.node(slot);
    if node.flags.materialized {
        return Ok(0);
    }
    let producer = match &node.kind {
        Kind::Shape(Shape::Sequence(producer)) => producer.clone(),
        _ => return Ok(0),
    };
    if slot.pool == PoolId::Auxiliary {
        return Err(LayoutError::NestedSequence);
    }
    let owner_z = node.z;
    let start = frame.pools.len(PoolId::Auxiliary);

    frame.pools.swap()?;
    let fetched = fetch(frame, &*producer);
    frame.pools.restore();
    let items = fetched?;

    let count = items.len();
    let span = frame.pools.allocate_from(PoolId::Auxiliary, items);

    // Everything this producer allocated draws at the sequence's position,
    // in its own creation order.
    let end = frame.pools.len(PoolId::Auxiliary) as u32;
    for member in frame.pools.slice_mut(PoolId::Auxiliary, Span::new(start as u32, end)) {
        member.z2 = member.z;
        member.z = owner_z;
        member.flags.sequence_member = true;
    }

    let node = frame.pools.node_mut(slot);
    node.children = span;
    node.pool = PoolId::Auxiliary;
    node.flags.materialized = true;

    tracing::trace!(z = owner_z, count, "materialized sequence");
    Ok(count)
}

fn fetch(frame: &mut Frame, producer: &dyn Sequence) -> Result<Vec<Node>> {
    let len = producer.len();
    let mut items = Vec::with_capacity(len);
    for index in 0..len {
        let item = producer
            .get(index, frame)
            .map_err(|source| LayoutError::Producer { index, source })?;
        if let Some(fault) = frame.take_fault() {
            return Err(fault);
        }
        if let Kind::Modifier(_) | Kind::Premodifier(_) = item.kind {
            return Err(LayoutError::InvalidSequenceItem {
                index,
                kind: item.kind.class_name(),
            });
        }
        items.push(item);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::config::EngineConfig;

    fn frame() -> Frame {
        let mut frame = Frame::new(&EngineConfig::default());
        frame.begin();
        frame
    }

    fn place(frame: &mut Frame, node: Node) -> Slot {
        let span = frame.pools.allocate_from(PoolId::Main, [node]);
        Slot::new(PoolId::Main, span.start)
    }

    #[test]
    fn test_materialize_into_auxiliary_pool() {
        let mut frame = frame();
        let seq = frame.sequence(FnSequence::new(3, |i, f: &mut Frame| {
            Ok(f.rect(10.0, i as f32 + 1.0))
        }));
        let owner_z = seq.z;
        let slot = place(&mut frame, seq);

        assert_eq!(materialize(&mut frame, slot).unwrap(), 3);

        let node = frame.pools.node(slot);
        assert!(node.flags.materialized);
        assert_eq!(node.pool, PoolId::Auxiliary);
        assert_eq!(frame.active_pool(), PoolId::Main);

        let items = frame.pools.slice(node.pool, node.children);
        let heights: Vec<f32> = items.iter().map(|n| n.height).collect();
        assert_eq!(heights, vec![1.0, 2.0, 3.0]);
        assert!(items.iter().all(|n| n.flags.sequence_member && n.z == owner_z));
        assert!(items[0].z2 < items[1].z2 && items[1].z2 < items[2].z2);
    }

    #[test]
    fn test_materialize_is_idempotent() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut frame = frame();
        let seq = frame.sequence(FnSequence::new(4, move |_, f: &mut Frame| {
            counter.set(counter.get() + 1);
            Ok(f.void(1.0, 1.0))
        }));
        let slot = place(&mut frame, seq);

        materialize(&mut frame, slot).unwrap();
        assert_eq!(materialize(&mut frame, slot).unwrap(), 0);
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_compound_items_allocate_in_auxiliary_pool() {
        let mut frame = frame();
        let seq = frame.sequence(FnSequence::new(2, |_, f: &mut Frame| {
            let args = [f.rect(1.0, 1.0), f.fill(crate::primitives::Color::RED)];
            Ok(f.compound(args))
        }));
        let slot = place(&mut frame, seq);
        materialize(&mut frame, slot).unwrap();

        let node = frame.pools.node(slot);
        let items = frame.pools.slice(node.pool, node.children);
        assert!(items.iter().all(|n| n.pool == PoolId::Auxiliary));
        assert_eq!(frame.pools.len(PoolId::Main), 1);
    }

    #[test]
    fn test_nested_sequence_fails() {
        let mut frame = frame();
        let seq = frame.sequence(FnSequence::new(1, |_, f: &mut Frame| {
            Ok(f.sequence(FnSequence::new(1, |_, g: &mut Frame| Ok(g.void(1.0, 1.0)))))
        }));
        let slot = place(&mut frame, seq);

        let err = materialize(&mut frame, slot).unwrap_err();
        assert!(matches!(err, LayoutError::NestedSequence));
        assert_eq!(frame.active_pool(), PoolId::Main);
    }

    #[test]
    fn test_producer_error_propagates() {
        let mut frame = frame();
        let seq = frame.sequence(FnSequence::new(3, |i, f: &mut Frame| {
            if i == 1 {
                return Err("row unavailable".into());
            }
            Ok(f.void(1.0, 1.0))
        }));
        let slot = place(&mut frame, seq);

        let err = materialize(&mut frame, slot).unwrap_err();
        assert!(matches!(err, LayoutError::Producer { index: 1, .. }));
        assert_eq!(frame.active_pool(), PoolId::Main);
    }

    #[test]
    fn test_modifier_item_is_rejected() {
        let mut frame = frame();
        let seq = frame.sequence(FnSequence::new(1, |_, f: &mut Frame| Ok(f.hoverride())));
        let slot = place(&mut frame, seq);

        let err = materialize(&mut frame, slot).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::InvalidSequenceItem { index: 0, kind: "modifier" }
        ));
    }

    #[test]
    fn test_empty_sequence_is_noop() {
        let mut frame = frame();
        let seq = frame.sequence(FnSequence::new(0, |_, f: &mut Frame| Ok(f.void(1.0, 1.0))));
        let slot = place(&mut frame, seq);

        assert_eq!(materialize(&mut frame, slot).unwrap(), 0);
        let node = frame.pools.node(slot);
        assert!(node.flags.materialized);
        assert!(node.children.is_empty());
    }
}
