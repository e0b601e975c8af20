//! Arena pools.
//!
//! All nodes of a frame live in two buffers: the main pool, and an
//! auxiliary pool that lazy sequences materialize into. Compounds refer to
//! children by [`Span`] into whichever pool they were built in, so a span is
//! only meaningful together with its [`PoolId`].
//!
//! At frame end the current buffers become the previous-frame buffers,
//! which stay readable for one more frame (identity matching, `prev_rect`)
//! before their storage is recycled.

use std::mem;

use crate::error::{LayoutError, Result};
use crate::node::{Key, Node, Span};

/// Which buffer a span indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PoolId {
    #[default]
    Main,
    Auxiliary,
}

/// Address of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub pool: PoolId,
    pub index: u32,
}

impl Slot {
    pub const fn new(pool: PoolId, index: u32) -> Self {
        Self { pool, index }
    }
}

/// The frame arena.
#[derive(Debug, Default)]
pub struct Pools {
    main: Vec<Node>,
    aux: Vec<Node>,
    prev_main: Vec<Node>,
    prev_aux: Vec<Node>,
    /// Staging area for synthesized separators.
    pub(crate) scratch: Vec<Node>,
    active: PoolId,
}

impl Pools {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            main: Vec::with_capacity(capacity),
            aux: Vec::with_capacity(capacity),
            prev_main: Vec::with_capacity(capacity),
            prev_aux: Vec::with_capacity(capacity),
            scratch: Vec::new(),
            active: PoolId::Main,
        }
    }

    /// Pool that builder calls currently allocate into.
    #[inline]
    pub fn active(&self) -> PoolId {
        self.active
    }

    /// Reserve `n` default nodes at the end of `pool`.
    pub fn allocate(&mut self, pool: PoolId, n: usize) -> Span {
        let buffer = self.buffer_mut(pool);
        let start = buffer.len();
        buffer.resize_with(start + n, Node::default);
        Span::new(start as u32, buffer.len() as u32)
    }

    /// Append `nodes` to `pool` as one contiguous span.
    pub fn allocate_from(&mut self, pool: PoolId, nodes: impl IntoIterator<Item = Node>) -> Span {
        let buffer = self.buffer_mut(pool);
        let start = buffer.len();
        buffer.extend(nodes);
        Span::new(start as u32, buffer.len() as u32)
    }

    /// Make the auxiliary pool active.
    ///
    /// Only one level of virtualization exists; swapping while already on
    /// the auxiliary pool is a nested sequence.
    pub fn swap(&mut self) -> Result<()> {
        if self.active == PoolId::Auxiliary {
            return Err(LayoutError::NestedSequence);
        }
        self.active = PoolId::Auxiliary;
        Ok(())
    }

    /// Make the main pool active again.
    pub fn restore(&mut self) {
        self.active = PoolId::Main;
    }

    #[inline]
    pub fn buffer(&self, pool: PoolId) -> &[Node] {
        match pool {
            PoolId::Main => &self.main,
            PoolId::Auxiliary => &self.aux,
        }
    }

    #[inline]
    fn buffer_mut(&mut self, pool: PoolId) -> &mut Vec<Node> {
        match pool {
            PoolId::Main => &mut self.main,
            PoolId::Auxiliary => &mut self.aux,
        }
    }

    #[inline]
    pub fn node(&self, slot: Slot) -> &Node {
        &self.buffer(slot.pool)[slot.index as usize]
    }

    #[inline]
    pub fn node_mut(&mut self, slot: Slot) -> &mut Node {
        &mut self.buffer_mut(slot.pool)[slot.index as usize]
    }

    #[inline]
    pub fn slice(&self, pool: PoolId, span: Span) -> &[Node] {
        &self.buffer(pool)[span.range()]
    }

    #[inline]
    pub fn slice_mut(&mut self, pool: PoolId, span: Span) -> &mut [Node] {
        &mut self.buffer_mut(pool)[span.range()]
    }

    pub fn len(&self, pool: PoolId) -> usize {
        self.buffer(pool).len()
    }

    /// Both current pools are empty.
    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.aux.is_empty()
    }

    /// Every node of the current frame, main pool first.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        let main = (0..self.main.len() as u32).map(|i| Slot::new(PoolId::Main, i));
        let aux = (0..self.aux.len() as u32).map(|i| Slot::new(PoolId::Auxiliary, i));
        main.chain(aux)
    }

    /// Last frame's node carrying `key`, if any.
    pub fn find_previous(&self, key: Key) -> Option<&Node> {
        self.prev_main
            .iter()
            .chain(self.prev_aux.iter())
            .find(|node| node.key == Some(key))
    }

    /// Frame boundary: drop the previous frame, keep this one as previous,
    /// and hand the old storage back as empty current buffers.
    pub fn recycle(&mut self) {
        self.prev_main.clear();
        self.prev_aux.clear();
        mem::swap(&mut self.main, &mut self.prev_main);
        mem::swap(&mut self.aux, &mut self.prev_aux);
        self.scratch.clear();
        self.active = PoolId::Main;
    }
}
