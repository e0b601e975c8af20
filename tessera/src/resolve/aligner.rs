//! Aligners: turn stretch weights into concrete sizes and positions.
//!
//! Two algorithms exist. [`Stack`] overlaps children at the origin and
//! shares the full limit among stretch weights. [`Follow`] lays children
//! out one after another along a main axis and shares whatever the fixed
//! children leave over. The horizontal follow is the vertical one with the
//! axes swapped through [`Axis`], not a copy.

use crate::error::Result;
use crate::frame::Frame;
use crate::node::{AlignerKind, Node, NodeFlags};
use crate::pool::Slot;

use super::Resolver;

// =========================================================================
// Axis accessors
// =========================================================================

/// Field selector used to write each algorithm once for both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];

    #[inline]
    pub fn cross(self) -> Self {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }

    #[inline]
    pub fn size(self, node: &Node) -> f32 {
        match self {
            Axis::Horizontal => node.width,
            Axis::Vertical => node.height,
        }
    }

    #[inline]
    pub fn size_mut(self, node: &mut Node) -> &mut f32 {
        match self {
            Axis::Horizontal => &mut node.width,
            Axis::Vertical => &mut node.height,
        }
    }

    #[inline]
    pub fn extra_mut(self, node: &mut Node) -> &mut f32 {
        match self {
            Axis::Horizontal => &mut node.extra_width,
            Axis::Vertical => &mut node.extra_height,
        }
    }

    #[inline]
    pub fn limit(self, node: &Node) -> f32 {
        match self {
            Axis::Horizontal => node.limit_w,
            Axis::Vertical => node.limit_h,
        }
    }

    #[inline]
    pub fn limit_mut(self, node: &mut Node) -> &mut f32 {
        match self {
            Axis::Horizontal => &mut node.limit_w,
            Axis::Vertical => &mut node.limit_h,
        }
    }

    #[inline]
    pub fn pos_mut(self, node: &mut Node) -> &mut f32 {
        match self {
            Axis::Horizontal => &mut node.x,
            Axis::Vertical => &mut node.y,
        }
    }

    #[inline]
    pub fn shrinks(self, flags: &NodeFlags) -> bool {
        match self {
            Axis::Horizontal => flags.hshrink,
            Axis::Vertical => flags.vshrink,
        }
    }

    #[inline]
    pub fn overrides(self, flags: &NodeFlags) -> bool {
        match self {
            Axis::Horizontal => flags.hoverride,
            Axis::Vertical => flags.voverride,
        }
    }
}

/// Replace a stretch weight with its resolved share plus the extra addend.
/// The child's limit on that axis becomes its size.
fn stretch(node: &mut Node, axis: Axis, share: f32) {
    let extra = std::mem::take(axis.extra_mut(node));
    let size = share + extra;
    *axis.size_mut(node) = size;
    *axis.limit_mut(node) = size;
}

/// Run the main pass on every child that is now fully sized. Children that
/// already ran return immediately.
fn apply_children(resolver: &Resolver<'_>, frame: &mut Frame, slot: Slot) -> Result<()> {
    let node = frame.pools.node(slot);
    let (pool, span) = (node.pool, node.children);
    for index in span.iter() {
        let child = Slot::new(pool, index);
        if frame.pools.node(child).is_sized() {
            resolver.apply(frame, child)?;
        }
    }
    Ok(())
}

// =========================================================================
// Aligner trait and registry
// =========================================================================

/// Per-compound stacking algorithm.
///
/// Called after the compound's premodifiers ran and its fully sized children
/// were resolved. Must leave the compound's own size resolved and every
/// resolvable child applied.
pub trait Aligner {
    fn align(&self, resolver: &Resolver<'_>, frame: &mut Frame, slot: Slot) -> Result<()>;
}

/// Immutable `AlignerKind -> Aligner` table, built once per engine.
pub struct AlignerRegistry {
    stack: Box<dyn Aligner>,
    vertical: Box<dyn Aligner>,
    horizontal: Box<dyn Aligner>,
}

impl std::fmt::Debug for AlignerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignerRegistry").finish_non_exhaustive()
    }
}

impl Default for AlignerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl AlignerRegistry {
    /// Stack plus vertical and horizontal follow.
    pub fn standard() -> Self {
        Self {
            stack: Box::new(Stack),
            vertical: Box::new(Follow::new(Axis::Vertical)),
            horizontal: Box::new(Follow::new(Axis::Horizontal)),
        }
    }

    /// Replace the behavior registered for `kind`.
    pub fn with(mut self, kind: AlignerKind, aligner: impl Aligner + 'static) -> Self {
        let slot = match kind {
            AlignerKind::Stack => &mut self.stack,
            AlignerKind::VerticalFollow => &mut self.vertical,
            AlignerKind::HorizontalFollow => &mut self.horizontal,
        };
        *slot = Box::new(aligner);
        self
    }

    pub fn get(&self, kind: AlignerKind) -> &dyn Aligner {
        match kind {
            AlignerKind::Stack => self.stack.as_ref(),
            AlignerKind::VerticalFollow => self.vertical.as_ref(),
            AlignerKind::HorizontalFollow => self.horizontal.as_ref(),
        }
    }
}

// =========================================================================
// Stack
// =========================================================================

/// Children overlap at the origin.
///
/// Size is the component-wise maximum of the declared floor and the known
/// children. A child with weight `-w` on an axis gets
/// `limit * w / total + extra`, where `total` sums all weights on that axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stack;

impl Aligner for Stack {
    fn align(&self, resolver: &Resolver<'_>, frame: &mut Frame, slot: Slot) -> Result<()> {
        let node = frame.pools.node(slot);
        let (pool, span) = (node.pool, node.children);

        for axis in Axis::BOTH {
            let node = frame.pools.node(slot);
            let floor = axis.size(node).max(0.0);
            let shrink = axis.shrinks(&node.flags);

            let kids = frame.pools.slice(pool, span);
            let extent = kids
                .iter()
                .map(|k| axis.size(k))
                .filter(|s| *s >= 0.0)
                .fold(floor, f32::max);
            let total: f32 = kids
                .iter()
                .map(|k| axis.size(k))
                .filter(|s| *s < 0.0)
                .map(|s| -s)
                .sum();
            let stretched = kids.iter().any(|k| axis.size(k) < 0.0);

            let node = frame.pools.node_mut(slot);
            *axis.size_mut(node) = extent;
            if shrink {
                *axis.limit_mut(node) = extent;
            }
            let limit = axis.limit(node);

            if !stretched {
                continue;
            }
            if !(total > 0.0 && total.is_finite()) {
                tracing::warn!(?axis, total, "stack has no usable stretch total, weights left unresolved");
                continue;
            }
            for kid in frame.pools.slice_mut(pool, span) {
                let size = axis.size(kid);
                if size < 0.0 {
                    stretch(kid, axis, limit * (-size / total));
                }
            }
        }

        apply_children(resolver, frame, slot)?;

        for axis in Axis::BOTH {
            let extent = frame
                .pools
                .slice(pool, span)
                .iter()
                .map(|k| axis.size(k))
                .filter(|s| *s >= 0.0)
                .fold(axis.size(frame.pools.node(slot)), f32::max);
            *axis.size_mut(frame.pools.node_mut(slot)) = extent;
        }
        Ok(())
    }
}

// =========================================================================
// Follow
// =========================================================================

/// Children placed one after another along `axis`.
///
/// Fixed children add to a known total; weights share what is left of the
/// limit: `max(0, (limit - known) / weights * w) + extra`. A weight on the
/// cross axis fills the cross limit.
#[derive(Debug, Clone, Copy)]
pub struct Follow {
    axis: Axis,
}

impl Follow {
    pub fn new(axis: Axis) -> Self {
        Self { axis }
    }
}

impl Aligner for Follow {
    fn align(&self, resolver: &Resolver<'_>, frame: &mut Frame, slot: Slot) -> Result<()> {
        let main = self.axis;
        let cross = main.cross();

        let node = frame.pools.node(slot);
        let (pool, span) = (node.pool, node.children);
        let floor_main = main.size(node).max(0.0);
        let floor_cross = cross.size(node).max(0.0);
        let flags = node.flags;

        let mut known = 0.0f32;
        let mut weights = 0.0f32;
        let mut known_cross = 0.0f32;
        for kid in frame.pools.slice(pool, span) {
            let size = main.size(kid);
            if size >= 0.0 {
                known += size;
            } else {
                weights += -size;
            }
            known_cross = known_cross.max(cross.size(kid));
        }

        let node = frame.pools.node_mut(slot);
        if main.shrinks(&flags) {
            *main.limit_mut(node) = floor_main.max(known);
        }
        if cross.shrinks(&flags) {
            *cross.limit_mut(node) = floor_cross.max(known_cross);
        }
        let limit_main = main.limit(node);
        let limit_cross = cross.limit(node);
        let remaining = limit_main - known;

        for kid in frame.pools.slice_mut(pool, span) {
            let weight = -main.size(kid);
            if weight > 0.0 {
                let share = if weights > 0.0 {
                    (remaining / weights * weight).max(0.0)
                } else {
                    0.0
                };
                stretch(kid, main, share);
            }
            if cross.size(kid) < 0.0 {
                stretch(kid, cross, limit_cross);
            }
        }

        apply_children(resolver, frame, slot)?;

        let mut offset = 0.0f32;
        let mut extent_cross = floor_cross;
        for kid in frame.pools.slice_mut(pool, span) {
            *main.pos_mut(kid) = offset;
            *cross.pos_mut(kid) = 0.0;
            offset += main.size(kid).max(0.0);
            extent_cross = extent_cross.max(cross.size(kid));
        }

        let node = frame.pools.node_mut(slot);
        *main.size_mut(node) = floor_main.max(offset);
        *cross.size_mut(node) = extent_cross;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Size;

    #[test]
    fn test_axis_cross() {
        assert_eq!(Axis::Horizontal.cross(), Axis::Vertical);
        assert_eq!(Axis::Vertical.cross(), Axis::Horizontal);
    }

    #[test]
    fn test_axis_accessors_select_fields() {
        let mut node = Node::default().size(3.0, 4.0);
        *Axis::Vertical.size_mut(&mut node) = 9.0;
        *Axis::Horizontal.limit_mut(&mut node) = 50.0;

        assert_eq!(node.declared_size(), Size::new(3.0, 9.0));
        assert_eq!(Axis::Horizontal.limit(&node), 50.0);
        assert_eq!(Axis::Vertical.limit(&node), 0.0);
    }

    #[test]
    fn test_stretch_folds_extra_and_sets_limit() {
        let mut node = Node::default().size(-1.0, 5.0).extra(10.0, 0.0);
        stretch(&mut node, Axis::Horizontal, 40.0);

        assert_eq!(node.width, 50.0);
        assert_eq!(node.limit_w, 50.0);
        assert_eq!(node.extra_width, 0.0);
    }

    #[test]
    fn test_registry_lookup() {
        struct Nothing;
        impl Aligner for Nothing {
            fn align(&self, _: &Resolver<'_>, _: &mut Frame, _: Slot) -> Result<()> {
                Ok(())
            }
        }

        let registry = AlignerRegistry::standard().with(AlignerKind::Stack, Nothing);
        // Replaced entries still resolve to something.
        let _ = registry.get(AlignerKind::Stack);
        let _ = registry.get(AlignerKind::HorizontalFollow);
    }
}
