//! Resolver: turns a freshly built tree into sized, positioned nodes.
//!
//! # Passes
//!
//! ```text
//! resolve_aligners   pre-order   sort premodifiers, pick aligner, imaginary
//!                                limits, materialize sequences
//! apply              mixed       premodifiers -> scissor -> propagate to
//!                                children -> aligner -> modifiers ->
//!                                overrides -> scissor clamp
//! inherit            pre-order   absolute positions, paint, scissor rects
//! ```
//!
//! The pre-pass and the main pass execute the same alignment premodifiers;
//! doing so twice yields the same node state.

mod aligner;
mod inherit;

pub use aligner::{Aligner, AlignerRegistry, Axis, Follow, Stack};
pub use inherit::{inherit, repaint};

use std::cmp::Reverse;

use crate::error::{LayoutError, Result};
use crate::frame::Frame;
use crate::node::{AlignerKind, DragRole, Kind, Modifier, Node, Premodifier};
use crate::pool::Slot;
use crate::primitives::{Point, Rect};
use crate::sequence;

/// Runs the layout passes over one frame's tree.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r AlignerRegistry,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r AlignerRegistry) -> Self {
        Self { registry }
    }

    // =====================================================================
    // Pre-pass
    // =====================================================================

    /// Alignment pre-pass over the subtree at `slot`.
    ///
    /// Returns the number of sequence items materialized.
    pub fn resolve_aligners(&self, frame: &mut Frame, slot: Slot) -> Result<usize> {
        let node = frame.pools.node(slot);
        if !node.is_container() {
            return Ok(0);
        }
        let (pool, premodifiers) = (node.pool, node.premodifiers);

        // Stable: equal priorities keep argument order.
        frame
            .pools
            .slice_mut(pool, premodifiers)
            .sort_by_key(|p| Reverse(priority(p)));

        let mut fractions = [None; 2];
        for index in premodifiers.iter() {
            let premodifier = match &frame.pools.node(Slot::new(pool, index)).kind {
                Kind::Premodifier(p) if p.runs_in_prepass() => *p,
                _ => continue,
            };
            let node = frame.pools.node_mut(slot);
            match premodifier {
                Premodifier::Limit { w, h } => {
                    if w < 0.0 {
                        fractions[0] = Some(fractions[0].unwrap_or(1.0) * -w);
                    }
                    if h < 0.0 {
                        fractions[1] = Some(fractions[1].unwrap_or(1.0) * -h);
                    }
                }
                Premodifier::Vfollow => set_aligner(node, AlignerKind::VerticalFollow)?,
                Premodifier::Hfollow => set_aligner(node, AlignerKind::HorizontalFollow)?,
                _ => {}
            }
        }
        frame.pools.node_mut(slot).limit_fraction = fractions;

        let mut materialized = sequence::materialize(frame, slot)?;

        let node = frame.pools.node(slot);
        let (pool, children) = (node.pool, node.children);
        for index in children.iter() {
            materialized += self.resolve_aligners(frame, Slot::new(pool, index))?;
        }
        Ok(materialized)
    }

    // =====================================================================
    // Main pass
    // =====================================================================

    /// Main pass over the container at `slot`. Leaves and containers that
    /// already ran this frame are left untouched.
    pub fn apply(&self, frame: &mut Frame, slot: Slot) -> Result<()> {
        let node = frame.pools.node(slot);
        if !node.is_container() || node.flags.resolved {
            return Ok(());
        }
        sequence::materialize(frame, slot)?;

        let node = frame.pools.node_mut(slot);
        node.flags.resolved = true;
        let (pool, premodifiers) = (node.pool, node.premodifiers);

        // 1. imaginary limits scale the inherited limit, then premodifiers
        // run in sorted order
        let [fw, fh] = node.limit_fraction;
        if let Some(f) = fw {
            node.limit_w *= f;
        }
        if let Some(f) = fh {
            node.limit_h *= f;
        }
        let sorted: Vec<Premodifier> = frame
            .pools
            .slice(pool, premodifiers)
            .iter()
            .filter_map(|p| match &p.kind {
                Kind::Premodifier(p) => Some(*p),
                _ => None,
            })
            .collect();
        for premodifier in sorted {
            execute_premodifier(frame.pools.node_mut(slot), premodifier)?;
        }

        // 2. local scissor rectangle
        let node = frame.pools.node_mut(slot);
        if node.flags.scissor {
            node.scissor = Some(Rect::new(0.0, 0.0, node.limit_w, node.limit_h));
        }

        // 3. propagate limits and transform, resolve known children first
        let (pool, children) = (node.pool, node.children);
        let (limit_w, limit_h, transform) = (node.limit_w, node.limit_h, node.transform);
        let (sx, sy) = transform.scale_factors();
        for index in children.iter() {
            let child_slot = Slot::new(pool, index);
            let child = frame.pools.node_mut(child_slot);
            child.limit_w = limit_w;
            child.limit_h = limit_h;
            child.transform = transform;
            scale(child, sx, sy);
            if child.is_sized() {
                self.apply(frame, child_slot)?;
            }
        }

        // 4. aligner
        let kind = frame.pools.node(slot).aligner;
        self.registry.get(kind).align(self, frame, slot)?;

        // 5. extra addend, then modifiers in argument order
        let node = frame.pools.node_mut(slot);
        node.width += std::mem::take(&mut node.extra_width);
        node.height += std::mem::take(&mut node.extra_height);

        let modifiers = node.modifiers;
        for index in modifiers.iter() {
            let modifier = match &mut frame.pools.node_mut(Slot::new(pool, index)).kind {
                Kind::Modifier(Modifier::Identity(key)) => Modifier::Identity(key.take()),
                Kind::Modifier(m) => m.clone(),
                _ => continue,
            };
            execute_modifier(frame.pools.node_mut(slot), modifier);
        }

        // 6. overrides bubble one level per container; the child keeps the
        // position its aligner gave it
        for index in children.iter() {
            let child = frame.pools.node(Slot::new(pool, index));
            let (flags, width, height) = (child.flags, child.width, child.height);
            let node = frame.pools.node_mut(slot);
            if flags.hoverride {
                node.width = width;
            }
            if flags.voverride {
                node.height = height;
            }
        }

        // 7. scissor clamp
        let node = frame.pools.node_mut(slot);
        if node.flags.scissor {
            node.width = node.width.min(node.limit_w);
            node.height = node.height.min(node.limit_h);
            node.scissor = Some(Rect::new(0.0, 0.0, node.limit_w, node.limit_h));
        }

        tracing::trace!(
            z = node.z,
            aligner = ?node.aligner,
            width = node.width,
            height = node.height,
            "resolved compound"
        );
        Ok(())
    }
}

fn priority(node: &Node) -> u8 {
    match &node.kind {
        Kind::Premodifier(p) => p.priority(),
        _ => 0,
    }
}

fn set_aligner(node: &mut Node, kind: AlignerKind) -> Result<()> {
    match node.aligner {
        AlignerKind::Stack => {
            node.aligner = kind;
            Ok(())
        }
        current if current == kind => Ok(()),
        _ => Err(LayoutError::ConflictingAligners { z: node.z }),
    }
}

/// Scale concrete sizes and extras by the accumulated transform. Weights
/// stay untouched. Extras of known-size leaves fold into the size here.
fn scale(node: &mut Node, sx: f32, sy: f32) {
    if node.width >= 0.0 {
        node.width *= sx;
    }
    if node.height >= 0.0 {
        node.height *= sy;
    }
    node.extra_width *= sx;
    node.extra_height *= sy;

    if !node.is_container() {
        if node.width >= 0.0 {
            node.width += std::mem::take(&mut node.extra_width);
        }
        if node.height >= 0.0 {
            node.height += std::mem::take(&mut node.extra_height);
        }
    }
}

fn execute_premodifier(node: &mut Node, premodifier: Premodifier) -> Result<()> {
    match premodifier {
        Premodifier::Transform { dx, dy } => {
            node.offset = node.offset + Point::new(dx, dy);
        }
        Premodifier::Pretransform(matrix) => {
            node.transform = node.transform * matrix;
        }
        Premodifier::Scissor => node.flags.scissor = true,
        Premodifier::Hshrink => node.flags.hshrink = true,
        Premodifier::Vshrink => node.flags.vshrink = true,
        Premodifier::Limit { w, h } => {
            node.limit_w = limit_component(node.limit_w, w);
            node.limit_h = limit_component(node.limit_h, h);
        }
        Premodifier::Vfollow => set_aligner(node, AlignerKind::VerticalFollow)?,
        Premodifier::Hfollow => set_aligner(node, AlignerKind::HorizontalFollow)?,
    }
    Ok(())
}

/// Non-negative `value` caps the limit. Negative components were folded
/// into `limit_fraction` by the pre-pass.
fn limit_component(inherited: f32, value: f32) -> f32 {
    if value < 0.0 {
        inherited
    } else {
        inherited.min(value)
    }
}

fn execute_modifier(node: &mut Node, modifier: Modifier) {
    match modifier {
        Modifier::Fill(color) => node.paint.fill = Some(color),
        Modifier::Stroke(color) => node.paint.stroke = Some(color),
        Modifier::StrokeWidth(width) => node.paint.stroke_width = Some(width),
        Modifier::Identity(key) => {
            if key.is_some() {
                node.key = key;
            }
        }
        Modifier::Cond(f) => node.conditional.cond = Some(f),
        Modifier::CondFill(f) => node.conditional.fill = Some(f),
        Modifier::CondStroke(f) => node.conditional.stroke = Some(f),
        Modifier::Between(_) => {}
        Modifier::Source(payload) => node.drag = DragRole::Source(payload),
        Modifier::Sink(f) => node.drag = DragRole::Sink(f),
        Modifier::Hoverride => node.flags.hoverride = true,
        Modifier::Voverride => node.flags.voverride = true,
    }
}
