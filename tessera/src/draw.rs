//! Draw order and draw list.
//!
//! Paint order is creation order, not tree order: every placed node is
//! stably sorted by `(z, z2)`. The sorted slots drive the interaction pass
//! and then the emission of [`DrawCommand`]s for the backend.

use std::rc::Rc;

use crate::config::EngineConfig;
use crate::frame::Frame;
use crate::interaction::DragState;
use crate::node::{CanvasFn, Handle, ImplicitFn, Kind, Paint, Shape};
use crate::pool::Slot;
use crate::primitives::{Color, Rect, Transform};

// =========================================================================
// Commands
// =========================================================================

/// What to draw.
#[derive(Debug, Clone)]
pub enum Primitive {
    Circle,
    Rect,
    RoundedRect { radius: f32 },
    Implicit(Handle<ImplicitFn>),
    Text { content: Rc<str>, font_size: f32 },
    VectorText { content: Rc<str> },
    Canvas(Handle<CanvasFn>),
    /// Follows the pointer while a drag is in flight.
    DragGhost,
    /// Outline of a compound's resolved rectangle.
    DebugOutline { depth: u32, overflow: bool },
}

/// One backend draw call.
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub primitive: Primitive,
    /// Absolute rectangle.
    pub rect: Rect,
    /// Absolute clip rectangle, if any.
    pub scissor: Option<Rect>,
    pub transform: Transform,
    pub paint: Paint,
    /// `(z, z2)` the command was sorted by.
    pub order: (u64, u64),
}

/// Backend seam. Receives commands back to front.
pub trait Renderer {
    fn draw(&mut self, command: &DrawCommand);
}

/// Sorted, positioned, clipped output of one frame.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DrawCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Hand every command to `renderer`, back to front.
    pub fn replay(&self, renderer: &mut dyn Renderer) {
        for command in &self.commands {
            renderer.draw(command);
        }
    }
}

impl<'a> IntoIterator for &'a DrawList {
    type Item = &'a DrawCommand;
    type IntoIter = std::slice::Iter<'a, DrawCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

/// Outline color by tree depth (cycles through a palette). Overflowing
/// compounds are bright red.
pub fn debug_color(depth: u32, overflow: bool) -> Color {
    const PALETTE: &[(f32, f32, f32)] = &[
        (0.8, 0.2, 0.2), // Red
        (0.2, 0.8, 0.2), // Green
        (0.2, 0.2, 0.8), // Blue
        (0.8, 0.8, 0.2), // Yellow
        (0.8, 0.2, 0.8), // Magenta
        (0.2, 0.8, 0.8), // Cyan
        (0.9, 0.5, 0.2), // Orange
        (0.5, 0.2, 0.9), // Purple
    ];
    if overflow {
        return Color::rgba(1.0, 0.0, 0.0, 0.5);
    }
    let (r, g, b) = PALETTE[depth as usize % PALETTE.len()];
    Color::rgba(r, g, b, 0.3)
}

// =========================================================================
// Passes
// =========================================================================

/// Every placed compound and shape, stably sorted by creation order.
pub(crate) fn draw_order(frame: &Frame) -> Vec<Slot> {
    let pools = &frame.pools;
    let mut order: Vec<Slot> = pools
        .slots()
        .filter(|slot| {
            let node = pools.node(*slot);
            node.flags.placed && matches!(node.kind, Kind::Compound | Kind::Shape(_))
        })
        .collect();
    order.sort_by_key(|slot| pools.node(*slot).z());
    order
}

/// Emit draw commands for `order`. The overlay node expands into the drag
/// ghost and, when enabled, debug outlines.
pub(crate) fn emit(
    frame: &Frame,
    order: &[Slot],
    drag: &DragState,
    config: &EngineConfig,
) -> DrawList {
    let mut list = DrawList {
        commands: Vec::with_capacity(order.len()),
    };

    for &slot in order {
        let node = frame.pools.node(slot);
        if node.flags.clipped || !node.is_sized() {
            continue;
        }
        let primitive = match &node.kind {
            Kind::Shape(shape) => match shape {
                Shape::Circle => Primitive::Circle,
                Shape::Rect => Primitive::Rect,
                Shape::RoundedRect { radius } => Primitive::RoundedRect { radius: *radius },
                Shape::Implicit(f) => Primitive::Implicit(f.clone()),
                Shape::Text { content, font_size } => Primitive::Text {
                    content: content.clone(),
                    font_size: *font_size,
                },
                Shape::VectorText { content } => Primitive::VectorText {
                    content: content.clone(),
                },
                Shape::Canvas(f) => Primitive::Canvas(f.clone()),
                Shape::Overlay => {
                    overlay(frame, &mut list, drag, config);
                    continue;
                }
                Shape::Void | Shape::Sequence(_) => continue,
            },
            _ => continue,
        };
        list.commands.push(DrawCommand {
            primitive,
            rect: node.rect(),
            scissor: node.scissor,
            transform: node.transform,
            paint: node.effective,
            order: node.z(),
        });
    }
    list
}

fn overlay(frame: &Frame, list: &mut DrawList, drag: &DragState, config: &EngineConfig) {
    if config.debug_overlay {
        if let Some(root) = frame.root {
            outline(frame, root, 0, list);
        }
    }

    if drag.is_active() {
        list.commands.push(DrawCommand {
            primitive: Primitive::DragGhost,
            rect: Rect::from_origin_size(drag.position, drag.origin.size()),
            scissor: None,
            transform: Transform::IDENTITY,
            paint: Paint {
                fill: Some(config.drag_ghost),
                ..Paint::default()
            },
            order: (u64::MAX, u64::MAX),
        });
    }
}

fn outline(frame: &Frame, slot: Slot, depth: u32, list: &mut DrawList) {
    let node = frame.pools.node(slot);
    if !node.is_container() {
        return;
    }
    if node.is_sized() {
        let overflow = node.width > node.limit_w || node.height > node.limit_h;
        list.commands.push(DrawCommand {
            primitive: Primitive::DebugOutline { depth, overflow },
            rect: node.rect(),
            scissor: None,
            transform: Transform::IDENTITY,
            paint: Paint {
                stroke: Some(debug_color(depth, overflow)),
                stroke_width: Some(1.0),
                fill: None,
            },
            order: (u64::MAX, u64::from(depth)),
        });
    }
    let (pool, children) = (node.pool, node.children);
    for index in children.iter() {
        outline(frame, Slot::new(pool, index), depth + 1, list);
    }
}
