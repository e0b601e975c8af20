//! Integration tests for the full frame pipeline.
//!
//! Every test drives the public `Engine` API: build a tree, run a frame,
//! then inspect either the draw list or last frame's rectangles through
//! `Frame::prev_rect`.

use std::cell::Cell;
use std::rc::Rc;

use tessera::{
    Color, DrawCommand, DrawList, Engine, EngineConfig, FnSequence, Frame, LayoutError, NoInput,
    Node, Primitive, Rect, Renderer,
};

const EPS: f32 = 1e-4;

/// Test harness around an engine with a small window.
struct LayoutTest {
    engine: Engine,
}

impl LayoutTest {
    fn new() -> Self {
        Self {
            engine: Engine::new(EngineConfig::default().with_window_size(200.0, 100.0)),
        }
    }

    /// Run one frame without input.
    fn frame(&mut self, build: impl FnOnce(&mut Frame) -> Node) -> DrawList {
        self.engine
            .run_frame(&NoInput, build)
            .expect("frame should resolve")
    }

    fn prev_rect(&self, key: &str) -> Rect {
        self.engine
            .frame()
            .prev_rect(key)
            .expect("keyed node should exist in last frame")
    }
}

fn rects(list: &DrawList) -> Vec<Rect> {
    list.iter()
        .filter(|c| matches!(c.primitive, Primitive::Rect))
        .map(|c| c.rect)
        .collect()
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPS
}

// =========================================================================
// Sizing
// =========================================================================

#[test]
fn test_stack_size_is_componentwise_max() {
    let mut t = LayoutTest::new();
    t.frame(|f| {
        let args = [f.identity("stack"), f.rect(3.0, 4.0), f.rect(5.0, 2.0)];
        f.compound(args)
    });

    let rect = t.prev_rect("stack");
    assert_eq!((rect.width, rect.height), (5.0, 4.0));
}

#[test]
fn test_hfollow_equal_weights_split_evenly() {
    let mut t = LayoutTest::new();
    let list = t.frame(|f| {
        let args = [
            f.hfollow(),
            f.limit(100.0, 100.0),
            f.rect(-1.0, 10.0),
            f.rect(-1.0, 10.0),
        ];
        f.compound(args)
    });

    let widths: Vec<f32> = rects(&list).iter().map(|r| r.width).collect();
    assert_eq!(widths.len(), 2);
    assert!(approx(widths[0], 50.0));
    assert!(approx(widths[1], 50.0));
}

#[test]
fn test_hfollow_weights_are_proportional() {
    let mut t = LayoutTest::new();
    let list = t.frame(|f| {
        let args = [
            f.hfollow(),
            f.limit(100.0, 100.0),
            f.rect(-1.0, 10.0),
            f.rect(-3.0, 10.0),
        ];
        f.compound(args)
    });

    let r = rects(&list);
    assert!(approx(r[0].width, 25.0));
    assert!(approx(r[1].width, 75.0));
    assert!(approx(r[1].x, 25.0));
}

#[test]
fn test_extra_addend_after_stretch() {
    let mut t = LayoutTest::new();
    let list = t.frame(|f| {
        let args = [
            f.hfollow(),
            f.limit(100.0, 100.0),
            f.rect(60.0, 10.0),
            f.rect(-1.0, 10.0).extra(10.0, 0.0),
        ];
        f.compound(args)
    });

    let r = rects(&list);
    assert_eq!(r[0].width, 60.0);
    assert!(approx(r[1].width, 50.0));
}

#[test]
fn test_root_content_fills_window() {
    let mut t = LayoutTest::new();
    let list = t.frame(|f| f.rect(-1.0, -1.0));

    assert_eq!(rects(&list), vec![Rect::new(0.0, 0.0, 200.0, 100.0)]);
}

#[test]
fn test_override_bubbles_to_overriding_ancestors() {
    let mut t = LayoutTest::new();
    t.frame(|f| {
        let leaf_args = [f.hoverride(), f.rect(42.0, 5.0)];
        let leaf = f.compound(leaf_args);
        let mid_args = [f.hoverride(), f.identity("mid"), leaf, f.rect(150.0, 5.0)];
        let mid = f.compound(mid_args);
        let outer_args = [f.identity("outer"), mid, f.rect(180.0, 5.0)];
        f.compound(outer_args)
    });

    assert_eq!(t.prev_rect("mid").width, 42.0);
    assert_eq!(t.prev_rect("outer").width, 42.0);
}

#[test]
fn test_voverride_in_vfollow_draws_after_sibling() {
    let mut t = LayoutTest::new();
    let list = t.frame(|f| {
        let args = [f.voverride(), f.identity("tail"), f.rect(30.0, 7.0)];
        let tail = f.compound(args);
        let args = [f.vfollow(), f.identity("list"), f.rect(10.0, 10.0), tail];
        f.compound(args)
    });

    // The tail's leaf was created first, so it paints first.
    assert_eq!(
        rects(&list),
        vec![Rect::new(0.0, 10.0, 30.0, 7.0), Rect::new(0.0, 0.0, 10.0, 10.0)]
    );
    assert_eq!(t.prev_rect("tail").y, 10.0);
    assert_eq!(t.prev_rect("list").height, 7.0);
}

// =========================================================================
// Draw order
// =========================================================================

#[test]
fn test_forced_creation_order_decides_paint_order() {
    let mut t = LayoutTest::new();
    let list = t.frame(|f| {
        let _ = f.void(0.0, 0.0);
        let a = f.rect(10.0, 10.0);
        let b = f.rect(20.0, 20.0).order(0);
        f.compound([a, b])
    });

    let widths: Vec<f32> = rects(&list).iter().map(|r| r.width).collect();
    assert_eq!(widths, vec![20.0, 10.0]);
}

#[test]
fn test_declaration_order_not_tree_order() {
    let mut t = LayoutTest::new();
    let list = t.frame(|f| {
        // Built first, placed last in the tree.
        let early = f.rect(1.0, 1.0);
        let late_args = [f.rect(2.0, 2.0)];
        let late = f.compound(late_args);
        f.compound([late, early])
    });

    let widths: Vec<f32> = rects(&list).iter().map(|r| r.width).collect();
    assert_eq!(widths, vec![1.0, 2.0]);
}

#[test]
fn test_renderer_receives_sorted_commands() {
    #[derive(Default)]
    struct Collect(Vec<Option<Color>>);

    impl Renderer for Collect {
        fn draw(&mut self, command: &DrawCommand) {
            self.0.push(command.paint.fill);
        }
    }

    let mut t = LayoutTest::new();
    let list = t.frame(|f| {
        let red_args = [f.fill(Color::RED), f.rect(5.0, 5.0)];
        let red = f.compound(red_args);
        let green_args = [f.fill(Color::GREEN), f.circle(5.0)];
        let green = f.compound(green_args);
        f.compound([green, red])
    });

    let mut collect = Collect::default();
    list.replay(&mut collect);
    assert_eq!(collect.0, vec![Some(Color::RED), Some(Color::GREEN)]);
}

// =========================================================================
// Sequences
// =========================================================================

#[test]
fn test_sequence_fetches_each_item_once_per_frame() {
    let calls = Rc::new(Cell::new(0usize));
    let mut t = LayoutTest::new();

    let counter = calls.clone();
    let list = t.frame(move |f| {
        f.sequence(FnSequence::new(6, move |i, g: &mut Frame| {
            counter.set(counter.get() + 1);
            Ok(g.rect(10.0, i as f32 + 1.0))
        }))
    });

    assert_eq!(calls.get(), 6);
    let r = rects(&list);
    assert_eq!(r.len(), 6);
    // Laid out top to bottom: 1 + 2 + 3 before the fourth item.
    assert_eq!(r[3].y, 6.0);
}

#[test]
fn test_sequence_items_draw_at_sequence_position() {
    let mut t = LayoutTest::new();
    let list = t.frame(|f| {
        let before = f.rect(1.0, 1.0);
        let seq = f.sequence(FnSequence::new(2, |_, g: &mut Frame| Ok(g.rect(5.0, 5.0))));
        let after = f.rect(9.0, 9.0);
        f.compound([after, seq, before])
    });

    let widths: Vec<f32> = rects(&list).iter().map(|r| r.width).collect();
    assert_eq!(widths, vec![1.0, 5.0, 5.0, 9.0]);
}

#[test]
fn test_nested_sequence_fails_frame() {
    let mut engine = Engine::new(EngineConfig::default());
    let result = engine.run_frame(&NoInput, |f| {
        f.sequence(FnSequence::new(2, |_, g: &mut Frame| {
            Ok(g.sequence(FnSequence::new(1, |_, h: &mut Frame| Ok(h.void(1.0, 1.0)))))
        }))
    });

    assert!(matches!(result, Err(LayoutError::NestedSequence)));
    // The next frame starts from a clean arena.
    assert!(engine.run_frame(&NoInput, |f| f.rect(1.0, 1.0)).is_ok());
}

#[test]
fn test_producer_error_fails_frame() {
    let mut engine = Engine::new(EngineConfig::default());
    let result = engine.run_frame(&NoInput, |f| {
        f.sequence(FnSequence::new(3, |i, g: &mut Frame| {
            if i == 2 {
                return Err("backing store closed".into());
            }
            Ok(g.void(1.0, 1.0))
        }))
    });

    match result {
        Err(LayoutError::Producer { index, source }) => {
            assert_eq!(index, 2);
            assert_eq!(source.to_string(), "backing store closed");
        }
        other => panic!("expected producer error, got {other:?}"),
    }
}

// =========================================================================
// Persistent keys
// =========================================================================

#[test]
fn test_key_expires_after_two_unread_frames() {
    let mut t = LayoutTest::new();
    let touch = |f: &mut Frame| {
        if let Some(scroll) = f.key::<u32>("scroll") {
            *scroll += 1;
        }
        f.void(1.0, 1.0)
    };
    let idle = |f: &mut Frame| f.void(1.0, 1.0);

    t.frame(touch); // N
    t.frame(touch); // N+1
    t.frame(idle); // N+2
    assert!(t.engine.frame().has_key("scroll"));

    t.frame(idle); // N+3
    assert!(!t.engine.frame().has_key("scroll"));
}

#[test]
fn test_key_value_survives_while_read() {
    let mut t = LayoutTest::new();
    let seen = Rc::new(Cell::new(0u32));
    for _ in 0..4 {
        let seen = seen.clone();
        t.frame(move |f| {
            let count = f.key::<u32>("clicks").unwrap();
            *count += 1;
            seen.set(*count);
            f.void(1.0, 1.0)
        });
    }
    assert_eq!(seen.get(), 4);
}
