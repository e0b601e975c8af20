//! Build a small screen, run two frames and print the draw list.
//!
//! Run with `RUST_LOG=tessera=debug` to see per-frame reports.

use tessera::{Color, Engine, EngineConfig, FnSequence, Frame, Node, Pointer};
use tracing_subscriber::EnvFilter;

fn screen(f: &mut Frame) -> Node {
    let title = f.text("Inbox");
    let header_args = [f.fill(Color::rgb8(40, 44, 52)), f.vshrink(), f.rect(-1.0, 24.0), title];
    let header = f.compound(header_args);

    let rows = f.sequence(FnSequence::new(5, |i, g: &mut Frame| {
        let label = g.text(&format!("message {i}"));
        let args = [
            g.cond_fill(|q| q.matches("hover").then_some(Color::rgb8(70, 90, 140))),
            g.rect(-1.0, 20.0),
            label,
        ];
        Ok(g.compound(args))
    }));
    let list_args = [f.scissor(), f.rect(-1.0, -1.0), rows];
    let list = f.compound(list_args);

    let args = [f.vfollow(), header, list];
    f.compound(args)
}

fn main() -> tessera::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = EngineConfig::default().with_window_size(320.0, 120.0);
    config.timing = true;
    let mut engine = Engine::new(config);

    // Warm-up frame, then one with the pointer over the second row.
    engine.run_frame(&Pointer::at(0.0, 0.0), screen)?;
    let list = engine.run_frame(&Pointer::at(10.0, 50.0).with("hover"), screen)?;

    for command in &list {
        let r = command.rect;
        println!(
            "{:>3}.{:<3} {:<28} ({:6.1}, {:6.1}) {:6.1}x{:<6.1} fill={:?}",
            command.order.0,
            command.order.1,
            format!("{:?}", command.primitive),
            r.x,
            r.y,
            r.width,
            r.height,
            command.paint.fill,
        );
    }

    let report = engine.report();
    println!(
        "frame {}: {} main, {} aux, {} commands in {:.2?}",
        report.frame,
        report.main_nodes,
        report.aux_nodes,
        report.commands,
        report.total()
    );
    Ok(())
}
