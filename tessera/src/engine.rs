//! Frame loop.
//!
//! [`Engine`] owns everything that outlives a single frame: the arena
//! storage, the key store, the aligner registry and the drag state. One call
//! to [`Engine::run_frame`] runs the whole pipeline and always leaves the
//! arena recycled for the next frame, whether the frame succeeded or not.

use crate::config::EngineConfig;
use crate::draw::{self, DrawList};
use crate::error::Result;
use crate::frame::Frame;
use crate::frame_timing::{FrameReport, measure};
use crate::interaction::{self, DragState, Matcher};
use crate::node::Node;
use crate::pool::PoolId;
use crate::resolve::{self, AlignerRegistry, Resolver};

/// Layout engine. Single-threaded; call [`run_frame`](Self::run_frame) once
/// per display frame.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    registry: AlignerRegistry,
    frame: Frame,
    drag: DragState,
    report: FrameReport,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(config, AlignerRegistry::standard())
    }

    /// Engine with a custom aligner table.
    pub fn with_registry(config: EngineConfig, registry: AlignerRegistry) -> Self {
        let frame = Frame::new(&config);
        Self {
            config,
            registry,
            frame,
            drag: DragState::default(),
            report: FrameReport::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Frame state between frames (previous rectangles, persistent keys).
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    /// Report of the last finished frame.
    pub fn report(&self) -> &FrameReport {
        &self.report
    }

    pub fn set_window_size(&mut self, width: f32, height: f32) {
        self.config.window_size = (width, height);
        self.frame.set_window_size(width, height);
    }

    /// Build, resolve and draw one frame.
    ///
    /// `build` returns the content placed under the root. A failed frame
    /// returns its error; the arena is recycled either way and the next
    /// frame starts clean.
    pub fn run_frame(&mut self, matcher: &dyn Matcher, build: impl FnOnce(&mut Frame) -> Node) -> Result<DrawList> {
        self.frame.begin();
        let mut report = FrameReport::new(self.frame.number());

        let result = self.run_passes(matcher, build, &mut report);

        report.main_nodes = self.frame.pools().len(PoolId::Main);
        report.aux_nodes = self.frame.pools().len(PoolId::Auxiliary);
        report.evicted_keys = self.frame.end();
        match &result {
            Ok(list) => report.commands = list.len(),
            Err(err) => tracing::warn!(frame = report.frame, %err, "frame discarded"),
        }
        report.log();
        self.report = report;
        result
    }

    fn run_passes(
        &mut self,
        matcher: &dyn Matcher,
        build: impl FnOnce(&mut Frame) -> Node,
        report: &mut FrameReport,
    ) -> Result<DrawList> {
        let timing = self.config.timing;
        let config = &self.config;
        let frame = &mut self.frame;
        let drag = &mut self.drag;
        let resolver = Resolver::new(&self.registry);

        let content = measure(report, timing, "build", || build(frame));
        if let Some(fault) = frame.take_fault() {
            return Err(fault);
        }
        let root = frame.root([content]);

        let materialized = measure(report, timing, "prepass", || resolver.resolve_aligners(frame, root))?;
        report.materialized = materialized;

        measure(report, timing, "layout", || resolver.apply(frame, root))?;
        measure(report, timing, "inherit", || resolve::inherit(frame, root));

        let order = measure(report, timing, "sort", || draw::draw_order(frame));
        let repaint = measure(report, timing, "interact", || {
            interaction::interact(frame, &order, matcher, config, drag)
        });
        if repaint {
            resolve::repaint(frame, root);
        }

        Ok(measure(report, timing, "emit", || {
            draw::emit(frame, &order, drag, config)
        }))
    }
}
