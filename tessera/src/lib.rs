//! Tessera: retained-tree layout core.
//!
//! User code rebuilds a declarative node tree every frame; the engine turns
//! it into a sorted, positioned, clipped draw list.
//!
//! # Pipeline
//!
//! ```text
//! build        Frame builder calls fill the main pool
//!   |
//! root         window-sized void + overlay seeded ahead of the content
//!   |
//! pre-pass     premodifier sort, aligner choice, sequence materialization
//!   |          (items land in the auxiliary pool)
//! main pass    sizes, stretch weights, modifiers, overrides, scissor
//!   |
//! inherit      absolute positions, paint, clip rectangles
//!   |
//! sort         stable by creation order
//!   |
//! interact     conditional callbacks, drag and drop (via Matcher)
//!   |
//! draw list    handed to a Renderer
//!   |
//! recycle      pools become last frame's, keys expire
//! ```
//!
//! # Usage
//!
//! ```
//! use tessera::{Color, Engine, EngineConfig, NoInput};
//!
//! let mut engine = Engine::new(EngineConfig::default().with_window_size(320.0, 240.0));
//! let list = engine
//!     .run_frame(&NoInput, |f| {
//!         let args = [
//!             f.hfollow(),
//!             f.fill(Color::BLUE),
//!             f.rect(-1.0, 20.0),
//!             f.rect(-1.0, 20.0),
//!         ];
//!         f.compound(args)
//!     })
//!     .unwrap();
//! assert_eq!(list.len(), 2);
//! ```

// Core primitives
pub mod primitives;
pub mod error;
pub mod config;

// Arena and node model
pub mod node;
pub mod pool;
pub mod keystore;

// Construction
pub mod frame;
pub mod builder;
pub mod sequence;

// Layout passes
pub mod resolve;

// Output
pub mod interaction;
pub mod draw;

// Frame loop
pub mod engine;

// Performance instrumentation
pub mod frame_timing;

pub use config::EngineConfig;
pub use draw::{DrawCommand, DrawList, Primitive, Renderer};
pub use engine::Engine;
pub use error::{LayoutError, ProducerError, Result};
pub use frame::{Frame, MonospaceMeasure, TextMeasure};
pub use frame_timing::FrameReport;
pub use interaction::{DragState, MatchInfo, Matcher, NoInput, Pointer, Query};
pub use node::{AlignerKind, Key, Kind, Modifier, Node, NodeFlags, Paint, Premodifier, Shape, Span};
pub use pool::{PoolId, Slot};
pub use primitives::{Color, Point, Rect, Size, Transform};
pub use resolve::{Aligner, AlignerRegistry, Axis, Resolver};
pub use sequence::{FnSequence, Sequence};
