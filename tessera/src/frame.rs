//! Per-frame build state.
//!
//! A [`Frame`] is handed to user code once per display frame. It owns the
//! arena pools, hands out creation stamps, and gives access to the few
//! pieces of state that outlive a frame: the persistent key store and last
//! frame's resolved rectangles.
//!
//! The construction API itself lives in [`builder`](crate::builder).

use unicode_width::UnicodeWidthChar;

use crate::config::EngineConfig;
use crate::error::LayoutError;
use crate::keystore::KeyStore;
use crate::node::Key;
use crate::pool::{PoolId, Pools, Slot};
use crate::primitives::{Rect, Size};

/// Monospace cell width at [`BASE_FONT_SIZE`].
pub const CHAR_WIDTH: f32 = 8.4;
/// Line height at [`BASE_FONT_SIZE`].
pub const LINE_HEIGHT: f32 = 18.0;
pub const BASE_FONT_SIZE: f32 = 14.0;

/// Text measurement seam. The engine never shapes glyphs itself.
pub trait TextMeasure {
    /// Size of `text` set at `font_size`.
    fn measure(&self, text: &str, font_size: f32) -> Size;
}

/// Fixed-cell measurement: every column is [`CHAR_WIDTH`] wide, every line
/// [`LINE_HEIGHT`] tall, both scaled linearly with the font size.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonospaceMeasure;

impl TextMeasure for MonospaceMeasure {
    fn measure(&self, text: &str, font_size: f32) -> Size {
        let scale = font_size / BASE_FONT_SIZE;
        let mut lines = 0usize;
        let mut widest = 0.0f32;
        for line in text.split('\n') {
            lines += 1;
            widest = widest.max(display_width(line));
        }
        Size::new(widest * CHAR_WIDTH * scale, lines as f32 * LINE_HEIGHT * scale)
    }
}

/// Display width in terminal columns (CJK and emoji count double).
pub(crate) fn display_width(text: &str) -> f32 {
    text.chars()
        .map(|c| UnicodeWidthChar::width(c).unwrap_or(0) as f32)
        .sum()
}

/// Build state for one frame. Reused across frames by the engine.
pub struct Frame {
    pub(crate) pools: Pools,
    pub(crate) keys: KeyStore,
    /// Next creation stamp.
    next_z: u64,
    /// First structural fault raised while building; surfaced by the
    /// sequencer or the engine.
    pub(crate) fault: Option<LayoutError>,
    pub(crate) root: Option<Slot>,
    pub(crate) window: Size,
    measure: Box<dyn TextMeasure>,
    number: u64,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("number", &self.number)
            .field("next_z", &self.next_z)
            .field("root", &self.root)
            .field("window", &self.window)
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

impl Frame {
    pub fn new(config: &EngineConfig) -> Self {
        let (width, height) = config.window_size;
        Self {
            pools: Pools::with_capacity(config.pool_capacity),
            keys: KeyStore::new(config.key_ttl_frames),
            next_z: 0,
            fault: None,
            root: None,
            window: Size::new(width, height),
            measure: Box::new(MonospaceMeasure),
            number: 0,
        }
    }

    /// Replace the text measurer.
    pub fn set_text_measure(&mut self, measure: impl TextMeasure + 'static) {
        self.measure = Box::new(measure);
    }

    pub fn measure_text(&self, text: &str, font_size: f32) -> Size {
        self.measure.measure(text, font_size)
    }

    pub fn window_size(&self) -> Size {
        self.window
    }

    pub fn set_window_size(&mut self, width: f32, height: f32) {
        self.window = Size::new(width, height);
    }

    /// Frames begun so far, starting at 1 for the first frame.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Pool new compounds allocate into.
    pub fn active_pool(&self) -> PoolId {
        self.pools.active()
    }

    pub fn pools(&self) -> &Pools {
        &self.pools
    }

    pub fn root_slot(&self) -> Option<Slot> {
        self.root
    }

    /// Persistent per-key state, created with `T::default()` on first use.
    ///
    /// Survives until it goes unread for the configured number of frames.
    pub fn key<T: Default + 'static>(&mut self, key: impl Into<Key>) -> Option<&mut T> {
        self.keys.get_or_default(key.into())
    }

    /// Whether any persistent state is stored under `key`.
    pub fn has_key(&self, key: impl Into<Key>) -> bool {
        self.keys.contains(key.into())
    }

    /// Last frame's final absolute rectangle of the node carrying `key`.
    pub fn prev_rect(&self, key: impl Into<Key>) -> Option<Rect> {
        self.pools.find_previous(key.into()).map(|node| node.rect())
    }

    /// Hand out the next creation stamp.
    #[inline]
    pub(crate) fn next_z(&mut self) -> u64 {
        let z = self.next_z;
        self.next_z += 1;
        z
    }

    /// Record a structural fault; the first one wins.
    pub(crate) fn raise(&mut self, error: LayoutError) {
        if self.fault.is_none() {
            self.fault = Some(error);
        }
    }

    pub(crate) fn take_fault(&mut self) -> Option<LayoutError> {
        self.fault.take()
    }

    pub(crate) fn begin(&mut self) {
        self.number += 1;
        self.next_z = 0;
        self.fault = None;
        self.root = None;
        self.keys.begin_frame();
    }

    /// Frame boundary. Returns the number of evicted keys.
    pub(crate) fn end(&mut self) -> usize {
        self.pools.recycle();
        self.root = None;
        self.keys.evict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monospace_single_line() {
        let size = MonospaceMeasure.measure("hello", BASE_FONT_SIZE);
        assert!((size.width - 5.0 * CHAR_WIDTH).abs() < 1e-4);
        assert!((size.height - LINE_HEIGHT).abs() < 1e-4);
    }

    #[test]
    fn test_monospace_scales_with_font_size() {
        let size = MonospaceMeasure.measure("ab\nabcd", 28.0);
        assert!((size.width - 4.0 * CHAR_WIDTH * 2.0).abs() < 1e-4);
        assert!((size.height - 2.0 * LINE_HEIGHT * 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_display_width_wide_chars() {
        assert_eq!(display_width("ab"), 2.0);
        assert_eq!(display_width("日本"), 4.0);
    }

    #[test]
    fn test_creation_stamps_restart_each_frame() {
        let mut frame = Frame::new(&EngineConfig::default());
        frame.begin();
        assert_eq!(frame.next_z(), 0);
        assert_eq!(frame.next_z(), 1);
        frame.end();

        frame.begin();
        assert_eq!(frame.next_z(), 0);
        assert_eq!(frame.number(), 2);
    }

    #[test]
    fn test_first_fault_wins() {
        let mut frame = Frame::new(&EngineConfig::default());
        frame.raise(LayoutError::NestedSequence);
        frame.raise(LayoutError::ConflictingAligners { z: 0 });
        assert!(matches!(frame.take_fault(), Some(LayoutError::NestedSequence)));
        assert!(frame.take_fault().is_none());
    }

    #[test]
    fn test_key_state_survives_frames() {
        let mut frame = Frame::new(&EngineConfig::default());
        frame.begin();
        *frame.key::<i32>("counter").unwrap() += 1;
        frame.end();

        frame.begin();
        *frame.key::<i32>("counter").unwrap() += 1;
        assert_eq!(frame.key::<i32>("counter").copied(), Some(2));
    }
}
