//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::primitives::Color;

/// Configuration for a layout [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window size. Seeds the root void and the root limits.
    pub window_size: (f32, f32),

    /// Outline every compound's resolved rectangle.
    pub debug_overlay: bool,

    /// Frames a persistent key may go unread before it is evicted.
    pub key_ttl_frames: u64,

    /// Pattern that starts a drag on a `source` node.
    pub drag_pattern: String,

    /// Pattern that delivers the dragged payload to a `sink` node.
    pub drop_pattern: String,

    /// Pattern that abandons an in-flight drag.
    pub cancel_pattern: String,

    /// Fill of the ghost rectangle that follows the pointer while dragging.
    pub drag_ghost: Color,

    /// Initial node capacity reserved in each pool.
    pub pool_capacity: usize,

    /// Record per-pass timings in the frame report.
    pub timing: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: (1200.0, 800.0),
            debug_overlay: false,
            key_ttl_frames: 2,
            drag_pattern: String::from("drag"),
            drop_pattern: String::from("drop"),
            cancel_pattern: String::from("release"),
            drag_ghost: Color::rgba(0.3, 0.5, 0.8, 0.4),
            pool_capacity: 1024,
            timing: false,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builder-style window size override.
    pub fn with_window_size(mut self, width: f32, height: f32) -> Self {
        self.window_size = (width, height);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LayoutError;

    #[test]
    fn test_default_key_ttl_is_two_frames() {
        assert_eq!(EngineConfig::default().key_ttl_frames, 2);
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json(r#"{ "window_size": [320.0, 240.0], "debug_overlay": true }"#)
            .unwrap();
        assert_eq!(config.window_size, (320.0, 240.0));
        assert!(config.debug_overlay);
        assert_eq!(config.drag_pattern, "drag");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = EngineConfig::from_json("{ window_size: ").unwrap_err();
        assert!(matches!(err, LayoutError::Config(_)));
    }

    #[test]
    fn test_with_window_size() {
        let config = EngineConfig::default().with_window_size(640.0, 480.0);
        assert_eq!(config.window_size, (640.0, 480.0));
    }
}
