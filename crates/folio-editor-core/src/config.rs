//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sanitize::{DEFAULT_MAX_INPUT_BYTES, SanitizeOptions};
use crate::undo::DEFAULT_HISTORY_DEPTH;

/// Tunables for one editing session. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Snapshots kept by the history stack.
    pub history_depth: usize,
    /// Quiet period after typing before a history snapshot is taken.
    pub debounce_ms: u64,
    /// Sanitizer profile for clipboard HTML.
    pub paste: SanitizeOptions,
    /// Sanitizer profile for host-provided content.
    pub load: SanitizeOptions,
    /// Markup larger than this goes through the fallback sanitizer.
    pub max_input_bytes: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            debounce_ms: 300,
            paste: SanitizeOptions::paste(),
            load: SanitizeOptions::load(),
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"history_depth": 10, "paste": {"strip_fonts": true}}"#)
                .expect("config");
        assert_eq!(config.history_depth, 10);
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert!(config.paste.strip_fonts);
        assert!(!config.paste.strip_highlight);
        assert_eq!(config.load, SanitizeOptions::load());
    }
}
