use std::path::Path;
use std::time::Duration;

use folio_editor_core::{EditorConfig, SanitizeOptions};
use serde::{Deserialize, Serialize};

use crate::error::{HostError, Result};

/// Default quiet period before a local draft is written.
pub const DEFAULT_AUTOSAVE_MS: u64 = 800;

/// Editor settings for each host page plus draft autosave timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub blog: EditorConfig,
    pub experience: EditorConfig,
    pub project: EditorConfig,
    pub autosave_ms: u64,
}

impl Default for HostConfig {
    /// The project page also drops white text from pastes, which would be
    /// invisible on its light cards.
    fn default() -> Self {
        Self {
            blog: EditorConfig::default(),
            experience: EditorConfig::default(),
            project: EditorConfig {
                paste: SanitizeOptions::paste().with_white_text(),
                ..EditorConfig::default()
            },
            autosave_ms: DEFAULT_AUTOSAVE_MS,
        }
    }
}

impl HostConfig {
    /// Load from a `.json` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let raw = std::fs::read_to_string(path).map_err(|source| HostError::ConfigIo {
                    path: path.to_path_buf(),
                    source,
                })?;
                let config =
                    serde_json::from_str(&raw).map_err(|source| HostError::ConfigParse {
                        path: path.to_path_buf(),
                        source,
                    })?;
                tracing::debug!(target: "folio::host", path = %path.display(), "loaded host config");
                Ok(config)
            }
            _ => Err(HostError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn autosave(&self) -> Duration {
        Duration::from_millis(self.autosave_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{name}", std::process::id()));
        std::fs::write(&path, contents).expect("write temp config");
        path
    }

    #[test]
    fn test_from_path_merges_defaults() {
        let path = temp_file(
            "folio-host.json",
            r#"{"autosave_ms": 1500, "blog": {"debounce_ms": 100}}"#,
        );
        let config = HostConfig::from_path(&path).expect("config");
        std::fs::remove_file(&path).ok();
        assert_eq!(config.autosave(), Duration::from_millis(1500));
        assert_eq!(config.blog.debounce_ms, 100);
        assert_eq!(config.blog.history_depth, 50);
        assert!(config.project.paste.strip_white_text);
    }

    #[test]
    fn test_from_path_errors() {
        assert!(matches!(
            HostConfig::from_path("folio.toml"),
            Err(HostError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            HostConfig::from_path("/nonexistent/folio.json"),
            Err(HostError::ConfigIo { .. })
        ));
        let path = temp_file("folio-broken.json", "{ nope");
        let result = HostConfig::from_path(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(HostError::ConfigParse { .. })));
    }
}
