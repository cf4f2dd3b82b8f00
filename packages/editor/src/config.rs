use crate::errors::EditorResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "scribe.config.json";

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Idle time after which the host should commit the open step
    #[serde(default = "default_idle_commit_ms")]
    pub idle_commit_ms: u64,

    /// Base URL of a history server; replication is off without it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_endpoint: Option<String>,

    /// Tags treated as unbreakable on top of the built-in set
    #[serde(default)]
    pub extra_unbreakable_tags: Vec<String>,

    /// Non-breaking spaces inserted by tab outside of lists
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,

    /// Reported by `history_len` as a soft cap, 0 for none
    #[serde(default)]
    pub max_steps: usize,
}

fn default_idle_commit_ms() -> u64 {
    100
}

fn default_tab_width() -> usize {
    4
}

impl EditorConfig {
    /// Load config from a directory, or the defaults when there is none
    pub fn load(dir: impl AsRef<Path>) -> EditorResult<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: EditorConfig = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "loaded editor config");
            Ok(config)
        } else {
            Ok(EditorConfig::default())
        }
    }

    pub fn idle_window(&self) -> Duration {
        Duration::from_millis(self.idle_commit_ms)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            idle_commit_ms: default_idle_commit_ms(),
            history_endpoint: None,
            extra_unbreakable_tags: Vec::new(),
            tab_width: default_tab_width(),
            max_steps: 0,
        }
    }
}
