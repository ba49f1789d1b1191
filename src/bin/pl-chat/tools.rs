//! Canned-response tools read from `tools.yaml`.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use promptlayer_chat::tools::{StaticTool, ToolRegistry};

use crate::config::ConfigError;

/// A tool that always answers with `response`.
#[derive(Debug, Clone, Deserialize)]
pub struct CannedTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub response: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CannedToolsConfig {
    #[serde(default)]
    pub tools: Vec<CannedTool>,
}

impl CannedToolsConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Registers every tool; a later entry replaces an earlier one of the same name.
    pub fn into_registry(self, timeout_ms: u64) -> ToolRegistry {
        self.tools
            .into_iter()
            .fold(ToolRegistry::new().timeout_ms(timeout_ms), |registry, tool| {
                log::debug!("registered canned tool {} ({})", tool.name, tool.description);
                registry.register(tool.name, StaticTool::new(tool.response))
            })
    }
}
