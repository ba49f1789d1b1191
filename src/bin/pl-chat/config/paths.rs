use std::path::PathBuf;

use super::error::ConfigError;

const APP_DIR: &str = "pl-chat";

/// Where the CLI reads its settings and writes its logs.
///
/// Defaults follow the platform conventions from `dirs`, e.g. on Linux
/// `$XDG_CONFIG_HOME/pl-chat/config.toml` and
/// `$XDG_DATA_HOME/pl-chat/logs/`.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
    pub logs_dir: PathBuf,
}

impl ConfigPaths {
    pub fn resolve(config_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_file = match config_override {
            Some(path) => path,
            None => platform_dir(dirs::config_dir(), "config")?.join("config.toml"),
        };
        let logs_dir = platform_dir(dirs::data_local_dir(), "data")?.join("logs");
        Ok(Self {
            config_file,
            logs_dir,
        })
    }

    /// `tools.yaml` next to the config file.
    pub fn tools_file(&self) -> PathBuf {
        self.config_file.with_file_name("tools.yaml")
    }
}

fn platform_dir(base: Option<PathBuf>, kind: &'static str) -> Result<PathBuf, ConfigError> {
    base.map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::NoPlatformDir(kind))
}
