use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config.toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid tools.yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("no platform {0} directory; pass --config explicitly")]
    NoPlatformDir(&'static str),
}
