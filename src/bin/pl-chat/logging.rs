use flexi_logger::{
    detailed_format, Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming,
};

use crate::config::{ConfigPaths, LoggingConfig};

/// Starts rotating file logging; `RUST_LOG` overrides the configured level.
///
/// The returned handle flushes pending lines when dropped, so keep it alive
/// for the whole run.
pub fn init_logging(config: &LoggingConfig, paths: &ConfigPaths) -> anyhow::Result<LoggerHandle> {
    let file_spec = match &config.path {
        Some(path) => FileSpec::try_from(path)?,
        None => FileSpec::default()
            .directory(paths.logs_dir.clone())
            .basename("pl-chat"),
    };
    let handle = Logger::try_with_env_or_str(&config.level)?
        .log_to_file(file_spec)
        .format_for_files(detailed_format)
        .append()
        .rotate(
            Criterion::Size(config.rotate_size),
            Naming::Numbers,
            Cleanup::KeepLogFiles(config.rotate_keep),
        )
        .start()?;
    log::debug!("logging to {}", paths.logs_dir.display());
    Ok(handle)
}
