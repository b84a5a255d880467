use flexi_logger::{detailed_format, Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming};
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "moodwall";

pub fn log_dir(app_data_dir: &Path) -> PathBuf {
    app_data_dir.join("logs")
}

/// Rotating file log under `<data_dir>/logs`. `RUST_LOG` overrides the level.
pub fn setup_logging(app_data_dir: &Path) -> Result<LoggerHandle, flexi_logger::FlexiLoggerError> {
    let file_spec = FileSpec::default()
        .directory(log_dir(app_data_dir))
        .basename(LOG_BASENAME);

    Logger::try_with_env_or_str("info")?
        .log_to_file(file_spec)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(10 * 1024 * 1024),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(3),
        )
        .duplicate_to_stderr(if cfg!(debug_assertions) {
            flexi_logger::Duplicate::Info
        } else {
            flexi_logger::Duplicate::Warn
        })
        .start()
}
