use serde_json::Value;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggerConfig;
use crate::utils::error::{AppError, Result};

const DEFAULT_REQUEST_ID: &str = "MAIN";

pub struct StructuredLogger;

impl StructuredLogger {
    /// Installs the global JSON subscriber.
    ///
    /// Everything at `level` and above goes to stdout. With a logger config,
    /// ERROR events are additionally appended to a daily rotated
    /// `{dir}/{file_name}.{date}.error.log`. `RUST_LOG` overrides `level`.
    pub fn init(level: &str, logger_config: Option<LoggerConfig>) -> Result<()> {
        let filter = match level.to_lowercase().as_str() {
            "error" => "error",
            "warn" => "warn",
            "info" => "info",
            "debug" => "debug",
            "trace" => "trace",
            _ => "info",
        };
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

        let installed = if let Some(config) = logger_config {
            let error_file_writer = Self::error_file_appender(&config)?.with_max_level(Level::ERROR);

            tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stdout.and(error_file_writer))
                .try_init()
        } else {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter)
                .try_init()
        };

        installed.map_err(|e| AppError::Generic(anyhow::anyhow!(e.to_string())))
    }

    pub fn error_file_appender(config: &LoggerConfig) -> Result<RollingFileAppender> {
        std::fs::create_dir_all(&config.dir)?;

        let mut builder = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(config.file_name.as_str())
            .filename_suffix("error.log");
        if config.max_backups > 0 {
            builder = builder.max_log_files(config.max_backups as usize);
        }

        Ok(builder.build(&config.dir)?)
    }

    pub fn log_error(error: &str, request_id: Option<&str>) {
        let request_id = request_id.unwrap_or(DEFAULT_REQUEST_ID);
        tracing::error!(x_request_id = request_id, "{}", error);
    }

    pub fn log_info(message: &str, request_id: Option<&str>, additional_data: Option<Value>) {
        let request_id = request_id.unwrap_or(DEFAULT_REQUEST_ID);
        match additional_data {
            Some(data) => tracing::info!(x_request_id = request_id, data = %data, "{}", message),
            None => tracing::info!(x_request_id = request_id, "{}", message),
        }
    }

    pub fn log_warning(message: &str, request_id: Option<&str>) {
        let request_id = request_id.unwrap_or(DEFAULT_REQUEST_ID);
        tracing::warn!(x_request_id = request_id, "{}", message);
    }
}
