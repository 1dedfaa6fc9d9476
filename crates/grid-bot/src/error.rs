//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("core error: {0}")]
    Core(#[from] grid_core::CoreError),

    #[error("client error: {0}")]
    Client(#[from] grid_client::ClientError),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] grid_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
