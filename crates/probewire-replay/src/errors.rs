//! Error types for the replay tool.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use probewire::DescriptionError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Protocol(#[from] DescriptionError),
    #[error("failed to read transcript '{path}': {source}")]
    ReadTranscript { path: PathBuf, source: io::Error },
    #[error("failed to serialise replayed event: {0}")]
    SerialiseEvent(serde_json::Error),
    #[error("failed to write replay output: {0}")]
    WriteOutput(io::Error),
}
