// SPDX-License-Identifier: MPL-2.0
//! Error types shared across the crate.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while resolving, provisioning, or running models.
#[derive(Debug, Clone)]
pub enum Error {
    /// Model id is not in the processor's supported set.
    InvalidModel {
        id: String,
        supported: &'static [&'static str],
    },
    /// The registry has no entry for the requested model id.
    UnknownModel(String),
    /// Failed to download a weight file (network error, bad URL, or no URL).
    Download(String),
    /// Weight file not found at the expected path.
    ModelNotFound(PathBuf),
    /// Weight file checksum verification failed.
    ChecksumMismatch { expected: String, actual: String },
    /// ONNX inference failed.
    Inference(String),
    /// Image preprocessing failed.
    Preprocessing(String),
    /// Image postprocessing failed.
    Postprocessing(String),
    /// Model session not initialized.
    SessionNotInitialized,
    /// Invalid configuration or settings file.
    Config(String),
    /// IO error occurred.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidModel { id, supported } => {
                write!(f, "Invalid model id {id}, supported models are {supported:?}")
            }
            Error::UnknownModel(id) => write!(f, "Unknown model id: {id}"),
            Error::Download(msg) => write!(f, "Download failed: {msg}"),
            Error::ModelNotFound(path) => {
                write!(f, "Model file not found: {}", path.display())
            }
            Error::ChecksumMismatch { expected, actual } => {
                write!(f, "Checksum mismatch: expected {expected}, got {actual}")
            }
            Error::Inference(msg) => write!(f, "Inference failed: {msg}"),
            Error::Preprocessing(msg) => write!(f, "Preprocessing failed: {msg}"),
            Error::Postprocessing(msg) => write!(f, "Postprocessing failed: {msg}"),
            Error::SessionNotInitialized => write!(f, "ONNX session not initialized"),
            Error::Config(msg) => write!(f, "Config error: {msg}"),
            Error::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
