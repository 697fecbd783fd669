//! Error taxonomy shared by the translator and the runtime bridge.
//!
//! Every variant maps to a process exit code so the binary can report
//! configuration problems differently from evaluation or I/O failures.

use std::path::PathBuf;

use thiserror::Error;

/// Opaque failure raised by an external pipeline engine.
pub type EngineFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to parse '{}' at line {line}: {message}", .path.display())]
    ConfigParse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("Configuration file '{}' not found.", .0.display())]
    NotFound(PathBuf),
    #[error("Missing key '{key}' in section [{section}].")]
    MissingKey { section: String, key: String },
    #[error("Unsupported param spec for {section}/{name}: '{raw}' (expected 1 or 3 values)")]
    MalformedParameterSpec {
        section: String,
        name: String,
        raw: String,
    },
    #[error("Unsupported prior distribution {tag} for {section}/{name}. Full data: '{raw}'")]
    UnsupportedPrior {
        tag: String,
        section: String,
        name: String,
        raw: String,
    },
    #[error("Option '{option}' = '{value}' is not a valid {expected}.")]
    InvalidOption {
        option: String,
        value: String,
        expected: &'static str,
    },
    #[error("Invalid redshift grid: {0}")]
    InvalidGrid(String),
    #[error("Parameter '{0}' is required but was not supplied.")]
    MissingParameter(String),
    #[error("Host theory is enabled but no theory provider was supplied.")]
    MissingTheory,
    #[error("Theory provider failed: {0}")]
    TheoryProvider(#[source] EngineFailure),
    #[error("Pipeline execution failed: {0}")]
    PipelineExecution(#[source] EngineFailure),
    #[error("[{section}] {key} holds a {expected}, got a {found}.")]
    ShapeMismatch {
        section: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Pipeline produced no result at [{section}] {key}.")]
    MissingResult { section: String, key: String },
    #[error("Failed to dump data block to '{}': {source}", .path.display())]
    Dump {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BridgeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit code used by the binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            BridgeError::ConfigParse { .. }
            | BridgeError::NotFound(_)
            | BridgeError::MissingKey { .. }
            | BridgeError::MalformedParameterSpec { .. }
            | BridgeError::UnsupportedPrior { .. }
            | BridgeError::InvalidOption { .. }
            | BridgeError::InvalidGrid(_) => 2,
            BridgeError::MissingParameter(_)
            | BridgeError::MissingTheory
            | BridgeError::TheoryProvider(_)
            | BridgeError::PipelineExecution(_)
            | BridgeError::ShapeMismatch { .. }
            | BridgeError::MissingResult { .. } => 3,
            BridgeError::Dump { .. }
            | BridgeError::Io { .. }
            | BridgeError::Yaml(_)
            | BridgeError::Json(_) => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
