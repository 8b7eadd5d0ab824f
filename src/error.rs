// Error types for the SDS waveform codec

use std::io;
use thiserror::Error;

/// Failures while turning instrument bytes into typed values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Empty buffer")]
    Empty,

    #[error("Buffer too short: expected at least {needed} bytes, got {got}")]
    TooShort { needed: usize, got: usize },

    #[error("Malformed block header: {0}")]
    MalformedHeader(String),

    #[error("Truncated block: header declares {declared} payload bytes, {available} available")]
    Truncated { declared: usize, available: usize },

    #[error("Trailing data: {extra} bytes follow the {declared} declared payload bytes")]
    TrailingData { declared: usize, extra: usize },

    #[error("Odd sample payload length: {0} bytes")]
    OddPayload(usize),

    #[error("Failed to read field '{0}'")]
    Field(&'static str),
}

/// Failures while converting raw codes into physical units.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScalingError {
    #[error("code_per_div is zero")]
    ZeroCodePerDiv,

    #[error("Raw sample block is empty")]
    EmptySamples,

    #[error("Sample count mismatch: preamble declares {declared}, block holds {actual}")]
    SampleCountMismatch { declared: i32, actual: usize },
}

#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Scaling error: {0}")]
    Scaling(#[from] ScalingError),

    #[error("{table} index {index} out of range (0..{len})")]
    IndexOutOfRange {
        table: &'static str,
        index: i64,
        len: usize,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl ScopeError {
    pub(crate) fn out_of_range(table: &'static str, index: impl Into<i64>, len: usize) -> Self {
        Self::IndexOutOfRange {
            table,
            index: index.into(),
            len,
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ScopeError>;
