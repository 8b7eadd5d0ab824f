// src/lib.rs
// SDS Waveform Library - Public API

//! # SDS Waveform
//!
//! A Rust library for decoding waveform transfers from Siglent SDS800X HD
//! oscilloscopes.
//!
//! ## Features
//!
//! - Decode the binary `:WAV:PRE?` preamble into typed acquisition parameters
//! - Decode `:WAV:DATA?` sample blocks (16-bit word format)
//! - Scale raw codes into time and voltage axes
//! - Drive an instrument over any [`Transport`]
//! - Export decoded waveforms to CSV
//!
//! ## Example
//!
//! ```no_run
//! use sds_waveform::AcquisitionSession;
//!
//! let preamble = std::fs::read("preamble.bin").expect("Failed to read preamble");
//! let data = std::fs::read("data.bin").expect("Failed to read data block");
//!
//! let mut session = AcquisitionSession::new();
//! let waveform = session
//!     .fetch_waveform(&data, Some(&preamble[..]))
//!     .expect("Failed to decode waveform");
//!
//! println!("Points: {}", waveform.len());
//! waveform.write_csv("output.csv").expect("Failed to write CSV");
//! ```

pub mod block;
pub mod channel;
pub mod config;
mod error;
pub mod preamble;
pub mod scaling;
pub mod scope;
pub mod session;
pub mod timebase;
pub mod transport;

pub use block::RawSampleBlock;
pub use channel::{Channel, Resolution};
pub use config::AcquisitionConfig;
pub use error::{DecodeError, Result, ScalingError, ScopeError};
pub use preamble::{BandwidthLimit, Coupling, Preamble, PreambleValue};
pub use scaling::{CountMismatch, CountPolicy, DecodedWaveform};
pub use scope::Oscilloscope;
pub use session::{AcquisitionSession, SessionState};
pub use transport::{ReplayTransport, Transport};
