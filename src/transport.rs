// Transport seam between the driver and the instrument connection

use std::collections::VecDeque;

use crate::error::{Result, ScopeError};

/// Query that returns the active waveform source.
pub const QUERY_ACTIVE_CHANNEL: &str = "WAV:SOUR?";

/// A connection that carries SCPI commands and raw responses.
///
/// Implementations own timeouts and reconnection; every call either
/// returns a complete response or an error.
pub trait Transport {
    fn send_command(&mut self, command: &str) -> Result<()>;

    fn read_bytes(&mut self) -> Result<Vec<u8>>;

    /// Send a query and return its response as trimmed text.
    fn query(&mut self, command: &str) -> Result<String> {
        self.send_command(command)?;
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes)
            .map(|s| s.trim().to_string())
            .map_err(|e| ScopeError::transport(format!("non UTF-8 reply to '{}': {}", command, e)))
    }

    fn query_active_channel(&mut self) -> Result<String> {
        self.query(QUERY_ACTIVE_CHANNEL)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_command(&mut self, command: &str) -> Result<()> {
        (**self).send_command(command)
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        (**self).read_bytes()
    }

    fn query(&mut self, command: &str) -> Result<String> {
        (**self).query(command)
    }

    fn query_active_channel(&mut self) -> Result<String> {
        (**self).query_active_channel()
    }
}

/// Transport that replays queued responses and records the commands sent.
///
/// Used to decode captured instrument dumps offline.
#[derive(Debug, Default)]
pub struct ReplayTransport {
    responses: VecDeque<Vec<u8>>,
    commands: Vec<String>,
}

impl ReplayTransport {
    pub fn new() -> Self {
        ReplayTransport::default()
    }

    pub fn push_response(&mut self, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.responses.push_back(bytes.into());
        self
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn pending(&self) -> usize {
        self.responses.len()
    }
}

impl Transport for ReplayTransport {
    fn send_command(&mut self, command: &str) -> Result<()> {
        self.commands.push(command.to_string());
        Ok(())
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        self.responses
            .pop_front()
            .ok_or_else(|| ScopeError::transport("no response queued"))
    }
}
