// SDS800X HD oscilloscope driver over an abstract transport

use std::collections::BTreeMap;

use log::{debug, error, info};

use crate::channel::{self, Channel, Resolution};
use crate::config::AcquisitionConfig;
use crate::error::{Result, ScopeError};
use crate::preamble::{Preamble, PreambleValue};
use crate::scaling::DecodedWaveform;
use crate::session::{AcquisitionSession, SessionState};
use crate::transport::Transport;

/// SCPI commands issued by the driver.
pub mod commands {
    pub const IDENTIFY: &str = "*IDN?";
    pub const SET_SOURCE: &str = "WAV:SOUR";
    pub const ACQUIRE_POINTS: &str = "ACQ:POIN?";
    pub const PREAMBLE: &str = ":WAV:PRE?";
    /// Request samples as 16-bit words; the 12-bit ADC does not fit a byte.
    pub const WORD_WIDTH: &str = ":WAV:WIDT WORD";
    pub const DATA: &str = ":WAV:DATA?";
}

pub struct Oscilloscope<T: Transport> {
    alias: String,
    transport: T,
    session: AcquisitionSession,
    refresh_preamble: bool,
    default_channel: String,
}

impl<T: Transport> Oscilloscope<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, &AcquisitionConfig::default())
    }

    pub fn with_config(transport: T, config: &AcquisitionConfig) -> Self {
        Oscilloscope {
            alias: config.alias.clone(),
            transport,
            session: AcquisitionSession::with_policy(config.mismatch_policy),
            refresh_preamble: config.refresh_preamble,
            default_channel: config.default_channel.clone(),
        }
    }

    /// Open a driver on an established link: identify the instrument and
    /// cache its current preamble.
    pub fn connect(transport: T, config: &AcquisitionConfig) -> Result<Self> {
        let mut scope = Self::with_config(transport, config);
        let id = scope.identify()?;
        info!("{}: Connection established to the oscilloscope. ID: {}", scope.alias, id);
        scope.read_preamble()?;
        Ok(scope)
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn session(&self) -> &AcquisitionSession {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Manufacturer, model, serial number and firmware revision.
    pub fn identify(&mut self) -> Result<String> {
        self.transport.query(commands::IDENTIFY).map_err(|e| {
            error!("{}: Error retrieving identification of the oscilloscope: {}", self.alias, e);
            e
        })
    }

    pub fn current_channel(&mut self) -> Result<String> {
        self.transport.query_active_channel()
    }

    /// Select the waveform source.
    ///
    /// An unknown name leaves the instrument untouched and reports the
    /// channel that stays active.
    pub fn set_channel(&mut self, name: &str) -> Result<Resolution> {
        if let Ok(channel) = name.parse::<Channel>() {
            self.transport
                .send_command(&format!("{} {}", commands::SET_SOURCE, channel))?;
            info!("{}: Active channel: {}", self.alias, channel);
            return Ok(Resolution::Selected(channel));
        }

        let active = self.transport.query_active_channel().map_err(|e| {
            error!("{}: Error retrieving the current channel: {}", self.alias, e);
            e
        })?;
        Ok(channel::resolve(name, &active))
    }

    /// Select the configured default channel.
    pub fn select_default_channel(&mut self) -> Result<Resolution> {
        let name = self.default_channel.clone();
        self.set_channel(&name)
    }

    /// Number of sampled points of the waveform on screen.
    pub fn number_of_points(&mut self) -> Result<i64> {
        let reply = self.transport.query(commands::ACQUIRE_POINTS)?;
        let n = reply
            .parse::<f64>()
            .map_err(|e| ScopeError::transport(format!("bad point count '{}': {}", reply, e)))?;
        if !n.is_finite() {
            return Err(ScopeError::transport(format!("non-finite point count '{}'", reply)));
        }
        Ok(n as i64)
    }

    pub fn read_preamble(&mut self) -> Result<&Preamble> {
        debug!("{}: Requesting preamble with the oscilloscope parameters.", self.alias);
        let bytes = self.request(commands::PREAMBLE)?;
        self.session.load_preamble(&bytes)
    }

    /// Fetch and scale the waveform of the active channel.
    ///
    /// `refresh` re-reads the preamble first; otherwise samples are scaled
    /// with the preamble cached by the last [`read_preamble`](Self::read_preamble).
    pub fn get_waveform(&mut self, refresh: bool) -> Result<DecodedWaveform> {
        let preamble = if refresh {
            Some(self.request(commands::PREAMBLE)?)
        } else {
            None
        };

        self.transport.send_command(commands::WORD_WIDTH)?;
        debug!("{}: Data format is set to 16-bit word", self.alias);
        let data = self.request(commands::DATA)?;
        debug!("{}: Raw bitstream has been received: {} bytes", self.alias, data.len());

        self.session
            .fetch_waveform(&data, preamble.as_deref())
            .map_err(|e| {
                error!("{}: Error retrieving waveform data: {}", self.alias, e);
                e
            })
    }

    /// [`get_waveform`](Self::get_waveform) with the configured refresh choice.
    pub fn acquire(&mut self) -> Result<DecodedWaveform> {
        self.get_waveform(self.refresh_preamble)
    }

    pub fn preamble_map(&self) -> Option<BTreeMap<&'static str, PreambleValue>> {
        self.session.preamble().map(Preamble::as_map)
    }

    pub fn into_inner(self) -> T {
        info!("{}: Connection to the oscilloscope released.", self.alias);
        self.transport
    }

    fn request(&mut self, command: &str) -> Result<Vec<u8>> {
        self.transport.send_command(command)?;
        self.transport.read_bytes()
    }
}
