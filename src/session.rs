// Acquisition session: preamble cache and fetch-and-decode

use log::{debug, info};

use crate::block;
use crate::error::{Result, ScopeError};
use crate::preamble::Preamble;
use crate::scaling::{self, CountPolicy, DecodedWaveform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    PreambleLoaded,
    WaveformReady,
}

/// Holds the most recent preamble of one instrument.
///
/// A preamble is replaced only by a successful decode, so a failed load
/// leaves the previous parameters and state in place.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionSession {
    state: SessionState,
    preamble: Option<Preamble>,
    policy: CountPolicy,
}

impl AcquisitionSession {
    pub fn new() -> Self {
        AcquisitionSession::default()
    }

    pub fn with_policy(policy: CountPolicy) -> Self {
        AcquisitionSession {
            policy,
            ..Default::default()
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn preamble(&self) -> Option<&Preamble> {
        self.preamble.as_ref()
    }

    pub fn policy(&self) -> CountPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: CountPolicy) {
        self.policy = policy;
    }

    pub fn load_preamble(&mut self, bytes: &[u8]) -> Result<&Preamble> {
        let preamble = Preamble::decode(bytes)?;
        self.state = SessionState::PreambleLoaded;
        Ok(self.preamble.insert(preamble))
    }

    /// Decode and scale one data block.
    ///
    /// With `preamble_bytes`, the samples are scaled with the fresh
    /// parameters; without, the cached preamble is used even if the
    /// instrument settings changed since it was read. The fresh preamble and
    /// the new state are kept only when the whole fetch succeeds.
    pub fn fetch_waveform(
        &mut self,
        data_bytes: &[u8],
        preamble_bytes: Option<&[u8]>,
    ) -> Result<DecodedWaveform> {
        let fresh = match preamble_bytes {
            Some(bytes) => {
                debug!("Refreshing preamble before scaling");
                Some(Preamble::decode(bytes)?)
            }
            None => None,
        };

        let preamble = fresh.or(self.preamble).ok_or_else(|| {
            ScopeError::InvalidState("fetch_waveform called before a preamble was loaded".into())
        })?;

        let raw = block::decode(data_bytes)?;
        let waveform = scaling::scale(&preamble, &raw, self.policy)?;

        info!("Waveform data retrieved: {} points", waveform.len());
        self.preamble = Some(preamble);
        self.state = SessionState::WaveformReady;
        Ok(waveform)
    }
}
