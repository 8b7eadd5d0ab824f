// Channel registry: valid waveform sources and fallback resolution

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScopeError};

/// Waveform source selectable with `WAV:SOUR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    C1,
    C2,
    C3,
    C4,
    F1,
    F2,
    F3,
    F4,
}

impl Channel {
    /// Registry order; a preamble's `source_channel` indexes this array.
    pub const ALL: [Channel; 8] = [
        Channel::C1,
        Channel::C2,
        Channel::C3,
        Channel::C4,
        Channel::F1,
        Channel::F2,
        Channel::F3,
        Channel::F4,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::C1 => "C1",
            Self::C2 => "C2",
            Self::C3 => "C3",
            Self::C4 => "C4",
            Self::F1 => "F1",
            Self::F2 => "F2",
            Self::F3 => "F3",
            Self::F4 => "F4",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: i64) -> Result<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| ScopeError::out_of_range("channel", index, Self::ALL.len()))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        Self::ALL.into_iter().find(|c| c.name() == s).ok_or(())
    }
}

/// Whether `name` is one of the registry's channel identifiers.
pub fn validate(name: &str) -> bool {
    name.parse::<Channel>().is_ok()
}

/// Outcome of a channel selection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The requested channel is valid and becomes active.
    Selected(Channel),
    /// The request was invalid; the instrument's active channel stays as is.
    FellBack { requested: String, active: String },
}

impl Resolution {
    /// Name of the channel that is active after resolution.
    pub fn active(&self) -> &str {
        match self {
            Self::Selected(channel) => channel.name(),
            Self::FellBack { active, .. } => active,
        }
    }

    pub fn fell_back(&self) -> bool {
        matches!(self, Self::FellBack { .. })
    }
}

/// Resolve a requested channel name against the currently active one.
///
/// Never fails: an unknown name degrades to "no change" and is reported
/// through the log and the returned [`Resolution`].
pub fn resolve(requested: &str, current_active: &str) -> Resolution {
    match requested.parse::<Channel>() {
        Ok(channel) => Resolution::Selected(channel),
        Err(()) => {
            let valid: Vec<&str> = Channel::ALL.iter().map(|c| c.name()).collect();
            warn!(
                "Invalid channel name '{}'. Valid channels are: {}.",
                requested,
                valid.join(", ")
            );
            warn!("Falling back to the current active channel: {}.", current_active);
            Resolution::FellBack {
                requested: requested.to_string(),
                active: current_active.to_string(),
            }
        }
    }
}
