//! Input channel filter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which MIDI channel the router listens to.
///
/// Channels are stored as wire indices (0..=15) and displayed, parsed and
/// serialized as 1..=16, the numbering printed on instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "ChannelRepr", into = "ChannelRepr")]
pub enum ChannelFilter {
    /// Every channel.
    #[default]
    Omni,
    /// One channel, by wire index 0..=15.
    Channel(u8),
}

impl ChannelFilter {
    /// Filter for a displayed channel number (1..=16).
    pub fn displayed(number: u8) -> Option<Self> {
        (1..=16).contains(&number).then(|| Self::Channel(number - 1))
    }

    /// True if a message on wire channel `channel` passes.
    #[inline]
    pub fn accepts(self, channel: u8) -> bool {
        match self {
            Self::Omni => true,
            Self::Channel(wanted) => wanted == channel,
        }
    }

    /// Displayed channel number, or `None` for omni.
    pub fn display_number(self) -> Option<u8> {
        match self {
            Self::Omni => None,
            Self::Channel(index) => Some(index + 1),
        }
    }
}

impl fmt::Display for ChannelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_number() {
            None => f.write_str("omni"),
            Some(number) => write!(f, "{number}"),
        }
    }
}

/// Error for channel strings that are neither `omni` nor 1..=16.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid MIDI channel '{0}' (expected omni or 1-16)")]
pub struct ParseChannelError(pub String);

impl FromStr for ChannelFilter {
    type Err = ParseChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("omni") || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::Omni);
        }
        trimmed
            .parse::<u8>()
            .ok()
            .and_then(Self::displayed)
            .ok_or_else(|| ParseChannelError(s.to_string()))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ChannelRepr {
    Number(u8),
    Name(String),
}

impl TryFrom<ChannelRepr> for ChannelFilter {
    type Error = ParseChannelError;

    fn try_from(repr: ChannelRepr) -> Result<Self, Self::Error> {
        match repr {
            ChannelRepr::Number(number) => {
                Self::displayed(number).ok_or_else(|| ParseChannelError(number.to_string()))
            }
            ChannelRepr::Name(name) => name.parse(),
        }
    }
}

impl From<ChannelFilter> for ChannelRepr {
    fn from(filter: ChannelFilter) -> Self {
        match filter.display_number() {
            None => Self::Name("omni".to_string()),
            Some(number) => Self::Number(number),
        }
    }
}
