//! Channel and correlation identifiers.
//!
//! A correlation id packs the owning channel into its high-order decimal
//! digits: `correlation = channel * SEQUENCE_SPAN + sequence`. The router never
//! keeps a per-request table; it recovers the channel from the id alone.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of correlation ids owned by each channel.
///
/// The six low-order decimal digits of a correlation id hold the per-channel
/// sequence number, so a channel can have at most `SEQUENCE_SPAN - 1` requests
/// outstanding besides the handshake value.
pub const SEQUENCE_SPAN: u64 = 1_000_000;

/// Identifier of an admitted client channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(u64);

impl ChannelId {
    /// First identifier handed out by a fresh registry.
    pub const FIRST: Self = Self(1);

    /// Largest channel whose handshake id still fits in a `u64`.
    #[expect(
        clippy::integer_division,
        reason = "the bound is the floor of the quotient by definition"
    )]
    pub const MAX: Self = Self(u64::MAX / SEQUENCE_SPAN);

    /// Wraps a raw channel number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw channel number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the identifier after this one, or `None` once [`Self::MAX`] is
    /// reached.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        if self.0 >= Self::MAX.0 {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Flat request identifier carrying its owning channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Wraps a raw correlation id as received on the wire.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Composes a correlation id from a channel and a sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::SequenceOutOfRange`] when `sequence` does not
    /// fit in the reserved low-order digits and
    /// [`CorrelationError::ChannelOutOfRange`] when the product overflows.
    pub const fn compose(channel: ChannelId, sequence: u64) -> Result<Self, CorrelationError> {
        if sequence >= SEQUENCE_SPAN {
            return Err(CorrelationError::SequenceOutOfRange { sequence });
        }
        let Some(base) = channel.0.checked_mul(SEQUENCE_SPAN) else {
            return Err(CorrelationError::ChannelOutOfRange { channel });
        };
        match base.checked_add(sequence) {
            Some(value) => Ok(Self(value)),
            None => Err(CorrelationError::ChannelOutOfRange { channel }),
        }
    }

    /// Returns the id sent to a freshly admitted channel (sequence zero).
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::ChannelOutOfRange`] for channels above
    /// [`ChannelId::MAX`].
    pub const fn handshake(channel: ChannelId) -> Result<Self, CorrelationError> {
        Self::compose(channel, 0)
    }

    /// Decodes the channel that owns this id.
    ///
    /// Total for every `u64`; integer division keeps it exact where a
    /// floating-point quotient would lose precision.
    #[must_use]
    #[expect(
        clippy::integer_division,
        reason = "routing is defined as the floor of the quotient"
    )]
    pub const fn channel(self) -> ChannelId {
        ChannelId(self.0 / SEQUENCE_SPAN)
    }

    /// Returns the per-channel sequence number.
    #[must_use]
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "the sequence is the remainder of the channel split"
    )]
    pub const fn sequence(self) -> u64 {
        self.0 % SEQUENCE_SPAN
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Errors raised while composing correlation ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// The sequence number does not fit in the reserved digits.
    #[error("sequence {sequence} exceeds the per-channel span of {span}", span = SEQUENCE_SPAN)]
    SequenceOutOfRange {
        /// Offending sequence number.
        sequence: u64,
    },
    /// The channel is too large to be encoded.
    #[error("channel {channel} cannot be encoded in a correlation id")]
    ChannelOutOfRange {
        /// Offending channel.
        channel: ChannelId,
    },
}
