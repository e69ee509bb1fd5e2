//! Error types for the slow-controls core.
//!
//! One enum covers the whole crate. The variants fall into the three classes
//! the channel lifecycle distinguishes:
//!
//! - **Configuration errors** (`InvalidDataType`, `InvalidNumber`,
//!   `FloatSizeMismatch`, `AddressConversion`, `ThresholdConversion`,
//!   `MissingThreshold`, `ZeroUniversalSize`, `BlockReadUnsupported`,
//!   `Config`): fatal at channel construction; the channel is never usable.
//! - **Per-cycle hard failures** (`ShortReadBuffer`, `FrontEnd`): a sampling
//!   cycle is aborted and the error propagates to the work loop.
//! - **Contained I/O** (`Io`): surfaced where a caller asked for a file
//!   operation directly; per-cycle save failures are logged and skipped
//!   inside `handle_sample` instead.

use crate::alarm::AlarmLevel;
use crate::frontend::FrontEndError;
use thiserror::Error;

/// Convenience alias for results using the core error type.
pub type Result<T> = std::result::Result<T, SlowControlsError>;

/// Primary error type for the slow-controls core.
#[derive(Error, Debug)]
pub enum SlowControlsError {
    /// The textual data-type spec matched none of the accepted grammars.
    #[error(
        "invalid channel data type '{spec}': valid types are #b (bit count), \
         #B#b (read bytes + bit count), char, unsigned char, short, \
         unsigned short, int, unsigned int, long long, unsigned long long, \
         float, double"
    )]
    InvalidDataType {
        /// The offending type spec.
        spec: String,
    },

    /// Numeric text that is neither decimal nor `0x`-prefixed hexadecimal
    /// (nor a floating literal, on the typed float path).
    #[error("invalid number '{text}'")]
    InvalidNumber {
        /// The offending text.
        text: String,
    },

    /// Typed float conversion targeted a buffer of the wrong size.
    #[error("floating point spec mismatch: {data_type} cannot fill a {buffer_len}-byte buffer")]
    FloatSizeMismatch {
        /// The resolved float keyword.
        data_type: String,
        /// Actual destination buffer size.
        buffer_len: usize,
    },

    /// The channel's hardware address text failed to convert.
    #[error("failed to convert universal address '{address}'")]
    AddressConversion {
        /// The address text as configured.
        address: String,
        /// The underlying codec failure.
        #[source]
        source: Box<SlowControlsError>,
    },

    /// One alarm threshold failed to convert.
    #[error("failed to convert {level} alarm threshold '{text}'")]
    ThresholdConversion {
        /// Which of the four levels.
        level: AlarmLevel,
        /// The threshold text as configured.
        text: String,
        /// The underlying codec failure.
        #[source]
        source: Box<SlowControlsError>,
    },

    /// Alarms are enabled but a threshold was left empty.
    #[error("alarms are enabled but the {level} threshold is empty")]
    MissingThreshold {
        /// Which of the four levels.
        level: AlarmLevel,
    },

    /// The owning front-end reported a zero address or data size.
    #[error(
        "front-end must have non-zero universal sizes \
         (address size = {address_size}, data size = {data_size})"
    )]
    ZeroUniversalSize {
        /// Reported universal address width in bytes.
        address_size: usize,
        /// Reported native data width in bytes.
        data_size: usize,
    },

    /// The resolved type needs a block read the front-end does not implement.
    #[error(
        "data type '{data_type}' needs a {read_size}-byte read but the \
         front-end data size is {data_size} bytes and it implements no block read"
    )]
    BlockReadUnsupported {
        /// The channel's type spec.
        data_type: String,
        /// Resolved read size in bytes.
        read_size: usize,
        /// The front-end's native data size in bytes.
        data_size: usize,
    },

    /// A raw read buffer handed to `handle_sample` was shorter than the
    /// resolved read size. Never silently coerced.
    #[error("raw read buffer is {got} bytes, expected at least {expected}")]
    ShortReadBuffer {
        /// Bytes supplied.
        got: usize,
        /// Bytes required by the resolved type.
        expected: usize,
    },

    /// A front-end read failed during a sampling cycle or capability probe.
    #[error(transparent)]
    FrontEnd(#[from] FrontEndError),

    /// Channel-definition TOML failed to parse.
    #[error("configuration parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O failure surfaced to the caller.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_data_type_lists_grammar() {
        let err = SlowControlsError::InvalidDataType {
            spec: "quadword".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'quadword'"));
        assert!(msg.contains("unsigned long long"));
        assert!(msg.contains("#B#b"));
    }

    #[test]
    fn test_threshold_conversion_names_level() {
        let err = SlowControlsError::ThresholdConversion {
            level: AlarmLevel::HiHi,
            text: "abc".into(),
            source: Box::new(SlowControlsError::InvalidNumber { text: "abc".into() }),
        };
        assert!(err.to_string().contains("hihi"));
    }
}
