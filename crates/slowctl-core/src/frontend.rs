//! Front-end interface seam consumed by slow-controls channels.
//!
//! A front-end owns the actual hardware transport. Channels only need four
//! things from it: its universal address/data widths, a native-width register
//! read, and (for types wider than a native register) a block read. Block
//! reads are optional; a front-end that implements them reports the fact
//! through an explicit one-time confirmation latch so that only the first
//! channel of an interface pays for the trial read.
//!
//! The trait is synchronous on purpose: a sampling cycle runs to completion
//! with no suspension points, and the caller serializes access per channel.

use std::fmt;
use thiserror::Error;

// =============================================================================
// Front-End Errors
// =============================================================================

/// Category of a front-end read failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontEndErrorKind {
    /// The front-end implements no block read. Fatal for channels whose
    /// resolved read size exceeds the native data size.
    BlockReadUnsupported,
    /// Hardware not initialized yet; safe to ignore during capability probes.
    NotReady,
    /// Any other runtime read failure.
    Hardware,
}

impl fmt::Display for FrontEndErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FrontEndErrorKind::BlockReadUnsupported => "block_read_unsupported",
            FrontEndErrorKind::NotReady => "not_ready",
            FrontEndErrorKind::Hardware => "hardware",
        };
        write!(f, "{}", label)
    }
}

/// Structured front-end failure: which interface, what category, and detail.
#[derive(Error, Debug, Clone)]
#[error("front-end '{uid}' {kind} error: {message}")]
pub struct FrontEndError {
    /// Interface UID the failure originated from.
    pub uid: String,
    /// Failure category.
    pub kind: FrontEndErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl FrontEndError {
    /// Create a new front-end error.
    pub fn new(
        uid: impl Into<String>,
        kind: FrontEndErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            kind,
            message: message.into(),
        }
    }

    /// The distinct "no block read implemented" condition.
    pub fn block_read_unsupported(uid: impl Into<String>) -> Self {
        Self::new(
            uid,
            FrontEndErrorKind::BlockReadUnsupported,
            "no block read implementation",
        )
    }

    /// True if this failure means the front-end implements no block read.
    pub fn is_block_read_unsupported(&self) -> bool {
        self.kind == FrontEndErrorKind::BlockReadUnsupported
    }
}

// =============================================================================
// Front-End Trait
// =============================================================================

/// Hardware front-end as seen by a slow-controls channel.
///
/// `address_size()` and `data_size()` must both be non-zero; channel
/// construction rejects a front-end that reports otherwise.
pub trait FrontEnd: Send + Sync {
    /// Unique identifier of this front-end instance. Prefixes every channel's
    /// full name.
    fn uid(&self) -> &str;

    /// Universal address width in bytes.
    fn address_size(&self) -> usize;

    /// Native register width in bytes.
    fn data_size(&self) -> usize;

    /// Fill `out`, sized to `data_size()`, from the register at `address`.
    fn read(&self, address: &[u8], out: &mut [u8]) -> Result<(), FrontEndError>;

    /// Fill `out` with `out.len()` bytes starting at `address`, for reads
    /// wider than the native data size.
    ///
    /// The default signals [`FrontEndErrorKind::BlockReadUnsupported`];
    /// front-ends with wide-read hardware override this.
    fn block_read(&self, address: &[u8], out: &mut [u8]) -> Result<(), FrontEndError> {
        let _ = (address, out);
        Err(FrontEndError::block_read_unsupported(self.uid()))
    }

    /// Whether a block read has already been confirmed to work on this
    /// front-end. Once true, channels skip the construction-time trial read.
    fn block_read_confirmed(&self) -> bool {
        false
    }

    /// Record that a block read succeeded once. One-time set; never cleared.
    fn confirm_block_read(&self) {}
}
