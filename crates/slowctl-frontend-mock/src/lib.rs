//! Register-backed mock front-end for exercising slow-controls channels.
//!
//! Presents a flat byte-addressed register space with configurable universal
//! address/data widths and selectable block-read behavior, so tests can cover
//! every capability-probe path:
//!
//! - [`BlockReadBehavior::Supported`]: wide reads work
//! - [`BlockReadBehavior::Unsupported`]: the distinct fatal condition
//! - [`BlockReadBehavior::NotReady`]: transient failure, ignored by probes
//!
//! # Example
//!
//! ```rust
//! use slowctl_frontend_mock::MockFrontEnd;
//! use slowctl_core::FrontEnd;
//!
//! let fe = MockFrontEnd::new("fe0", 8, 8);
//! fe.load(0x10, &42u32.to_ne_bytes());
//!
//! let mut out = vec![0u8; fe.data_size()];
//! fe.read(&0x10u64.to_ne_bytes(), &mut out).unwrap();
//! assert_eq!(&out[..4], &42u32.to_ne_bytes());
//! ```

use parking_lot::Mutex;
use slowctl_core::frontend::{FrontEnd, FrontEndError, FrontEndErrorKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::trace;

/// How the mock answers block reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockReadBehavior {
    /// Signal the distinct "no block read implementation" condition.
    #[default]
    Unsupported,
    /// Serve block reads from the register space.
    Supported,
    /// Fail as if the hardware were still powering up.
    NotReady,
}

/// Mock front-end over a sparse byte-addressed register space.
///
/// Unwritten addresses read as zero. The confirmation latch and a block-read
/// probe counter let tests assert the one-time capability negotiation.
pub struct MockFrontEnd {
    uid: String,
    address_size: usize,
    data_size: usize,
    memory: Mutex<HashMap<u64, u8>>,
    block_reads: BlockReadBehavior,
    confirmed: AtomicBool,
    block_read_calls: AtomicUsize,
}

impl MockFrontEnd {
    /// Create a mock with the given universal address and data widths.
    pub fn new(uid: impl Into<String>, address_size: usize, data_size: usize) -> Self {
        Self {
            uid: uid.into(),
            address_size,
            data_size,
            memory: Mutex::new(HashMap::new()),
            block_reads: BlockReadBehavior::default(),
            confirmed: AtomicBool::new(false),
            block_read_calls: AtomicUsize::new(0),
        }
    }

    /// Select the block-read behavior.
    pub fn with_block_reads(mut self, behavior: BlockReadBehavior) -> Self {
        self.block_reads = behavior;
        self
    }

    /// Write `bytes` into the register space starting at `address`.
    pub fn load(&self, address: u64, bytes: &[u8]) {
        let mut memory = self.memory.lock();
        for (i, byte) in bytes.iter().enumerate() {
            memory.insert(address + i as u64, *byte);
        }
    }

    /// Number of block reads attempted so far (probes included).
    pub fn block_read_calls(&self) -> usize {
        self.block_read_calls.load(Ordering::Relaxed)
    }

    /// Interpret an address buffer as a byte offset, native byte order.
    fn decode_address(&self, address: &[u8]) -> u64 {
        let mut bytes = [0u8; 8];
        let n = address.len().min(8);
        bytes[..n].copy_from_slice(&address[..n]);
        u64::from_ne_bytes(bytes)
    }

    /// Copy `out.len()` bytes out of the register space at `base`.
    fn copy_out(&self, base: u64, out: &mut [u8]) {
        let memory = self.memory.lock();
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = memory.get(&(base + i as u64)).copied().unwrap_or(0);
        }
    }
}

impl FrontEnd for MockFrontEnd {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn address_size(&self) -> usize {
        self.address_size
    }

    fn data_size(&self) -> usize {
        self.data_size
    }

    fn read(&self, address: &[u8], out: &mut [u8]) -> Result<(), FrontEndError> {
        let base = self.decode_address(address);
        trace!(uid = %self.uid, base, len = out.len(), "mock read");
        self.copy_out(base, out);
        Ok(())
    }

    fn block_read(&self, address: &[u8], out: &mut [u8]) -> Result<(), FrontEndError> {
        self.block_read_calls.fetch_add(1, Ordering::Relaxed);
        match self.block_reads {
            BlockReadBehavior::Unsupported => Err(FrontEndError::block_read_unsupported(&self.uid)),
            BlockReadBehavior::NotReady => Err(FrontEndError::new(
                &self.uid,
                FrontEndErrorKind::NotReady,
                "front-end not initialized",
            )),
            BlockReadBehavior::Supported => {
                let base = self.decode_address(address);
                trace!(uid = %self.uid, base, len = out.len(), "mock block read");
                self.copy_out(base, out);
                Ok(())
            }
        }
    }

    fn block_read_confirmed(&self) -> bool {
        self.confirmed.load(Ordering::Relaxed)
    }

    fn confirm_block_read(&self) {
        self.confirmed.store(true, Ordering::Relaxed);
    }
}
