//! `slowctl-core`
//!
//! Slow-controls channel core: acquisition of time-series samples from
//! hardware front-ends, alarm evaluation, and serialization into the
//! live-monitor transmit stream and persisted logs.
//!
//! ## Pipeline
//!
//! One [`SlowControlsChannel`] per monitored hardware point. An external
//! work loop drives each cycle:
//!
//! ```text
//! do_read (front-end) → extract bits → change check → alarm check
//!                     → tx packets → aggregate log → per-channel file
//! ```
//!
//! ## Key Types
//!
//! - [`SlowControlsChannel`]: per-channel state and the sampling pipeline
//! - [`FrontEnd`]: the hardware seam (native + block reads, capability latch)
//! - [`SampleType`]: resolved type descriptor with its numeric domain
//! - [`AlarmState`] / [`AlarmMask`]: latching alarm machine and fired mask
//! - [`AggregateLog`] / [`RecordFormat`]: caller-owned shared log appending
//! - [`ChannelConfig`] / [`SlowControlsConfig`]: plain-data definitions
//!
//! ## Example
//!
//! ```rust,ignore
//! use slowctl_core::{AggregateLog, ChannelConfig, RecordFormat, SlowControlsChannel};
//! use bytes::BytesMut;
//! use std::sync::Arc;
//!
//! let frontend: Arc<dyn slowctl_core::FrontEnd> = make_front_end();
//! let mut channel = SlowControlsChannel::new(
//!     frontend,
//!     ChannelConfig::new("temp0", "int", "0x10"),
//! )?;
//!
//! let mut raw = Vec::new();
//! channel.do_read(&mut raw)?;
//!
//! let mut tx = BytesMut::new();
//! let mut shared = aggregate_file();
//! let mut log = AggregateLog::new(&mut shared, RecordFormat::Binary);
//! let fired = channel.handle_sample(&raw, Some(&mut tx), Some(&mut log))?;
//! ```
//!
//! Channels are synchronous and single-threaded by contract; the caller
//! serializes access per channel and owns the aggregate log handle.

pub mod alarm;
pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod frontend;
pub mod packet;
pub mod record;
pub mod types;

pub use alarm::{AlarmLevel, AlarmMask, AlarmState, AlarmThresholds};
pub use channel::SlowControlsChannel;
pub use config::{ChannelConfig, SlowControlsConfig};
pub use error::{Result, SlowControlsError};
pub use frontend::{FrontEnd, FrontEndError, FrontEndErrorKind};
pub use packet::TxPacket;
pub use record::{AggregateLog, RecordFormat};
pub use types::{NumericDomain, SampleType};
