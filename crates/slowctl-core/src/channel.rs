//! The slow-controls channel: one monitored hardware point.
//!
//! A [`SlowControlsChannel`] is constructed once from a [`ChannelConfig`]
//! against the front-end that owns it; every textual field (type spec,
//! address, thresholds) is parsed and validated there, so a constructed
//! channel can never fail on configuration grounds again. Per cycle, an
//! external work loop calls [`SlowControlsChannel::do_read`] and hands the
//! raw buffer to [`SlowControlsChannel::handle_sample`], which runs the
//! pipeline:
//!
//! ```text
//! extract → change check → tx value packet → alarm check
//!         → tx alarm packets → aggregate append → per-channel save
//! ```
//!
//! Channels are single-threaded by contract: the caller serializes access to
//! one channel instance, and the aggregate log handle is caller-owned.

use crate::alarm::{AlarmLevel, AlarmMask, AlarmState, AlarmThresholds};
use crate::codec;
use crate::config::ChannelConfig;
use crate::error::{Result, SlowControlsError};
use crate::frontend::FrontEnd;
use crate::packet;
use crate::record::{self, AggregateLog, RecordFormat};
use crate::types::SampleType;
use bytes::BytesMut;
use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Replace every non-alphanumeric character with `_`, for file names.
fn underscore_string(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// One monitored hardware point with its full sampling pipeline.
pub struct SlowControlsChannel {
    frontend: Arc<dyn FrontEnd>,

    name: String,
    full_name: String,

    sample_type: SampleType,
    bit_offset: u32,
    address: Vec<u8>,

    read_access: bool,
    write_access: bool,
    monitoring_enabled: bool,
    record_changes_only: bool,
    delay_between_samples: u64,

    save_enabled: bool,
    save_format: RecordFormat,
    save_file: PathBuf,

    alarms_enabled: bool,
    latch_alarms: bool,
    thresholds: AlarmThresholds,
    alarms: AlarmState,

    sample: Vec<u8>,
    last_sample: Option<Vec<u8>>,
    last_sample_time: u64,
    sequence: u8,
}

impl SlowControlsChannel {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Build a channel from its static definition.
    ///
    /// Fails fast on any configuration problem: zero front-end sizes, an
    /// unparsable type spec or address, a required-but-unsupported block
    /// read, or bad threshold text while alarms are enabled.
    pub fn new(frontend: Arc<dyn FrontEnd>, config: ChannelConfig) -> Result<Self> {
        let address_size = frontend.address_size();
        let data_size = frontend.data_size();
        if address_size == 0 || data_size == 0 {
            return Err(SlowControlsError::ZeroUniversalSize {
                address_size,
                data_size,
            });
        }

        let full_name = format!("{}:{}", frontend.uid(), config.name);
        debug!(channel = %full_name, data_type = %config.data_type, address = %config.address,
            "resolving slow controls channel");

        let sample_type = SampleType::parse(&config.data_type, config.bit_offset)?;

        let mut address = vec![0u8; address_size];
        codec::string_to_buffer(&config.address, &mut address, None).map_err(|e| {
            SlowControlsError::AddressConversion {
                address: config.address.clone(),
                source: Box::new(e),
            }
        })?;

        Self::probe_block_read(frontend.as_ref(), &sample_type, &address, &config.data_type)?;

        let byte_width = sample_type.byte_width();
        let thresholds = if config.alarms_enabled {
            let convert = |level: AlarmLevel, text: &str| -> Result<Vec<u8>> {
                if text.trim().is_empty() {
                    return Err(SlowControlsError::MissingThreshold { level });
                }
                let mut buf = vec![0u8; byte_width];
                codec::string_to_buffer(text, &mut buf, Some(&sample_type)).map_err(|e| {
                    SlowControlsError::ThresholdConversion {
                        level,
                        text: text.into(),
                        source: Box::new(e),
                    }
                })?;
                Ok(buf)
            };
            AlarmThresholds::new(
                convert(AlarmLevel::LoLo, &config.lolo)?,
                convert(AlarmLevel::Lo, &config.lo)?,
                convert(AlarmLevel::Hi, &config.hi)?,
                convert(AlarmLevel::HiHi, &config.hihi)?,
            )
        } else {
            AlarmThresholds::zeroed(byte_width)
        };

        let save_format = if config.save_binary_format {
            RecordFormat::Binary
        } else {
            RecordFormat::Text
        };
        // stable for the channel's lifetime; reopened in append mode per save
        let save_file = config.save_path.join(format!(
            "{}-{}-{}.{}",
            config.save_file_radix,
            underscore_string(&full_name),
            Utc::now().timestamp(),
            save_format.extension()
        ));

        let channel = Self {
            frontend,
            name: config.name,
            full_name,
            sample_type,
            bit_offset: config.bit_offset,
            address,
            read_access: config.read_access,
            write_access: config.write_access,
            monitoring_enabled: config.monitoring_enabled,
            record_changes_only: config.record_changes_only,
            delay_between_samples: config.delay_between_samples.max(1),
            save_enabled: config.save_enabled,
            save_format,
            save_file,
            alarms_enabled: config.alarms_enabled,
            latch_alarms: config.latch_alarms,
            thresholds,
            alarms: AlarmState::default(),
            sample: vec![0u8; byte_width],
            last_sample: None,
            last_sample_time: 0,
            sequence: 0,
        };

        info!(channel = %channel.full_name, "constructed slow controls channel");
        debug!("{}", channel);
        Ok(channel)
    }

    /// One-time trial read confirming block-read support on the front-end.
    ///
    /// Only runs when the resolved read size exceeds the native data size
    /// and no earlier channel confirmed support. "Unsupported" is fatal; any
    /// other failure is taken as hardware-not-ready and ignored.
    fn probe_block_read(
        frontend: &dyn FrontEnd,
        sample_type: &SampleType,
        address: &[u8],
        data_type: &str,
    ) -> Result<()> {
        let read_size = sample_type.read_size();
        let data_size = frontend.data_size();
        if read_size <= data_size || frontend.block_read_confirmed() {
            return Ok(());
        }

        let mut probe = vec![0u8; read_size];
        match frontend.block_read(address, &mut probe) {
            Ok(()) => {}
            Err(e) if e.is_block_read_unsupported() => {
                return Err(SlowControlsError::BlockReadUnsupported {
                    data_type: data_type.into(),
                    read_size,
                    data_size,
                });
            }
            Err(e) => {
                warn!(frontend = frontend.uid(), error = %e,
                    "ignoring block-read probe failure; assuming front-end not set up yet");
            }
        }
        debug!(frontend = frontend.uid(), "block read confirmed");
        frontend.confirm_block_read();
        Ok(())
    }

    // =========================================================================
    // Sampling
    // =========================================================================

    /// Perform the appropriately-sized hardware read into `out`.
    ///
    /// Uses a block read when the resolved read size exceeds the front-end's
    /// native data size, a native read otherwise. `out` is resized to the
    /// read width.
    pub fn do_read(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.sample_type.read_size() > self.frontend.data_size() {
            out.resize(self.sample_type.read_size(), 0);
            self.frontend.block_read(&self.address, out)?;
        } else {
            out.resize(self.frontend.data_size(), 0);
            self.frontend.read(&self.address, out)?;
        }
        Ok(())
    }

    /// Run the sampling pipeline over one raw read buffer.
    ///
    /// `tx_buffer` is the live-monitor stream; pass `None` when no monitor
    /// consumer is attached. `aggregate` is the caller-owned shared log.
    /// Returns the alarm levels that fired this cycle.
    ///
    /// Save-file failures are logged and skipped; only a structurally short
    /// raw buffer aborts the cycle.
    pub fn handle_sample(
        &mut self,
        raw: &[u8],
        mut tx_buffer: Option<&mut BytesMut>,
        aggregate: Option<&mut AggregateLog<'_>>,
    ) -> Result<AlarmMask> {
        let read_size = self.sample_type.read_size();
        if raw.len() < read_size {
            return Err(SlowControlsError::ShortReadBuffer {
                got: raw.len(),
                expected: read_size,
            });
        }

        self.sample = codec::extract_bits(raw, self.bit_offset, self.sample_type.bit_width());
        let time = Utc::now().timestamp() as u64;

        if self.record_changes_only && self.last_sample.as_deref() == Some(&self.sample[..]) {
            debug!(channel = %self.full_name, "no change");
            return Ok(AlarmMask::EMPTY);
        }

        debug!(channel = %self.full_name, sample = %self.sample_type.format_value(&self.sample),
            "new value");
        self.last_sample = Some(self.sample.clone());
        self.last_sample_time = time;

        if self.monitoring_enabled {
            if let Some(tx) = tx_buffer.as_deref_mut() {
                packet::append_packet(
                    tx,
                    packet::VALUE_PACKET_TYPE,
                    self.next_sequence(),
                    time,
                    &self.full_name,
                    self.sample_type.bit_width(),
                    &self.sample,
                );
                debug!(channel = %self.full_name, tx_len = tx.len(), "appended value packet");
            }
        }

        let fired = if self.alarms_enabled {
            self.alarms
                .evaluate(&self.sample_type, &self.sample, &self.thresholds, self.latch_alarms)
        } else {
            AlarmMask::EMPTY
        };

        if self.monitoring_enabled && !fired.is_empty() {
            if let Some(tx) = tx_buffer.as_deref_mut() {
                for level in fired.fired() {
                    packet::append_packet(
                        tx,
                        level.packet_type(),
                        self.next_sequence(),
                        time,
                        &self.full_name,
                        self.sample_type.bit_width(),
                        self.thresholds.get(level),
                    );
                    debug!(channel = %self.full_name, level = %level, "appended alarm packet");
                }
            }
        }

        if let Some(log) = aggregate {
            if let Err(e) = self.append_aggregate(log, time, fired) {
                warn!(channel = %self.full_name, error = %e,
                    "aggregate log append failed; record dropped");
            }
        }

        if self.save_enabled {
            self.save_record(time, fired);
        }

        Ok(fired)
    }

    /// Append this cycle's sample record plus any alarm records to the
    /// caller-owned aggregate log.
    fn append_aggregate(
        &self,
        log: &mut AggregateLog<'_>,
        time: u64,
        fired: AlarmMask,
    ) -> std::io::Result<()> {
        log.append(time, &self.full_name, &self.sample_type, &self.sample)?;
        log.append_alarms(fired, &self.full_name, &self.sample_type, &self.thresholds)
    }

    /// Append this cycle's record (plus alarm records) to the per-channel
    /// file. Failures are reported and skipped, never fatal to the cycle.
    fn save_record(&self, time: u64, fired: AlarmMask) {
        let mut file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.save_file)
        {
            Ok(file) => file,
            Err(e) => {
                warn!(channel = %self.full_name, file = %self.save_file.display(), error = %e,
                    "failed to open slow controls channel file");
                return;
            }
        };

        if let Err(e) = self.append_save_records(&mut file, time, fired) {
            warn!(channel = %self.full_name, file = %self.save_file.display(), error = %e,
                "failed to append slow controls channel record");
        }
    }

    /// Sequentially write the per-channel record set for one cycle.
    fn append_save_records(
        &self,
        file: &mut std::fs::File,
        time: u64,
        fired: AlarmMask,
    ) -> std::io::Result<()> {
        record::append_channel_record(file, self.save_format, time, &self.sample_type, &self.sample)?;
        record::append_channel_alarms(file, self.save_format, fired, &self.sample_type, &self.thresholds)
    }

    /// Current sequence value; post-increments with 8-bit wraparound.
    fn next_sequence(&mut self) -> u8 {
        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        seq
    }

    // =========================================================================
    // Alarms
    // =========================================================================

    /// Clear one latched alarm level, or all four when `level` is `None`.
    pub fn clear_alarms(&mut self, level: Option<AlarmLevel>) {
        self.alarms.clear(level);
    }

    /// Persistent per-level alarmed flags.
    pub fn alarm_state(&self) -> &AlarmState {
        &self.alarms
    }

    /// Converted threshold buffers (zeroed when alarms are disabled).
    pub fn thresholds(&self) -> &AlarmThresholds {
        &self.thresholds
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Channel name within its front-end.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<interfaceUID>:<name>`, as carried in packets and records.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Resolved type descriptor.
    pub fn sample_type(&self) -> &SampleType {
        &self.sample_type
    }

    /// Converted hardware address, sized to the front-end's address width.
    pub fn address(&self) -> &[u8] {
        &self.address
    }

    /// Most recent extracted sample.
    pub fn sample(&self) -> &[u8] {
        &self.sample
    }

    /// Unix time of the last recorded sample (0 before the first).
    pub fn last_sample_time(&self) -> u64 {
        self.last_sample_time
    }

    /// Seconds the external scheduler should wait between samples (≥ 1).
    pub fn delay_between_samples(&self) -> u64 {
        self.delay_between_samples
    }

    /// Whether the hardware point is readable.
    pub fn read_access(&self) -> bool {
        self.read_access
    }

    /// Whether the hardware point is writable.
    pub fn write_access(&self) -> bool {
        self.write_access
    }

    /// Whether samples feed the transmit stream.
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring_enabled
    }

    /// Derived per-channel save file path (stable for the channel lifetime).
    pub fn save_file(&self) -> &Path {
        &self.save_file
    }
}

impl fmt::Debug for SlowControlsChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for SlowControlsChannel {
    /// Diagnostic dump of every configured field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "slow controls channel '{}'", self.full_name)?;
        writeln!(f, "\tdata_type: {}", self.sample_type)?;
        writeln!(f, "\tbit_offset: {}", self.bit_offset)?;
        writeln!(f, "\taddress: {}", codec::to_hex_string_be(&self.address))?;
        writeln!(f, "\tread_access: {}", self.read_access)?;
        writeln!(f, "\twrite_access: {}", self.write_access)?;
        writeln!(f, "\tmonitoring_enabled: {}", self.monitoring_enabled)?;
        writeln!(f, "\trecord_changes_only: {}", self.record_changes_only)?;
        writeln!(f, "\tdelay_between_samples: {}", self.delay_between_samples)?;
        writeln!(f, "\tsave_enabled: {}", self.save_enabled)?;
        writeln!(f, "\tsave_file: {}", self.save_file.display())?;
        writeln!(f, "\talarms_enabled: {}", self.alarms_enabled)?;
        writeln!(f, "\tlatch_alarms: {}", self.latch_alarms)?;
        for level in AlarmLevel::ALL {
            writeln!(
                f,
                "\t{}: {} (alarmed: {})",
                level,
                codec::to_hex_string_be(self.thresholds.get(level)),
                self.alarms.is_alarmed(level)
            )?;
        }
        write!(f, "\tsequence: {}", self.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore_string() {
        assert_eq!(underscore_string("fe0:temp-1"), "fe0_temp_1");
        assert_eq!(underscore_string("plain123"), "plain123");
    }
}
