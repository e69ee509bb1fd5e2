//! Persisted record encodings: the aggregate log and per-channel logs.
//!
//! Both logs exist in a binary and a text variant. The aggregate log is one
//! file shared by every channel of a front-end; its handle is owned (and, if
//! channels run concurrently, locked) by the caller; a channel only appends
//! single records through [`AggregateLog`]. Per-channel records omit the
//! channel name since the file identifies the channel.
//!
//! Record layouts:
//!
//! ```text
//! aggregate binary:    8B time | 4B name len | name | 1B value bytes
//!                      | 1B value bits | value
//! aggregate text:      time \n name \n value \n
//! per-channel binary:  8B time | value
//! per-channel text:    time \n value \n
//! ```
//!
//! Alarm records reuse the same layouts with the sentinel times 1–4 in place
//! of the timestamp and the fired level's threshold as the value.

use crate::alarm::{AlarmMask, AlarmThresholds};
use crate::types::SampleType;
use std::io::{self, Write};

/// Encoding of a persisted log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Fixed-layout binary records.
    Binary,
    /// Line-oriented text records.
    Text,
}

impl RecordFormat {
    /// File extension used for derived save-file names.
    pub fn extension(self) -> &'static str {
        match self {
            RecordFormat::Binary => "dat",
            RecordFormat::Text => "txt",
        }
    }
}

// =============================================================================
// Aggregate Log
// =============================================================================

/// Append-side view of the caller-owned aggregate file.
///
/// Borrows the sink for the duration of one sampling call; the caller keeps
/// ownership, buffering policy, and any cross-channel locking.
pub struct AggregateLog<'a> {
    sink: &'a mut dyn Write,
    format: RecordFormat,
}

impl<'a> AggregateLog<'a> {
    /// Wrap a caller-owned writer for appending.
    pub fn new(sink: &'a mut dyn Write, format: RecordFormat) -> Self {
        Self { sink, format }
    }

    /// The log's encoding.
    pub fn format(&self) -> RecordFormat {
        self.format
    }

    /// Append one record.
    pub fn append(&mut self, time: u64, name: &str, ty: &SampleType, value: &[u8]) -> io::Result<()> {
        match self.format {
            RecordFormat::Binary => {
                self.sink.write_all(&time.to_ne_bytes())?;
                self.sink.write_all(&(name.len() as u32).to_ne_bytes())?;
                self.sink.write_all(name.as_bytes())?;
                self.sink
                    .write_all(&[value.len() as u8, ty.bit_width() as u8])?;
                self.sink.write_all(value)
            }
            RecordFormat::Text => {
                write!(self.sink, "{}\n{}\n{}\n", time, name, ty.format_value(value))
            }
        }
    }

    /// Append one threshold record per fired level, marked with the
    /// sentinel times 1–4.
    pub fn append_alarms(
        &mut self,
        fired: AlarmMask,
        name: &str,
        ty: &SampleType,
        thresholds: &AlarmThresholds,
    ) -> io::Result<()> {
        for level in fired.fired() {
            self.append(level.sentinel_time(), name, ty, thresholds.get(level))?;
        }
        Ok(())
    }
}

// =============================================================================
// Per-Channel Records
// =============================================================================

/// Append one per-channel record (no name field).
pub fn append_channel_record<W: Write>(
    sink: &mut W,
    format: RecordFormat,
    time: u64,
    ty: &SampleType,
    value: &[u8],
) -> io::Result<()> {
    match format {
        RecordFormat::Binary => {
            sink.write_all(&time.to_ne_bytes())?;
            sink.write_all(value)
        }
        RecordFormat::Text => write!(sink, "{}\n{}\n", time, ty.format_value(value)),
    }
}

/// Append one per-channel threshold record per fired level.
pub fn append_channel_alarms<W: Write>(
    sink: &mut W,
    format: RecordFormat,
    fired: AlarmMask,
    ty: &SampleType,
    thresholds: &AlarmThresholds,
) -> io::Result<()> {
    for level in fired.fired() {
        append_channel_record(sink, format, level.sentinel_time(), ty, thresholds.get(level))?;
    }
    Ok(())
}
