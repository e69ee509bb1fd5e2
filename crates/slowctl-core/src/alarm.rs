//! 4-level alarm evaluation with optional latching.
//!
//! Each channel carries four independent alarmed flags, one per level
//! (lolo, lo, hi, hihi). On every evaluated sample a level trips when the
//! sample crosses its threshold (`<=` for the low pair, `>=` for the high
//! pair). Flags only ever transition false→true here; [`AlarmState::clear`]
//! is the sole way back. With latching enabled an alarmed level is not
//! re-evaluated, so it fires exactly once until cleared; without latching it
//! re-fires on every out-of-range sample.
//!
//! [`AlarmState::evaluate`] returns the per-cycle fired mask (the levels that
//! tripped on *this* sample), which the encoder uses to emit alarm packets
//! and records. The persistent alarmed flags are a separate notion.

use crate::types::SampleType;
use std::fmt;

// =============================================================================
// Alarm Levels
// =============================================================================

/// One of the four alarm levels, ordered lolo → hihi.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmLevel {
    /// Low-low: fires on `sample <= lolo`.
    LoLo,
    /// Low: fires on `sample <= lo`.
    Lo,
    /// High: fires on `sample >= hi`.
    Hi,
    /// High-high: fires on `sample >= hihi`.
    HiHi,
}

impl AlarmLevel {
    /// All four levels in mask-bit order.
    pub const ALL: [AlarmLevel; 4] = [
        AlarmLevel::LoLo,
        AlarmLevel::Lo,
        AlarmLevel::Hi,
        AlarmLevel::HiHi,
    ];

    /// Mask-bit index: 0 = lolo .. 3 = hihi.
    pub fn index(self) -> usize {
        match self {
            AlarmLevel::LoLo => 0,
            AlarmLevel::Lo => 1,
            AlarmLevel::Hi => 2,
            AlarmLevel::HiHi => 3,
        }
    }

    /// Transmit packet type for this level (1–4; 0 is the value packet).
    pub fn packet_type(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Sentinel timestamp (1–4) marking this level's records in saved logs.
    pub fn sentinel_time(self) -> u64 {
        self.index() as u64 + 1
    }

    /// Whether this level compares `sample <= threshold`.
    pub fn is_low(self) -> bool {
        matches!(self, AlarmLevel::LoLo | AlarmLevel::Lo)
    }

    /// Lowercase label used in diagnostics and error messages.
    pub fn label(self) -> &'static str {
        match self {
            AlarmLevel::LoLo => "lolo",
            AlarmLevel::Lo => "lo",
            AlarmLevel::Hi => "hi",
            AlarmLevel::HiHi => "hihi",
        }
    }
}

impl fmt::Display for AlarmLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// =============================================================================
// Fired Mask
// =============================================================================

/// 4-bit mask of levels that fired during one sampling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmMask(u8);

impl AlarmMask {
    /// No levels fired.
    pub const EMPTY: AlarmMask = AlarmMask(0);

    /// Raw mask bits (bit 0 = lolo .. bit 3 = hihi).
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether a given level fired.
    pub fn contains(self, level: AlarmLevel) -> bool {
        self.0 & (1 << level.index()) != 0
    }

    /// Mark a level as fired.
    pub fn insert(&mut self, level: AlarmLevel) {
        self.0 |= 1 << level.index();
    }

    /// Whether nothing fired.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Fired levels, lolo → hihi.
    pub fn fired(self) -> impl Iterator<Item = AlarmLevel> {
        AlarmLevel::ALL
            .into_iter()
            .filter(move |level| self.contains(*level))
    }
}

// =============================================================================
// Thresholds & State
// =============================================================================

/// The four threshold buffers, each sized to the channel's byte width.
#[derive(Debug, Clone)]
pub struct AlarmThresholds {
    lolo: Vec<u8>,
    lo: Vec<u8>,
    hi: Vec<u8>,
    hihi: Vec<u8>,
}

impl AlarmThresholds {
    /// Bundle converted threshold buffers.
    pub fn new(lolo: Vec<u8>, lo: Vec<u8>, hi: Vec<u8>, hihi: Vec<u8>) -> Self {
        Self { lolo, lo, hi, hihi }
    }

    /// Zero-filled thresholds of the given byte width (alarms disabled).
    pub fn zeroed(byte_width: usize) -> Self {
        Self::new(
            vec![0; byte_width],
            vec![0; byte_width],
            vec![0; byte_width],
            vec![0; byte_width],
        )
    }

    /// Threshold buffer for one level.
    pub fn get(&self, level: AlarmLevel) -> &[u8] {
        match level {
            AlarmLevel::LoLo => &self.lolo,
            AlarmLevel::Lo => &self.lo,
            AlarmLevel::Hi => &self.hi,
            AlarmLevel::HiHi => &self.hihi,
        }
    }
}

/// Persistent per-level alarmed flags.
#[derive(Debug, Clone, Default)]
pub struct AlarmState {
    alarmed: [bool; 4],
}

impl AlarmState {
    /// Whether a level is currently alarmed.
    pub fn is_alarmed(&self, level: AlarmLevel) -> bool {
        self.alarmed[level.index()]
    }

    /// Evaluate all four levels against one sample, returning the levels
    /// that fired this cycle.
    ///
    /// An alarmed level is skipped while `latch` holds it; otherwise the
    /// comparison re-runs every sample and an out-of-range value re-fires.
    pub fn evaluate(
        &mut self,
        ty: &SampleType,
        sample: &[u8],
        thresholds: &AlarmThresholds,
        latch: bool,
    ) -> AlarmMask {
        let mut fired = AlarmMask::EMPTY;
        for level in AlarmLevel::ALL {
            if self.alarmed[level.index()] && latch {
                continue;
            }
            let tripped = if level.is_low() {
                ty.leq(sample, thresholds.get(level))
            } else {
                ty.geq(sample, thresholds.get(level))
            };
            if tripped {
                self.alarmed[level.index()] = true;
                fired.insert(level);
            }
        }
        fired
    }

    /// Clear one level, or all four when `level` is `None`.
    pub fn clear(&mut self, level: Option<AlarmLevel>) {
        match level {
            Some(level) => self.alarmed[level.index()] = false,
            None => self.alarmed = [false; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_type() -> SampleType {
        SampleType::parse("unsigned int", 0).unwrap()
    }

    fn thresholds_u32(lolo: u32, lo: u32, hi: u32, hihi: u32) -> AlarmThresholds {
        AlarmThresholds::new(
            lolo.to_ne_bytes().to_vec(),
            lo.to_ne_bytes().to_vec(),
            hi.to_ne_bytes().to_vec(),
            hihi.to_ne_bytes().to_vec(),
        )
    }

    #[test]
    fn test_mask_bits() {
        let mut mask = AlarmMask::EMPTY;
        assert!(mask.is_empty());
        mask.insert(AlarmLevel::Hi);
        assert_eq!(mask.bits(), 0b0100);
        mask.insert(AlarmLevel::LoLo);
        assert_eq!(mask.bits(), 0b0101);
        assert!(mask.contains(AlarmLevel::Hi));
        assert!(!mask.contains(AlarmLevel::HiHi));
        assert_eq!(
            mask.fired().collect::<Vec<_>>(),
            vec![AlarmLevel::LoLo, AlarmLevel::Hi]
        );
    }

    #[test]
    fn test_in_range_sample_fires_nothing() {
        let ty = u32_type();
        let thr = thresholds_u32(10, 20, 80, 90);
        let mut state = AlarmState::default();

        let fired = state.evaluate(&ty, &50u32.to_ne_bytes(), &thr, true);
        assert!(fired.is_empty());
        for level in AlarmLevel::ALL {
            assert!(!state.is_alarmed(level));
        }
    }

    #[test]
    fn test_low_levels_fire_together() {
        let ty = u32_type();
        let thr = thresholds_u32(10, 20, 80, 90);
        let mut state = AlarmState::default();

        // 5 <= lolo (10) and <= lo (20): both low levels fire
        let fired = state.evaluate(&ty, &5u32.to_ne_bytes(), &thr, true);
        assert_eq!(fired.bits(), 0b0011);
    }

    #[test]
    fn test_latching_blocks_refire_until_cleared() {
        let ty = u32_type();
        let thr = thresholds_u32(10, 20, 80, 90);
        let mut state = AlarmState::default();

        let fired = state.evaluate(&ty, &85u32.to_ne_bytes(), &thr, true);
        assert_eq!(fired.bits(), 0b0100);
        assert!(state.is_alarmed(AlarmLevel::Hi));

        // back in range: flag stays, nothing fires
        let fired = state.evaluate(&ty, &50u32.to_ne_bytes(), &thr, true);
        assert!(fired.is_empty());
        assert!(state.is_alarmed(AlarmLevel::Hi));

        // out of range again while latched: still no re-fire
        let fired = state.evaluate(&ty, &85u32.to_ne_bytes(), &thr, true);
        assert!(fired.is_empty());

        // cleared: the next excursion fires again
        state.clear(Some(AlarmLevel::Hi));
        assert!(!state.is_alarmed(AlarmLevel::Hi));
        let fired = state.evaluate(&ty, &85u32.to_ne_bytes(), &thr, true);
        assert_eq!(fired.bits(), 0b0100);
    }

    #[test]
    fn test_unlatched_refires_every_sample() {
        let ty = u32_type();
        let thr = thresholds_u32(10, 20, 80, 90);
        let mut state = AlarmState::default();

        for _ in 0..3 {
            let fired = state.evaluate(&ty, &95u32.to_ne_bytes(), &thr, false);
            assert_eq!(fired.bits(), 0b1100, "hi and hihi re-fire unlatched");
        }
        assert!(state.is_alarmed(AlarmLevel::Hi));
        assert!(state.is_alarmed(AlarmLevel::HiHi));

        // flags persist even once the sample returns in range
        let fired = state.evaluate(&ty, &50u32.to_ne_bytes(), &thr, false);
        assert!(fired.is_empty());
        assert!(state.is_alarmed(AlarmLevel::Hi));
    }

    #[test]
    fn test_clear_all() {
        let ty = u32_type();
        let thr = thresholds_u32(10, 20, 80, 90);
        let mut state = AlarmState::default();
        state.evaluate(&ty, &95u32.to_ne_bytes(), &thr, true);
        state.evaluate(&ty, &5u32.to_ne_bytes(), &thr, true);

        state.clear(None);
        for level in AlarmLevel::ALL {
            assert!(!state.is_alarmed(level));
        }
    }

    #[test]
    fn test_signed_domain_thresholds() {
        let ty = SampleType::parse("int", 0).unwrap();
        // lolo = -100 expressed as its two's-complement pattern
        let thr = AlarmThresholds::new(
            (-100i32).to_ne_bytes().to_vec(),
            (-50i32).to_ne_bytes().to_vec(),
            50i32.to_ne_bytes().to_vec(),
            100i32.to_ne_bytes().to_vec(),
        );
        let mut state = AlarmState::default();

        let fired = state.evaluate(&ty, &(-75i32).to_ne_bytes(), &thr, true);
        assert_eq!(fired.bits(), 0b0010, "only lo fires for -75");
    }

    #[test]
    fn test_level_metadata() {
        assert_eq!(AlarmLevel::LoLo.packet_type(), 1);
        assert_eq!(AlarmLevel::HiHi.packet_type(), 4);
        assert_eq!(AlarmLevel::Lo.sentinel_time(), 2);
        assert_eq!(AlarmLevel::Hi.to_string(), "hi");
    }
}
