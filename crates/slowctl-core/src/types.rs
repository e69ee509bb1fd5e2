//! Channel data-type resolution and numeric-domain operations.
//!
//! A channel's textual type spec is resolved exactly once, at construction,
//! into a [`SampleType`]: the numeric domain plus the three widths everything
//! else keys off (bit width, byte width, read size). All later per-sample
//! work (alarm comparisons, text formatting) dispatches on the resolved
//! [`NumericDomain`] instead of re-matching the type string.
//!
//! Accepted grammar:
//!
//! - `<N>B<M>b`: explicit read size of `N` bytes carrying an `M`-bit value
//!   (block reads wider than the native register).
//! - `<M>b`: an `M`-bit value; read size derived from the bit offset.
//! - One of the C-style keywords `char`, `unsigned char`, `short`,
//!   `unsigned short`, `int`, `unsigned int`, `long long`,
//!   `unsigned long long`, `float`, `double`.

use crate::codec;
use crate::error::{Result, SlowControlsError};
use std::fmt;

// =============================================================================
// Numeric Domain
// =============================================================================

/// Closed set of value interpretations a channel can carry.
///
/// Bit-field specs (`...b`) land in [`NumericDomain::RawBits`] and behave as
/// unsigned integers for comparisons while rendering as hex strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericDomain {
    /// Unsigned integral keywords (`unsigned char` .. `unsigned long long`).
    Unsigned,
    /// Signed integral keywords (`char` .. `long long`).
    Signed,
    /// `float`.
    Float32,
    /// `double`.
    Float64,
    /// Bit-field types (`<M>b`, `<N>B<M>b`).
    RawBits,
}

/// Keyword table: spec text, domain, bit width.
const KEYWORDS: &[(&str, NumericDomain, u32)] = &[
    ("char", NumericDomain::Signed, 8),
    ("unsigned char", NumericDomain::Unsigned, 8),
    ("short", NumericDomain::Signed, 16),
    ("unsigned short", NumericDomain::Unsigned, 16),
    ("int", NumericDomain::Signed, 32),
    ("unsigned int", NumericDomain::Unsigned, 32),
    ("long long", NumericDomain::Signed, 64),
    ("unsigned long long", NumericDomain::Unsigned, 64),
    ("float", NumericDomain::Float32, 32),
    ("double", NumericDomain::Float64, 64),
];

// =============================================================================
// Sample Type Descriptor
// =============================================================================

/// Resolved type descriptor for one channel, fixed at construction.
#[derive(Debug, Clone)]
pub struct SampleType {
    spec: String,
    domain: NumericDomain,
    bit_width: u32,
    byte_width: usize,
    read_size: usize,
}

impl SampleType {
    /// Resolve a textual type spec against the channel's bit offset.
    ///
    /// The bit offset participates because a derived read size must cover
    /// `bit_offset + bit_width` bits of the raw buffer.
    pub fn parse(spec: &str, bit_offset: u32) -> Result<Self> {
        let invalid = || SlowControlsError::InvalidDataType { spec: spec.into() };

        let (domain, bit_width, explicit_read) = if spec.len() > 1 && spec.ends_with('b') {
            let body = &spec[..spec.len() - 1];
            if let Some((bytes, bits)) = body.split_once('B') {
                let read: usize = bytes.parse().map_err(|_| invalid())?;
                let width: u32 = bits.parse().map_err(|_| invalid())?;
                (NumericDomain::RawBits, width, Some(read))
            } else {
                let width: u32 = body.parse().map_err(|_| invalid())?;
                (NumericDomain::RawBits, width, None)
            }
        } else if let Some(&(_, domain, width)) = KEYWORDS.iter().find(|(kw, _, _)| *kw == spec) {
            (domain, width, None)
        } else {
            return Err(invalid());
        };

        if bit_width == 0 {
            return Err(invalid());
        }

        let covered_bits = (bit_offset + bit_width) as usize;
        let read_size = explicit_read.unwrap_or(covered_bits.div_ceil(8));
        if read_size * 8 < covered_bits {
            // explicit read size too small for the offset + width it carries
            return Err(invalid());
        }

        Ok(Self {
            spec: spec.into(),
            domain,
            bit_width,
            byte_width: (bit_width as usize).div_ceil(8),
            read_size,
        })
    }

    /// The textual spec as configured.
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Resolved numeric domain.
    pub fn domain(&self) -> NumericDomain {
        self.domain
    }

    /// Logical value width in bits.
    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Sample/threshold buffer width in bytes (`ceil(bit_width / 8)`).
    pub fn byte_width(&self) -> usize {
        self.byte_width
    }

    /// Bytes the hardware read must deliver.
    pub fn read_size(&self) -> usize {
        self.read_size
    }

    /// Whether this is a bit-field type.
    pub fn is_raw_bits(&self) -> bool {
        self.domain == NumericDomain::RawBits
    }

    /// Whether the typed codec path (direct float parse) applies.
    pub fn is_float(&self) -> bool {
        matches!(self.domain, NumericDomain::Float32 | NumericDomain::Float64)
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Zero-extend a value buffer into a `u64`, native byte order.
    pub fn decode_unsigned(&self, buf: &[u8]) -> u64 {
        let mut bytes = [0u8; 8];
        let n = buf.len().min(8);
        bytes[..n].copy_from_slice(&buf[..n]);
        u64::from_ne_bytes(bytes)
    }

    /// Decode a value buffer as the signed integer of its byte width,
    /// widened to `i64`.
    pub fn decode_signed(&self, buf: &[u8]) -> i64 {
        match self.byte_width {
            1 => i8::from_ne_bytes([buf[0]]) as i64,
            2 => i16::from_ne_bytes([buf[0], buf[1]]) as i64,
            4 => i32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]) as i64,
            _ => {
                let mut bytes = [0u8; 8];
                let n = buf.len().min(8);
                bytes[..n].copy_from_slice(&buf[..n]);
                i64::from_ne_bytes(bytes)
            }
        }
    }

    /// Decode a 4-byte value buffer as `f32`, native byte order.
    pub fn decode_f32(&self, buf: &[u8]) -> f32 {
        f32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]])
    }

    /// Decode an 8-byte value buffer as `f64`, native byte order.
    pub fn decode_f64(&self, buf: &[u8]) -> f64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&buf[..8]);
        f64::from_ne_bytes(bytes)
    }

    // =========================================================================
    // Comparison & Formatting
    // =========================================================================

    /// `lhs <= rhs` under this type's domain.
    pub fn leq(&self, lhs: &[u8], rhs: &[u8]) -> bool {
        match self.domain {
            NumericDomain::Unsigned | NumericDomain::RawBits => {
                self.decode_unsigned(lhs) <= self.decode_unsigned(rhs)
            }
            NumericDomain::Signed => self.decode_signed(lhs) <= self.decode_signed(rhs),
            NumericDomain::Float32 => self.decode_f32(lhs) <= self.decode_f32(rhs),
            NumericDomain::Float64 => self.decode_f64(lhs) <= self.decode_f64(rhs),
        }
    }

    /// `lhs >= rhs` under this type's domain.
    pub fn geq(&self, lhs: &[u8], rhs: &[u8]) -> bool {
        match self.domain {
            NumericDomain::Unsigned | NumericDomain::RawBits => {
                self.decode_unsigned(lhs) >= self.decode_unsigned(rhs)
            }
            NumericDomain::Signed => self.decode_signed(lhs) >= self.decode_signed(rhs),
            NumericDomain::Float32 => self.decode_f32(lhs) >= self.decode_f32(rhs),
            NumericDomain::Float64 => self.decode_f64(lhs) >= self.decode_f64(rhs),
        }
    }

    /// Render a value buffer in this type's natural text form.
    ///
    /// Integers render in decimal, floats with six fractional digits (the
    /// classic `%f` rendering the persisted text formats use), bit-fields as
    /// a lowercase hex string in buffer order.
    pub fn format_value(&self, buf: &[u8]) -> String {
        match self.domain {
            NumericDomain::RawBits => codec::to_hex_string(buf),
            NumericDomain::Unsigned => self.decode_unsigned(buf).to_string(),
            NumericDomain::Signed => self.decode_signed(buf).to_string(),
            NumericDomain::Float32 => format!("{:.6}", self.decode_f32(buf)),
            NumericDomain::Float64 => format!("{:.6}", self.decode_f64(buf)),
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} bits, {} bytes, {}-byte read)",
            self.spec, self.bit_width, self.byte_width, self.read_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_widths() {
        let cases = [
            ("char", NumericDomain::Signed, 8, 1),
            ("unsigned char", NumericDomain::Unsigned, 8, 1),
            ("short", NumericDomain::Signed, 16, 2),
            ("unsigned short", NumericDomain::Unsigned, 16, 2),
            ("int", NumericDomain::Signed, 32, 4),
            ("unsigned int", NumericDomain::Unsigned, 32, 4),
            ("long long", NumericDomain::Signed, 64, 8),
            ("unsigned long long", NumericDomain::Unsigned, 64, 8),
            ("float", NumericDomain::Float32, 32, 4),
            ("double", NumericDomain::Float64, 64, 8),
        ];

        for (spec, domain, bits, bytes) in cases {
            let ty = SampleType::parse(spec, 0).unwrap();
            assert_eq!(ty.domain(), domain, "domain for {}", spec);
            assert_eq!(ty.bit_width(), bits, "bit width for {}", spec);
            assert_eq!(ty.byte_width(), bytes, "byte width for {}", spec);
            assert_eq!(ty.read_size(), bytes, "read size for {}", spec);
            assert_eq!(
                ty.byte_width(),
                (ty.bit_width() as usize).div_ceil(8),
                "byte width must be ceil(bit width / 8) for {}",
                spec
            );
        }
    }

    #[test]
    fn test_bitfield_spec_derives_read_size_from_offset() {
        // 12 bits at offset 0 fit in 2 bytes
        let ty = SampleType::parse("12b", 0).unwrap();
        assert_eq!(ty.domain(), NumericDomain::RawBits);
        assert_eq!(ty.bit_width(), 12);
        assert_eq!(ty.byte_width(), 2);
        assert_eq!(ty.read_size(), 2);

        // the same 12 bits at offset 6 straddle a third byte
        let ty = SampleType::parse("12b", 6).unwrap();
        assert_eq!(ty.byte_width(), 2);
        assert_eq!(ty.read_size(), 3);
    }

    #[test]
    fn test_block_read_spec() {
        let ty = SampleType::parse("16B12b", 0).unwrap();
        assert_eq!(ty.domain(), NumericDomain::RawBits);
        assert_eq!(ty.bit_width(), 12);
        assert_eq!(ty.byte_width(), 2);
        assert_eq!(ty.read_size(), 16);
    }

    #[test]
    fn test_invalid_specs_rejected() {
        for spec in ["quadword", "", "b", "xb", "4Bxb", "0b", "1B16b", "int32"] {
            let err = SampleType::parse(spec, 0).unwrap_err();
            assert!(
                matches!(err, SlowControlsError::InvalidDataType { .. }),
                "spec '{}' should be an invalid data type, got {:?}",
                spec,
                err
            );
        }
    }

    #[test]
    fn test_explicit_read_must_cover_offset() {
        // 2 bytes hold 16 bits; at offset 4 only 12 remain
        assert!(SampleType::parse("2B16b", 0).is_ok());
        assert!(SampleType::parse("2B16b", 4).is_err());
    }

    #[test]
    fn test_signed_decode_sign_extends() {
        let ty = SampleType::parse("char", 0).unwrap();
        assert_eq!(ty.decode_signed(&[0xFF]), -1);
        assert_eq!(ty.decode_signed(&[0x7F]), 127);

        let ty = SampleType::parse("int", 0).unwrap();
        assert_eq!(ty.decode_signed(&(-42i32).to_ne_bytes()), -42);
    }

    #[test]
    fn test_unsigned_decode_zero_extends() {
        let ty = SampleType::parse("unsigned short", 0).unwrap();
        assert_eq!(ty.decode_unsigned(&0xBEEFu16.to_ne_bytes()), 0xBEEF);

        let ty = SampleType::parse("12b", 0).unwrap();
        assert_eq!(ty.decode_unsigned(&[0x34, 0x02]), 0x0234);
    }

    #[test]
    fn test_format_value_per_domain() {
        let ty = SampleType::parse("char", 0).unwrap();
        assert_eq!(ty.format_value(&[0xFF]), "-1");

        let ty = SampleType::parse("unsigned int", 0).unwrap();
        assert_eq!(ty.format_value(&4_000_000_000u32.to_ne_bytes()), "4000000000");

        let ty = SampleType::parse("float", 0).unwrap();
        assert_eq!(ty.format_value(&1.5f32.to_ne_bytes()), "1.500000");

        let ty = SampleType::parse("double", 0).unwrap();
        assert_eq!(ty.format_value(&(-2.25f64).to_ne_bytes()), "-2.250000");

        let ty = SampleType::parse("16b", 0).unwrap();
        assert_eq!(ty.format_value(&[0xAB, 0x01]), "0xab01");
    }

    #[test]
    fn test_float_comparison_uses_float_domain() {
        let ty = SampleType::parse("double", 0).unwrap();
        let small = 50.0f64.to_ne_bytes();
        let big = 100.0f64.to_ne_bytes();
        assert!(ty.leq(&small, &big));
        assert!(ty.geq(&big, &small));
        assert!(!ty.geq(&small, &big));
    }

    #[test]
    fn test_signed_comparison_orders_negatives() {
        let ty = SampleType::parse("int", 0).unwrap();
        let neg = (-5i32).to_ne_bytes();
        let pos = 3i32.to_ne_bytes();
        assert!(ty.leq(&neg, &pos));
        // an unsigned view of -5 would order the other way around
        assert!(!ty.geq(&neg, &pos));
    }
}
