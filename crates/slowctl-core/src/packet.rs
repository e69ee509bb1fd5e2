//! Transmit packet encoding for the live-monitor stream.
//!
//! Packets are appended to a caller-supplied growing buffer; the channel
//! never owns or flushes it. One layout serves both packet classes:
//!
//! ```text
//! 1B  packet type (0: value, 1: lolo, 2: lo, 3: hi, 4: hihi)
//! 1B  sequence count from the channel (wraps at 255)
//! 8B  time, native-endian (alarm packets carry the real time too)
//! 4B  name length, native-endian
//!     name
//! 1B  value length in bytes
//! 1B  value length in bits
//!     value (the sample, or the fired level's threshold)
//! ```

use bytes::{Buf, BufMut, BytesMut};

/// Packet type of a value packet; alarm packets use `level + 1`.
pub const VALUE_PACKET_TYPE: u8 = 0;

/// Exact encoded length of a packet with the given name and value sizes.
pub fn packet_len(name_len: usize, value_len: usize) -> usize {
    2 + 8 + 4 + name_len + 2 + value_len
}

/// Append one packet to the transmit buffer.
pub fn append_packet(
    tx: &mut BytesMut,
    packet_type: u8,
    sequence: u8,
    time: u64,
    name: &str,
    bit_width: u32,
    value: &[u8],
) {
    tx.reserve(packet_len(name.len(), value.len()));
    tx.put_u8(packet_type);
    tx.put_u8(sequence);
    tx.put_slice(&time.to_ne_bytes());
    tx.put_slice(&(name.len() as u32).to_ne_bytes());
    tx.put_slice(name.as_bytes());
    tx.put_u8(value.len() as u8);
    tx.put_u8(bit_width as u8);
    tx.put_slice(value);
}

// =============================================================================
// Monitor-Side Parsing
// =============================================================================

/// One decoded transmit packet, as a monitor consumer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxPacket {
    /// 0 for a value packet, 1–4 for alarm packets (lolo..hihi).
    pub packet_type: u8,
    /// Channel sequence counter at emit time.
    pub sequence: u8,
    /// Sample time in Unix seconds.
    pub time: u64,
    /// Full channel name (`<interfaceUID>:<channel>`).
    pub name: String,
    /// Value width in bits.
    pub value_bits: u8,
    /// Value bytes: the sample, or the alarm threshold.
    pub value: Vec<u8>,
}

/// Decode the next packet off the front of `buf`.
///
/// Returns `None` on a truncated or non-UTF-8 packet; `buf` may then be left
/// partially consumed, so treat `None` as end-of-stream.
pub fn parse_packet(buf: &mut impl Buf) -> Option<TxPacket> {
    if buf.remaining() < 2 + 8 + 4 {
        return None;
    }
    let packet_type = buf.get_u8();
    let sequence = buf.get_u8();

    let mut time_bytes = [0u8; 8];
    buf.copy_to_slice(&mut time_bytes);
    let time = u64::from_ne_bytes(time_bytes);

    let mut len_bytes = [0u8; 4];
    buf.copy_to_slice(&mut len_bytes);
    let name_len = u32::from_ne_bytes(len_bytes) as usize;

    if buf.remaining() < name_len + 2 {
        return None;
    }
    let mut name_bytes = vec![0u8; name_len];
    buf.copy_to_slice(&mut name_bytes);
    let name = String::from_utf8(name_bytes).ok()?;

    let value_len = buf.get_u8() as usize;
    let value_bits = buf.get_u8();
    if buf.remaining() < value_len {
        return None;
    }
    let mut value = vec![0u8; value_len];
    buf.copy_to_slice(&mut value);

    Some(TxPacket {
        packet_type,
        sequence,
        time,
        name,
        value_bits,
        value,
    })
}

/// Drain a transmit buffer into its packets, stopping at the first
/// undecodable remainder.
pub fn parse_all(mut bytes: &[u8]) -> Vec<TxPacket> {
    let mut packets = Vec::new();
    while let Some(packet) = parse_packet(&mut bytes) {
        packets.push(packet);
    }
    packets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_length_exact() {
        let mut tx = BytesMut::new();
        append_packet(&mut tx, VALUE_PACKET_TYPE, 7, 1_700_000_000, "fe0:temp", 32, &[1, 2, 3, 4]);
        assert_eq!(tx.len(), packet_len("fe0:temp".len(), 4));
        assert_eq!(tx.len(), 2 + 8 + 4 + 8 + 1 + 1 + 4);
    }

    #[test]
    fn test_field_layout() {
        let mut tx = BytesMut::new();
        append_packet(&mut tx, 3, 9, 42, "a:b", 12, &[0xCD, 0x0A]);

        assert_eq!(tx[0], 3, "packet type");
        assert_eq!(tx[1], 9, "sequence");
        assert_eq!(&tx[2..10], &42u64.to_ne_bytes(), "time");
        assert_eq!(&tx[10..14], &3u32.to_ne_bytes(), "name length");
        assert_eq!(&tx[14..17], b"a:b", "name");
        assert_eq!(tx[17], 2, "value byte length");
        assert_eq!(tx[18], 12, "value bit length");
        assert_eq!(&tx[19..21], &[0xCD, 0x0A], "value");
    }

    #[test]
    fn test_parse_round_trip() {
        let mut tx = BytesMut::new();
        append_packet(&mut tx, VALUE_PACKET_TYPE, 0, 1_700_000_000, "fe0:v", 32, &[1, 2, 3, 4]);
        append_packet(&mut tx, 4, 1, 1_700_000_000, "fe0:v", 32, &[9, 9, 9, 9]);

        let packets = parse_all(&tx);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].packet_type, VALUE_PACKET_TYPE);
        assert_eq!(packets[0].sequence, 0);
        assert_eq!(packets[0].name, "fe0:v");
        assert_eq!(packets[0].value, vec![1, 2, 3, 4]);
        assert_eq!(packets[1].packet_type, 4);
        assert_eq!(packets[1].value, vec![9, 9, 9, 9]);
    }

    #[test]
    fn test_parse_truncated_returns_none() {
        let mut tx = BytesMut::new();
        append_packet(&mut tx, VALUE_PACKET_TYPE, 0, 1, "fe0:v", 32, &[1, 2, 3, 4]);
        let truncated = &tx[..tx.len() - 1];
        assert!(parse_all(truncated).is_empty());
    }
}
