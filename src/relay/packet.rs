//! Wire codec for the caption-relay packet format.
//!
//! Layout (IPtalk-compatible, simplified):
//!
//! ```text
//! offset 0..3  : command, 4 ASCII bytes ("TEXT" for sends)
//! offset 4..7  : payload length, u32 little-endian
//! offset 8..   : payload, Shift-JIS encoded text
//! ```

use crate::defaults;
use encoding_rs::SHIFT_JIS;

/// Byte length of the command + length header.
pub const HEADER_LEN: usize = 8;

/// A decoded relay packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPacket {
    pub command: String,
    pub text: String,
}

/// Encode caption text as a `TEXT` packet.
///
/// Text that Shift-JIS cannot represent yields an empty payload with a
/// zero length field; the header is always emitted and encoding never
/// fails the caller.
pub fn encode(text: &str) -> Vec<u8> {
    let (payload, _, had_errors) = SHIFT_JIS.encode(text);
    let payload: &[u8] = if had_errors { &[] } else { &payload };

    let mut packet = Vec::with_capacity(HEADER_LEN + payload.len());
    packet.extend_from_slice(defaults::RELAY_COMMAND);
    packet.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    packet.extend_from_slice(payload);
    packet
}

/// Decode a datagram into a packet.
///
/// Returns `None`, with no partial interpretation, when the buffer is
/// shorter than the header or the declared length exceeds what remains.
/// A payload that is not valid Shift-JIS decodes to the empty string
/// rather than rejecting the packet.
pub fn decode(bytes: &[u8]) -> Option<RelayPacket> {
    if bytes.len() < HEADER_LEN {
        return None;
    }

    let declared = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    if bytes.len() < HEADER_LEN + declared {
        return None;
    }

    let command = if bytes[..4].is_ascii() {
        String::from_utf8_lossy(&bytes[..4]).into_owned()
    } else {
        String::new()
    };

    let payload = &bytes[HEADER_LEN..HEADER_LEN + declared];
    let (text, _, had_errors) = SHIFT_JIS.decode(payload);
    let text = if had_errors {
        String::new()
    } else {
        text.into_owned()
    };

    Some(RelayPacket { command, text })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_produces_exact_bytes_for_ascii() {
        let packet = encode("A\nB");

        // "A\nB" is ASCII, identical under Shift-JIS
        let expected = [
            0x54, 0x45, 0x58, 0x54, // "TEXT"
            0x03, 0x00, 0x00, 0x00, // 3, little-endian
            0x41, 0x0A, 0x42, // "A\nB"
        ];
        assert_eq!(packet, expected);
    }

    #[test]
    fn round_trip_ascii() {
        let decoded = decode(&encode("A\nB")).unwrap();
        assert_eq!(decoded.command, "TEXT");
        assert_eq!(decoded.text, "A\nB");
    }

    #[test]
    fn round_trip_japanese() {
        let original = "テスト送信";
        let packet = encode(original);

        // Shift-JIS uses two bytes per character here
        let declared = u32::from_le_bytes([packet[4], packet[5], packet[6], packet[7]]);
        assert_eq!(declared as usize, packet.len() - HEADER_LEN);
        assert_eq!(declared, 10);

        let decoded = decode(&packet).unwrap();
        assert_eq!(decoded.command, "TEXT");
        assert_eq!(decoded.text, original);
    }

    #[test]
    fn round_trip_multiline_japanese() {
        let original = "行1\n行2";
        let decoded = decode(&encode(original)).unwrap();
        assert_eq!(decoded.text, original);
    }

    #[test]
    fn unencodable_text_yields_header_only_packet() {
        // U+1D11E is outside Shift-JIS
        let packet = encode("𝄞");

        assert_eq!(packet.len(), HEADER_LEN);
        assert_eq!(&packet[..4], b"TEXT");
        assert_eq!(&packet[4..8], &[0, 0, 0, 0]);

        let decoded = decode(&packet).unwrap();
        assert_eq!(decoded.text, "");
    }

    #[test]
    fn decode_rejects_short_buffers() {
        assert!(decode(&[]).is_none());
        assert!(decode(&[0x00, 0x01, 0x02]).is_none());
        assert!(decode(&[0x54, 0x45, 0x58, 0x54, 0x00, 0x00, 0x00]).is_none());
    }

    #[test]
    fn decode_rejects_declared_length_beyond_buffer() {
        let mut packet = encode("hello");
        // Claim one more byte than is present
        packet[4] = 6;
        assert!(decode(&packet).is_none());
    }

    #[test]
    fn decode_accepts_trailing_bytes_beyond_declared_length() {
        let mut packet = encode("hi");
        packet.extend_from_slice(b"junk");

        let decoded = decode(&packet).unwrap();
        assert_eq!(decoded.text, "hi");
    }

    #[test]
    fn decode_non_ascii_command_becomes_empty() {
        let mut packet = encode("x");
        packet[0] = 0xFF;

        let decoded = decode(&packet).unwrap();
        assert_eq!(decoded.command, "");
        assert_eq!(decoded.text, "x");
    }

    #[test]
    fn decode_invalid_shift_jis_payload_becomes_empty_text() {
        let mut packet = Vec::new();
        packet.extend_from_slice(b"TEXT");
        packet.extend_from_slice(&2u32.to_le_bytes());
        packet.extend_from_slice(&[0x85, 0xFF]); // not a valid Shift-JIS pair

        let decoded = decode(&packet).unwrap();
        assert_eq!(decoded.command, "TEXT");
        assert_eq!(decoded.text, "");
    }

    #[test]
    fn empty_text_round_trips() {
        let packet = encode("");
        assert_eq!(packet.len(), HEADER_LEN);
        let decoded = decode(&packet).unwrap();
        assert_eq!(decoded.text, "");
    }
}
