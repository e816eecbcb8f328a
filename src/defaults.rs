//! Default configuration constants for livecap.
//!
//! Shared constants used across configuration types and components to
//! ensure consistency and eliminate duplication.

use std::time::Duration;

/// Canonical sample rate in Hz for frames handed to the recognition engine.
///
/// 16kHz mono f32 is the format streaming speech recognizers expect; the
/// format normalizer converts every captured frame to this rate.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Canonical channel count for normalized frames.
pub const TARGET_CHANNELS: u16 = 1;

/// Minimum spacing enforced between successive applied display updates
/// for partial recognition results.
///
/// 250ms keeps captions readable while a recognizer revises its
/// hypothesis many times per second.
pub const THROTTLE_INTERVAL: Duration = Duration::from_millis(250);

/// Default UDP port for the caption relay.
///
/// 15000 is the conventional IPtalk port.
pub const RELAY_PORT: u16 = 15_000;

/// Wire command for outgoing relay text packets.
pub const RELAY_COMMAND: &[u8; 4] = b"TEXT";

/// Name substrings identifying communication apps worth capturing.
///
/// Matched case-insensitively against capturable target names; when no
/// target matches, the full target list is offered instead.
pub const COMMUNICATION_APPS: &[&str] = &[
    "zoom", "teams", "meet", "webex", "slack", "discord", "facetime",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_format_is_speech_canonical() {
        assert_eq!(TARGET_SAMPLE_RATE, 16_000);
        assert_eq!(TARGET_CHANNELS, 1);
    }

    #[test]
    fn relay_command_is_ascii_text() {
        assert_eq!(RELAY_COMMAND, b"TEXT");
    }

    #[test]
    fn communication_filter_is_lowercase() {
        for name in COMMUNICATION_APPS {
            assert_eq!(*name, name.to_lowercase());
        }
    }
}
