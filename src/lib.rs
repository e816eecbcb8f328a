//! livecap - Live captioning engine
//!
//! Captures microphone or system audio, streams it through a speech
//! recognizer, throttles partial results for readable display, and
//! exchanges caption text with peers over a UDP relay.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod recognize;
pub mod relay;
pub mod session;
pub mod transcript;

// Core traits (capture → recognize → display/relay)
pub use audio::source::{CaptureBackend, SystemCapture};
pub use recognize::engine::RecognitionEngine;

// Session
pub use session::SessionController;

// Relay
pub use relay::service::{ListenerState, RelayService};

// Error handling
pub use error::{LivecapError, Result};

// Config
pub use config::{Config, SourceKind};

// Transcript
pub use transcript::Transcript;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(
                ver.contains('+'),
                "With GIT_HASH set, version should contain '+', got: {}",
                ver
            );
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
