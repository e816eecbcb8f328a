//! Command-line interface for livecap
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Live captioning with system-audio capture and UDP relay
#[derive(Parser, Debug)]
#[command(name = "livecap", version, about = "Live captioning with system-audio capture and UDP relay")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress status output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Audio source override (microphone, system_audio)
    #[arg(long, value_name = "SOURCE")]
    pub source: Option<String>,

    /// Audio input device for microphone capture
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Application name substring for system-audio capture
    #[arg(long, value_name = "NAME")]
    pub target: Option<String>,

    /// UDP relay port
    #[arg(long, short = 'p', value_name = "PORT")]
    pub port: Option<u16>,

    /// Caption update spacing (default: 250ms). Examples: 250ms, 1s
    #[arg(long, value_name = "DURATION", value_parser = parse_throttle)]
    pub throttle: Option<Duration>,

    /// Broadcast every caption update over the relay
    #[arg(long)]
    pub relay_captions: bool,

    /// Write the final transcript to a file on exit
    #[arg(long, value_name = "PATH")]
    pub save: Option<PathBuf>,
}

/// Parse a throttle duration string.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (milliseconds), single-unit (`250ms`, `1s`), and compound (`1s500ms`).
fn parse_throttle(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Bare number → milliseconds
    if let Ok(millis) = s.parse::<u64>() {
        return Ok(Duration::from_millis(millis));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,

    /// List system-audio capture targets
    Targets,

    /// Run a standalone relay listener and print received captions
    Relay,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_throttle_bare_number_is_millis() {
        assert_eq!(parse_throttle("250"), Ok(Duration::from_millis(250)));
    }

    #[test]
    fn parse_throttle_humantime_units() {
        assert_eq!(parse_throttle("1s"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_throttle(" 500ms "), Ok(Duration::from_millis(500)));
    }

    #[test]
    fn parse_throttle_rejects_garbage() {
        assert!(parse_throttle("soon").is_err());
    }

    #[test]
    fn cli_parses_relay_subcommand_with_port() {
        let cli = Cli::parse_from(["livecap", "--port", "16000", "relay"]);
        assert_eq!(cli.port, Some(16000));
        assert!(matches!(cli.command, Some(Commands::Relay)));
    }

    #[test]
    fn cli_defaults_to_caption_mode() {
        let cli = Cli::parse_from(["livecap"]);
        assert!(cli.command.is_none());
        assert!(!cli.relay_captions);
    }
}
