use anyhow::Result;
use clap::Parser;
use livecap::audio::microphone::{list_devices, MicrophoneBackend};
use livecap::audio::source::{CaptureBackend, SystemCapture};
use livecap::audio::system::{filter_communication_targets, LoopbackCapture, SystemAudioBackend};
use livecap::cli::{Cli, Commands};
use livecap::config::{Config, SourceKind};
use livecap::recognize::engine::LineEngine;
use livecap::relay::service::RelayService;
use livecap::session::SessionController;
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = load_config(&cli)?;
            run_captions(config, &cli).await?;
        }
        Some(Commands::Devices) => {
            list_audio_devices()?;
        }
        Some(Commands::Targets) => {
            list_capture_targets()?;
        }
        Some(Commands::Relay) => {
            let config = load_config(&cli)?;
            run_relay(&config, cli.quiet).await?;
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Command-line flags
/// 2. Environment variable overrides
/// 3. Custom config path from CLI (--config)
/// 4. Default config path (~/.config/livecap/config.toml)
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    };
    let mut config = config.with_env_overrides();

    if let Some(source) = &cli.source {
        config.audio.source = match source.as_str() {
            "microphone" | "mic" => SourceKind::Microphone,
            "system_audio" | "system-audio" | "system" => SourceKind::SystemAudio,
            other => anyhow::bail!("unknown audio source: '{other}'"),
        };
    }
    if let Some(device) = &cli.device {
        config.audio.device = Some(device.clone());
    }
    if let Some(target) = &cli.target {
        config.audio.target = Some(target.clone());
    }
    if let Some(port) = cli.port {
        config.relay.port = port;
    }
    if let Some(throttle) = cli.throttle {
        config.caption.throttle_ms = throttle.as_millis() as u64;
    }
    if cli.relay_captions {
        config.caption.auto_relay = true;
    }

    Ok(config)
}

/// List available audio input devices.
fn list_audio_devices() -> Result<()> {
    let devices = list_devices()?;

    if devices.is_empty() {
        eprintln!("No audio input devices found");
        std::process::exit(1);
    }

    println!("Available audio input devices:");
    for (idx, device) in devices.iter().enumerate() {
        println!("  [{}] {}", idx, device);
    }

    Ok(())
}

/// List system-audio capture targets, communication apps first.
fn list_capture_targets() -> Result<()> {
    let capture = LoopbackCapture::new();
    let targets = capture.targets()?;

    if targets.is_empty() {
        eprintln!("No system-audio capture targets found");
        std::process::exit(1);
    }

    let preferred = filter_communication_targets(&targets);
    println!("System-audio capture targets:");
    for target in &targets {
        if preferred.contains(target) && preferred.len() != targets.len() {
            println!("  {} {}", target.name, "(communication app)".dimmed());
        } else {
            println!("  {}", target.name);
        }
    }

    Ok(())
}

/// Build the capture backend selected by the configuration.
fn build_backend(config: &Config) -> livecap::Result<Box<dyn CaptureBackend>> {
    match config.audio.source {
        SourceKind::Microphone => {
            let backend = MicrophoneBackend::new(config.audio.device.as_deref())?;
            Ok(Box::new(backend))
        }
        SourceKind::SystemAudio => {
            let backend =
                SystemAudioBackend::new(LoopbackCapture::new(), config.audio.target.clone());
            Ok(Box::new(backend))
        }
    }
}

/// Run the live-captioning session until Ctrl-C.
async fn run_captions(config: Config, cli: &Cli) -> Result<()> {
    // Caption text arrives on stdin, one line per utterance, from an
    // external recognizer process piped in.
    let engine = Arc::new(LineEngine::new(std::io::BufReader::new(std::io::stdin())));

    let mut session = SessionController::new(engine, config.throttle_interval());

    let relay = if config.caption.auto_relay {
        let mut relay = RelayService::new(config.relay.port);
        relay.start().await?;
        if !cli.quiet {
            eprintln!(
                "{} relaying captions on UDP port {}",
                "livecap:".green(),
                config.relay.port
            );
        }
        let relay = Arc::new(Mutex::new(relay));
        session = session.with_relay(Arc::clone(&relay));
        Some(relay)
    } else {
        None
    };

    session.start(build_backend(&config)?).await?;
    if !cli.quiet {
        eprintln!("{} captioning; press Ctrl-C to stop", "livecap:".green());
    }

    // Mirror the transcript to the terminal until shutdown
    let mut shown = String::new();
    let mut reported: Option<String> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                let text = session.transcript_text().await;
                if text != shown {
                    println!("{}", text);
                    shown = text;
                }
                // The error is retained; report each distinct one once
                let error = session.last_error().await;
                if error != reported {
                    if let Some(message) = &error {
                        eprintln!("{} {}", "recognition error:".red(), message);
                    }
                    reported = error;
                }
            }
        }
    }

    session.stop().await?;
    if let Some(relay) = &relay {
        relay.lock().await.stop().await;
    }

    if let Some(path) = &cli.save {
        session.save_transcript(path).await?;
        if !cli.quiet {
            eprintln!("{} transcript saved to {}", "livecap:".green(), path.display());
        }
    }

    Ok(())
}

/// Run a standalone relay exchange: broadcast stdin lines, print
/// received captions.
async fn run_relay(config: &Config, quiet: bool) -> Result<()> {
    let mut relay = RelayService::new(config.relay.port);
    relay.start().await?;
    if !quiet {
        eprintln!(
            "{} exchanging captions on UDP port {}; press Ctrl-C to stop",
            "livecap:".green(),
            config.relay.port
        );
    }

    // Stdin blocks, so it gets its own thread
    let (lines_tx, mut lines_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        use std::io::BufRead;
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if lines_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut printed = 0usize;
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines_rx.recv(), if stdin_open => {
                match line {
                    Some(line) => {
                        if let Err(e) = relay.send(&line).await {
                            eprintln!("{} {}", "relay error:".red(), e);
                        }
                    }
                    None => stdin_open = false,
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                let received = relay.received_text().await;
                if received.len() > printed {
                    print!("{}", &received[printed..]);
                    printed = received.len();
                }
                if let Some(error) = relay.last_error().await {
                    eprintln!("{} {}", "relay error:".red(), error);
                    break;
                }
            }
        }
    }

    relay.stop().await;
    Ok(())
}
