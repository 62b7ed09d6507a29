//! avoffset - Automatic audio offset manager CLI

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use avoffset::config::{AppConfig, Args, Command, ConfigAction, LearnedAction};
use avoffset::offset::AudioOffset;
use avoffset::playback::{
    EventScript, EventService, HostCommand, PlaybackMachine, PlayerHost,
};
use avoffset::stream::{classify, AudioStreamInfo, Signature, StreamInfo, VideoStreamInfo};

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration before logging so its log settings apply
    let (config, config_error) = AppConfig::load_or_default(args.config.as_deref());

    init_logging(&args, &config)?;
    if let Some(e) = config_error {
        warn!("{}, using defaults", e);
    }

    match args.command.unwrap_or_default() {
        Command::Replay { script } => cmd_replay(&config, &script),
        Command::Resolve {
            hdr,
            audio,
            channels,
            atmos,
            fps,
        } => cmd_resolve(&config, hdr, audio, channels, atmos, fps),
        Command::Learned { action } => cmd_learned(&config, action),
        Command::Config { action } => cmd_config(&config, args.config.as_deref(), action),
    }
}

fn init_logging(args: &Args, config: &AppConfig) -> Result<()> {
    let level = args
        .log_level()
        .or_else(|| config.log_level.parse().ok())
        .unwrap_or(tracing::Level::INFO);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let log_file = args
        .log
        .clone()
        .or_else(|| (!config.log_file.is_empty()).then(|| config.log_file.clone()));

    if let Some(log_file) = log_file {
        let file = std::fs::File::create(&log_file)
            .with_context(|| format!("cannot create log file {}", log_file))?;
        subscriber.with_writer(file).init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Host that prints every command instead of driving a player
#[derive(Debug, Default)]
struct ConsoleHost {
    issued: usize,
}

impl ConsoleHost {
    fn print(&mut self, command: HostCommand) {
        self.issued += 1;
        println!("  -> {}", command);
    }
}

impl PlayerHost for ConsoleHost {
    fn set_audio_offset(&mut self, offset: AudioOffset) -> avoffset::Result<()> {
        self.print(HostCommand::SetAudioOffset(offset));
        Ok(())
    }

    fn seek_relative(&mut self, rewind: Duration) -> avoffset::Result<()> {
        self.print(HostCommand::SeekRelative(rewind));
        Ok(())
    }

    fn notify(&mut self, message: &str, _display_for: Duration) -> avoffset::Result<()> {
        self.print(HostCommand::Notify(message.replace('\n', " | ")));
        Ok(())
    }
}

/// Replay a recorded event script through the event service
fn cmd_replay(config: &AppConfig, script: &Path) -> Result<()> {
    let script = EventScript::load(script)?;
    println!(
        "Replaying {} tick(s), {} event(s)\n",
        script.tick.len(),
        script.event_count()
    );

    let (store, machine_config) = config.build();
    let machine = PlaybackMachine::new(machine_config, store, ConsoleHost::default());

    let mut service = EventService::new();
    service.start(machine)?;

    let sender = service.sender()?;
    for (i, tick) in script.tick.into_iter().enumerate() {
        let names: Vec<&str> = tick.events.iter().map(|e| e.name()).collect();
        println!("tick {}: {}", i + 1, names.join(", "));
        sender.send_tick(tick.events)?;
    }

    let machine = service.stop()?;
    println!(
        "\nFinished in state {:?}, {} host command(s) issued",
        machine.state(),
        machine.host().issued
    );

    let learned: Vec<_> = machine.store().learned_entries().collect();
    if !learned.is_empty() {
        println!("\nLearned offsets:");
        for (sig, offset) in learned {
            println!("  {:<32} {}", sig.key(), offset);
        }
    }

    Ok(())
}

/// Classify stream metadata and show the resolved offset
fn cmd_resolve(
    config: &AppConfig,
    hdr: String,
    audio: String,
    channels: Option<u32>,
    atmos: bool,
    fps: Option<f64>,
) -> Result<()> {
    let stream = StreamInfo {
        video: Some(VideoStreamInfo {
            hdr_type: hdr,
            fps,
            gamut: None,
        }),
        audio: Some(AudioStreamInfo {
            codec: audio,
            channels,
            atmos,
        }),
    };

    let (store, machine_config) = config.build_read_only();
    let sig = classify(&stream, &machine_config.classifier)?;
    let resolved = store.resolve(&sig);

    println!("Signature:  {}", sig.key());
    println!("Label:      {}", sig.label());
    println!("Offset:     {}", resolved.offset);
    println!("Source:     {:?}", resolved.provenance);
    if !store.hdr_enabled(sig.hdr) {
        println!("\nOffsets are disabled for HDR type '{}'.", sig.hdr);
    }

    Ok(())
}

/// List or clear learned offsets
fn cmd_learned(config: &AppConfig, action: LearnedAction) -> Result<()> {
    let file = config.learned_file();
    let mut learned = file.load();

    match action {
        LearnedAction::List => {
            if learned.is_empty() {
                println!("No learned offsets in {}", file.path().display());
                return Ok(());
            }

            println!("Learned offsets ({}):\n", file.path().display());
            for (sig, offset) in &learned {
                println!("  {:<32} {:>8}   {}", sig.key(), offset.to_string(), sig.label());
            }
            println!();
        }
        LearnedAction::Clear {
            signature: Some(key),
        } => {
            let sig: Signature = key.parse()?;
            if learned.remove(&sig).is_some() {
                file.save(&learned)?;
                info!("Cleared learned offset for {}", sig);
                println!("Cleared learned offset for {}", sig.key());
            } else {
                println!("No learned offset for {}", sig.key());
            }
        }
        LearnedAction::Clear { signature: None } => {
            file.remove()?;
            println!("Cleared {} learned offset(s)", learned.len());
        }
    }

    Ok(())
}

/// Print a sample configuration or validate the active one
fn cmd_config(config: &AppConfig, explicit: Option<&Path>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Sample => {
            print!("{}", AppConfig::sample_config());
        }
        ConfigAction::Check => {
            let source = explicit
                .map(Path::to_path_buf)
                .or_else(AppConfig::default_path);
            match source {
                Some(path) => println!("Configuration: {}", path.display()),
                None => println!("Configuration: built-in defaults"),
            }

            let runtime = config.runtime();
            println!("Learned file:  {}", config.learned_file().path().display());
            println!(
                "Monitoring:    {}",
                if config.monitoring.enabled { "on" } else { "off" }
            );
            println!("Composition:   {:?}", runtime.tables.composition);
            println!(
                "Entries:       {} hdr, {} audio, {} fps, {} exact",
                runtime.tables.hdr.len(),
                runtime.tables.audio.len(),
                runtime.tables.fps.len(),
                runtime.tables.signatures.len()
            );

            if runtime.issues.is_empty() {
                println!("\nNo problems found.");
            } else {
                println!("\n{} problem(s):", runtime.issues.len());
                for issue in &runtime.issues {
                    println!("  - {}", issue);
                }
            }
        }
    }

    Ok(())
}
