mod chooser;
mod config;
mod logging;
mod monitor;
mod notify;
mod sound;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;

use tether_platform::{ChargeStatus, PowerObserver, SystemPowerObserver};

use chooser::{PresetChooser, PromptChooser, SoundChooser};
use config::{config_path, ensure_dirs, LogLevel, UserConfig};
use logging::LogMode;
use monitor::{AlarmSignal, ChargeTracker, StateCoordinator};
use notify::{DesktopNotifier, NotificationGateway, SilentGateway};
use sound::{RodioPlayer, SoundStore};

#[derive(Debug, Subcommand)]
enum SoundCommands {
    /// Pick a new alert sound
    Set {
        /// Path to the sound file; prompts when omitted
        path: Option<PathBuf>,
    },

    /// Remove the custom sound and fall back to the built-in tone
    Reset,

    /// Show the stored sound
    Show,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Watch the power source and ring while unplugged (default)
    #[command(alias = "w")]
    Watch {
        /// Poll interval in milliseconds
        #[arg(short, long)]
        poll_ms: Option<u64>,

        /// Deliver every reading, including repeats
        #[arg(long)]
        raw: bool,

        /// Disable desktop notifications
        #[arg(long)]
        no_notify: bool,
    },

    /// Manage the custom alert sound
    Sound {
        #[command(subcommand)]
        command: SoundCommands,
    },

    /// Show or edit configuration
    Config {
        /// Print config file path
        #[arg(long)]
        path: bool,

        /// Reset config to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(short, long)]
        edit: bool,
    },

    /// Print debug information about the power source
    Debug {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Audible alarm for machines left running unplugged
/// https://github.com/tether-sh/tether
#[derive(Debug, Parser)]
#[command(name = "tether", version, verbatim_doc_comment)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Poll interval in milliseconds (for default watch mode)
    #[arg(short, long, global = true)]
    poll_ms: Option<u64>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = ensure_dirs();

    let cli = Cli::parse();
    let config = UserConfig::load();
    let log_level_override = cli.log_level.as_deref().map(LogLevel::from_str);

    match cli.command {
        Some(Commands::Sound { command }) => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            run_sound_command(command, config)
        }
        Some(Commands::Config { path, reset, edit }) => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            run_config(path, reset, edit)
        }
        Some(Commands::Debug { json }) => {
            let _guard = logging::init(config.log_level, LogMode::Stderr, log_level_override);
            run_debug(json, config)
        }
        Some(Commands::Watch {
            poll_ms,
            raw,
            no_notify,
        }) => {
            let _guard = logging::init(config.log_level, LogMode::Both, log_level_override);
            let mut config = config;
            config.merge_with_args(poll_ms, raw, no_notify);
            run_watch(config)
        }
        None => {
            let _guard = logging::init(config.log_level, LogMode::Both, log_level_override);
            let mut config = config;
            config.merge_with_args(cli.poll_ms, false, false);
            run_watch(config)
        }
    }
}

fn build_coordinator(
    config: &UserConfig,
    chooser: Box<dyn SoundChooser>,
) -> Result<StateCoordinator> {
    let observer = SystemPowerObserver::new(config.poll_interval())?;
    let tracker = ChargeTracker::new(Box::new(observer), config.repeat_policy);
    let alarm = AlarmSignal::new(Arc::new(RodioPlayer::new()));
    let store = SoundStore::new();
    let gateway: Box<dyn NotificationGateway> = if config.notify {
        Box::new(DesktopNotifier::new())
    } else {
        Box::new(SilentGateway)
    };

    Ok(StateCoordinator::new(tracker, alarm, store, gateway, chooser))
}

fn run_watch(config: UserConfig) -> Result<()> {
    let coordinator = build_coordinator(&config, Box::new(PromptChooser))?;
    monitor::run_monitor(coordinator)
}

fn run_sound_command(command: SoundCommands, config: UserConfig) -> Result<()> {
    match command {
        SoundCommands::Set { path } => {
            let chooser: Box<dyn SoundChooser> = match path {
                Some(path) => Box::new(PresetChooser::new(path)),
                None => Box::new(PromptChooser),
            };
            let mut coordinator = build_coordinator(&config, chooser)?;
            coordinator.select_sound();

            match SoundStore::new().stored_path() {
                Some(stored) => println!("Stored sound: {}", stored.display()),
                None => println!("No sound stored."),
            }
        }
        SoundCommands::Reset => {
            SoundStore::new().reset();
            println!("Custom sound removed; the built-in tone will be used.");
        }
        SoundCommands::Show => match SoundStore::new().stored_path() {
            Some(stored) => println!("{}", stored.display()),
            None => println!("No custom sound stored."),
        },
    }

    Ok(())
}

fn run_config(path: bool, reset: bool, edit: bool) -> Result<()> {
    let config_file = config_path();

    if path {
        println!("{}", config_file.display());
        return Ok(());
    }

    if reset {
        let config = UserConfig::default();
        config.save()?;
        println!("Config reset to defaults at: {}", config_file.display());
        return Ok(());
    }

    if edit {
        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());

        if !config_file.exists() {
            let config = UserConfig::default();
            config.save()?;
        }

        std::process::Command::new(editor)
            .arg(&config_file)
            .status()?;

        return Ok(());
    }

    let config = UserConfig::load();
    println!("Config file: {}", config_file.display());
    println!();
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}

fn run_debug(json: bool, config: UserConfig) -> Result<()> {
    let observer = SystemPowerObserver::new(config.poll_interval())?;
    let state = observer.snapshot();
    let plugged = observer.is_plugged_in();
    let stored_sound = SoundStore::new().stored_path();
    let alarm_would_ring = !plugged && state.status == ChargeStatus::NotCharging;

    if json {
        let doc = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "status": state.status,
            "status_label": state.status.label(),
            "plugged_in": plugged,
            "alarm_would_ring": alarm_would_ring,
            "stored_sound": stored_sound,
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("tether debug information");
    println!("{}", "=".repeat(60));

    println!("\n--- Power ---");
    println!("Status: {}", state.status.label());
    println!("Plugged in: {}", if plugged { "yes" } else { "no" });
    println!(
        "Alarm would ring: {}",
        if alarm_would_ring { "yes" } else { "no" }
    );

    println!("\n--- Sound ---");
    match stored_sound {
        Some(path) => println!("Custom sound: {}", path.display()),
        None => println!("Custom sound: none (built-in tone)"),
    }

    println!("\n--- Paths ---");
    println!("Config: {}", config_path().display());
    println!("Sound dir: {}", config::sound_dir().display());
    println!("Logs: {}", config::runtime_dir().display());

    println!("\n--- Current Config ---");
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}
