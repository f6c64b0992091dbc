// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

// SSH Tunnel Status - CLI Client
// Feeds supervisor status lines through the status engine and prints the result

mod notifications;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunnel_status_common::{EngineConfig, IconKind};
use tunnel_status_core::{
    decode, lookup, side_effect_class, EffectRunner, JsonFileStore, LocalChannel,
    LoggingController, NotificationSink, NullNotifier, SettingsStore, SubscriptionManager,
    SystemState, UserSettings,
};

use notifications::DesktopNotifier;

/// How long to wait for the engine to publish after a line is fed in
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "tunnel-status")]
#[command(about = "SSH tunnel connection status engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a single raw status signal
    Decode {
        /// Raw signal, e.g. "BAD_CONFIG: Illegal port value"
        signal: String,

        /// Output as JSON for scripting
        #[arg(short, long)]
        json: bool,
    },

    /// Read status signals from stdin and print each resulting state
    Watch {
        /// Remote SSH host
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// SSH username
        #[arg(short, long)]
        user: Option<String>,

        /// Local port to forward
        #[arg(short, long)]
        port: Option<String>,

        /// Path to SSH private key
        #[arg(short, long)]
        key_path: Option<String>,

        /// Disable desktop notifications
        #[arg(long)]
        no_notify: bool,

        /// Output each state as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the saved connection settings
    Settings {
        /// Output as JSON for scripting
        #[arg(short, long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tunnel_status=info,tunnel_status_core=info,tunnel_status_common=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode { signal, json } => decode_signal(&signal, json)?,
        Commands::Watch {
            host,
            user,
            port,
            key_path,
            no_notify,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let overrides = SettingsArgs {
                host,
                user,
                port,
                key_path,
            };
            watch(config, overrides, !no_notify, json).await?;
        }
        Commands::Settings { json } => {
            let config = load_config(cli.config.as_deref())?;
            show_settings(&config, json).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EngineConfig::load().context("Failed to load configuration")?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn decode_signal(raw: &str, json: bool) -> Result<()> {
    let decoded = decode(raw);
    let display = lookup(decoded.code);

    if json {
        let output = serde_json::json!({
            "code": decoded.code,
            "detail": decoded.detail,
            "label": display.label,
            "icon": display.icon,
            "class": side_effect_class(decoded.code),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Decoded signal".bold());
    println!("  Code:   {}", decoded.code.to_string().cyan());
    println!("  Label:  {}", paint(display.icon, display.label));
    println!("  Icon:   {}", display.icon.class_name());
    println!("  Class:  {:?}", side_effect_class(decoded.code));
    match &decoded.detail {
        Some(detail) => println!("  Detail: {}", detail),
        None => println!("  Detail: {}", "-".dimmed()),
    }

    Ok(())
}

/// Settings given on the command line
struct SettingsArgs {
    host: Option<String>,
    user: Option<String>,
    port: Option<String>,
    key_path: Option<String>,
}

impl SettingsArgs {
    fn is_empty(&self) -> bool {
        self.host.is_none() && self.user.is_none() && self.port.is_none() && self.key_path.is_none()
    }

    /// Overlay the given values on the saved settings
    fn merge(self, saved: Option<UserSettings>) -> UserSettings {
        let base = saved.unwrap_or_default();
        UserSettings {
            host: self.host.unwrap_or(base.host),
            user: self.user.unwrap_or(base.user),
            port: self.port.unwrap_or(base.port),
            key_path: self.key_path.unwrap_or(base.key_path),
        }
    }
}

async fn watch(config: EngineConfig, args: SettingsArgs, notify: bool, json: bool) -> Result<()> {
    let store = Arc::new(JsonFileStore::new(config.settings_path()?));
    let notifier: Arc<dyn NotificationSink> = if notify && config.notifications {
        Arc::new(DesktopNotifier)
    } else {
        Arc::new(NullNotifier)
    };

    let saved = store.load().await.context("Failed to read saved settings")?;
    let settings = if args.is_empty() {
        saved
    } else {
        Some(args.merge(saved))
    };

    let channel = Arc::new(LocalChannel::new());
    let runner = EffectRunner::new(store, notifier);
    let manager = SubscriptionManager::new(channel.clone(), Arc::new(LoggingController), runner)
        .with_event(config.channel.clone())
        .with_notifications_granted(notify && config.notifications);

    manager.start().await?;

    match settings {
        Some(settings) => manager
            .connect(settings)
            .await
            .context("Failed to start tunnel")?,
        None => eprintln!(
            "{}",
            "No saved settings; statuses will be tracked but not persisted.".yellow()
        ),
    }

    let mut rx = manager.subscribe();
    print_state(&rx.borrow_and_update(), json)?;

    eprintln!(
        "{}",
        "Reading status signals from stdin. Press Ctrl+D to finish.".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let before = manager.snapshot();
        channel.emit(manager.event(), line);

        // Every processed signal publishes a new snapshot
        let changed = tokio::time::timeout(
            SETTLE_TIMEOUT,
            rx.wait_for(|state| !Arc::ptr_eq(state, &before)),
        )
        .await;
        let next = match changed {
            Ok(Ok(state)) => state.clone(),
            Ok(Err(_)) => break,
            Err(_) => {
                tracing::warn!("Timed out waiting for the status engine");
                continue;
            }
        };
        print_state(&next, json)?;
    }

    manager.stop().await;

    let last = manager.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(&last.history)?);
    } else {
        print_history(&last);
    }

    Ok(())
}

async fn show_settings(config: &EngineConfig, json: bool) -> Result<()> {
    let path = config.settings_path()?;
    let store = JsonFileStore::new(&path);
    let settings = store.load().await.context("Failed to read saved settings")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let Some(settings) = settings else {
        println!("{}", "No saved settings.".yellow());
        println!("  Expected at: {}", path.display().to_string().dimmed());
        return Ok(());
    };

    println!("{}", "Saved settings:".bold());
    println!("  Host:  {}", settings.host.cyan());
    println!("  User:  {}", settings.user);
    println!("  Port:  {}", settings.port);
    println!("  Key:   {}", settings.key_path);
    println!("  File:  {}", path.display().to_string().dimmed());

    if let Err(e) = settings.local_port() {
        println!("{}", format!("⚠️  {}", e).yellow());
    }

    Ok(())
}

fn print_state(state: &SystemState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(state)?);
        return Ok(());
    }

    let line = format!(
        "[{}] {}",
        state.status.token(),
        paint(state.display_info.icon, state.display_info.label)
    );
    match &state.system_error {
        Some(error) => println!("{}  {}", line, error.red()),
        None => println!("{}", line),
    }
    Ok(())
}

fn print_history(state: &SystemState) {
    println!();
    println!("{}", "Status history:".bold());
    for entry in state.history.entries() {
        println!(
            "  {}  {}",
            entry.iso_timestamp().dimmed(),
            paint(lookup(entry.status).icon, &entry.status.to_string())
        );
    }

    if state.is_connected() {
        println!("{}", "✓ Tunnel is up".green().bold());
    }
}

fn paint(icon: IconKind, text: &str) -> ColoredString {
    match icon {
        IconKind::Ok => text.green(),
        IconKind::Pending | IconKind::Warn => text.yellow(),
        IconKind::Err => text.red(),
        IconKind::Alert => text.magenta(),
        IconKind::Question => text.cyan(),
        IconKind::Circle => text.normal(),
    }
}
