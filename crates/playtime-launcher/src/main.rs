//! playtime - launch games within a daily time budget
//!
//! This is the main entry point. It wires together:
//! - Configuration loading
//! - The usage store
//! - The Linux process host and supervisor
//! - The launch coordinator
//! - A terminal shell on stdin/stdout

mod shell;

use anyhow::{Context, Result};
use clap::Parser;
use playtime_config::load_config;
use playtime_core::{
    CoreEvent, DEFAULT_POLL_INTERVAL, LaunchCoordinator, LaunchOutcome, ProcessSupervisor,
    SupervisorConfig,
};
use playtime_host::LinuxHost;
use playtime_store::DurationStore;
use playtime_util::{default_config_path, format_duration};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::shell::{HELP, ShellCommand};

/// playtime - Launch games within a daily time budget
#[derive(Parser, Debug)]
#[command(name = "playtime")]
#[command(about = "Launch games within a daily time budget", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/playtime/config.toml)
    #[arg(short, long, env = "PLAYTIME_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set PLAYTIME_DATA_DIR env var)
    #[arg(short, long, env = "PLAYTIME_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print events and status as JSON lines, and log as JSON
    #[arg(long)]
    json: bool,
}

/// Main launcher state
struct Launcher {
    coordinator: LaunchCoordinator,
    events: mpsc::UnboundedReceiver<CoreEvent>,
    json: bool,
}

impl Launcher {
    fn new(args: &Args) -> Result<Self> {
        let mut policy = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            game_count = policy.games.len(),
            daily_limit = %format_duration(policy.launcher.daily_limit),
            "Configuration loaded"
        );

        if let Some(data_dir) = &args.data_dir {
            policy.launcher.data_dir = data_dir.clone();
        }

        std::fs::create_dir_all(&policy.launcher.data_dir).with_context(|| {
            format!(
                "Failed to create data directory {:?}",
                policy.launcher.data_dir
            )
        })?;

        let usage_path = policy.launcher.usage_path();
        let store = Arc::new(
            DurationStore::load(&usage_path)
                .with_context(|| format!("Failed to load usage log {:?}", usage_path))?,
        );

        info!(
            usage_path = %usage_path.display(),
            accumulated = %format_duration(store.snapshot().accumulated),
            "Store initialized"
        );

        let host = Arc::new(LinuxHost::new());
        let supervisor = Arc::new(ProcessSupervisor::with_config(
            host,
            SupervisorConfig {
                poll_interval: DEFAULT_POLL_INTERVAL,
                kill_grace: policy.launcher.kill_grace,
            },
        ));

        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = LaunchCoordinator::new(
            policy.games,
            policy.launcher.daily_limit,
            store,
            supervisor,
            tx,
        );

        Ok(Self {
            coordinator,
            events: rx,
            json: args.json,
        })
    }

    async fn run(mut self) -> Result<()> {
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        let mut lines = spawn_stdin_reader().context("Failed to start input reader")?;

        if !self.json {
            println!("{}", shell::render_games(self.coordinator.games()));
            println!("{}", HELP);
        }

        info!("Launcher running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down");
                    break;
                }

                Some(event) = self.events.recv() => {
                    self.print_event(&event);
                }

                line = lines.recv() => {
                    let line = match line {
                        Some(Ok(line)) => line,
                        None => {
                            info!("Input closed, shutting down");
                            break;
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Failed to read input, shutting down");
                            break;
                        }
                    };

                    if !self.handle_line(&line) {
                        break;
                    }
                }
            }
        }

        if let Err(e) = self.coordinator.notify_shutdown_requested() {
            warn!(error = %e, "Failed to flush usage on shutdown");
        }

        // Report anything the coordinator emitted before we stopped listening
        while let Ok(event) = self.events.try_recv() {
            self.print_event(&event);
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Returns `false` when the shell should exit
    fn handle_line(&self, line: &str) -> bool {
        let command = match ShellCommand::parse(line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                println!("{}", HELP);
                return true;
            }
        };

        match command {
            ShellCommand::List => println!("{}", shell::render_games(self.coordinator.games())),
            ShellCommand::Status => {
                let status = self.coordinator.status();
                if self.json {
                    match serde_json::to_string(&status) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!(error = %e, "Failed to serialize status"),
                    }
                } else {
                    println!("{}", shell::render_status(&status));
                }
            }
            ShellCommand::Launch(index) => match self.coordinator.notify_launch_requested(index) {
                LaunchOutcome::UnknownGame => println!("no game number {}", index + 1),
                outcome => debug!(?outcome, "Launch handled"),
            },
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Quit => return false,
            ShellCommand::Empty => {}
        }

        true
    }

    fn print_event(&self, event: &CoreEvent) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "Failed to serialize event"),
            }
        } else if let Some(line) = shell::render_event(event) {
            println!("{}", line);
        }
    }
}

/// Read stdin lines on a plain thread.
///
/// A blocking read cannot be cancelled, and the runtime waits for its own
/// blocking pool on drop, so the reader lives outside it. The channel closes
/// at EOF or after a read error.
fn spawn_stdin_reader() -> std::io::Result<mpsc::UnboundedReceiver<std::io::Result<String>>> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        })?;

    Ok(rx)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if args.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "playtime starting");

    let launcher = Launcher::new(&args)?;
    launcher.run().await
}
