//! portpanel - Router Port Status Panel
//!
//! Entry point for the portpanel command line tool.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use portpanel::{EditRequest, NoRefresh, PanelConfig, PanelHost, PortPanel, StatusChange, UbusHost};
use portpanel_common::{Level, Notifier};

/// Router port status panel
#[derive(Parser, Debug)]
#[command(name = "portpanel")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to $PORTPANEL_CONFIG or /etc/portpanel.toml)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List ports with status, speed and zones
    Show {
        /// Also print traffic counters and network membership
        #[arg(short, long)]
        verbose: bool,
    },

    /// Change the label, description or state of a port
    Edit {
        device: String,

        #[arg(long)]
        label: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Enable the port (LAN ports only)
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Disable the port (LAN ports only)
        #[arg(long)]
        disable: bool,
    },

    /// Reset a port to its factory label and clear its description
    RestoreOriginal { device: String },

    /// Move a port to a new position (0-based)
    Move { device: String, index: usize },

    /// Copy the port configuration to the .bak file
    Backup,

    /// Replace the port configuration with the .bak file
    RestoreBackup,

    /// Install a port configuration file
    Upload { file: PathBuf },

    /// Print or save the raw port configuration
    Download { file: Option<PathBuf> },
}

/// Prints notifications to stderr.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: Level, message: &str) {
        eprintln!("[{}] {}", level.as_str(), message);
    }
}

/// Initializes tracing/logging subsystem
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log level")?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => PanelConfig::load_or_default(path),
        None => PanelConfig::load(),
    }
    .context("loading configuration")?;

    let ubus = Arc::new(UbusHost::new(&config));
    let host = PanelHost {
        fs: ubus.clone(),
        rpc: ubus.clone(),
        network: ubus,
        notifier: Arc::new(ConsoleNotifier),
        refresh: Arc::new(NoRefresh),
    };
    let mut panel = PortPanel::new(host, config);

    match args.command {
        Command::Backup => panel.backup().await?,
        Command::Download { file } => {
            let content = panel.download().await?;
            match file {
                Some(path) => tokio::fs::write(&path, content)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?,
                None => print!("{}", content),
            }
        }
        command => {
            if !panel.load().await? {
                info!("Nothing to show on a swconfig board");
                return Ok(());
            }
            run_loaded(&mut panel, command).await?;
        }
    }
    Ok(())
}

async fn run_loaded(panel: &mut PortPanel, command: Command) -> Result<()> {
    match command {
        Command::Show { verbose } => {
            for row in panel.rows() {
                println!("{}", row.summary());
                if verbose {
                    println!("    {}  {}", row.tx_summary, row.rx_summary);
                    for line in row.tooltip.lines() {
                        println!("    {}", line);
                    }
                    for (name, value) in &row.stats {
                        println!("    {:<20} {}", name, value);
                    }
                }
            }
        }
        Command::Edit {
            device,
            label,
            description,
            enable,
            disable,
        } => {
            let current = panel
                .ports()
                .iter()
                .find(|p| p.device == device)
                .cloned()
                .with_context(|| format!("unknown port {}", device))?;
            let request = EditRequest {
                label: label.unwrap_or(current.label),
                description: description.unwrap_or(current.description),
                enabled: match (enable, disable) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            let outcome = panel.edit(&device, request).await?;
            println!("{}: {}", device, outcome.label);
            if outcome.status_change == Some(StatusChange::Failed) {
                bail!("port state of {} was not changed", device);
            }
        }
        Command::RestoreOriginal { device } => {
            let outcome = panel.restore_original(&device).await?;
            println!("{}: {}", device, outcome.label);
        }
        Command::Move { device, index } => panel.move_port(&device, index).await?,
        Command::RestoreBackup => {
            let outcome = panel.restore_backup().await?;
            println!("{:?}", outcome);
        }
        Command::Upload { file } => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let outcome = panel.upload(&content).await?;
            println!("{:?}", outcome);
        }
        Command::Backup | Command::Download { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("portpanel: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("portpanel: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
