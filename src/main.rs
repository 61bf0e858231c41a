//! Command-line front end for a serial LED device.
//!
//! Runs one named command (`on`, `off`, `status`), an arbitrary line
//! (`send`), or an interactive session (`chat`) against the configured port.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serial_commander::{
    logging, AppConfig, DeviceCommand, DeviceController, Dispatcher, KeywordClassifier,
    PlainPhraser, Response, SerialLink, TransactionResult,
};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "serial-commander.json";

/// Stable exit codes
mod exit_codes {
    /// Device replied with a content line, or the command needed no device
    pub const OK: i32 = 0;
    /// Connection, transaction or configuration failure
    pub const ERROR: i32 = 1;
    /// Command was sent but the device gave no classifiable reply
    pub const NO_RESPONSE: i32 = 2;
}

#[derive(Parser)]
#[command(
    name = "serial-commander",
    version,
    about = "Send line commands to a serial device and print its reply"
)]
struct Cli {
    /// Configuration file (JSON); defaults apply if it does not exist
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serial port, overriding the configuration file
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Baud rate, overriding the configuration file
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Log protocol traffic to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(flatten)]
    Device(DeviceAction),
    /// Write a configuration file populated with defaults and any overrides
    InitConfig {
        /// Destination (defaults to --config)
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Commands that need an open link
#[derive(Subcommand)]
enum DeviceAction {
    /// Turn the LED on
    On,
    /// Turn the LED off
    Off,
    /// Query device status
    Status,
    /// Send an arbitrary line
    Send {
        /// Command words, joined with single spaces
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Interactive session: describe what you want in plain words
    Chat,
}

fn main() {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "debug" } else { "warn" });

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(exit_codes::ERROR);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Command::InitConfig { path, force } => {
            let path = path.clone().unwrap_or_else(|| cli.config.clone());
            init_config(&path, *force, &cli)
        }
        Command::Device(action) => {
            let config = resolve_config(&cli)?;
            run_device(action, &config)
        }
    }
}

fn run_device(action: &DeviceAction, config: &AppConfig) -> Result<i32> {
    let link = SerialLink::open(&config.link)
        .with_context(|| format!("connect to {}", config.link.port))?;
    let mut controller = DeviceController::new(link, config.transaction.clone());

    let code = match action {
        DeviceAction::On => report(controller.led_on())?,
        DeviceAction::Off => report(controller.led_off())?,
        DeviceAction::Status => report(controller.status())?,
        DeviceAction::Send { text } => {
            let text = text.join(" ");
            // Known vocabulary goes out in its canonical spelling
            match DeviceCommand::parse(&text) {
                Some(command) => report(controller.execute(command))?,
                None => report(controller.send_raw(&text).map(|t| t.response))?,
            }
        }
        DeviceAction::Chat => {
            println!("Connected to {}. Type 'quit' to leave.", config.link.port);
            let mut dispatcher = Dispatcher::new(&mut controller, KeywordClassifier, PlainPhraser);
            dispatcher
                .run(io::stdin().lock(), io::stdout().lock())
                .context("interactive session")?;
            exit_codes::OK
        }
    };

    controller.close();
    Ok(code)
}

/// Load the config file (or defaults) and apply command-line overrides
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("load {}", cli.config.display()))?;

    if let Some(port) = &cli.port {
        config.link.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.link.baud_rate = baud;
    }

    config.validate().context("validate configuration")?;
    info!(port = %config.link.port, baud = config.link.baud_rate, "configuration resolved");
    Ok(config)
}

fn init_config(path: &Path, force: bool, cli: &Cli) -> Result<i32> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let mut config = AppConfig::default();
    if let Some(port) = &cli.port {
        config.link.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.link.baud_rate = baud;
    }

    config
        .save_to_file(path)
        .with_context(|| format!("write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(exit_codes::OK)
}

/// Print the outcome of a transaction and pick the exit code
fn report(result: TransactionResult<Option<Response>>) -> Result<i32> {
    match result? {
        Some(response) => {
            println!("{}", response);
            Ok(exit_codes::OK)
        }
        None => {
            eprintln!("no response");
            Ok(exit_codes::NO_RESPONSE)
        }
    }
}
