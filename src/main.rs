//! Command-line front end.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::fs::{self, File};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use fastboot_unlock::signer::load_private_key;
use fastboot_unlock::{
    DeviceConfig, FastbootTransport, PayloadSigner, RsaSha256Signer, UnlockSession, UsbFastboot, list_fastboot_devices,
    lock_bootloader,
};

/// Unlock or relock a bootloader that requires a signed identifier token.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Only use the device with this serial number.
    #[arg(short, long, global = true)]
    serial: Option<String>,
    /// Only match this USB vendor ID (hex).
    #[arg(long, global = true, value_parser = parse_hex_u16)]
    vid: Option<u16>,
    /// Only match this USB product ID (hex).
    #[arg(long, global = true, value_parser = parse_hex_u16)]
    pid: Option<u16>,
    /// Reset the device before claiming its interface.
    #[arg(long, global = true)]
    reset: bool,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long, global = true)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List connected fastboot devices.
    Devices,
    /// Sign the device identifier token and unlock the bootloader.
    Unlock {
        /// RSA private key (PKCS#8 or PKCS#1 PEM).
        #[arg(short, long)]
        key: PathBuf,
    },
    /// Relock the bootloader.
    Lock,
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex ID '{s}': {e}"))
}

fn setup_logging(log_file_path: Option<PathBuf>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file =
            File::create(path).with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file.clone(), &cli.verbose)?;

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = DeviceConfig::default().with_ids(cli.vid, cli.pid);
    if let Some(serial) = cli.serial {
        config = config.with_serial(serial);
    }
    if cli.reset {
        config = config.with_reset();
    }

    match cli.command {
        Command::Devices => {
            let devices = list_fastboot_devices(&config).context("Failed to list USB devices")?;
            println!("Found {} fastboot device(s):", devices.len());
            for d in devices {
                println!(
                    "{:04x}:{:04x}  bus {:03} addr {:03}  {}  ({})",
                    d.vendor_id,
                    d.product_id,
                    d.bus_number,
                    d.device_address,
                    d.serial.as_deref().unwrap_or("<no serial>"),
                    d.manufacturer.as_deref().unwrap_or("UNKNOWN")
                );
            }
        }
        Command::Unlock { key } => {
            let pem = fs::read_to_string(&key).with_context(|| format!("Failed to read key file {:?}", key))?;
            let private_key = load_private_key(&pem)?;

            let mut transport = UsbFastboot::new(config);
            transport.connect().await.context("Failed to connect")?;
            println!("Connected! Confirm the unlock on the device when prompted.");

            let signer = PayloadSigner::new(RsaSha256Signer);
            let mut session = UnlockSession::new(&mut transport);
            let abort = async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Ctrl+C received, aborting unlock.");
                } else {
                    std::future::pending::<()>().await;
                }
            };
            if let Err(e) = session.unlock_or_abort(&signer, &private_key, abort).await {
                if let Some(identifier) = session.identifier() {
                    info!(%identifier, "Identifier used for this attempt");
                }
                bail!("Unlock failed: {}", e);
            }
            println!("Unlocked!");
        }
        Command::Lock => {
            let mut transport = UsbFastboot::new(config);
            transport.connect().await.context("Failed to connect")?;
            let reply = lock_bootloader(&mut transport).await.context("Lock failed")?;
            if !reply.is_empty() {
                println!("{reply}");
            }
            println!("Locked!");
        }
    }

    Ok(())
}
