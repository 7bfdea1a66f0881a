//! Sealpost command-line client.
//!
//! # Usage
//!
//! ```bash
//! # Create keys for alice and publish her bundle to the shared relay
//! sealpost --user alice --relay /srv/sealpost init
//!
//! # Send a file to bob, then list and fetch as bob
//! sealpost --user alice --relay /srv/sealpost send --to bob report.pdf
//! sealpost --user bob --relay /srv/sealpost inbox
//! sealpost --user bob --relay /srv/sealpost receive <file-id> --out ~/Downloads
//! ```

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use sealpost_cli::{CliError, Config, commands};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Sealpost end-to-end encrypted file drop
#[derive(Parser, Debug)]
#[command(name = "sealpost")]
#[command(about = "End-to-end encrypted and signed file drop")]
#[command(version)]
struct Args {
    /// Local state directory
    #[arg(long, env = "SEALPOST_HOME", default_value = ".sealpost", global = true)]
    home: PathBuf,

    /// Relay directory shared between users [default: <home>/relay]
    #[arg(long, env = "SEALPOST_RELAY", global = true)]
    relay: Option<PathBuf>,

    /// Local identity
    #[arg(short, long, env = "SEALPOST_USER", global = true)]
    user: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load or create keys and publish the public bundle
    Init {
        /// Account already has keys on another device; never generate
        #[arg(long)]
        existing: bool,
    },

    /// Show the local identity and key fingerprint
    Whoami,

    /// Encrypt, sign, and upload a file
    Send {
        /// Receiver identity
        #[arg(long)]
        to: String,

        /// File to send
        path: PathBuf,
    },

    /// List files waiting for the local identity
    Inbox,

    /// Download, verify, and decrypt a file
    Receive {
        /// File id from `inbox`
        file_id: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Remove local keys
    Logout,
}

#[allow(clippy::print_stdout, clippy::disallowed_macros)]
fn output(line: &str) {
    println!("{line}");
}

#[allow(clippy::print_stderr)]
fn report(err: &CliError) {
    eprintln!("sealpost: {err}");
    if err.is_retryable() {
        eprintln!("sealpost: the relay may be temporarily unavailable; retry later");
    }
}

async fn run(args: Args, cancel: CancellationToken) -> Result<(), CliError> {
    let config = Config::new(args.home, args.relay, args.user);

    match args.command {
        Command::Init { existing } => {
            let identity = commands::init(&config, existing).await?;
            output(&format!("{} {}", identity.user, identity.fingerprint));
        },
        Command::Whoami => {
            let identity = commands::whoami(&config).await?;
            output(&format!("{} {}", identity.user, identity.fingerprint));
        },
        Command::Send { to, path } => {
            let receipt = commands::send(&config, &to, &path, &cancel).await?;
            output(&receipt.file_id);
        },
        Command::Inbox => {
            for entry in commands::inbox(&config, &cancel).await? {
                output(&format!(
                    "{}\t{}\t{}\t{}",
                    entry.file_id, entry.sender_id, entry.uploaded_at, entry.file_name
                ));
            }
        },
        Command::Receive { file_id, out } => {
            let saved = commands::receive(&config, &file_id, &out, &cancel).await?;
            output(&format!("{} ({} bytes)", saved.path.display(), saved.file.size));
        },
        Command::Logout => commands::logout(&config).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling transfer");
            on_interrupt.cancel();
        }
    });

    match run(args, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            report(&err);
            ExitCode::FAILURE
        },
    }
}
