use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;

use reset_relay::config::{RelayConfig, SmtpConfig};
use reset_relay::error::{EX_NOPERM, InboundError};
use reset_relay::host::{PrintHost, SmtpHost};
use reset_relay::inbound::InboundMessage;
use reset_relay::relay::{MailHost, Outcome, handle_email};
use reset_relay::upstream::ResetApiClient;

#[derive(Parser)]
#[command(name = "reset-relay", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Handle one inbound message read from stdin.
    Deliver {
        /// Envelope sender; defaults to the From header.
        #[arg(long)]
        sender: Option<String>,
        /// Envelope recipient; defaults to the To header.
        #[arg(long)]
        recipient: Option<String>,
        /// Print the reply to stdout instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the generic HTTP responder.
    Serve {
        #[arg(long, env = "RELAY_HTTP_PORT", default_value_t = 8787)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Install rustls crypto provider before any TLS usage
    let _ = rustls::crypto::ring::default_provider().install_default();

    // stdout carries dry-run output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Deliver {
            sender,
            recipient,
            dry_run,
        } => deliver(sender, recipient, dry_run).await,
        Command::Serve { port } => match serve(port).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("{e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

/// Everything `deliver` needs before the relay runs.
struct Invocation {
    config: RelayConfig,
    host: Box<dyn MailHost>,
    inbound: InboundMessage,
}

async fn load(
    sender: Option<&str>,
    recipient: Option<&str>,
    dry_run: bool,
) -> reset_relay::error::Result<Invocation> {
    let config = RelayConfig::from_env()?;

    let host: Box<dyn MailHost> = if dry_run {
        Box::new(PrintHost::stdout())
    } else {
        Box::new(SmtpHost::new(SmtpConfig::from_env()?))
    };

    let mut raw = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut raw)
        .await
        .map_err(InboundError::from)?;
    let inbound = InboundMessage::parse(&raw, sender, recipient)?;

    Ok(Invocation {
        config,
        host,
        inbound,
    })
}

async fn deliver(sender: Option<String>, recipient: Option<String>, dry_run: bool) -> ExitCode {
    let Invocation {
        config,
        host,
        inbound,
    } = match load(sender.as_deref(), recipient.as_deref(), dry_run).await {
        Ok(invocation) => invocation,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(e.exit_code());
        }
    };

    let authority = ResetApiClient::new(&config);
    let outcome = handle_email(&config, &authority, host.as_ref(), &inbound).await;
    tracing::debug!(outcome = outcome.label(), "Invocation finished");

    match outcome {
        Outcome::Replied => ExitCode::SUCCESS,
        Outcome::Rejected { reason } => {
            // The MTA quotes this line in the bounce.
            eprintln!("{reason}");
            ExitCode::from(EX_NOPERM)
        }
    }
}

async fn serve(port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    reset_relay::http::serve(listener)
        .await
        .context("HTTP responder failed")
}
