//! Skype connector command line.
//!
//! Reads webhook bodies and relayed message data on stdin; the library never
//! touches process input itself.

mod commands;
mod config;

use clap::{Args, Parser, Subcommand};
use commands::RelayContent;
use config::ConnectorAppConfig;
use skype_activity::HyperChatAttachment;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(name = "skype-connector", version, about = "Skype activity connector tools")]
struct Cli {
    /// Config file (default: ~/.skype-connector/config.toml).
    #[arg(long, global = true, env = "SKYPE_CONNECTOR_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the identity derived from a webhook payload read on stdin.
    Inspect,
    /// Print the session id for a request body read on stdin.
    SessionId,
    /// Print the user id encoded in an external id.
    ResolveUser { external_id: String },
    /// Reply with text to the webhook payload read on stdin.
    Reply {
        #[arg(long)]
        text: String,
    },
    /// Send to the conversation described by message data read on stdin.
    Relay(RelayArgs),
}

#[derive(Debug, Args)]
struct RelayArgs {
    #[arg(long, conflicts_with = "attachment_base64")]
    text: Option<String>,
    /// MIME type of the attachment, e.g. image/jpg.
    #[arg(long, requires = "attachment_base64")]
    attachment_type: Option<String>,
    #[arg(long, requires_all = ["attachment_type", "attachment_name"])]
    attachment_base64: Option<String>,
    #[arg(long)]
    attachment_name: Option<String>,
}

impl RelayArgs {
    fn into_content(self) -> anyhow::Result<RelayContent> {
        if let Some(text) = self.text {
            return Ok(RelayContent::Text(text));
        }
        match (
            self.attachment_type,
            self.attachment_base64,
            self.attachment_name,
        ) {
            (Some(content_type), Some(content_base64), Some(name)) => {
                Ok(RelayContent::Attachment(HyperChatAttachment {
                    content_type,
                    content_base64,
                    name,
                }))
            }
            _ => Err(anyhow::anyhow!(
                "relay needs --text or --attachment-type/--attachment-base64/--attachment-name"
            )),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;
    install_panic_hook();

    let cli = Cli::parse();

    match cli.command {
        Command::Inspect => {
            let payload = read_stdin().await?;
            let summary = commands::inspect(&payload)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::SessionId => {
            let body = read_stdin().await?;
            println!("{}", commands::session_id(&body)?);
        }
        Command::ResolveUser { external_id } => {
            println!("{}", commands::resolve_user(&external_id)?);
        }
        Command::Reply { text } => {
            let cfg = ConnectorAppConfig::load(cli.config).await?;
            let payload = read_stdin().await?;
            let receipt = commands::reply(&cfg, &payload, &text).await?;
            println!("{}", serde_json::to_string(&receipt)?);
        }
        Command::Relay(args) => {
            let content = args.into_content()?;
            let cfg = ConnectorAppConfig::load(cli.config).await?;
            let message_data = read_stdin().await?;
            let receipt = commands::relay(&cfg, &message_data, content).await?;
            println!("{}", serde_json::to_string(&receipt)?);
        }
    }
    Ok(())
}

async fn read_stdin() -> anyhow::Result<String> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .map_err(|e| anyhow::anyhow!("read stdin: {e}"))?;
    Ok(input)
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new("info,skype_connector=debug,skype_activity=debug"),
    };
    let log_format = std::env::var("SKYPE_CONNECTOR_LOG_FORMAT")
        .unwrap_or_else(|_| "json".to_string())
        .to_ascii_lowercase();

    // Logs go to stderr so command output on stdout stays machine-readable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true)
                .init();
        }
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact()
                .init();
        }
        other => {
            return Err(anyhow::anyhow!(
                "unsupported SKYPE_CONNECTOR_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::debug!(log_format = %log_format, "tracing initialized");
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_to_string(panic_info.payload());
        tracing::error!(
            panic_location = %location,
            panic_payload = %payload,
            "panic captured"
        );
        default_hook(panic_info);
    }));
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return msg.to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
