//! `toolcrib` — command-line administration for a makerspace membership API.
//!
//! # Usage
//!
//! ```
//! toolcrib login admin
//! toolcrib member list --sort email --filter firstname=ali
//! toolcrib spans set 1423 --category labaccess --period 2026-01-01:2026-06-30
//! ```

mod commands;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use toolcrib_client::{
  auth::{AuthContext, AuthEvent},
  gateway::{GatewayConfig, HttpGateway},
};
use toolcrib_core::resources::{
  Group, Key, Member, Message, Product, ProductAction,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "toolcrib", about = "Admin CLI for the toolcrib membership API")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Base URL of the API (overrides the config file).
  #[arg(long, env = "TOOLCRIB_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Log in and store the session token.
  Login { username: String },
  /// Drop the stored session.
  Logout,
  /// Member records.
  #[command(subcommand)]
  Member(commands::ResourceCommand),
  /// Group records.
  #[command(subcommand)]
  Group(commands::ResourceCommand),
  /// Access key records.
  #[command(subcommand)]
  Key(commands::ResourceCommand),
  /// Message records.
  #[command(subcommand)]
  Message(commands::ResourceCommand),
  /// Webshop product records.
  #[command(subcommand)]
  Product(commands::ResourceCommand),
  /// Webshop product action records.
  #[command(subcommand)]
  ProductAction(commands::ResourceCommand),
  /// Manage a member's group relations.
  Groups {
    member_id: i64,
    /// Group id to attach; repeatable.
    #[arg(long)]
    add: Vec<i64>,
    /// Group id to detach; repeatable.
    #[arg(long)]
    remove: Vec<i64>,
  },
  /// Access spans and derived periods.
  #[command(subcommand)]
  Spans(commands::SpanCommand),
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file plus `TOOLCRIB_*` environment.
#[derive(serde::Deserialize)]
struct Settings {
  base_url:     String,
  session_file: Option<PathBuf>,
}

fn default_session_path() -> Result<PathBuf> {
  let home = std::env::var("HOME").context("HOME is not set")?;
  Ok(
    PathBuf::from(home)
      .join(".config")
      .join("toolcrib")
      .join("session.json"),
  )
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration: defaults, then file, then environment.
  let settings = config::Config::builder()
    .set_default("base_url", "http://localhost:8010")
    .context("invalid default configuration")?
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("TOOLCRIB"))
    .build()
    .context("failed to read configuration")?;
  let settings: Settings = settings
    .try_deserialize()
    .context("failed to deserialise configuration")?;

  // CLI flag overrides config file, which overrides the default.
  let base_url = cli.url.unwrap_or(settings.base_url);
  let session_file = match settings.session_file {
    Some(path) => path,
    None => default_session_path()?,
  };

  let auth = Arc::new(AuthContext::with_store(session_file));
  let _listener = auth.listen(|event| {
    if event == AuthEvent::PermissionDenied {
      eprintln!("permission denied by the server");
    }
  });

  let gateway = HttpGateway::new(GatewayConfig { base_url }, Arc::clone(&auth))
    .context("failed to build HTTP client")?;

  match cli.command {
    Command::Login { username } => commands::login(&gateway, &username).await,
    Command::Logout => commands::logout(&gateway).await,
    Command::Member(cmd) => commands::resource::<Member>(cmd, &gateway).await,
    Command::Group(cmd) => commands::resource::<Group>(cmd, &gateway).await,
    Command::Key(cmd) => commands::resource::<Key>(cmd, &gateway).await,
    Command::Message(cmd) => commands::resource::<Message>(cmd, &gateway).await,
    Command::Product(cmd) => commands::resource::<Product>(cmd, &gateway).await,
    Command::ProductAction(cmd) => {
      commands::resource::<ProductAction>(cmd, &gateway).await
    }
    Command::Groups { member_id, add, remove } => {
      commands::member_groups(&gateway, member_id, &add, &remove).await
    }
    Command::Spans(cmd) => commands::spans(cmd, &gateway).await,
  }
}
