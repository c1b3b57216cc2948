//! Trustline terminal client.
//!
//! # Usage
//!
//! ```bash
//! TRUSTLINE_TOKEN=... trustline --user alice
//! trustline --server ws://chat.example:8000 --api http://chat.example:8000 --user alice --token ...
//! ```
//!
//! Type `/open <partner>` to open a conversation, then plain text to send.

mod driver;
mod render;

use std::{sync::Arc, time::Duration};

use clap::Parser;
use trustline_app::{Collaborators, Runtime};
use trustline_client::{
    ConnectionConfig, ContactsChangeReason, DirectoryObserver, Identity, SystemEnv,
    rest::RestCollaborators, transport::TransportConfig,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::driver::CliDriver;

/// Trustline chat client
#[derive(Parser, Debug)]
#[command(name = "trustline")]
#[command(about = "Terminal client for the Trustline chat server")]
#[command(version)]
struct Args {
    /// WebSocket base URL of the chat server
    #[arg(short, long, default_value = "ws://localhost:8000")]
    server: String,

    /// REST base URL of the chat server
    #[arg(short, long, default_value = "http://localhost:8000")]
    api: String,

    /// Username to chat as
    #[arg(short, long)]
    user: String,

    /// Session token issued at login
    #[arg(long, env = "TRUSTLINE_TOKEN", hide_env_values = true)]
    token: String,

    /// Seconds to wait for the connection to open
    #[arg(long, default_value = "10")]
    handshake_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

/// Directory refreshes have no local directory to reload; they are logged.
struct LoggedDirectory;

impl DirectoryObserver for LoggedDirectory {
    fn contacts_changed(&self, reason: ContactsChangeReason, note: Option<&str>) {
        tracing::info!(?reason, note, "contact directory changed");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let identity = Identity::new(args.user)?;
    let transport =
        TransportConfig { ws_base: args.server, api_base: args.api, auth_token: args.token };
    let rest = Arc::new(RestCollaborators::new(&transport)?);
    let collaborators = Collaborators {
        history: rest.clone(),
        verifier: rest,
        directory: Arc::new(LoggedDirectory),
    };
    let config =
        ConnectionConfig { handshake_timeout: Duration::from_secs(args.handshake_timeout) };

    tracing::info!(%identity, "trustline starting");

    let env = SystemEnv::new();
    let driver = CliDriver::new(env, transport);
    let exit = Runtime::new(driver, env, identity, config, collaborators).run().await?;

    tracing::info!(?exit, "trustline stopped");
    Ok(())
}
