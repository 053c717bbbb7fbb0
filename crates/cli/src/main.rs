//! Asana connector entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: read the TOML file named by `--config` and
//!    resolve the access token (flag / `ASANA_ACCESS_TOKEN` over the file).
//! 2. **Wire observability**: configure `tracing-subscriber` with a JSON layer
//!    and, when configured, an OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: create the `AsanaClient` and register one
//!    [`handler::LogEventHandler`] per configured subscription.
//! 4. **Serve**: bind the webhook listener so the handshakes Asana sends
//!    while webhooks are being created can be answered.
//! 5. **Start**: reconcile remote webhooks, then attach the connector to the
//!    listener so notification batches are routed. Any startup error stops
//!    the listener and ends the process. The listener then runs until Ctrl-C.

mod config;
mod handler;
mod telemetry;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use asana::AsanaClient;
use clap::Parser;
use connector::ConnectorBuilder;
use listener::WebhookEndpoint;

use crate::config::AppConfig;
use crate::handler::LogEventHandler;

#[derive(Parser, Debug)]
#[command(name = "asana-connector", version, about = "Routes Asana webhook events to local handlers")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "asana-connector.toml")]
    config: PathBuf,

    /// Address to bind the webhook listener to (overrides `[server] bind`).
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Asana access token (overrides `[connector] access_token`).
    #[arg(long, env = "ASANA_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    let telemetry = telemetry::init(&config.telemetry);
    let result = run(cli, config).await;
    if let Err(e) = &result {
        let message = format!("{e:#}");
        tracing::error!(error = %message, "asana connector stopped");
    }
    telemetry.shutdown().await;
    result
}

async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let connector_config = config.connector_config(cli.access_token.as_deref())?;
    let client = AsanaClient::new(config.asana_config(&connector_config))
        .context("building Asana client")?;
    let endpoint = WebhookEndpoint::new(connector_config.webhook_path())
        .context("configuring webhook endpoint")?;

    let mut builder = ConnectorBuilder::new(connector_config);
    for request in config.subscriptions.iter().cloned() {
        builder
            .on(request, Arc::new(LogEventHandler))
            .context("registering subscription")?;
    }

    // Asana sends the handshake while a create call is in flight, so the
    // endpoint must be reachable before reconciliation starts.
    let bind = cli.bind.unwrap_or(config.server.bind);
    let socket = listener::bind(bind)
        .await
        .context("binding webhook listener")?;
    let server = tokio::spawn(listener::serve(socket, endpoint.clone(), shutdown_signal()));

    let attached = match builder.start(Arc::new(client)).await {
        Ok(connector) => endpoint
            .attach(Arc::new(connector))
            .context("attaching connector to webhook endpoint"),
        Err(e) => Err(e).context("starting connector"),
    };
    if let Err(e) = attached {
        server.abort();
        return Err(e);
    }

    server
        .await
        .context("webhook listener task")?
        .context("running webhook listener")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
