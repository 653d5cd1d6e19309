//! firefly - IRC bot runtime.

use std::sync::Arc;

use anyhow::Context;
use firefly::auth::SessionStore;
use firefly::client::Connection;
use firefly::config::{Config, validate};
use firefly::dispatcher::{DispatchSettings, Dispatcher};
use firefly::language::NullLanguage;
use firefly::plugins;
use firefly::registry::Registry;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "firefly.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(path = %config_path, error = %e, "Invalid config");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    info!(
        host = %config.server.host,
        port = config.server.port,
        nick = %config.server.nick,
        "Starting firefly"
    );

    let auth = Arc::new(SessionStore::from_config(&config.auth));
    let mut registry = Registry::new(config.plugins.clone(), config.identity_nicks(), auth.clone());
    plugins::register_all(&mut registry).context("plugin registration failed")?;
    info!(plugins = registry.plugins().count(), "Plugins registered");

    let (connection, transport) = Connection::new(config.server.clone());
    let mut dispatcher = Dispatcher::new(
        registry,
        DispatchSettings::from_config(&config),
        Arc::new(transport),
        Arc::new(NullLanguage),
        auth,
    );

    tokio::select! {
        result = connection.run(&mut dispatcher) => {
            result.context("connection failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
