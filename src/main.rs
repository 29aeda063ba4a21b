//! greeting-gateway: a minimal GraphQL-over-HTTP server
//!
//! Every request is answered by one of two handlers, picked at startup:
//! - Echo: logs the request body and replies "Hello world"
//! - GraphQL: executes a JSON operation request against a schema loaded
//!   once from an SDL file and replies with the JSON response envelope
//!
//! Features:
//! - Catch-all endpoint, no routing
//! - Schema built before the listener is bound; failures are fatal
//! - Graceful shutdown on Ctrl-C
//! - Configuration via CLI arguments or TOML file

mod config;
mod handlers;
mod schema;
mod server;

use config::{Config, Mode};
use handlers::graphql::SchemaExecutor;
use server::{Handler, Server};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        mode = ?config.mode,
        schema = %config.schema_path.display(),
        "Starting greeting-gateway"
    );

    let handler = match config.mode {
        Mode::Echo => Handler::Echo,
        Mode::Graphql => Handler::Graphql(load_executor(&config)?),
    };

    Server::bind(&config, handler)?.run().await?;
    Ok(())
}

/// Build the schema. Runs before the listener exists, so a bad schema
/// file stops the process without serving anything.
fn load_executor(config: &Config) -> Result<Arc<SchemaExecutor>, schema::SchemaError> {
    let schema = schema::load(&config.schema_path, schema::default_resolvers())?;
    info!(path = %config.schema_path.display(), "Schema loaded");
    Ok(Arc::new(SchemaExecutor::new(schema)))
}
