//! HTTP server for the gateway.
//!
//! Binds the listening socket, mounts the active handler as a catch-all
//! and serves connections until shutdown is requested.

use crate::config::{Config, Mode};
use crate::handlers::{echo, graphql};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// The handler answering every request.
pub enum Handler {
    Echo,
    Graphql(Arc<dyn graphql::Executor>),
}

impl Handler {
    pub fn mode(&self) -> Mode {
        match self {
            Handler::Echo => Mode::Echo,
            Handler::Graphql(_) => Mode::Graphql,
        }
    }
}

/// Build the router. No routing is performed: every method and path
/// reaches the handler. Bodies larger than `body_limit` bytes are refused
/// with 413.
pub fn router(handler: Handler, body_limit: usize) -> Router {
    let app = match handler {
        Handler::Echo => Router::new().fallback(echo::handle_request),
        Handler::Graphql(executor) => Router::new()
            .fallback(graphql::handle_request)
            .with_state(executor),
    };
    app.layer(DefaultBodyLimit::max(body_limit))
}

/// Server instance
pub struct Server {
    listener: TcpListener,
    app: Router,
    mode: Mode,
}

impl Server {
    /// Bind the configured address. Must be called from within a Tokio runtime.
    pub fn bind(config: &Config, handler: Handler) -> std::io::Result<Self> {
        let listener = TcpListener::from_std(create_listener(config.listen, config.backlog)?)?;
        let mode = handler.mode();

        Ok(Server {
            listener,
            app: router(handler, config.body_limit),
            mode,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> std::io::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` completes, then drain in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(address = %self.local_addr()?, mode = ?self.mode, "Server listening");

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Create a non-blocking listening socket with address reuse enabled.
fn create_listener(addr: SocketAddr, backlog: u32) -> std::io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog.min(i32::MAX as u32) as i32)?;

    Ok(socket.into())
}
