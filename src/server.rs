//! Listener lifecycle
//!
//! Binds the listener, announces where the share is reachable, and serves
//! until the failure signal fires or the process is asked to stop.

use anyhow::Context;
use axum::Router;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use tokio::net::TcpListener;
use tokio::signal;

use crate::routes;
use crate::signal::FailureReason;
use crate::state::AppState;

/// A bound, not yet serving, LanShare server
pub struct Server {
    listener: TcpListener,
    router: Router,
    state: AppState,
    local_addr: SocketAddr,
}

impl Server {
    /// Bind the configured host and port.
    ///
    /// A bind failure is raised on the failure signal as well as returned.
    pub async fn bind(state: AppState) -> anyhow::Result<Self> {
        let host = state.config().server.host.clone();
        let port = state.config().server.port;

        let listener = match TcpListener::bind((host.as_str(), port)).await {
            Ok(listener) => listener,
            Err(e) => {
                state
                    .failure()
                    .signal(format!("could not bind {}:{}: {}", host, port, e));
                return Err(e).with_context(|| format!("Failed to bind {}:{}", host, port));
            }
        };
        let local_addr = listener.local_addr().context("Failed to read bound address")?;

        Ok(Self {
            listener,
            router: routes::app(state.clone()),
            state,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address to hand to other machines on the network
    pub fn display_addr(&self) -> SocketAddr {
        display_addr(self.local_addr)
    }

    /// Print the startup banner
    pub fn welcome(&self) {
        let addr = self.display_addr();
        tracing::info!("LanShare Server listening on {} (bound {})", addr, self.local_addr);
        for (role, path) in self.state.paths().snapshot() {
            match path {
                Some(path) => tracing::info!("{} path: {}", role, path.display()),
                None => tracing::info!("{} path: not configured", role),
            }
        }

        println!("Listening and running on http://{}", addr);
        println!("Open /browse to list, /download to fetch, /upload to send files");
    }

    /// Serve until shutdown. Returns the failure reason if the failure signal
    /// caused the shutdown.
    pub async fn wait(self) -> Result<(), FailureReason> {
        let failure = self.state.failure().clone();

        let shutdown = {
            let failure = failure.clone();
            async move {
                tokio::select! {
                    reason = failure.wait() => {
                        tracing::warn!("Failure signal received ({}), shutting down...", reason);
                    },
                    _ = shutdown_signal() => {},
                }
            }
        };

        if let Err(e) = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
        {
            failure.signal(format!("server error: {}", e));
        }

        tracing::info!("Server shutdown complete");
        match failure.reason() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

/// Replace an unspecified bind address with the machine's outbound address
fn display_addr(bound: SocketAddr) -> SocketAddr {
    if !bound.ip().is_unspecified() {
        return bound;
    }
    match outbound_ip() {
        Some(ip) => SocketAddr::new(ip, bound.port()),
        None => bound,
    }
}

/// Local address the OS would route external traffic from.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
fn outbound_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
