//! TCP Server
//!
//! Accepts client connections and spawns one task per connection. Every task
//! gets a clone of the same [`CommandHandler`], so all clients share one store.

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Serves connections from `listener` until `shutdown` completes.
///
/// Connections that are still open when `shutdown` fires keep running in
/// their own tasks until the runtime stops.
pub async fn run<F>(
    listener: TcpListener,
    handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = accept_loop(listener, handler, stats) => {}
        _ = shutdown => {
            info!("Shutdown signal received, stopping server...");
        }
    }
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, handler: CommandHandler, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = handler.clone();
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
