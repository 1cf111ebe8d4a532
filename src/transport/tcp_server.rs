//! TCP Server
//!
//! Accepts protocol clients and hands each one its own task.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use super::connection::Connection;
use crate::error::{EllisError, Result};
use crate::pool::NationPool;
use crate::run_state::RunState;

/// Wait before accepting again after a failed accept
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

pub struct TcpServer {
    pub local_addr: SocketAddr,
    listener: TcpListener,
}

impl TcpServer {
    pub async fn bind(bind_addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| EllisError::Transport(format!("Socket creation failed: {}", e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| EllisError::Transport(format!("Socket creation failed: {}", e)))?;

        Ok(Self {
            local_addr,
            listener,
        })
    }

    /// Accept clients until the server stops.
    ///
    /// The running flag is checked between accepts, so a stop is only seen
    /// once the next client connects.
    pub async fn serve(&self, pool: Arc<NationPool>, run_state: RunState) {
        info!("Listening for clients on {}", self.local_addr);
        while run_state.is_running() {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("TCP accept failed: {}", e);
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };
            if !run_state.is_running() {
                debug!("Turning away {}: shutting down", peer_addr);
                break;
            }
            debug!("Client accepted: {}", peer_addr);

            let connection = Connection::new(stream, peer_addr, pool.clone(), run_state.clone());
            tokio::spawn(async move {
                // errors are already logged by the connection
                let _ = connection.run().await;
            });
        }
        info!("Goodbye!!!");
    }
}
