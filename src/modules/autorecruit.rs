//! Telegrams every nation it can borrow from the server.
//!
//! Talks to the server over the same TCP protocol as any other client, then
//! hands all borrowed nations back when it finishes.
use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, info};

use super::{Module, ModuleContext};
use crate::error::{EllisError, Result};
use crate::record::NationRecord;
use crate::run_state::RunState;
use crate::transport::{END_SENTINEL, READ_BUFFER_SIZE};

/// Pause between connecting and the first `GET`
pub const START_DELAY: Duration = Duration::from_secs(60);
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);
// The protocol has no framing; give the server time to read each RETURN alone
const RETURN_SPACING: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub struct Autorecruit {
    running: RunState,
    start_delay: Duration,
    reconnect_delay: Duration,
}

impl Default for Autorecruit {
    fn default() -> Self {
        Self::with_delays(START_DELAY, RECONNECT_DELAY)
    }
}

impl Autorecruit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delays(start_delay: Duration, reconnect_delay: Duration) -> Self {
        Self {
            running: RunState::new(),
            start_delay,
            reconnect_delay,
        }
    }

    fn keep_going(&self, ctx: &ModuleContext) -> bool {
        self.running.is_running() && ctx.run_state.is_running()
    }

    /// One connection's worth of recruiting; ends the module when it returns
    async fn session(&self, ctx: &ModuleContext) -> Result<()> {
        info!("Connecting to Ellis...");
        let mut stream = TcpStream::connect(ctx.server_addr).await?;
        info!("Connected to Ellis!");
        tokio::time::sleep(self.start_delay).await;

        let mut recruited = Vec::new();
        let result = self.recruit(&mut stream, ctx, &mut recruited).await;
        if let Err(e) = &result {
            error!("Autorecruit failed: {}", e);
        }

        info!("Returning {} nations...", recruited.len());
        for (i, record) in recruited.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(RETURN_SPACING).await;
            }
            let command = format!("RETURN {}", record.to_json()?);
            if let Err(e) = stream.write_all(command.as_bytes()).await {
                error!("Could not return {}: {}", record.name(), e);
                break;
            }
        }
        if let Err(e) = stream.shutdown().await {
            debug!("Shutdown failed: {}", e);
        }
        self.running.stop();
        info!("Goodbye...");
        result
    }

    async fn recruit(
        &self,
        stream: &mut TcpStream,
        ctx: &ModuleContext,
        recruited: &mut Vec<NationRecord>,
    ) -> Result<()> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        while self.keep_going(ctx) {
            info!("Getting Nation...");
            stream.write_all(b"GET").await?;
            let read = stream.read(&mut buf).await?;
            let reply = &buf[..read];
            if read == 0 || reply == END_SENTINEL {
                info!("Server closed the session");
                break;
            }
            let record: NationRecord = match serde_json::from_slice(reply) {
                Ok(record) => record,
                Err(e) => {
                    error!("Unreadable nation from server: {}", e);
                    continue;
                }
            };
            debug!("Sending Telegram to {}!", record.name());
            ctx.pool.send_telegram(record.name()).await?;
            recruited.push(record);
        }
        info!("Shutting Down!");
        Ok(())
    }
}

#[async_trait]
impl Module for Autorecruit {
    fn name(&self) -> &str {
        "Autorecruit"
    }

    async fn start(&self, ctx: ModuleContext) -> Result<()> {
        self.running.start();
        while self.keep_going(&ctx) {
            match self.session(&ctx).await {
                Err(EllisError::Io(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                    debug!("Server not up yet, retrying");
                    tokio::time::sleep(self.reconnect_delay).await;
                }
                result => return result,
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.running.stop();
    }
}
