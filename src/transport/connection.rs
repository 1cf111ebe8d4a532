//! One client connection speaking the nation protocol
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, instrument, warn};

use super::commands::Command;
use crate::error::{EllisError, Result};
use crate::pool::NationPool;
use crate::record::NationRecord;
use crate::run_state::RunState;

/// Each read is taken as one whole command
pub const READ_BUFFER_SIZE: usize = 2048;
/// How long `get` waits before asking the pool again
pub const GET_RETRY_DELAY: Duration = Duration::from_secs(30);
/// Sent before closing any connection the client did not end itself
pub const END_SENTINEL: &[u8] = b"END";

const RECRUITABLE: &[u8] = br#"{"recruitable": 1}"#;
const NOT_RECRUITABLE: &[u8] = br#"{"recruitable": 0}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingCommand,
    Responding,
    /// The client ended the session, by `END` or by hanging up
    Closed,
}

pub struct Connection<S> {
    stream: S,
    peer_addr: SocketAddr,
    pool: Arc<NationPool>,
    run_state: RunState,
    state: ConnectionState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer_addr: SocketAddr, pool: Arc<NationPool>, run_state: RunState) -> Self {
        Self {
            stream,
            peer_addr,
            pool,
            run_state,
            state: ConnectionState::AwaitingCommand,
        }
    }

    /// Serve commands until the client leaves, the server stops or something fails.
    ///
    /// Unless the client closed the session, `END` is sent before the socket
    /// shuts down.
    #[instrument(skip_all, level = "debug")]
    pub async fn run(mut self) -> Result<()> {
        info!("Handling Client: {}", self.peer_addr);
        let result = self.serve().await;
        if let Err(e) = &result {
            error!("Connection to {} failed: {}", self.peer_addr, e);
        }

        if self.state != ConnectionState::Closed {
            if let Err(e) = self.stream.write_all(END_SENTINEL).await {
                debug!("Could not send END to {}: {}", self.peer_addr, e);
            }
            self.state = ConnectionState::Closed;
        }
        info!("Disconnecting {}", self.peer_addr);
        if let Err(e) = self.stream.shutdown().await {
            debug!("Shutdown of {} failed: {}", self.peer_addr, e);
        }
        result
    }

    async fn serve(&mut self) -> Result<()> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        while self.run_state.is_running() {
            debug!("Waiting for Command...");
            let read = self.stream.read(&mut buf).await?;
            if read == 0 {
                debug!("{} hung up", self.peer_addr);
                self.state = ConnectionState::Closed;
                return Ok(());
            }
            let command = Command::parse(&String::from_utf8_lossy(&buf[..read]));
            debug!("Command from {}: {}", self.peer_addr, command.name());

            self.state = ConnectionState::Responding;
            match command {
                Command::Get => self.serve_get().await?,
                Command::Return { payload } => self.serve_return(&payload).await?,
                Command::Check { name } => self.serve_check(&name).await?,
                Command::End => {
                    self.state = ConnectionState::Closed;
                    return Ok(());
                }
                Command::Unknown(raw) => debug!("Ignoring unknown command: {:?}", raw),
            }
            self.state = ConnectionState::AwaitingCommand;
        }
        Ok(())
    }

    async fn serve_get(&mut self) -> Result<()> {
        info!("Sending Nation!");
        while self.run_state.is_running() {
            if let Some(record) = self.pool.checkout().await? {
                if self.pool.check_recruitable(record.name()).await? {
                    let body = record.to_json()?;
                    self.stream.write_all(body.as_bytes()).await?;
                    return Ok(());
                }
                debug!("{} is no longer recruitable", record.name());
                self.pool.retire(&record).await?;
            }
            debug!("Waiting for an available nation");
            tokio::time::sleep(GET_RETRY_DELAY).await;
        }
        Ok(())
    }

    async fn serve_return(&mut self, payload: &str) -> Result<()> {
        info!("Returning Nation!");
        let record: NationRecord = match serde_json::from_str(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring malformed return from {}: {}", self.peer_addr, e);
                return Ok(());
            }
        };
        match self.pool.give_back(&record).await {
            Ok(bucket) => {
                debug!("{} went back to {}", record.name(), bucket);
                Ok(())
            }
            Err(EllisError::Client(msg)) => {
                warn!("Ignoring return from {}: {}", self.peer_addr, msg);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn serve_check(&mut self, name: &str) -> Result<()> {
        info!("Checking Nation!");
        let reply = if self.pool.check_recruitable(name).await? {
            RECRUITABLE
        } else {
            NOT_RECRUITABLE
        };
        self.stream.write_all(reply).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, DuplexStream};
    use tokio::task::JoinHandle;

    use super::*;
    use crate::blacklist::Blacklist;
    use crate::pool::tests::FakeDirectory;
    use crate::pool::{Bucket, Buckets};

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn spawn_connection(
        fake: &FakeDirectory,
        available: &[&str],
        run_state: RunState,
    ) -> (DuplexStream, Arc<NationPool>, JoinHandle<Result<()>>) {
        let buckets = Buckets::new(
            available.iter().map(|n| NationRecord::new(*n)).collect(),
            vec![],
            vec![],
        );
        let pool = Arc::new(NationPool::new(
            Box::new(fake.clone()),
            Blacklist::new(),
            buckets,
        ));
        let (client, server) = duplex(READ_BUFFER_SIZE);
        let connection = Connection::new(server, peer(), pool.clone(), run_state);
        (client, pool, tokio::spawn(connection.run()))
    }

    async fn reply(client: &mut DuplexStream) -> String {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let read = client.read(&mut buf).await.unwrap();
        String::from_utf8_lossy(&buf[..read]).to_string()
    }

    async fn rest(client: &mut DuplexStream) -> String {
        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn get_then_end_closes_quietly() {
        let fake = FakeDirectory::with_nations(&["potato"]);
        let (mut client, pool, handle) = spawn_connection(&fake, &["potato"], RunState::running());

        client.write_all(b"GET").await.unwrap();
        let record: NationRecord = serde_json::from_str(&reply(&mut client).await).unwrap();
        assert_eq!(record.name(), "potato");
        assert_eq!(record.get("region"), Some("the_field"));

        client.write_all(b"END").await.unwrap();
        assert_eq!(rest(&mut client).await, "");
        handle.await.unwrap().unwrap();
        assert_eq!(pool.snapshot().await.bucket_of("potato"), Some(Bucket::Rented));
    }

    #[tokio::test]
    async fn check_replies_with_flag() {
        let fake = FakeDirectory::default();
        fake.state.lock().unwrap().unrecruitable.insert("tomato".to_string());
        let (mut client, _pool, handle) = spawn_connection(&fake, &[], RunState::running());

        client.write_all(b"check potato").await.unwrap();
        assert_eq!(reply(&mut client).await, r#"{"recruitable": 1}"#);
        client.write_all(b"CHECK tomato").await.unwrap();
        assert_eq!(reply(&mut client).await, r#"{"recruitable": 0}"#);

        drop(client);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn return_gives_back_rented_nation() {
        let fake = FakeDirectory::with_nations(&["potato"]);
        let (mut client, pool, handle) = spawn_connection(&fake, &["potato"], RunState::running());

        client.write_all(b"get").await.unwrap();
        let body = reply(&mut client).await;
        client
            .write_all(format!("RETURN {}", body).as_bytes())
            .await
            .unwrap();
        while pool.snapshot().await.counts() != (1, 0, 0) {
            tokio::task::yield_now().await;
        }

        drop(client);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn malformed_return_is_swallowed() {
        let fake = FakeDirectory::with_nations(&["potato"]);
        let (mut client, pool, handle) = spawn_connection(&fake, &["potato"], RunState::running());

        client.write_all(b"return {not json").await.unwrap();
        drop(client);
        handle.await.unwrap().unwrap();
        assert_eq!(pool.snapshot().await.counts(), (1, 0, 0));
    }

    #[tokio::test]
    async fn unknown_commands_are_ignored() {
        let (mut client, _pool, handle) =
            spawn_connection(&FakeDirectory::default(), &[], RunState::running());

        client.write_all(b"dance").await.unwrap();
        drop(client);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn returning_unrented_nation_changes_nothing() {
        let fake = FakeDirectory::with_nations(&["potato"]);
        let (mut client, pool, handle) = spawn_connection(&fake, &["potato"], RunState::running());

        client
            .write_all(br#"RETURN {"name": "potato"}"#)
            .await
            .unwrap();
        drop(client);
        handle.await.unwrap().unwrap();
        assert_eq!(pool.snapshot().await.counts(), (1, 0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn get_skips_unrecruitable_and_waits() {
        let fake = FakeDirectory::with_nations(&["potato", "tomato"]);
        fake.state.lock().unwrap().unrecruitable.insert("tomato".to_string());
        let (mut client, pool, handle) =
            spawn_connection(&fake, &["potato", "tomato"], RunState::running());

        client.write_all(b"GET").await.unwrap();
        let record: NationRecord = serde_json::from_str(&reply(&mut client).await).unwrap();
        assert_eq!(record.name(), "potato");

        let buckets = pool.snapshot().await;
        assert_eq!(buckets.bucket_of("tomato"), Some(Bucket::Recruited));
        assert_eq!(buckets.bucket_of("potato"), Some(Bucket::Rented));

        drop(client);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn stopped_server_sends_end() {
        let (mut client, _pool, handle) =
            spawn_connection(&FakeDirectory::default(), &[], RunState::new());
        assert_eq!(rest(&mut client).await, "END");
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn upstream_failure_sends_end_and_errors() {
        let fake = FakeDirectory::with_nations(&["potato"]);
        fake.state.lock().unwrap().broken.insert("potato".to_string());
        let (mut client, _pool, handle) = spawn_connection(&fake, &["potato"], RunState::running());

        client.write_all(b"GET").await.unwrap();
        assert_eq!(rest(&mut client).await, "END");
        assert!(handle.await.unwrap().is_err());
    }
}
