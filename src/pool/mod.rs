//! The shared nation inventory.
//!
//! One async mutex guards both the buckets and the upstream directory. Every
//! bucket move and every upstream call (rate-limit waits included) happens
//! while it is held, so a pool operation and the call it depends on are
//! atomic with respect to every other pool operation.
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

pub mod buckets;

use crate::blacklist::{is_blacklisted, Blacklist};
use crate::client_error;
use crate::directory::Directory;
use crate::error::Result;
use crate::record::NationRecord;
use crate::run_state::RunState;
pub use buckets::{Bucket, Buckets};

struct PoolState {
    buckets: Buckets,
    directory: Box<dyn Directory>,
}

pub struct NationPool {
    state: Mutex<PoolState>,
    blacklist: Blacklist,
}

impl std::fmt::Debug for NationPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NationPool")
            .field("blacklist_rules", &self.blacklist.len())
            .finish()
    }
}

impl NationPool {
    pub fn new(directory: Box<dyn Directory>, blacklist: Blacklist, buckets: Buckets) -> Self {
        Self {
            state: Mutex::new(PoolState { buckets, directory }),
            blacklist,
        }
    }

    /// Hand out the most recently added nation, refreshed from upstream.
    ///
    /// `Ok(None)` means "try again": either nothing is available or the
    /// refreshed nation turned out to be blacklisted and was retired.
    /// A nation upstream no longer knows is retired and the `NotFound` is
    /// returned; any other upstream error puts the nation back on the stack.
    #[instrument(skip(self), level = "debug")]
    pub async fn checkout(&self) -> Result<Option<NationRecord>> {
        let mut state = self.state.lock().await;
        let PoolState { buckets, directory } = &mut *state;

        let mut record = match buckets.pop_available() {
            Some(record) => record,
            None => return Ok(None),
        };
        let fetched = directory.fetch_nation(record.name()).await;
        match fetched {
            Ok(info) => record.merge(info),
            Err(e) if e.is_not_found() => {
                warn!("{} no longer exists upstream", record.name());
                buckets.recruit(record);
                return Err(e);
            }
            Err(e) => {
                buckets.push_available(record);
                return Err(e);
            }
        }

        if is_blacklisted(&record, &self.blacklist) {
            info!("{} is blacklisted, retiring it", record.name());
            buckets.recruit(record);
            return Ok(None);
        }
        buckets.rent(record.clone());
        Ok(Some(record))
    }

    /// Take a rented nation back, sorting it by whether it is still recruitable.
    ///
    /// Only nations that are currently rented can be given back; anything
    /// else is rejected without touching the buckets.
    #[instrument(skip(self, record), fields(name = record.name()), level = "debug")]
    pub async fn give_back(&self, record: &NationRecord) -> Result<Bucket> {
        let name = record.name();
        if !self.state.lock().await.buckets.is_rented(name) {
            return Err(client_error!("{} is not rented out", name));
        }

        let recruitable = self.check_recruitable(name).await?;

        let mut state = self.state.lock().await;
        let stored = state
            .buckets
            .take_rented(name)
            .ok_or_else(|| client_error!("{} is not rented out", name))?;
        if recruitable {
            state.buckets.push_available(stored);
            Ok(Bucket::Available)
        } else {
            state.buckets.recruit(stored);
            Ok(Bucket::Recruited)
        }
    }

    /// Move a rented nation straight to `recruited`
    pub async fn retire(&self, record: &NationRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        let stored = state
            .buckets
            .take_rented(record.name())
            .ok_or_else(|| client_error!("{} is not rented out", record.name()))?;
        debug!("Retiring {}", stored.name());
        state.buckets.recruit(stored);
        Ok(())
    }

    pub async fn check_recruitable(&self, name: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.directory.fetch_recruitable(name, None).await
    }

    pub async fn send_telegram(&self, recipient: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.directory.send_telegram(recipient).await
    }

    /// Keep pulling new foundings into `available` until the server stops.
    ///
    /// Foundings are checked against the blacklist once their upstream
    /// attributes are merged in. Foundings upstream no longer knows are
    /// skipped; any other upstream
    /// error ends the loop and is returned. Either way `available` is
    /// deduplicated once on the way out.
    pub async fn populate_loop(&self, run_state: &RunState) -> Result<()> {
        info!("Starting to pull nations");
        let result = self.populate_until_stopped(run_state).await;
        if let Err(e) = &result {
            error!("Nation pulling failed: {}", e);
        }
        let removed = self.dedup_available().await;
        info!("Stopped pulling nations ({} duplicates dropped)", removed);
        result
    }

    async fn populate_until_stopped(&self, run_state: &RunState) -> Result<()> {
        while run_state.is_running() {
            debug!("Sending Request to NS");
            let foundings = {
                let mut state = self.state.lock().await;
                state.directory.fetch_foundings().await?
            };
            for mut founding in foundings {
                let mut state = self.state.lock().await;
                let PoolState { buckets, directory } = &mut *state;
                let fetched = directory.fetch_nation(founding.name()).await;
                match fetched {
                    Ok(info) => founding.merge(info),
                    Err(e) if e.is_not_found() => {
                        debug!("{} vanished before we could look at it", founding.name());
                        continue;
                    }
                    Err(e) => return Err(e),
                }
                if is_blacklisted(&founding, &self.blacklist) {
                    debug!("{} is blacklisted, skipping it", founding.name());
                    continue;
                }
                if buckets.is_rented(founding.name()) || buckets.is_recruited(founding.name()) {
                    debug!("{} is already handed out or recruited", founding.name());
                    continue;
                }
                buckets.push_available(founding);
            }
        }
        Ok(())
    }

    pub async fn dedup_available(&self) -> usize {
        self.state.lock().await.buckets.dedup_available()
    }

    /// Copies of all three buckets
    pub async fn snapshot(&self) -> Buckets {
        self.state.lock().await.buckets.clone()
    }
}
