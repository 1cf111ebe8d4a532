//! Wires the pool, the protocol listener and the modules together
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::directory::{Directory, DirectoryGateway};
use crate::error::Result;
use crate::modules::{Autorecruit, ModuleContext, ModuleRegistry};
use crate::persistence;
use crate::pool::{Buckets, NationPool};
use crate::run_state::RunState;
use crate::settings::Settings;
use crate::transport::TcpServer;

pub struct Server {
    settings: Settings,
    pool: Arc<NationPool>,
    run_state: RunState,
    registry: ModuleRegistry,
    listener: TcpServer,
    populate: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// Load saved state, bind the listener and mark the server running
    pub async fn start(settings: Settings) -> Result<Self> {
        let gateway = DirectoryGateway::new(&settings.upstream)?;
        Self::start_with_directory(settings, Box::new(gateway)).await
    }

    #[instrument(skip_all, level = "debug")]
    pub async fn start_with_directory(
        settings: Settings,
        directory: Box<dyn Directory>,
    ) -> Result<Self> {
        let buckets = Buckets::new(
            persistence::load_records(&settings.available_path()),
            persistence::load_records(&settings.rented_path()),
            persistence::load_records(&settings.recruited_path()),
        );
        let (available, rented, recruited) = buckets.counts();
        info!(
            "Loaded {} available, {} rented and {} recruited nations",
            available, rented, recruited
        );
        let blacklist = persistence::load_blacklist(&settings.blacklist_path());
        let pool = Arc::new(NationPool::new(directory, blacklist, buckets));

        let mut registry = ModuleRegistry::new();
        if settings.autorecruit {
            registry.register(Arc::new(Autorecruit::new()));
        }

        let listener = TcpServer::bind(settings.socket_address()?).await?;
        let run_state = RunState::running();

        Ok(Self {
            settings,
            pool,
            run_state,
            registry,
            listener,
            populate: Mutex::new(None),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr
    }

    pub fn pool(&self) -> Arc<NationPool> {
        self.pool.clone()
    }

    pub fn run_state(&self) -> RunState {
        self.run_state.clone()
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Start pulling nations and running modules, then accept clients until stopped
    pub async fn run(&self) {
        *self.populate.lock().await = Some(self.spawn_populate());
        let _modules = self.registry.start_all(&ModuleContext {
            pool: self.pool.clone(),
            server_addr: self.local_addr(),
            run_state: self.run_state.clone(),
        });
        self.listener
            .serve(self.pool.clone(), self.run_state.clone())
            .await;
    }

    fn spawn_populate(&self) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let run_state = self.run_state.clone();
        tokio::spawn(async move {
            if let Err(e) = pool.populate_loop(&run_state).await {
                error!("Nation pulling stopped: {}", e);
            }
        })
    }

    /// Stop every loop and write the buckets out.
    ///
    /// Waits for the populate loop to finish its final dedup before saving,
    /// however long its current upstream call takes.
    pub async fn stop(&self) {
        info!("Stopping Ellis");
        self.run_state.stop();
        self.registry.stop_all();
        let populate = self.populate.lock().await.take();
        if let Some(handle) = populate {
            if let Err(e) = handle.await {
                error!("Nation pulling task failed: {}", e);
            }
        }
        self.save().await;
    }

    pub async fn save(&self) {
        let buckets = self.pool.snapshot().await;
        persistence::save_records(&self.settings.available_path(), &buckets.available);
        persistence::save_records(&self.settings.rented_path(), &buckets.rented);
        persistence::save_records(&self.settings.recruited_path(), &buckets.recruited);
    }
}
