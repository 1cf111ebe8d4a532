//! Auxiliary modules that run alongside the server.
//!
//! Modules are registered explicitly with a [`ModuleRegistry`] and get what
//! they need through a [`ModuleContext`]; none of them can reach the server
//! itself.
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub mod autorecruit;

use crate::error::Result;
use crate::pool::NationPool;
use crate::run_state::RunState;
pub use autorecruit::Autorecruit;

/// Capabilities handed to a module when it starts
#[derive(Clone, Debug)]
pub struct ModuleContext {
    /// Used for upstream calls such as telegrams
    pub pool: Arc<NationPool>,
    /// Where the protocol server is listening
    pub server_addr: SocketAddr,
    pub run_state: RunState,
}

#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    /// Run until finished or stopped; called on its own task
    async fn start(&self, ctx: ModuleContext) -> Result<()>;

    /// Ask a running module to finish
    fn stop(&self);
}

#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Arc<dyn Module>) {
        info!("Registered module {}", module.name());
        self.modules.push(module);
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Spawn one task per registered module
    pub fn start_all(&self, ctx: &ModuleContext) -> Vec<JoinHandle<()>> {
        self.modules
            .iter()
            .map(|module| {
                let module = module.clone();
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    info!("Starting module {}", module.name());
                    if let Err(e) = module.start(ctx).await {
                        error!("Module {} failed: {}", module.name(), e);
                    }
                })
            })
            .collect()
    }

    pub fn stop_all(&self) {
        for module in &self.modules {
            info!("Stopping module {}", module.name());
            module.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::blacklist::Blacklist;
    use crate::pool::tests::FakeDirectory;
    use crate::pool::Buckets;

    #[derive(Default)]
    struct Counter {
        started: AtomicUsize,
        stopped: AtomicUsize,
    }

    #[async_trait]
    impl Module for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        async fn start(&self, _ctx: ModuleContext) -> Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn context() -> ModuleContext {
        ModuleContext {
            pool: Arc::new(NationPool::new(
                Box::new(FakeDirectory::default()),
                Blacklist::new(),
                Buckets::default(),
            )),
            server_addr: "127.0.0.1:4526".parse().unwrap(),
            run_state: RunState::running(),
        }
    }

    #[tokio::test]
    async fn registry_starts_and_stops_everything() {
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());
        let mut registry = ModuleRegistry::new();
        registry.register(first.clone());
        registry.register(second.clone());
        assert_eq!(registry.names(), vec!["counter", "counter"]);

        for handle in registry.start_all(&context()) {
            handle.await.unwrap();
        }
        registry.stop_all();

        for module in [first, second] {
            assert_eq!(module.started.load(Ordering::SeqCst), 1);
            assert_eq!(module.stopped.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn empty_registry_spawns_nothing() {
        let registry = ModuleRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.start_all(&context()).is_empty());
    }
}
