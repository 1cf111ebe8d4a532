pub mod blacklist;
pub mod cli;
pub mod directory;
pub mod error;
pub mod limiters;
pub mod modules;
pub mod persistence;
pub mod pool;
pub mod record;
pub mod run_state;
pub mod server;
pub mod settings;
pub mod transport;
