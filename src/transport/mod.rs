//! The text protocol clients use to borrow and return nations.
//!
//! One task per TCP connection; every command goes through the shared
//! [`NationPool`](crate::pool::NationPool).

pub mod commands;
pub mod connection;
pub mod tcp_server;

pub use commands::Command;
pub use connection::{Connection, ConnectionState, END_SENTINEL, GET_RETRY_DELAY, READ_BUFFER_SIZE};
pub use tcp_server::TcpServer;
