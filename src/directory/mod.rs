//! Access to the upstream nation directory
use async_trait::async_trait;

pub mod gateway;
pub mod parse;

use crate::error::Result;
use crate::record::NationRecord;
pub use gateway::DirectoryGateway;

/// The upstream calls the pool depends on.
///
/// Implementations rate-limit themselves; methods take `&mut self` because
/// the limiter state changes on every call. The pool only calls these while
/// holding its lock.
#[async_trait]
pub trait Directory: Send {
    /// Recently founded nations: `name`, `founding_region`, `founded_at`
    async fn fetch_foundings(&mut self) -> Result<Vec<NationRecord>>;

    /// Full attribute map for one nation; `NotFound` if upstream has no such nation
    async fn fetch_nation(&mut self, name: &str) -> Result<NationRecord>;

    /// Whether the nation may currently receive a recruitment telegram
    async fn fetch_recruitable(&mut self, name: &str, region: Option<&str>) -> Result<bool>;

    /// Send the configured recruitment telegram to `recipient`
    async fn send_telegram(&mut self, recipient: &str) -> Result<()>;
}
