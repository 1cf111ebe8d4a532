//! Two-tier limiter for calls to the upstream directory.
//!
//! General calls share a budget of 50 requests per 62 second window.
//! Telegrams get one request per 180 second window and must also fit in the
//! general budget.
//!
//! Both `acquire_*` methods wait with `tokio::time::sleep` until the call is
//! permitted. Callers hold the pool lock while they wait, so a backoff on one
//! task stalls every other pool operation for the same duration.
use tokio::time::{self, Duration, Instant};
use tracing::{debug, warn};

pub const GENERAL_MAX_CALLS: u32 = 50;
pub const GENERAL_WINDOW: Duration = Duration::from_secs(62);
pub const GENERAL_BACKOFF: Duration = Duration::from_secs(62);
pub const TELEGRAM_MAX_CALLS: u32 = 1;
pub const TELEGRAM_WINDOW: Duration = Duration::from_secs(180);
pub const TELEGRAM_BACKOFF: Duration = Duration::from_secs(182);

/// Counters as seen from outside, for logging and tests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LimiterSnapshot {
    pub general_count: u32,
    pub telegram_count: u32,
}

#[derive(Clone, Debug, Default)]
pub struct RateLimiter {
    general_count: u32,
    telegram_count: u32,
    last_general_at: Option<Instant>,
    last_telegram_at: Option<Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> LimiterSnapshot {
        LimiterSnapshot {
            general_count: self.general_count,
            telegram_count: self.telegram_count,
        }
    }

    /// Wait until a general API call is allowed, then count it
    pub async fn acquire_general(&mut self) {
        loop {
            let now = Instant::now();
            if self.general_allowed(now) {
                self.record_general(now);
                return;
            }
            warn!(
                "General budget of {} calls exhausted, backing off {:?}",
                GENERAL_MAX_CALLS, GENERAL_BACKOFF
            );
            time::sleep(GENERAL_BACKOFF).await;
            self.general_count = 0;
        }
    }

    /// Wait until a telegram call is allowed, then count it.
    ///
    /// A refused telegram backs off and then only re-validates the general
    /// budget: once the backoff is over the call goes ahead without checking
    /// the telegram window again.
    pub async fn acquire_telegram(&mut self) {
        let now = Instant::now();
        if elapsed_since(self.last_telegram_at, now, TELEGRAM_WINDOW) {
            self.telegram_count = 0;
        }
        let telegram_allowed = elapsed_since(self.last_telegram_at, now, TELEGRAM_WINDOW)
            && self.telegram_count < TELEGRAM_MAX_CALLS;
        if self.general_allowed(now) && telegram_allowed {
            self.record_general(now);
            self.telegram_count += 1;
            self.last_telegram_at = Some(now);
            return;
        }
        warn!("Telegram budget exhausted, backing off {:?}", TELEGRAM_BACKOFF);
        time::sleep(TELEGRAM_BACKOFF).await;
        self.general_count = 0;
        self.acquire_general().await;
    }

    fn combined_count(&self) -> u32 {
        self.general_count + self.telegram_count
    }

    fn general_allowed(&self, now: Instant) -> bool {
        self.combined_count() < GENERAL_MAX_CALLS
            || elapsed_since(self.last_general_at, now, GENERAL_WINDOW)
    }

    fn record_general(&mut self, now: Instant) {
        if self.combined_count() >= GENERAL_MAX_CALLS {
            self.general_count = 0;
        }
        self.general_count += 1;
        self.last_general_at = Some(now);
        debug!(
            "API call permitted ({} general, {} telegram in window)",
            self.general_count, self.telegram_count
        );
    }
}

// A window with no previous call counts as elapsed
fn elapsed_since(last: Option<Instant>, now: Instant, window: Duration) -> bool {
    match last {
        Some(last) => now.saturating_duration_since(last) > window,
        None => true,
    }
}
