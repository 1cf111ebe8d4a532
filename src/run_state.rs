//! The server-wide running flag.
//!
//! Loops check it only at their head. A task blocked on the network or in a
//! rate-limit backoff notices a stop once that wait completes, so shutdown
//! latency is unbounded.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct RunState {
    running: Arc<AtomicBool>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running() -> Self {
        let state = Self::new();
        state.start();
        state
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let state = RunState::running();
        let other = state.clone();
        assert!(other.is_running());
        state.stop();
        assert!(!other.is_running());
    }
}
