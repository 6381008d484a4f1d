//! # Shutdown Coordination
//!
//! One-shot latch shared by every exit path plus the stop flag the
//! background tasks watch.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

#[derive(Debug)]
pub struct Shutdown {
    fired: AtomicBool,
    stop_tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            fired: AtomicBool::new(false),
            stop_tx,
        }
    }

    /// Receiver that turns true once shutdown begins
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    /// Raise the stop flag.
    ///
    /// Returns true only for the first caller, who owns the cleanup.
    pub fn begin(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.stop_tx.send_replace(true);
        true
    }

    pub fn has_begun(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_fires_once() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.has_begun());
        assert!(shutdown.begin());
        assert!(!shutdown.begin());
        assert!(shutdown.has_begun());
    }

    #[tokio::test]
    async fn test_subscribers_see_stop_flag() {
        let shutdown = Shutdown::new();
        let mut early = shutdown.subscribe();
        assert!(!*early.borrow());

        shutdown.begin();
        early.changed().await.unwrap();
        assert!(*early.borrow());

        // Late subscribers see the current value
        assert!(*shutdown.subscribe().borrow());
    }
}
