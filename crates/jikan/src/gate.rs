use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Minimum spacing between two outbound request dispatches.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(500);

/// Serializing gate that spaces out request dispatches to the upstream API.
///
/// The dispatch timestamp is recorded before the HTTP call is issued, not
/// after it completes, so slow responses may still overlap in flight. Only
/// dispatch times are guaranteed to be spaced apart.
#[derive(Debug)]
pub struct RequestGate {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RequestGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Wait until the spacing requirement is met, then claim a dispatch slot.
    ///
    /// Holding the lock across the sleep serializes concurrent callers, so
    /// each waiter claims its own slot at least `min_interval` after the
    /// previous one.
    pub async fn wait(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new(MIN_REQUEST_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_sequential_dispatches() {
        let gate = RequestGate::default();

        let mut timestamps = Vec::new();
        for _ in 0..4 {
            gate.wait().await;
            timestamps.push(Instant::now());
        }

        for pair in timestamps.windows(2) {
            assert!(pair[1] - pair[0] >= MIN_REQUEST_INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spaces_concurrent_dispatches() {
        let gate = Arc::new(RequestGate::default());

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move {
                    gate.wait().await;
                    Instant::now()
                })
            })
            .collect();

        let mut timestamps = Vec::new();
        for handle in handles {
            timestamps.push(handle.await.unwrap());
        }
        timestamps.sort();

        for pair in timestamps.windows(2) {
            assert!(pair[1] - pair[0] >= MIN_REQUEST_INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_delay_after_long_idle() {
        let gate = RequestGate::default();

        gate.wait().await;
        sleep(Duration::from_secs(5)).await;

        let before = Instant::now();
        gate.wait().await;
        assert_eq!(Instant::now(), before);
    }
}
