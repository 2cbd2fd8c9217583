use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Per-origin politeness window. Each origin gets at most one request slot
/// every `delay`.
pub struct HostPacer {
    delay: Duration,
    ready_at: DashMap<String, Instant>,
}

impl HostPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ready_at: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.delay.is_zero()
    }

    /// Reserves the next slot for `origin` and sleeps until it opens.
    pub async fn wait(&self, origin: &str) {
        if !self.is_enabled() {
            return;
        }
        let slot = {
            let now = Instant::now();
            let mut entry = self.ready_at.entry(origin.to_string()).or_insert(now);
            let slot = (*entry).max(now);
            *entry = slot + self.delay;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }

    pub fn tracked_origins(&self) -> usize {
        self.ready_at.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_same_origin_is_spaced() {
        let pacer = HostPacer::new(Duration::from_millis(100));
        let start = Instant::now();
        pacer.wait("http://a.test").await;
        pacer.wait("http://a.test").await;
        pacer.wait("http://a.test").await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_origins_are_independent() {
        let pacer = HostPacer::new(Duration::from_millis(100));
        let start = Instant::now();
        pacer.wait("http://a.test").await;
        pacer.wait("http://b.test").await;
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(pacer.tracked_origins(), 2);
    }

    #[tokio::test]
    async fn test_disabled_pacer_does_not_track() {
        let pacer = HostPacer::new(Duration::ZERO);
        pacer.wait("http://a.test").await;
        assert_eq!(pacer.tracked_origins(), 0);
    }
}
