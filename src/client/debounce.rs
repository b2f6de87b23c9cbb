use std::time::Duration;

use tokio::time::Instant;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Holds the latest input until it has been left alone for `delay`.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replaces the pending value and restarts the timer.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Releases the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(at) if now >= at => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn releases_only_after_quiet_period() {
        let mut d = Debounce::new(SEARCH_DEBOUNCE);
        let t0 = Instant::now();
        d.push("a", t0);
        d.push("ab", t0 + Duration::from_millis(300));

        assert_eq!(d.poll(t0 + Duration::from_millis(700)), None);
        assert_eq!(d.poll(t0 + Duration::from_millis(800)), Some("ab"));
        assert_eq!(d.poll(t0 + Duration::from_secs(5)), None);
        assert!(d.deadline().is_none());
    }
}
