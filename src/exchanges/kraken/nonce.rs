use std::sync::atomic::{AtomicU64, Ordering};

/// Millisecond nonces that never repeat or go backwards, even when the
/// clock does not advance between calls.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    last: AtomicU64,
}

impl NonceGenerator {
    pub fn new() -> NonceGenerator {
        NonceGenerator::default()
    }

    pub fn next(&self) -> u64 {
        self.next_at(now_millis())
    }

    fn next_at(&self, now: u64) -> u64 {
        let previous = match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            }) {
            Ok(previous) | Err(previous) => previous,
        };
        now.max(previous + 1)
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
