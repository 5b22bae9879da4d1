use tracing::info;

/// Emits a progress line each time a count-down value crosses the next
/// threshold, so a run produces about `total / granularity` lines no matter
/// how many write calls it takes.
#[derive(Debug, Clone)]
pub struct RateLimitedLogger {
    granularity: u64,
    next_threshold: i64,
    emitted: u64,
}

impl RateLimitedLogger {
    pub fn new(total_target: u64, granularity: u64) -> Self {
        RateLimitedLogger {
            granularity,
            next_threshold: total_target as i64 - granularity as i64,
            emitted: 0,
        }
    }

    /// Log `remaining` if it reached the current threshold. At most one line
    /// per call; returns whether a line was emitted.
    pub fn maybe_log(&mut self, remaining: i64) -> bool {
        // zero granularity disables periodic logging
        if self.granularity == 0 || remaining > self.next_threshold {
            return false;
        }

        info!("{} bytes remaining", remaining);
        self.next_threshold -= self.granularity as i64;
        self.emitted += 1;
        true
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}
