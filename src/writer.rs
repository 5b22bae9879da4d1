use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::PortConfig;
use crate::error::ThruResult;
use crate::interface::SerialLink;
use crate::logger::RateLimitedLogger;
use crate::payload::Payload;
use crate::stop::StopFlag;
use crate::util::create_progress_bar;

/// Outcome of one writer run
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReport {
    pub target: u64,
    pub written: u64,
    /// Write calls issued, accepted or not
    pub write_calls: u64,
    /// Write calls that accepted nothing
    pub stalls: u64,
    pub elapsed: Duration,
}

/// Running byte count of a writer run. `remaining` only ever drops, by
/// exactly the bytes each write call accepted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TransferCounter {
    target: u64,
    remaining: i64,
    write_calls: u64,
    stalls: u64,
}

impl TransferCounter {
    pub(crate) fn new(target: u64) -> Self {
        TransferCounter {
            target,
            remaining: target as i64,
            write_calls: 0,
            stalls: 0,
        }
    }

    /// Account one write call; false when it accepted nothing
    pub(crate) fn record(&mut self, accepted: usize) -> bool {
        self.write_calls += 1;
        if accepted == 0 {
            self.stalls += 1;
            return false;
        }
        self.remaining -= accepted as i64;
        true
    }

    pub(crate) fn remaining(&self) -> i64 {
        self.remaining
    }

    pub(crate) fn written(&self) -> u64 {
        (self.target as i64 - self.remaining) as u64
    }
}

/// Streams growing tails of the payload until `target` bytes were accepted.
///
/// Each pass over the payload writes its last 1, 2, ..., 95 bytes, so the
/// device sees writes of every length up to a full cycle. Partial writes are
/// counted as sent and the loop moves on to the next tail; writes that accept
/// nothing are tallied as stalls and do not count.
pub struct WriterLoop {
    payload: Payload,
    target: u64,
    logger: RateLimitedLogger,
    progress: bool,
    stop: StopFlag,
}

impl WriterLoop {
    pub fn new(payload: Payload, target: u64, granularity: u64) -> Self {
        WriterLoop {
            payload,
            target,
            logger: RateLimitedLogger::new(target, granularity),
            progress: false,
            stop: StopFlag::new(),
        }
    }

    pub fn from_config(config: &PortConfig) -> Self {
        let mut writer = Self::new(
            Payload::build(),
            config.total_target(),
            config.log_granularity(),
        );
        writer.progress_bar(config.progress);
        writer
    }

    pub fn progress_bar(&mut self, enable: bool) {
        self.progress = enable;
    }

    /// End the run early once `stop` is raised, checked between writes
    pub fn stop_on(&mut self, stop: StopFlag) {
        self.stop = stop;
    }

    pub fn run<L: SerialLink + ?Sized>(&mut self, link: &mut L) -> ThruResult<WriteReport> {
        let started = Instant::now();
        let pb = create_progress_bar(self.target, "written", self.progress);
        let mut counter = TransferCounter::new(self.target);

        info!("Writing {} bytes", self.target);
        'cycles: while counter.remaining() > 0 {
            for tail_len in 1..=self.payload.len() {
                if self.stop.is_raised() {
                    info!("Stopped with {} bytes left to write", counter.remaining());
                    break 'cycles;
                }

                let slice = self.payload.tail(tail_len, counter.remaining() as usize);
                let accepted = link.write(slice)?;
                if !counter.record(accepted) {
                    continue;
                }

                self.logger.maybe_log(counter.remaining());
                pb.set_position(counter.written().min(self.target));

                if counter.remaining() <= 0 {
                    break;
                }
            }
        }
        pb.finish_and_clear();

        let written = counter.written();
        if written != self.target && !self.stop.is_raised() {
            warn!(
                "Device accepted {} bytes, the run asked for {}",
                written, self.target
            );
        }

        Ok(WriteReport {
            target: self.target,
            written,
            write_calls: counter.write_calls,
            stalls: counter.stalls,
            elapsed: started.elapsed(),
        })
    }

    pub fn logged_lines(&self) -> u64 {
        self.logger.emitted()
    }
}
