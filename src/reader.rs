use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::PortConfig;
use crate::error::ThruResult;
use crate::interface::SerialLink;
use crate::stop::StopFlag;

/// Outcome of one reader run
#[derive(Debug, Clone, PartialEq)]
pub struct ReadReport {
    pub received: u64,
    pub chunks: u64,
    pub timeouts: u64,
    /// How often the first chunk of a cycle was echoed
    pub cycles_shown: u64,
    pub elapsed: Duration,
}

/// Drains delimiter-terminated chunks and counts what arrives.
///
/// The first chunk of every `wrap_period` chunks is echoed so the data can be
/// eyeballed, and the running counters are logged whenever the chunk index
/// wraps.
pub struct ReaderLoop {
    wrap_period: u64,
    max_idle: u64,
    stop: StopFlag,
}

impl ReaderLoop {
    pub fn new(wrap_period: u64, max_idle: u64) -> Self {
        ReaderLoop {
            wrap_period,
            max_idle,
            stop: StopFlag::new(),
        }
    }

    pub fn from_config(config: &PortConfig) -> Self {
        Self::new(config.wrap_period, config.max_idle)
    }

    /// End the run once `stop` is raised, checked between reads
    pub fn stop_on(&mut self, stop: StopFlag) {
        self.stop = stop;
    }

    pub fn run<L: SerialLink + ?Sized>(&self, link: &mut L) -> ThruResult<ReadReport> {
        let started = Instant::now();
        let mut chunk_index = 0u64;
        let mut received = 0u64;
        let mut chunks = 0u64;
        let mut timeouts = 0u64;
        let mut idle = 0u64;
        let mut cycles_shown = 0u64;

        info!("Reading until the link closes");
        while !self.stop.is_raised() {
            let Some(chunk) = link.read_until_delimiter()? else {
                debug!("Link closed");
                break;
            };
            if chunk.is_empty() {
                timeouts += 1;
                idle += 1;
                if self.max_idle > 0 && idle >= self.max_idle {
                    debug!("{} reads in a row timed out, stopping", idle);
                    break;
                }
                continue;
            }
            idle = 0;

            received += chunk.len() as u64;
            chunks += 1;

            if chunk_index == 0 {
                info!("{}", echo_line(&chunk));
                cycles_shown += 1;
            }
            chunk_index += 1;
            if self.wrap_period > 0 && chunk_index > self.wrap_period - 1 {
                chunk_index -= self.wrap_period;
                info!("{} bytes in {} chunks received", received, chunks);
            }
        }

        Ok(ReadReport {
            received,
            chunks,
            timeouts,
            cycles_shown,
            elapsed: started.elapsed(),
        })
    }
}

/// The chunk as a one-tuple, e.g. `("}~\n",)`
fn echo_line(chunk: &[u8]) -> String {
    format!("{:?}", (String::from_utf8_lossy(chunk),))
}
