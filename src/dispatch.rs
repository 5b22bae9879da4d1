use std::fmt;
use std::fs::File;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::PortConfig;
use crate::error::{ThruError, ThruResult};
use crate::interface::SerialLink;
use crate::payload::Payload;
use crate::reader::{ReadReport, ReaderLoop};
use crate::stop::StopFlag;
use crate::writer::{WriteReport, WriterLoop};

pub const USAGE: &str = "expected a role, usage: serthru <reader|writer|dump> [key=value ...]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Reader,
    Writer,
    /// Write the payload to a file or stdout, no device involved
    Dump,
}

impl Role {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "reader" => Some(Role::Reader),
            "writer" => Some(Role::Writer),
            "dump" => Some(Role::Dump),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Reader => write!(f, "reader"),
            Role::Writer => write!(f, "writer"),
            Role::Dump => write!(f, "dump"),
        }
    }
}

/// A role together with the configuration it runs with
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub role: Role,
    pub config: PortConfig,
}

/// Split raw arguments into a role and configuration overrides.
///
/// Role tokens are picked out first (the last one wins), then every other
/// token is applied in order as `key=value`, or as `key=true` when it has
/// no `=`.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> ThruResult<Invocation> {
    let role = args
        .iter()
        .filter_map(|arg| Role::from_token(arg.as_ref()))
        .last()
        .ok_or_else(|| ThruError::Usage(USAGE.to_owned()))?;

    let mut config = PortConfig::default();
    for arg in args {
        let token: &str = arg.as_ref();
        if Role::from_token(token).is_some() {
            continue;
        }
        match token.split_once('=') {
            Some((key, value)) => config.apply_override(key, value),
            None => config.apply_flag(token),
        }
    }

    Ok(Invocation { role, config })
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloseStatus {
    Closed,
    Failed(String),
}

impl fmt::Display for CloseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseStatus::Closed => write!(f, "ok"),
            CloseStatus::Failed(e) => write!(f, "failed ({})", e),
        }
    }
}

/// Loop-specific counters of a finished run
#[derive(Debug, Clone, PartialEq)]
pub enum Transfer {
    Written(WriteReport),
    Read(ReadReport),
    /// Payload bytes dumped
    Dumped(u64),
}

/// Final record of a run, printed once at exit
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub role: Role,
    pub config: PortConfig,
    pub transfer: Transfer,
    pub close: CloseStatus,
}

impl RunSummary {
    /// Bytes written or received
    pub fn total_bytes(&self) -> u64 {
        match &self.transfer {
            Transfer::Written(report) => report.written,
            Transfer::Read(report) => report.received,
            Transfer::Dumped(bytes) => *bytes,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match &self.transfer {
            Transfer::Written(report) => report.elapsed,
            Transfer::Read(report) => report.elapsed,
            Transfer::Dumped(_) => Duration::ZERO,
        }
    }

    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.total_bytes() as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role={} {} total_count={}", self.role, self.config, self.total_bytes())?;
        match &self.transfer {
            Transfer::Written(report) => write!(
                f,
                " target={} write_calls={} stalls={}",
                report.target, report.write_calls, report.stalls
            )?,
            Transfer::Read(report) => write!(
                f,
                " chunks={} timeouts={}",
                report.chunks, report.timeouts
            )?,
            Transfer::Dumped(_) => write!(
                f,
                " out={}",
                self.config.dump_path.as_deref().unwrap_or("stdout")
            )?,
        }
        write!(
            f,
            " elapsed={:.3}s rate={:.0}B/s close={}",
            self.elapsed().as_secs_f64(),
            self.bytes_per_sec(),
            self.close
        )
    }
}

impl Invocation {
    /// Run the selected loop on an already open link, then close it.
    /// The link is closed exactly once, also when the loop fails or `stop`
    /// ends it early.
    pub fn execute<L: SerialLink + ?Sized>(
        self,
        link: &mut L,
        stop: &StopFlag,
    ) -> ThruResult<RunSummary> {
        let outcome = match self.role {
            Role::Writer => {
                let mut writer = WriterLoop::from_config(&self.config);
                writer.stop_on(stop.clone());
                writer.run(link).map(Transfer::Written)
            }
            Role::Reader => {
                let mut reader = ReaderLoop::from_config(&self.config);
                reader.stop_on(stop.clone());
                reader.run(link).map(Transfer::Read)
            }
            Role::Dump => dump_payload(&self.config).map(Transfer::Dumped),
        };

        let close = match link.close() {
            Ok(()) => CloseStatus::Closed,
            Err(e) => {
                warn!("Closing {} failed: {}", self.config.port, e);
                CloseStatus::Failed(e.to_string())
            }
        };

        let summary = RunSummary {
            role: self.role,
            config: self.config,
            transfer: outcome?,
            close,
        };
        debug!("Finished: {}", summary);
        Ok(summary)
    }
}

/// Write the payload where `config` says, returning the byte count
fn dump_payload(config: &PortConfig) -> ThruResult<u64> {
    let payload = Payload::build();
    let result = match &config.dump_path {
        Some(path) => File::create(path).and_then(|mut file| payload.dump(&mut file)),
        None => payload.dump(&mut std::io::stdout().lock()),
    };
    result.map_err(|e| ThruError::Output(format!("Failed to dump payload: {}", e)))?;

    Ok(payload.len() as u64)
}

/// Parse `args`, open the link with `open` and run the selected role until
/// it finishes or `stop` is raised. Nothing is opened when the arguments
/// carry no role, or for `dump`.
pub fn dispatch<S, L, F>(args: &[S], open: F, stop: &StopFlag) -> ThruResult<RunSummary>
where
    S: AsRef<str>,
    L: SerialLink,
    F: FnOnce(&PortConfig) -> ThruResult<L>,
{
    let invocation = parse_args(args)?;

    if invocation.role == Role::Dump {
        let bytes = dump_payload(&invocation.config)?;
        return Ok(RunSummary {
            role: invocation.role,
            config: invocation.config,
            transfer: Transfer::Dumped(bytes),
            close: CloseStatus::Closed,
        });
    }

    info!("Running {} on {}", invocation.role, invocation.config.port);
    let mut link = open(&invocation.config)?;
    invocation.execute(&mut link, stop)
}
