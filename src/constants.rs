pub(crate) const DEFAULT_BAUD_RATE: u32 = 12_500_000;
#[cfg(windows)]
pub(crate) const DEFAULT_PORT: &str = "COM1";
#[cfg(not(windows))]
pub(crate) const DEFAULT_PORT: &str = "/dev/ttyTHS0";
pub(crate) const DEFAULT_STOP_BITS: u8 = 2;
pub(crate) const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Roughly this many progress lines per writer run
pub(crate) const DEFAULT_LOG_DIVISOR: u64 = 25;

pub(crate) const PAYLOAD_FIRST: u8 = 33;
pub(crate) const PAYLOAD_LAST: u8 = 126;
pub(crate) const DELIMITER: u8 = b'\n';

pub(crate) const READ_CHUNK_SIZE: usize = 1024;
