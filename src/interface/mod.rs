pub mod serialport;

use crate::error::ThruResult;

/// What the throughput loops need from a serial device
pub trait SerialLink {
    /// Write as much of `bytes` as the device accepts right now and return
    /// how many bytes that was. 0 means backpressure, not an error.
    fn write(&mut self, bytes: &[u8]) -> ThruResult<usize>;

    /// Block until the delimiter arrives or the timeout elapses.
    /// `Some(empty)` on a timeout without data, `None` once the device is closed.
    fn read_until_delimiter(&mut self) -> ThruResult<Option<Vec<u8>>>;

    /// Drain pending output and release the device
    fn close(&mut self) -> ThruResult<()>;
}
