use std::io::Write;
use std::ops::Deref;

use crate::constants::{DELIMITER, PAYLOAD_FIRST, PAYLOAD_LAST};

/// Number of bytes in one payload cycle
pub const PAYLOAD_LEN: usize = (PAYLOAD_LAST - PAYLOAD_FIRST) as usize + 2;

/// One cycle of test data: every printable ASCII byte followed by a line feed.
///
/// The writer never sends anything but tails of this buffer, so a reader
/// splitting on the delimiter sees lines of varying length that all end with
/// the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Vec<u8>,
}

impl Payload {
    pub fn build() -> Self {
        let mut bytes: Vec<u8> = (PAYLOAD_FIRST..=PAYLOAD_LAST).collect();
        bytes.push(DELIMITER);

        Payload { bytes }
    }

    /// Last `len` bytes of the cycle, truncated to at most `limit` bytes
    pub fn tail(&self, len: usize, limit: usize) -> &[u8] {
        let start = self.bytes.len() - len.min(self.bytes.len());
        let end = start.saturating_add(limit).min(self.bytes.len());
        &self.bytes[start..end]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write one raw cycle to `out`, e.g. to diff against a capture
    pub fn dump<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(self.as_bytes())?;
        out.flush()
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::build()
    }
}

impl Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}
