//! Serial link throughput exerciser.
//!
//! A writer streams tails of a fixed 95-byte cycle buffer until a byte target
//! is reached; a reader on the other end drains delimiter-terminated chunks
//! and counts them. Both are driven from a flat `role key=value ...` argument
//! list, see [`dispatch`].

pub use config::{OverrideValue, Parity, PortConfig};
pub use dispatch::{CloseStatus, Invocation, Role, RunSummary, Transfer, dispatch, parse_args};
pub use interface::SerialLink;
pub use interface::serialport::SerialPortDevice;
pub use payload::{PAYLOAD_LEN, Payload};
pub use reader::{ReadReport, ReaderLoop};
pub use stop::StopFlag;
pub use writer::{WriteReport, WriterLoop};

pub mod config;
pub(crate) mod constants;
pub mod dispatch;
pub mod error;
pub mod interface;
pub mod logger;
pub mod payload;
pub mod reader;
pub mod stop;
pub(crate) mod util;
pub mod writer;
