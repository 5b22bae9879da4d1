use std::io::{ErrorKind, Read, Write};

use tracing::{debug, info, trace};

use super::SerialLink;
use crate::config::{Parity, PortConfig};
use crate::constants::{DELIMITER, READ_CHUNK_SIZE};
use crate::error::{ThruError, ThruResult};

/// Serial port backed by the `serialport` crate
pub struct SerialPortDevice {
    serial_port: Box<dyn serialport::SerialPort>,
    pending: Vec<u8>,
}

impl SerialPortDevice {
    pub fn open(config: &PortConfig) -> ThruResult<SerialPortDevice> {
        let parity = match config.parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
            other => {
                return Err(ThruError::PortUnavailable(format!(
                    "{}: parity {:?} is not supported by this platform",
                    config.port, other
                )));
            }
        };
        let stop_bits = match config.stop_bits {
            1 => serialport::StopBits::One,
            _ => serialport::StopBits::Two,
        };

        let serial_port = serialport::new(config.port.as_str(), config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(serialport::FlowControl::None)
            .timeout(config.timeout())
            .open()
            .map_err(|e| ThruError::PortUnavailable(format!("{}: {}", config.port, e)))?;

        // Stale bytes from an earlier run would skew the counters
        serial_port
            .clear(serialport::ClearBuffer::All)
            .map_err(|e| ThruError::PortUnavailable(format!("{}: {}", config.port, e)))?;

        info!("Opened {}", config);
        Ok(SerialPortDevice {
            serial_port,
            pending: Vec::with_capacity(READ_CHUNK_SIZE),
        })
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|b| *b == DELIMITER)?;
        let rest = self.pending.split_off(end + 1);
        Some(std::mem::replace(&mut self.pending, rest))
    }
}

impl SerialLink for SerialPortDevice {
    fn write(&mut self, bytes: &[u8]) -> ThruResult<usize> {
        match self.serial_port.write(bytes) {
            Ok(accepted) => {
                trace!("Wrote {} of {} bytes", accepted, bytes.len());
                Ok(accepted)
            }
            // Backpressure, not progress
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                trace!("Write of {} bytes stalled: {}", bytes.len(), e);
                Ok(0)
            }
            Err(e) => Err(ThruError::Communication(format!("{:?}", e))),
        }
    }

    fn read_until_delimiter(&mut self) -> ThruResult<Option<Vec<u8>>> {
        let mut buffer = [0u8; READ_CHUNK_SIZE];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            match self.serial_port.read(&mut buffer) {
                Ok(0) => {
                    debug!("Serial port reported end of stream");
                    if self.pending.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(std::mem::take(&mut self.pending)));
                }
                Ok(size) => self.pending.extend_from_slice(&buffer[..size]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                // Timeout is fine, hand back whatever arrived so far
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    return Ok(Some(std::mem::take(&mut self.pending)));
                }
                Err(e) => return Err(ThruError::Communication(format!("{:?}", e))),
            }
        }
    }

    fn close(&mut self) -> ThruResult<()> {
        self.serial_port.flush().map_err(|e| {
            ThruError::Communication(format!("Failed to drain output buffer, {}", e))
        })?;
        debug!("Closed serial port");

        Ok(())
    }
}
