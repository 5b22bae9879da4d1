#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use serthru::{
        CloseStatus, Parity, Payload, PortConfig, Role, SerialLink, StopFlag, Transfer, dispatch,
        error::{ThruError, ThruResult},
    };

    /// Loopback link: everything written comes back as delimiter-terminated
    /// chunks, with an optional timeout between reads.
    #[derive(Default)]
    struct Loopback {
        wire: Vec<u8>,
        write_sizes: Vec<usize>,
        max_accept: Option<usize>,
        chunks: VecDeque<Vec<u8>>,
        closes: usize,
    }

    impl Loopback {
        fn replay(&mut self) {
            let mut rest = self.wire.as_slice();
            while let Some(end) = rest.iter().position(|b| *b == b'\n') {
                self.chunks.push_back(rest[..=end].to_vec());
                self.chunks.push_back(Vec::new());
                rest = &rest[end + 1..];
            }
            if !rest.is_empty() {
                self.chunks.push_back(rest.to_vec());
            }
        }
    }

    impl SerialLink for Loopback {
        fn write(&mut self, bytes: &[u8]) -> ThruResult<usize> {
            let accepted = self.max_accept.map_or(bytes.len(), |m| m.min(bytes.len()));
            self.wire.extend_from_slice(&bytes[..accepted]);
            self.write_sizes.push(bytes.len());
            Ok(accepted)
        }

        fn read_until_delimiter(&mut self) -> ThruResult<Option<Vec<u8>>> {
            Ok(self.chunks.pop_front())
        }

        fn close(&mut self) -> ThruResult<()> {
            self.closes += 1;
            Ok(())
        }
    }

    #[test]
    fn writer_sends_exactly_the_target() {
        let mut opened = None;
        let summary = dispatch(
            &["writer", "total=200", "parity=O"],
            |config: &PortConfig| {
                opened = Some(config.clone());
                Ok(Loopback::default())
            },
            &StopFlag::new(),
        )
        .unwrap();

        let config = opened.unwrap();
        assert_eq!(config.parity, Parity::Odd);
        assert_eq!(config.baud_rate, 12_500_000);

        assert_eq!(summary.role, Role::Writer);
        assert_eq!(summary.total_bytes(), 200);
        assert_eq!(summary.close, CloseStatus::Closed);
        match summary.transfer {
            Transfer::Written(report) => {
                assert_eq!(report.target, 200);
                assert_eq!(report.write_calls, 20);
            }
            other => panic!("unexpected transfer {:?}", other),
        }
    }

    #[test]
    fn role_missing_opens_nothing() {
        let mut opened = false;
        let result = dispatch(
            &["baudrate=9600"],
            |_: &PortConfig| {
                opened = true;
                Ok(Loopback::default())
            },
            &StopFlag::new(),
        );

        assert!(matches!(result, Err(ThruError::Usage(_))));
        assert!(!opened);
    }

    #[test]
    fn open_failure_is_fatal() {
        let result = dispatch(
            &["reader"],
            |config: &PortConfig| -> ThruResult<Loopback> {
                Err(ThruError::PortUnavailable(config.port.clone()))
            },
            &StopFlag::new(),
        );

        assert!(matches!(result, Err(ThruError::PortUnavailable(_))));
    }

    #[test]
    fn reader_counts_what_writer_sent() {
        let target = 3 * 4560 + 17;
        let mut link = Loopback {
            max_accept: Some(40),
            ..Loopback::default()
        };
        let mut writer = serthru::WriterLoop::new(Payload::build(), target, target / 25);
        let written = writer.run(&mut link).unwrap();

        assert_eq!(written.written, target);
        assert_eq!(link.wire.len() as u64, target);
        assert!(writer.logged_lines() <= 26);
        // tails longer than 40 bytes were accepted partially
        assert!(link.write_sizes.iter().any(|n| *n > 40));

        link.replay();
        let read = serthru::ReaderLoop::new(949, 0).run(&mut link).unwrap();

        assert_eq!(read.received, target);
        assert!(read.timeouts > 0);
        assert_eq!(read.cycles_shown, 1);
    }

    #[test]
    fn every_chunk_ends_with_the_payload_tail() {
        let payload = Payload::build();
        let mut link = Loopback::default();
        serthru::WriterLoop::new(payload.clone(), 4560, 0)
            .run(&mut link)
            .unwrap();
        link.replay();

        let lines: Vec<Vec<u8>> = link.chunks.into_iter().filter(|c| !c.is_empty()).collect();
        assert_eq!(lines.len(), 95);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line.as_slice(), &payload[95 - (i + 1)..]);
        }
    }
}
