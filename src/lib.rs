extern crate serialport;

pub mod config;
pub mod error;
pub mod output;
pub mod protocol;

use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

pub use config::{AcquisitionConfig, PortSettings};
pub use error::{Error, Result};
use protocol::Sample;

#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// The requested number of samples was collected.
    Complete(Vec<Sample>),
    /// The caller asked us to stop early; holds whatever arrived until then.
    Cancelled(Vec<Sample>),
}

impl Outcome {
    pub fn samples(&self) -> &[Sample] {
        match self {
            Outcome::Complete(samples) | Outcome::Cancelled(samples) => samples,
        }
    }

    pub fn into_samples(self) -> Vec<Sample> {
        match self {
            Outcome::Complete(samples) | Outcome::Cancelled(samples) => samples,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete(_))
    }
}

/// Acquisition collects a fixed number of samples from a line-oriented
/// source. It knows nothing about serial ports: anything implementing BufRead
/// will do, which is also what the tests rely on.
pub struct Acquisition {
    sample_count: usize,
    samples: Vec<Sample>,
    lines_received: usize,
}

impl Acquisition {
    pub fn new(sample_count: usize) -> Acquisition {
        Acquisition {
            sample_count,
            samples: Vec::with_capacity(sample_count),
            lines_received: 0,
        }
    }

    fn is_complete(&self) -> bool {
        self.samples.len() >= self.sample_count
    }

    fn process_line(&mut self, raw: &[u8]) -> Result<()> {
        self.lines_received += 1;
        let line = self.lines_received;
        let sample = protocol::decode_line(raw)
            .and_then(protocol::parse_line)
            .map_err(|source| Error::Parse { line, source })?;
        if let Some(sample) = sample {
            log::debug!(
                "sample {}/{}: {}",
                self.samples.len() + 1,
                self.sample_count,
                sample.to_line()
            );
            self.samples.push(sample);
        }
        Ok(())
    }

    /// Read until `sample_count` samples have been collected, the source
    /// reaches EOF, or `cancel` is set.
    ///
    /// `cancel` is only checked between reads, so for a timely reaction the
    /// reader must time out periodically (TimedOut and WouldBlock are treated
    /// as "nothing yet", never as failures). Data read before a timeout is
    /// kept, lines may therefore arrive in several pieces.
    pub fn run(mut self, reader: &mut dyn BufRead, cancel: &AtomicBool) -> Result<Outcome> {
        let mut buf = Vec::with_capacity(64);
        loop {
            if self.is_complete() {
                return Ok(Outcome::Complete(self.samples));
            }
            if cancel.load(Ordering::Relaxed) {
                log::info!(
                    "acquisition cancelled after {}/{} samples",
                    self.samples.len(),
                    self.sample_count
                );
                return Ok(Outcome::Cancelled(self.samples));
            }

            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    // EOF. Devices don't always terminate their final line.
                    if !buf.is_empty() {
                        self.process_line(&buf)?;
                        buf.clear();
                        if self.is_complete() {
                            continue;
                        }
                    }
                    return Err(Error::ConnectionClosed {
                        collected: self.samples.len(),
                        expected: self.sample_count,
                    });
                }
                Ok(_) => (),
                Err(error) => match error.kind() {
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                        continue;
                    }
                    _ => return Err(error.into()),
                },
            };

            // No newline means read_until stopped at EOF, which the next read
            // will report.
            if buf.last() != Some(&b'\n') {
                continue;
            }
            self.process_line(&buf)?;
            buf.clear();
        }
    }
}

/// Open the configured port, collect samples, close the port and write the
/// samples to the configured output file. A cancelled acquisition still
/// writes the samples collected so far.
pub fn run_to_file(config: &AcquisitionConfig, cancel: &AtomicBool) -> Result<Outcome> {
    config.validate()?;

    let port = config.port.open()?;
    log::info!(
        "reading {} samples from {} at {} baud",
        config.sample_count,
        config.port.path,
        config.port.baud_rate
    );
    acquire_to_file(
        std::io::BufReader::new(port),
        config.sample_count,
        &config.output_path,
        cancel,
    )
}

/// Collect `sample_count` samples from `reader` and write them to
/// `output_path`. The reader (and with it the port) is dropped before the
/// file is written. Nothing is written if the acquisition fails.
pub fn acquire_to_file<R: BufRead>(
    mut reader: R,
    sample_count: usize,
    output_path: &Path,
    cancel: &AtomicBool,
) -> Result<Outcome> {
    let outcome = Acquisition::new(sample_count).run(&mut reader, cancel)?;
    drop(reader);

    if !outcome.is_complete() {
        log::warn!(
            "writing partial data: {} of {} samples",
            outcome.samples().len(),
            sample_count
        );
    }
    output::write_to_path(output_path, outcome.samples())?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::{BufReader, Cursor, Read};
    use std::sync::Arc;

    enum Chunk {
        Data(&'static [u8]),
        Timeout,
    }

    // Replays a fixed script of reads, emulating a serial port with a short
    // read timeout. Optionally requests cancellation on the first timeout.
    struct ScriptedPort {
        chunks: VecDeque<Chunk>,
        cancel_on_timeout: Option<Arc<AtomicBool>>,
    }

    impl ScriptedPort {
        fn new(chunks: Vec<Chunk>) -> ScriptedPort {
            ScriptedPort {
                chunks: chunks.into(),
                cancel_on_timeout: None,
            }
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            match self.chunks.pop_front() {
                None => Ok(0),
                Some(Chunk::Timeout) => {
                    if let Some(cancel) = &self.cancel_on_timeout {
                        cancel.store(true, Ordering::Relaxed);
                    }
                    Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "Operation timed out",
                    ))
                }
                Some(Chunk::Data(data)) => {
                    assert!(data.len() <= out.len(), "test chunk too large");
                    out[..data.len()].copy_from_slice(data);
                    Ok(data.len())
                }
            }
        }
    }

    fn run(input: &'static str, sample_count: usize) -> Result<Outcome> {
        let mut reader = Cursor::new(input.as_bytes());
        Acquisition::new(sample_count).run(&mut reader, &AtomicBool::new(false))
    }

    #[test]
    fn test_collects_requested_samples() {
        let outcome = run("1.0,2.0,3.0\n4,5,6\r\n-7.5,8.25,9\n", 3).unwrap();
        assert_eq!(
            outcome,
            Outcome::Complete(vec![
                Sample([1.0, 2.0, 3.0]),
                Sample([4.0, 5.0, 6.0]),
                Sample([-7.5, 8.25, 9.0]),
            ])
        );
    }

    #[test]
    fn test_stops_reading_once_complete() {
        // The trailing garbage must never be parsed.
        let outcome = run("1,2,3\n4,5,6\nnot a sample\n", 2).unwrap();
        assert!(outcome.is_complete());
        assert_eq!(outcome.samples().len(), 2);
    }

    #[test]
    fn test_blank_lines_are_not_samples() {
        let outcome = run("\n1,2,3\n\r\n   \n4,5,6\n", 2).unwrap();
        assert_eq!(
            outcome.into_samples(),
            vec![Sample([1.0, 2.0, 3.0]), Sample([4.0, 5.0, 6.0])]
        );
    }

    #[test]
    fn test_unterminated_final_line() {
        let outcome = run("1,2,3\n4,5,6", 2).unwrap();
        assert_eq!(outcome.samples()[1], Sample([4.0, 5.0, 6.0]));
    }

    #[test]
    fn test_eof_before_complete() {
        match run("1,2,3\n\n", 3) {
            Err(Error::ConnectionClosed {
                collected,
                expected,
            }) => {
                assert_eq!(collected, 1);
                assert_eq!(expected, 3);
            }
            other => panic!("expected ConnectionClosed, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_reports_line() {
        match run("1,2,3\n\n1,2\n4,5,6\n", 3) {
            Err(Error::Parse { line, source }) => {
                assert_eq!(line, 3);
                assert_eq!(source.received_message, "1,2");
            }
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8() {
        let mut reader = Cursor::new(b"1,2,3\n\xff\xfe,2,3\n".to_vec());
        let result = Acquisition::new(2).run(&mut reader, &AtomicBool::new(false));
        assert!(matches!(result, Err(Error::Parse { line: 2, .. })));
    }

    #[test]
    fn test_line_split_across_timeouts() {
        let port = ScriptedPort::new(vec![
            Chunk::Data(b"1.5,2"),
            Chunk::Timeout,
            Chunk::Data(b".5,3"),
            Chunk::Timeout,
            Chunk::Timeout,
            Chunk::Data(b".5\n7,8,9\n"),
        ]);
        let mut reader = BufReader::new(port);
        let outcome = Acquisition::new(2)
            .run(&mut reader, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Complete(vec![Sample([1.5, 2.5, 3.5]), Sample([7.0, 8.0, 9.0])])
        );
    }

    #[test]
    fn test_cancel_before_start() {
        let mut reader = Cursor::new(b"1,2,3\n".to_vec());
        let outcome = Acquisition::new(1)
            .run(&mut reader, &AtomicBool::new(true))
            .unwrap();
        assert_eq!(outcome, Outcome::Cancelled(vec![]));
    }

    #[test]
    fn test_cancel_keeps_collected_samples() {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut port = ScriptedPort::new(vec![
            Chunk::Data(b"1,2,3\n"),
            Chunk::Data(b"4,5"),
            Chunk::Timeout,
            Chunk::Data(b",6\n"),
        ]);
        port.cancel_on_timeout = Some(cancel.clone());
        let mut reader = BufReader::new(port);

        let outcome = Acquisition::new(10).run(&mut reader, &cancel).unwrap();
        // The partial "4,5" line is dropped along with everything after it.
        assert_eq!(outcome, Outcome::Cancelled(vec![Sample([1.0, 2.0, 3.0])]));
    }

    #[test]
    fn test_other_io_errors_abort() {
        struct BrokenPort;
        impl Read for BrokenPort {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "device unplugged",
                ))
            }
        }
        let mut reader = BufReader::new(BrokenPort);
        let result = Acquisition::new(1).run(&mut reader, &AtomicBool::new(false));
        assert!(matches!(result, Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_acquire_to_file_writes_every_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        let input = "0.5,1,-2\r\n3.25,4,5e-5\n\n6,7,8\n9,10,11\n";

        let outcome =
            acquire_to_file(Cursor::new(input), 3, &path, &AtomicBool::new(false)).unwrap();

        assert!(outcome.is_complete());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "0.5, 1.0, -2.0\n3.25, 4.0, 5e-05\n6.0, 7.0, 8.0\n"
        );
    }

    #[test]
    fn test_acquire_to_file_cancelled_writes_partial_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        let cancel = Arc::new(AtomicBool::new(false));
        let mut port = ScriptedPort::new(vec![
            Chunk::Data(b"1,2,3\n"),
            Chunk::Data(b"4,5,6\n"),
            Chunk::Timeout,
            Chunk::Data(b"7,8,9\n"),
        ]);
        port.cancel_on_timeout = Some(cancel.clone());

        let outcome = acquire_to_file(BufReader::new(port), 5, &path, &cancel).unwrap();

        assert!(!outcome.is_complete());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "1.0, 2.0, 3.0\n4.0, 5.0, 6.0\n"
        );
    }

    #[test]
    fn test_acquire_to_file_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");

        let result = acquire_to_file(
            Cursor::new("1,2,3\n4,5\n"),
            2,
            &path,
            &AtomicBool::new(false),
        );

        assert!(matches!(result, Err(Error::Parse { line: 2, .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_run_to_file_rejects_invalid_config() {
        let config = AcquisitionConfig {
            sample_count: 0,
            ..AcquisitionConfig::default()
        };
        let result = run_to_file(&config, &AtomicBool::new(false));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_run_to_file_missing_port() {
        let dir = tempfile::tempdir().unwrap();
        let config = AcquisitionConfig {
            port: PortSettings {
                path: dir
                    .path()
                    .join("no-such-tty")
                    .to_string_lossy()
                    .into_owned(),
                ..PortSettings::default()
            },
            output_path: dir.path().join("output.txt"),
            ..AcquisitionConfig::default()
        };
        let result = run_to_file(&config, &AtomicBool::new(false));
        assert!(matches!(result, Err(Error::Serial(_))), "got {result:?}");
        // Nothing is written when the port can't be opened.
        assert!(!config.output_path.exists());
    }
}
