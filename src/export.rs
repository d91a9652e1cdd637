//! Session-scoped CSV export of computed effective-window values.

use crate::{effective::EffectiveWindow, flow::FlowKey};
use csv::Writer;
use std::{
    fs::File,
    io::Write,
    path::PathBuf,
};

/// Column order of the export file.
const HEADER: [&str; 6] = ["time", "flow", "effwin", "cwnd_est", "rwnd", "bytes_in_flight"];

/// Resolved export settings, supplied by the host application.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub path: PathBuf,
    /// Write one row per this many recordable observations. Values
    /// below 1 are treated as 1 (a row for every observation).
    pub throttle: u64,
}

/// An error raised while opening or writing the export destination.
///
/// The engine reacts by disabling export for the rest of the session;
/// packet processing is never interrupted by one of these.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// The open export destination for one capture session.
///
/// Owns its writer exclusively. Every accepted row is flushed
/// immediately so a crash or disable mid-session leaves a readable
/// file.
pub struct ExportSink<W: Write> {
    writer: Writer<W>,
    write_count: u64,
    throttle: u64,
}

impl ExportSink<Box<dyn Write + Send>> {
    /// Opens the configured destination file and writes the header
    /// row.
    pub fn open(config: &ExportConfig) -> Result<Self, ExportError> {
        let file = File::create(&config.path)?;
        Self::from_writer(Box::new(file), config.throttle)
    }
}

impl<W: Write> ExportSink<W> {
    /// Wraps an already-open destination and writes the header row.
    pub fn from_writer(writer: W, throttle: u64) -> Result<Self, ExportError> {
        let mut writer = Writer::from_writer(writer);
        writer.write_record(HEADER)?;
        writer.flush()?;
        Ok(Self {
            writer,
            write_count: 0,
            throttle: throttle.max(1),
        })
    }

    /// Counts one recordable observation and writes its row if the
    /// throttle interval has come around.
    pub fn record(
        &mut self,
        timestamp: f64,
        flow: &FlowKey,
        window: &EffectiveWindow,
    ) -> Result<(), ExportError> {
        self.write_count += 1;
        if self.write_count % self.throttle != 0 {
            return Ok(());
        }
        self.writer.write_record([
            format!("{timestamp:.6}"),
            flow.to_string(),
            window.value.to_string(),
            format!("{:.0}", window.cwnd_estimate),
            window.scaled_rwnd.unwrap_or(0).to_string(),
            window.bytes_in_flight.unwrap_or(0).to_string(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and drops the handle. Called on session end; dropping
    /// the sink without calling this still flushes via the writer's
    /// own drop.
    pub fn close(mut self) {
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effective::effective_window;
    use std::io;
    use std::net::SocketAddr;

    /// Accepts a fixed number of underlying writes, then reports the
    /// destination gone.
    struct FailingWriter {
        budget: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink went away"));
            }
            self.budget -= 1;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("effwin-{}-{name}.csv", std::process::id()))
    }

    fn flow() -> FlowKey {
        let src: SocketAddr = "10.0.0.1:443".parse().unwrap();
        let dst: SocketAddr = "10.0.0.2:52234".parse().unwrap();
        FlowKey::new(Some(0), src, dst)
    }

    fn read_rows(path: &PathBuf) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|record| record.unwrap().iter().map(str::to_owned).collect())
            .collect()
    }

    #[test]
    fn header_and_row_format() {
        let path = temp_path("format");
        let mut sink = ExportSink::open(&ExportConfig {
            path: path.clone(),
            throttle: 1,
        })
        .unwrap();
        let window = effective_window(Some(65535), 65535.0, Some(32767)).unwrap();
        sink.record(0.001202, &flow(), &window).unwrap();
        sink.close();

        let rows = read_rows(&path);
        assert_eq!(rows[0], HEADER);
        assert_eq!(
            rows[1],
            [
                "0.001202",
                "10.0.0.1:443>10.0.0.2:52234",
                "32768",
                "65535",
                "65535",
                "32767",
            ]
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn throttle_keeps_every_nth_row() {
        let path = temp_path("throttle");
        let mut sink = ExportSink::open(&ExportConfig {
            path: path.clone(),
            throttle: 3,
        })
        .unwrap();
        let window = effective_window(Some(8192), 8192.0, Some(100)).unwrap();
        for n in 0..10 {
            sink.record(f64::from(n) * 0.001, &flow(), &window).unwrap();
        }
        sink.close();

        // floor(10 / 3) data rows plus the header.
        let rows = read_rows(&path);
        assert_eq!(rows.len(), 1 + 3);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn throttle_below_one_means_every_row() {
        let path = temp_path("throttle-zero");
        let mut sink = ExportSink::open(&ExportConfig {
            path: path.clone(),
            throttle: 0,
        })
        .unwrap();
        let window = effective_window(Some(8192), 8192.0, None).unwrap();
        for n in 0..4 {
            sink.record(f64::from(n), &flow(), &window).unwrap();
        }
        sink.close();
        assert_eq!(read_rows(&path).len(), 1 + 4);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_fields_export_as_zero() {
        let path = temp_path("missing");
        let mut sink = ExportSink::open(&ExportConfig {
            path: path.clone(),
            throttle: 1,
        })
        .unwrap();
        let window = effective_window(None, 300.0, Some(300)).unwrap();
        sink.record(0.5, &flow(), &window).unwrap();
        sink.close();

        let rows = read_rows(&path);
        assert_eq!(rows[1][2], "0");
        assert_eq!(rows[1][4], "0");
        assert_eq!(rows[1][5], "300");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unwritable_destination_fails_open() {
        let config = ExportConfig {
            path: PathBuf::from("/nonexistent-effwin-dir/out.csv"),
            throttle: 1,
        };
        assert!(ExportSink::open(&config).is_err());
    }

    #[test]
    fn write_failure_surfaces_an_error() {
        // One write of budget covers the header flush; the first row
        // then hits the dead destination.
        let mut sink = ExportSink::from_writer(FailingWriter { budget: 1 }, 1).unwrap();
        let window = effective_window(Some(100), 100.0, None).unwrap();
        assert!(sink.record(0.0, &flow(), &window).is_err());
    }

    #[test]
    fn header_failure_fails_construction() {
        assert!(ExportSink::from_writer(FailingWriter { budget: 0 }, 1).is_err());
    }
}
