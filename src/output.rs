//! Shared output device for progress lines and structured records.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// How progress and errors are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON document per record.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format \"{other}\", expected text or json")),
        }
    }
}

/// A cloneable, thread-safe writer.
///
/// Every clone writes to the same sink; each call holds the lock for one
/// complete line or record, so lines from different resources never tear.
#[derive(Clone)]
pub struct OutputDevice {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputDevice {
    /// Wrap any writer.
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Device writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Device writing to an in-memory buffer, returned alongside it.
    #[must_use]
    pub fn buffer() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Write one line, appending a newline.
    ///
    /// # Errors
    ///
    /// Propagates the underlying writer's I/O error.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut sink = self.sink.lock();
        writeln!(sink, "{line}")?;
        sink.flush()
    }

    /// Write one pretty-printed JSON record.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if serialisation or the write fails.
    pub fn write_json<S>(&self, record: &S) -> io::Result<()>
    where
        S: Serialize + ?Sized,
    {
        let encoded = serde_json::to_string_pretty(record).map_err(io::Error::other)?;
        self.write_line(&encoded)
    }
}

impl fmt::Debug for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputDevice").finish_non_exhaustive()
    }
}

/// In-memory sink readable while devices still write to it.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Everything written so far, lossily decoded as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Written lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_concurrent_lines_do_not_interleave() {
        let (device, buffer) = OutputDevice::buffer();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let device = device.clone();
                thread::spawn(move || {
                    for j in 0..50 {
                        device.write_line(&format!("writer-{i} line-{j}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let lines = buffer.lines();
        assert_eq!(lines.len(), 200);
        assert!(lines.iter().all(|l| l.starts_with("writer-") && l.contains(" line-")));
    }

    #[test]
    fn test_write_json_record() {
        let (device, buffer) = OutputDevice::buffer();
        device.write_json(&serde_json::json!({"step": "migrate-data"})).unwrap();
        let value: serde_json::Value = serde_json::from_str(&buffer.contents()).unwrap();
        assert_eq!(value["step"], "migrate-data");
    }
}
