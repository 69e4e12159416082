use std::fmt;
use std::io::{self, Write};
use std::process::Stdio;
use std::sync::{Arc, Mutex};

/// A writer that can be handed to several sinks at once.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Where a child's standard output or standard error goes.
#[derive(Clone, Default)]
pub enum OutputSink {
    /// The parent's own stream.
    #[default]
    Inherit,
    /// Discarded.
    Null,
    /// Piped and copied into the writer.
    Writer(SharedWriter),
}

impl OutputSink {
    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        OutputSink::Writer(Arc::new(Mutex::new(writer)))
    }

    /// Sink backed by a file, truncating it.
    pub fn file(path: impl AsRef<std::path::Path>) -> io::Result<Self> {
        Ok(Self::writer(std::fs::File::create(path)?))
    }

    pub fn stdio(&self) -> Stdio {
        match self {
            OutputSink::Inherit => Stdio::inherit(),
            OutputSink::Null => Stdio::null(),
            OutputSink::Writer(_) => Stdio::piped(),
        }
    }

    pub fn is_piped(&self) -> bool {
        matches!(self, OutputSink::Writer(_))
    }

    /// Write `bytes` to the sink as the parent process.
    pub fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        match self {
            OutputSink::Inherit => {
                let mut out = io::stdout().lock();
                out.write_all(bytes)?;
                out.flush()
            }
            OutputSink::Null => Ok(()),
            OutputSink::Writer(writer) => {
                let mut writer = writer
                    .lock()
                    .map_err(|_| io::Error::new(io::ErrorKind::Other, "output sink lock poisoned"))?;
                writer.write_all(bytes)?;
                writer.flush()
            }
        }
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSink::Inherit => f.write_str("Inherit"),
            OutputSink::Null => f.write_str("Null"),
            OutputSink::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

impl From<CaptureBuffer> for OutputSink {
    fn from(buffer: CaptureBuffer) -> Self {
        OutputSink::writer(buffer)
    }
}

/// In-memory sink whose clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> Vec<u8> {
        match self.inner.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Captured output, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "capture buffer lock poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_clones_share_buffer() {
        let capture = CaptureBuffer::new();
        let sink: OutputSink = capture.clone().into();
        sink.write_all(b"hello ").unwrap();
        sink.write_all(b"world").unwrap();
        assert_eq!(capture.contents(), "hello world");
    }

    #[test]
    fn test_null_sink_discards() {
        assert!(OutputSink::Null.write_all(b"ignored").is_ok());
    }

    #[test]
    fn test_only_writer_sinks_are_piped() {
        assert!(!OutputSink::Inherit.is_piped());
        assert!(!OutputSink::Null.is_piped());
        assert!(OutputSink::from(CaptureBuffer::new()).is_piped());
    }

    #[test]
    fn test_default_sink_inherits() {
        assert!(matches!(OutputSink::default(), OutputSink::Inherit));
        assert_eq!(format!("{:?}", OutputSink::writer(Vec::<u8>::new())), "Writer(..)");
    }
}
