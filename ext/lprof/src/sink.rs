use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::ProfilerError;
use crate::frame::FrameRecord;
use crate::serialization::{self, text};
use crate::session::configuration::TraceFormat;

/// Destination for completed call trees. A session owns exactly one sink
/// and drops it on close.
pub trait TraceSink {
    /// Receives the records of one tree in pop order.
    fn emit(&mut self, records: &[FrameRecord]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Serializes trees into any writer, buffered.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: BufWriter<W>,
    format: TraceFormat,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, format: TraceFormat, print_header: bool) -> io::Result<Self> {
        let mut writer = BufWriter::new(writer);
        if print_header && format == TraceFormat::Text {
            text::write_header(&mut writer)?;
        }
        Ok(Self { writer, format })
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> TraceSink for WriterSink<W> {
    fn emit(&mut self, records: &[FrameRecord]) -> io::Result<()> {
        serialization::write_tree(&mut self.writer, self.format, records)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

pub type FileSink = WriterSink<File>;

impl WriterSink<File> {
    /// Creates (or truncates) the trace file at `path`.
    pub fn create(path: &Path, format: TraceFormat, print_header: bool) -> Result<Self, ProfilerError> {
        let unavailable = |source: io::Error| ProfilerError::SinkUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(unavailable)?;
        let mut sink = Self::new(file, format, print_header).map_err(unavailable)?;
        sink.flush().map_err(unavailable)?;
        Ok(sink)
    }
}

/// Keeps trees in memory. Clones share the same storage, so a caller can
/// hand one clone to a session and inspect the other.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    trees: Arc<Mutex<Vec<Vec<FrameRecord>>>>,
    flushes: Arc<AtomicUsize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trees(&self) -> Vec<Vec<FrameRecord>> {
        self.trees.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl TraceSink for MemorySink {
    fn emit(&mut self, records: &[FrameRecord]) -> io::Result<()> {
        self.trees
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(records.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
