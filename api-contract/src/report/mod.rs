//! The report sink and the records written to it.
//!
//! Everything a scenario produces ends up as markdown blocks in one sink:
//! one block per HTTP exchange, one per finished step, and a summary when the
//! scenario finishes. Every block is written with a single call while the
//! sink's lock is held, so blocks from concurrent exchanges never interleave.

pub mod markdown;

use crate::{
    data::Headers,
    error::Error,
    interceptor::{Exchange, ExchangeOutcome},
    step::{StepRecord, StepStatus},
};
use lazy_static::lazy_static;
use std::{
    collections::HashMap,
    fmt,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

lazy_static! {
    static ref CONSOLE_SINK: Arc<ReportSink> = Arc::new(ReportSink::new(ConsoleWriter));
    static ref FILE_SINKS: Mutex<HashMap<PathBuf, Arc<ReportSink>>> = Mutex::new(HashMap::new());
}

/// Request half of a [`LogRecord`], captured before the call goes out.
#[derive(Debug, Clone)]
pub struct LogRecordDraft {
    number: u64,
    timestamp: OffsetDateTime,
    method: String,
    url: String,
    request_headers: Headers,
    request_body: String,
}

impl LogRecordDraft {
    pub fn from_exchange(exchange: &Exchange) -> Self {
        let request = exchange.logged_request();
        Self {
            number: exchange.number(),
            timestamp: exchange.timestamp(),
            method: request.method.to_string(),
            url: request.url.clone(),
            request_headers: request.headers.clone(),
            request_body: request.body.clone(),
        }
    }

    pub fn finish(self, outcome: ExchangeOutcome, elapsed: Duration) -> Result<LogRecord, Error> {
        let timestamp = self
            .timestamp
            .format(&Rfc3339)
            .map_err(|e| Error::LoggingFailure(format!("couldn't format timestamp: {}", e)))?;

        let mut record = LogRecord {
            number: self.number,
            timestamp,
            method: self.method,
            url: self.url,
            request_headers: self.request_headers,
            request_body: self.request_body,
            outcome,
            elapsed,
            rendered: String::new(),
        };
        record.rendered = markdown::render_exchange(&record)
            .map_err(|e| Error::LoggingFailure(format!("couldn't render exchange: {}", e)))?;

        Ok(record)
    }
}

/// A captured HTTP exchange. Never changes once created.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    number: u64,
    timestamp: String,
    method: String,
    url: String,
    request_headers: Headers,
    request_body: String,
    outcome: ExchangeOutcome,
    elapsed: Duration,
    rendered: String,
}

impl LogRecord {
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn request_headers(&self) -> &Headers {
        &self.request_headers
    }

    pub fn request_body(&self) -> &str {
        &self.request_body
    }

    pub fn outcome(&self) -> &ExchangeOutcome {
        &self.outcome
    }

    pub fn status_code(&self) -> Option<u16> {
        match &self.outcome {
            ExchangeOutcome::Response(response) => Some(response.status_code),
            ExchangeOutcome::Failure(_) => None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

pub struct ReportSink {
    writer: Mutex<Box<dyn Write + Send>>,
    interactions: AtomicU64,
}

impl ReportSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            interactions: AtomicU64::new(0),
        }
    }

    /// The process-wide sink printing to the test output.
    pub fn console() -> Arc<ReportSink> {
        CONSOLE_SINK.clone()
    }

    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self::new(File::create(path)?))
    }

    /// The process-wide sink for a report file.
    ///
    /// The file is truncated when the first scenario opens it. Later scenarios
    /// writing to the same path get the same sink, so their blocks are
    /// appended under one lock.
    pub fn shared_file<P: AsRef<Path>>(path: P) -> Result<Arc<ReportSink>, Error> {
        let path = canonical_report_path(path.as_ref())?;
        let mut sinks = FILE_SINKS.lock()?;

        if let Some(sink) = sinks.get(&path) {
            return Ok(sink.clone());
        }

        let sink = Arc::new(Self::file(&path)?);
        sinks.insert(path, sink.clone());

        Ok(sink)
    }

    pub fn in_memory() -> (Self, MemoryReport) {
        let report = MemoryReport::default();
        (Self::new(report.clone()), report)
    }

    /// Writes one block. The lock is held for exactly this write.
    pub fn append(&self, block: &str) -> Result<(), Error> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::LoggingFailure("the report sink lock was poisoned".into()))?;

        writer
            .write_all(block.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| Error::LoggingFailure(e.to_string()))
    }

    /// Hands out interaction numbers, starting at 1.
    pub fn next_interaction(&self) -> u64 {
        self.interactions.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl fmt::Debug for ReportSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportSink")
            .field("interactions", &self.interactions.load(Ordering::SeqCst))
            .finish()
    }
}

fn canonical_report_path(path: &Path) -> Result<PathBuf, Error> {
    let file_name = path.file_name().ok_or_else(|| {
        Error::Configuration(format!("report path {} has no file name", path.display()))
    })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    Ok(fs::canonicalize(parent)?.join(file_name))
}

/// Writes to stdout; a closed or broken stdout is an `io::Error`, not a panic.
struct ConsoleWriter;

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Report kept in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryReport {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryReport {
    pub fn contents(&self) -> String {
        let buffer = self
            .buffer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Write for MemoryReport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory report lock poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything recorded for one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepRecord>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.steps
            .iter()
            .all(|step| step.status == StepStatus::Succeeded)
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|step| step.name == name)
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Failed)
    }
}
