//! Tracing subscriber setup shared by Nova hosts and tests.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Once, OnceLock};

use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt, TestWriter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// A plain level (`debug`) or filter directives such as `info,nova.impact=trace`.
    pub level: String,

    /// Emit one JSON object per event.
    pub json: bool,

    /// Mirror events to stderr.
    pub stderr: bool,

    /// Lines kept by the in-memory [`LogBuffer`].
    #[schemars(range(min = 1))]
    pub buffer_lines: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
            stderr: true,
            buffer_lines: Self::DEFAULT_BUFFER_LINES,
        }
    }
}

impl LoggingConfig {
    pub const DEFAULT_BUFFER_LINES: usize = 2_000;

    /// Canonical spelling for plain levels; anything else passes through as directives.
    pub(crate) fn normalize_level_directives(level: &str) -> String {
        let level = level.trim();
        let canonical = match level.to_ascii_lowercase().as_str() {
            "" => "info",
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" | "warning" => "warn",
            "error" => "error",
            _ => return level.to_owned(),
        };
        canonical.to_owned()
    }

    /// The configured directives followed by `RUST_LOG`, when that is set and parses.
    pub fn env_filter(&self) -> EnvFilter {
        let configured = Self::normalize_level_directives(&self.level);
        let from_env = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        if let Some(from_env) = from_env {
            if let Ok(filter) = EnvFilter::try_new(format!("{configured},{from_env}")) {
                return filter;
            }
        }
        EnvFilter::try_new(&configured)
            .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::INFO.into()))
    }
}

/// The most recent formatted log lines, kept for bug reports.
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            lines: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_line(&self, line: String) {
        let mut lines = self.lines.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Up to `n` lines, oldest first.
    pub fn last_lines(&self, n: usize) -> Vec<String> {
        let lines = self.lines.lock();
        let skip = lines.len().saturating_sub(n);
        lines.iter().skip(skip).cloned().collect()
    }
}

struct BufferSink(Arc<LogBuffer>);

impl<'a> MakeWriter<'a> for BufferSink {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter {
            buffer: Arc::clone(&self.0),
            pending: Vec::new(),
        }
    }
}

/// Collects the output of one event; lines reach the buffer on drop.
struct BufferWriter {
    buffer: Arc<LogBuffer>,
    pending: Vec<u8>,
}

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for BufferWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.pending);
        for line in text.lines().filter(|line| !line.is_empty()) {
            self.buffer.push_line(line.to_owned());
        }
    }
}

static GLOBAL_LOG_BUFFER: OnceLock<Arc<LogBuffer>> = OnceLock::new();

pub fn global_log_buffer() -> Arc<LogBuffer> {
    GLOBAL_LOG_BUFFER
        .get_or_init(|| Arc::new(LogBuffer::new(LoggingConfig::DEFAULT_BUFFER_LINES)))
        .clone()
}

/// Installs the global `tracing` subscriber.
///
/// Only the first call installs anything; every call returns the shared [`LogBuffer`].
pub fn init_tracing(logging: &LoggingConfig) -> Arc<LogBuffer> {
    static INIT: Once = Once::new();

    let buffer = GLOBAL_LOG_BUFFER
        .get_or_init(|| Arc::new(LogBuffer::new(logging.buffer_lines)))
        .clone();

    INIT.call_once(|| {
        let sink = BoxMakeWriter::new(BufferSink(Arc::clone(&buffer)));
        let writer = match (logging.stderr, cfg!(debug_assertions)) {
            (false, _) => sink,
            // Goes through `eprint!`, so the test harness captures it.
            (true, true) => BoxMakeWriter::new(sink.and(TestWriter::with_stderr)),
            (true, false) => BoxMakeWriter::new(sink.and(io::stderr)),
        };

        let fmt = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if logging.json {
            fmt.json().boxed()
        } else {
            fmt.boxed()
        };

        let subscriber = tracing_subscriber::registry()
            .with(logging.env_filter())
            .with(layer);
        // A host may already have installed its own subscriber.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });

    buffer
}
