//! Rolling in-memory log buffer.
//!
//! [`LogBufferLayer`] renders every event that passes the subscriber's
//! filter as one line and appends it to a [`LogSink`]. The default sink,
//! [`RollingLogBuffer`], keeps the most recent `capacity` lines.

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Default number of lines kept by [`RollingLogBuffer`].
pub const DEFAULT_LOG_BUFFER_LINES: usize = 200;

/// Destination for rendered log lines.
pub trait LogSink: Send + Sync {
    fn append(&self, line: String);
}

/// Bounded buffer of the most recent log lines. Oldest lines are evicted first.
#[derive(Debug)]
pub struct RollingLogBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl Default for RollingLogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_BUFFER_LINES)
    }
}

impl RollingLogBuffer {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Copy of the buffered lines, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }
}

impl LogSink for RollingLogBuffer {
    fn append(&self, line: String) {
        let mut lines = self.lines.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }
}

/// Tracing layer that mirrors events into a [`LogSink`].
///
/// Line format: `[HH:MM:SS] LEVEL target: message key=value ...`
pub struct LogBufferLayer {
    sink: Arc<dyn LogSink>,
}

impl LogBufferLayer {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }
}

impl<S: Subscriber> Layer<S> for LogBufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let meta = event.metadata();
        let line = format!(
            "[{}] {} {}: {}",
            Local::now().format("%H:%M:%S"),
            meta.level(),
            meta.target(),
            visitor.finish()
        );
        self.sink.append(line);
    }
}

/// Collects the message and the structured fields of one event.
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields
        } else {
            format!("{} {}", self.message, self.fields)
        }
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}
