//! Tasks run by the worker for stored pictures, shots and print requests.

use crate::core::picture::PictureRef;
use crate::error::DeviceError;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Input for a worker task
#[derive(Debug, Clone, Copy)]
pub enum Job<'a> {
    /// Encoded bytes to be kept under `filename`
    Store { data: &'a [u8], filename: &'a str },
    /// An already stored picture selected for postprocessing
    Postprocess { picture_ref: &'a PictureRef },
}

impl Job<'_> {
    /// File the job is about
    pub fn target(&self) -> &str {
        match self {
            Job::Store { filename, .. } => filename,
            Job::Postprocess { picture_ref } => &picture_ref.original,
        }
    }
}

/// Trait for tasks the worker runs in sequence
pub trait WorkerTask: Send {
    /// Task name used in failure reports
    fn name(&self) -> &'static str;

    fn run(&mut self, job: &Job<'_>) -> Result<(), DeviceError>;
}

/// Writes stored bytes to disk
#[derive(Debug, Default, Clone, Copy)]
pub struct PictureSaver;

impl WorkerTask for PictureSaver {
    fn name(&self) -> &'static str {
        "picture saver"
    }

    fn run(&mut self, job: &Job<'_>) -> Result<(), DeviceError> {
        let Job::Store { data, filename } = job else {
            return Ok(());
        };
        let path = Path::new(filename);
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| DeviceError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, data).map_err(|source| DeviceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(filename, bytes = data.len(), "Saved picture");
        Ok(())
    }
}

/// Counts the jobs it sees; clones share the value
#[derive(Debug, Clone)]
pub struct Counter {
    label: &'static str,
    value: Arc<AtomicU32>,
}

impl Counter {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            value: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn value(&self) -> u32 {
        self.value.load(Ordering::SeqCst)
    }
}

impl WorkerTask for Counter {
    fn name(&self) -> &'static str {
        "counter"
    }

    fn run(&mut self, _job: &Job<'_>) -> Result<(), DeviceError> {
        let value = self.value.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(counter = self.label, value, "Counter incremented");
        Ok(())
    }
}

/// One line of the event log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub kind: &'static str,
    pub target: String,
}

/// Records what happened to which file, with a timestamp.
///
/// Only the most recent entries are kept.
#[derive(Debug, Clone)]
pub struct EventLog {
    kind: &'static str,
    capacity: usize,
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl EventLog {
    /// Entries kept by [`EventLog::new`]
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new(kind: &'static str) -> Self {
        Self::with_capacity(kind, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(kind: &'static str, capacity: usize) -> Self {
        Self {
            kind,
            capacity,
            entries: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// A log for `kind` that appends to the same entries as `self`
    pub fn with_kind(&self, kind: &'static str) -> Self {
        Self {
            kind,
            capacity: self.capacity,
            entries: Arc::clone(&self.entries),
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl WorkerTask for EventLog {
    fn name(&self) -> &'static str {
        "event log"
    }

    fn run(&mut self, job: &Job<'_>) -> Result<(), DeviceError> {
        let entry = LogEntry {
            timestamp: Local::now(),
            kind: self.kind,
            target: job.target().to_string(),
        };
        info!(
            kind = entry.kind,
            target = %entry.target,
            at = %entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            "Event logged"
        );
        let mut entries = self.entries.lock().map_err(|_| DeviceError::Task {
            task: self.name().to_string(),
            reason: "log poisoned".to_string(),
        })?;
        if self.capacity == 0 {
            return Ok(());
        }
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }
}

/// Collects print requests until the printer driver takes them.
///
/// When the queue is full the oldest request is dropped.
#[derive(Debug, Clone)]
pub struct PrintQueue {
    capacity: usize,
    jobs: Arc<Mutex<VecDeque<PictureRef>>>,
}

impl PrintQueue {
    /// Requests kept by [`PrintQueue::new`]
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            jobs: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Pictures waiting to be printed, oldest first
    pub fn jobs(&self) -> Vec<PictureRef> {
        self.jobs
            .lock()
            .map(|jobs| jobs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove and return every waiting picture, oldest first
    pub fn take(&self) -> Vec<PictureRef> {
        self.jobs
            .lock()
            .map(|mut jobs| jobs.drain(..).collect())
            .unwrap_or_default()
    }
}

impl Default for PrintQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerTask for PrintQueue {
    fn name(&self) -> &'static str {
        "print queue"
    }

    fn run(&mut self, job: &Job<'_>) -> Result<(), DeviceError> {
        let Job::Postprocess { picture_ref } = job else {
            return Ok(());
        };
        let mut jobs = self.jobs.lock().map_err(|_| DeviceError::Task {
            task: self.name().to_string(),
            reason: "queue poisoned".to_string(),
        })?;
        if jobs.len() >= self.capacity {
            if let Some(dropped) = jobs.pop_front() {
                warn!(picture = %dropped, "Print queue full, dropping oldest request");
            }
        }
        if self.capacity > 0 {
            info!(picture = %picture_ref, "Queued for printing");
            jobs.push_back((*picture_ref).clone());
        }
        Ok(())
    }
}
