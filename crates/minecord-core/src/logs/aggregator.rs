use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Source name for process-level diagnostics
pub const SYSTEM_SOURCE: &str = "system";

/// Default per-source ring capacity
pub const DEFAULT_LOG_CAPACITY: usize = 300;

const BROADCAST_CAPACITY: usize = 1_024;

/// Kind of log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Plain diagnostic
    Log,
    /// Warning
    Warn,
    /// Error
    Error,
    /// Game chat line
    Chat,
    /// Connection status line
    Status,
}

impl LogLevel {
    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Chat => "chat",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch
    pub ts: u64,
    /// Kind of line
    pub level: LogLevel,
    /// Line text
    pub text: String,
    /// `system` or an endpoint name
    #[serde(rename = "bot")]
    pub source: String,
}

/// Every buffer, keyed by source
pub type LogSnapshot = BTreeMap<String, Vec<LogEntry>>;

/// Bounded per-source log buffers with live streaming
#[derive(Debug)]
pub struct LogAggregator {
    buffers: Mutex<BTreeMap<String, VecDeque<LogEntry>>>,
    capacity: usize,
    tx: broadcast::Sender<LogEntry>,
}

impl LogAggregator {
    /// Create an aggregator keeping at most `capacity` entries per source.
    ///
    /// The `system` buffer always exists.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let mut buffers = BTreeMap::new();
        buffers.insert(SYSTEM_SOURCE.to_string(), VecDeque::new());
        Self {
            buffers: Mutex::new(buffers),
            capacity: capacity.max(1),
            tx,
        }
    }

    /// Per-source capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Create an empty buffer for `source` if it has none
    pub fn ensure_source(&self, source: &str) {
        self.lock()
            .entry(source.to_string())
            .or_insert_with(VecDeque::new);
    }

    /// Whether `source` has a buffer
    #[must_use]
    pub fn has_source(&self, source: &str) -> bool {
        self.lock().contains_key(source)
    }

    /// Known sources
    #[must_use]
    pub fn sources(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Append a line and broadcast it
    pub fn push(&self, source: impl Into<String>, level: LogLevel, text: impl Into<String>) {
        let entry = LogEntry {
            ts: u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0),
            level,
            text: text.into(),
            source: source.into(),
        };

        // Broadcast while holding the lock; subscribe() relies on it
        let mut buffers = self.lock();
        let ring = buffers
            .entry(entry.source.clone())
            .or_insert_with(VecDeque::new);
        if ring.len() >= self.capacity {
            ring.pop_front();
        }
        ring.push_back(entry.clone());
        let _ = self.tx.send(entry);
    }

    /// Append a line built from space-joined parts
    pub fn push_parts<I, T>(&self, source: impl Into<String>, level: LogLevel, parts: I)
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        let text = parts
            .into_iter()
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.push(source, level, text);
    }

    /// Copy of every buffer
    #[must_use]
    pub fn snapshot(&self) -> LogSnapshot {
        snapshot_of(&self.lock())
    }

    /// Entries of one source, oldest first
    #[must_use]
    pub fn entries(&self, source: &str) -> Vec<LogEntry> {
        self.lock()
            .get(source)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot plus a receiver of every later entry
    #[must_use]
    pub fn subscribe(&self) -> LogSubscription {
        let buffers = self.lock();
        LogSubscription {
            snapshot: snapshot_of(&buffers),
            receiver: self.tx.subscribe(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, VecDeque<LogEntry>>> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LogAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

fn snapshot_of(buffers: &BTreeMap<String, VecDeque<LogEntry>>) -> LogSnapshot {
    buffers
        .iter()
        .map(|(source, ring)| (source.clone(), ring.iter().cloned().collect()))
        .collect()
}

/// Item delivered to a [`LogSubscription`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFeed {
    /// The next entry
    Entry(LogEntry),
    /// The subscriber fell behind and this many entries were skipped
    Lagged(u64),
}

/// Snapshot and live stream taken at the same instant
#[derive(Debug)]
pub struct LogSubscription {
    /// Buffers at subscription time
    pub snapshot: LogSnapshot,
    receiver: broadcast::Receiver<LogEntry>,
}

impl LogSubscription {
    /// Wait for the next entry. `None` once the aggregator is gone.
    pub async fn recv(&mut self) -> Option<LogFeed> {
        match self.receiver.recv().await {
            Ok(entry) => Some(LogFeed::Entry(entry)),
            Err(broadcast::error::RecvError::Lagged(n)) => Some(LogFeed::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Next entry if one is already buffered
    pub fn try_recv(&mut self) -> Option<LogFeed> {
        match self.receiver.try_recv() {
            Ok(entry) => Some(LogFeed::Entry(entry)),
            Err(broadcast::error::TryRecvError::Lagged(n)) => Some(LogFeed::Lagged(n)),
            Err(_) => None,
        }
    }
}
