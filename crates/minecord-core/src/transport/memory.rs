//! In-process game connector for tests
//!
//! Every `connect` creates a [`MemorySession`] controller the test can use to
//! raise transport events, and records every line the manager sends.

use super::{GameConnector, GameLink, GameSession, TransportEvent};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Events a test can raise before the manager reads any
const SESSION_BUFFER: usize = 1_024;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scriptable [`GameConnector`]
#[derive(Clone, Default)]
pub struct MemoryConnector {
    sessions: Arc<Mutex<Vec<MemorySession>>>,
    sent: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicUsize>,
    failing_connects: Arc<AtomicUsize>,
    failing_sends: Arc<AtomicBool>,
    manual_spawn: Arc<AtomicBool>,
}

impl MemoryConnector {
    /// Connector whose sessions spawn immediately
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector whose sessions wait for [`MemorySession::spawn`]
    #[must_use]
    pub fn manual() -> Self {
        let connector = Self::default();
        connector.manual_spawn.store(true, Ordering::SeqCst);
        connector
    }

    /// Fail the next `n` connect attempts
    pub fn fail_next_connects(&self, n: usize) {
        self.failing_connects.store(n, Ordering::SeqCst);
    }

    /// Make every link's `send_chat_line` fail (or succeed again)
    pub fn fail_sends(&self, fail: bool) {
        self.failing_sends.store(fail, Ordering::SeqCst);
    }

    /// Number of connect attempts so far
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of sessions opened so far
    #[must_use]
    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }

    /// The most recently opened session
    #[must_use]
    pub fn last_session(&self) -> Option<MemorySession> {
        lock(&self.sessions).last().cloned()
    }

    /// Every line sent through any session, in order
    #[must_use]
    pub fn sent_lines(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl GameConnector for MemoryConnector {
    async fn connect(&self, _config: &ConnectionConfig) -> Result<GameSession> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failing_connects.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_connects.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Transport("simulated connect failure".to_string()));
        }

        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        let session = MemorySession {
            events: tx,
            alive: Arc::new(AtomicBool::new(true)),
        };
        if !self.manual_spawn.load(Ordering::SeqCst) {
            session.emit(TransportEvent::Spawned);
        }
        lock(&self.sessions).push(session.clone());

        let link = MemoryLink {
            alive: session.alive.clone(),
            events: session.events.clone(),
            sent: self.sent.clone(),
            failing_sends: self.failing_sends.clone(),
        };
        Ok(GameSession::new(Box::new(link), rx))
    }
}

/// Test-side controller of one in-memory session
#[derive(Clone)]
pub struct MemorySession {
    events: mpsc::Sender<TransportEvent>,
    alive: Arc<AtomicBool>,
}

impl MemorySession {
    /// Raise a transport event
    pub fn emit(&self, event: TransportEvent) {
        if event == TransportEvent::Disconnected {
            self.alive.store(false, Ordering::SeqCst);
        }
        let _ = self.events.try_send(event);
    }

    /// Raise `Spawned`
    pub fn spawn(&self) {
        self.emit(TransportEvent::Spawned);
    }

    /// Simulate the server dropping the connection
    pub fn drop_connection(&self) {
        self.emit(TransportEvent::Disconnected);
    }

    /// Whether the manager (or the test) closed this session
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.alive.load(Ordering::SeqCst)
    }
}

struct MemoryLink {
    alive: Arc<AtomicBool>,
    events: mpsc::Sender<TransportEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    failing_sends: Arc<AtomicBool>,
}

impl GameLink for MemoryLink {
    fn send_chat_line(&self, text: &str) -> Result<()> {
        if self.failing_sends.load(Ordering::SeqCst) {
            return Err(Error::Transport("simulated send failure".to_string()));
        }
        if !self.is_alive() {
            return Err(Error::Transport("session is closed".to_string()));
        }
        lock(&self.sent).push(text.to_string());
        Ok(())
    }

    fn close(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            let _ = self.events.try_send(TransportEvent::Disconnected);
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}
