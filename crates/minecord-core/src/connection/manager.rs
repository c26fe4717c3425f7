use super::backoff::Backoff;
use super::phase::Phase;
use super::queue::{OutboundQueue, DEFAULT_QUEUE_CAPACITY};
use super::state::{ConnectionState, ConnectionStatus};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::event_bus::{ConnectionEvent, EventBus};
use crate::transport::{GameConnector, GameSession, TransportEvent};
use chrono::Utc;
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Tuning knobs for a [`ConnectionManager`]
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Reconnect delay policy
    pub backoff: Backoff,
    /// Delay between queued sends
    pub flush_delay: Duration,
    /// Outbound queue capacity
    pub queue_capacity: usize,
    /// Event bus capacity
    pub event_capacity: usize,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            backoff: Backoff::default(),
            flush_delay: Duration::from_millis(1_000),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            event_capacity: 256,
        }
    }
}

/// Outcome of [`ConnectionManager::send_chat`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReport {
    /// Sent, or accepted into the queue
    pub ok: bool,
    /// Waiting in the outbound queue
    pub queued: bool,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendReport {
    /// Delivered to the transport
    #[must_use]
    pub fn sent() -> Self {
        Self {
            ok: true,
            queued: false,
            error: None,
        }
    }

    /// Accepted into the outbound queue
    #[must_use]
    pub fn queued() -> Self {
        Self {
            ok: true,
            queued: true,
            error: None,
        }
    }

    /// Rejected or failed
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            queued: false,
            error: Some(error.into()),
        }
    }
}

enum Command {
    Start(oneshot::Sender<bool>),
    Stop(oneshot::Sender<()>),
    ReconnectNow(oneshot::Sender<()>),
    SendChat(String, oneshot::Sender<SendReport>),
}

/// Handle to one endpoint's connection task.
///
/// All state lives in the task; the handle only sends commands and reads the
/// latest published [`ConnectionStatus`]. Dropping the last handle ends the
/// task and closes the transport.
pub struct ConnectionManager {
    config: Arc<ConnectionConfig>,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
    events: EventBus,
}

impl ConnectionManager {
    /// Spawn the manager task in the idle phase
    pub fn spawn(
        config: ConnectionConfig,
        connector: Arc<dyn GameConnector>,
        options: ManagerOptions,
    ) -> Arc<Self> {
        let config = Arc::new(config);
        let events = EventBus::new(options.event_capacity);
        let state = ConnectionState::new();
        let (status_tx, status_rx) = watch::channel(state.project(&config, Utc::now()));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let worker = Worker {
            config: config.clone(),
            connector,
            state,
            queue: OutboundQueue::new(options.queue_capacity),
            backoff: options.backoff,
            flush_delay: options.flush_delay,
            stopping: false,
            session: None,
            connecting: None,
            retry_at: None,
            flush_at: None,
            events: events.clone(),
            status_tx,
        };
        tokio::spawn(worker.run(cmd_rx));

        Arc::new(Self {
            config,
            commands: cmd_tx,
            status: status_rx,
            events,
        })
    }

    /// Endpoint name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Endpoint configuration
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Event bus of this connection
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Begin connecting. Returns `false` when already connecting or connected.
    pub async fn start(&self) -> Result<bool> {
        self.request(Command::Start).await
    }

    /// Cancel everything and move to `stopped`. Idempotent.
    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await
    }

    /// Drop the current session (or attempt) and connect again right away
    pub async fn reconnect_now(&self) -> Result<()> {
        self.request(Command::ReconnectNow).await
    }

    /// Send a chat line or slash command, queueing it while the connection
    /// is not usable
    pub async fn send_chat(&self, text: &str) -> SendReport {
        let text = text.trim();
        if text.is_empty() {
            return SendReport::failed("empty message");
        }
        let text = text.to_string();
        self.request(|reply| Command::SendChat(text, reply))
            .await
            .unwrap_or_else(|e| SendReport::failed(e.to_string()))
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        let mut status = self.status.borrow().clone();
        if let (Phase::Connected, Some(at)) = (status.phase, status.connected_at) {
            status.up_for_ms = u64::try_from((Utc::now() - at).num_milliseconds()).unwrap_or(0);
        }
        status
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.status.borrow().phase
    }

    /// Connecting or connected
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase().is_running()
    }

    /// Watch every published status
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| Error::ManagerClosed(self.config.name.clone()))?;
        rx.await
            .map_err(|_| Error::ManagerClosed(self.config.name.clone()))
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("name", &self.config.name)
            .field("phase", &self.phase())
            .finish()
    }
}

type PendingConnect = BoxFuture<'static, Result<GameSession>>;

struct Worker {
    config: Arc<ConnectionConfig>,
    connector: Arc<dyn GameConnector>,
    state: ConnectionState,
    queue: OutboundQueue,
    backoff: Backoff,
    flush_delay: Duration,
    stopping: bool,
    session: Option<GameSession>,
    connecting: Option<PendingConnect>,
    retry_at: Option<Instant>,
    flush_at: Option<Instant>,
    events: EventBus,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        debug!(bot = %self.config.name, "Connection manager started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                result = pending_connect(&mut self.connecting), if self.connecting.is_some() => {
                    self.connecting = None;
                    self.on_connect_result(result);
                }
                event = next_event(&mut self.session), if self.session.is_some() => {
                    self.on_transport_event(event);
                }
                _ = sleep_until(self.retry_at), if self.retry_at.is_some() => {
                    self.retry_at = None;
                    self.on_retry();
                }
                _ = sleep_until(self.flush_at), if self.flush_at.is_some() => {
                    self.flush_at = None;
                    self.flush();
                }
            }
            self.publish_status();
        }

        if let Some(session) = self.session.take() {
            session.link.close();
        }
        debug!(bot = %self.config.name, "Connection manager exited");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                let started = self.start();
                self.publish_status();
                let _ = reply.send(started);
            }
            Command::Stop(reply) => {
                self.stop();
                self.publish_status();
                let _ = reply.send(());
            }
            Command::ReconnectNow(reply) => {
                self.reconnect_now();
                self.publish_status();
                let _ = reply.send(());
            }
            Command::SendChat(text, reply) => {
                let report = self.send_chat(text);
                self.publish_status();
                let _ = reply.send(report);
            }
        }
    }

    fn start(&mut self) -> bool {
        if self.state.phase.is_running() {
            debug!(bot = %self.config.name, phase = %self.state.phase, "Start ignored");
            return false;
        }
        self.stopping = false;
        self.retry_at = None;
        self.backoff.reset();
        self.begin_connect()
    }

    fn stop(&mut self) {
        self.stopping = true;
        self.retry_at = None;
        self.flush_at = None;
        self.connecting = None;
        let dropped = self.queue.clear();
        if dropped > 0 {
            debug!(bot = %self.config.name, dropped, "Discarded outbound queue");
        }
        if let Some(session) = self.session.take() {
            session.link.close();
        }
        if self.state.phase != Phase::Stopped && self.set_phase(Phase::Stopped) {
            info!(bot = %self.config.name, "Stopped");
        }
    }

    fn reconnect_now(&mut self) {
        self.stopping = false;
        self.retry_at = None;
        self.flush_at = None;
        self.connecting = None;
        if let Some(session) = self.session.take() {
            session.link.close();
        }
        info!(bot = %self.config.name, "Reconnecting now");
        if self.state.phase == Phase::Connecting {
            self.spawn_connect();
        } else {
            self.begin_connect();
        }
    }

    fn on_retry(&mut self) {
        if self.stopping || self.state.phase != Phase::Disconnected {
            return;
        }
        self.begin_connect();
    }

    fn begin_connect(&mut self) -> bool {
        if !self.set_phase(Phase::Connecting) {
            return false;
        }
        self.spawn_connect();
        true
    }

    fn spawn_connect(&mut self) {
        info!(
            bot = %self.config.name,
            address = %self.config.address(),
            username = %self.config.credentials.username,
            auth = self.config.credentials.auth.as_str(),
            "Connecting"
        );
        let connector = self.connector.clone();
        let config = self.config.clone();
        self.connecting = Some(Box::pin(async move { connector.connect(&config).await }));
    }

    fn on_connect_result(&mut self, result: Result<GameSession>) {
        match result {
            Ok(session) => {
                if self.stopping {
                    session.link.close();
                    return;
                }
                debug!(bot = %self.config.name, "Transport up, waiting for spawn");
                self.session = Some(session);
            }
            Err(e) => {
                warn!(bot = %self.config.name, error = %e, "Connect failed");
                self.state.last_error = Some(e.to_string());
                self.events
                    .publish(ConnectionEvent::status(format!("⚠️ Minecraft error: {}", e)));
                self.on_terminated();
            }
        }
    }

    fn on_transport_event(&mut self, event: Option<TransportEvent>) {
        match event {
            Some(TransportEvent::Spawned) => {
                if self.state.phase != Phase::Connecting {
                    return;
                }
                if self.set_phase(Phase::Connected) {
                    info!(bot = %self.config.name, "Spawned in");
                    self.events
                        .publish(ConnectionEvent::status("✅ Connected to Minecraft."));
                    if !self.queue.is_empty() {
                        self.schedule_flush();
                    }
                }
            }
            Some(TransportEvent::ChatLine(text)) => {
                self.events.publish(ConnectionEvent::chat(text));
            }
            Some(TransportEvent::Kicked(reason)) => {
                warn!(bot = %self.config.name, reason = %reason, "Kicked");
                self.events.publish(ConnectionEvent::status(format!(
                    "❌ Kicked from Minecraft: {}",
                    reason
                )));
                self.state.last_kick_reason = Some(reason);
            }
            Some(TransportEvent::Error(message)) => {
                warn!(bot = %self.config.name, error = %message, "Transport error");
                self.events.publish(ConnectionEvent::status(format!(
                    "⚠️ Minecraft error: {}",
                    message
                )));
                self.state.last_error = Some(message);
            }
            Some(TransportEvent::Disconnected) | None => self.on_terminated(),
        }
    }

    fn on_terminated(&mut self) {
        if let Some(session) = self.session.take() {
            session.link.close();
        }
        self.connecting = None;
        self.flush_at = None;

        if self.stopping {
            if self.state.phase != Phase::Stopped {
                self.set_phase(Phase::Stopped);
            }
            return;
        }
        if !self.state.phase.is_running() {
            return;
        }

        if self.set_phase(Phase::Disconnected) {
            warn!(bot = %self.config.name, "Disconnected");
            self.events
                .publish(ConnectionEvent::status("⚠️ Disconnected from Minecraft."));
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(&mut self) {
        let delay = self.backoff.next_delay();
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let wall = chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());

        self.state.reconnect_count += 1;
        self.state.next_retry_delay_ms = Some(delay_ms);
        self.state.next_retry_at = Some(Utc::now() + wall);
        self.retry_at = Some(Instant::now() + delay);

        info!(
            bot = %self.config.name,
            delay_ms,
            attempt = self.state.reconnect_count,
            "Reconnect scheduled"
        );
    }

    fn is_usable(&self) -> bool {
        self.state.phase == Phase::Connected
            && self
                .session
                .as_ref()
                .is_some_and(|session| session.link.is_alive())
    }

    fn send_chat(&mut self, text: String) -> SendReport {
        if self.queue.is_empty() && self.is_usable() {
            if let Some(session) = &self.session {
                return match session.link.send_chat_line(&text) {
                    Ok(()) => SendReport::sent(),
                    Err(e) => {
                        warn!(bot = %self.config.name, error = %e, "Send failed");
                        SendReport::failed(e.to_string())
                    }
                };
            }
        }

        if let Some(evicted) = self.queue.push(text) {
            debug!(bot = %self.config.name, evicted = %evicted.text, "Outbound queue full, dropped oldest");
        }
        self.schedule_flush();
        SendReport::queued()
    }

    fn schedule_flush(&mut self) {
        if self.flush_at.is_none() {
            self.flush_at = Some(Instant::now() + self.flush_delay);
        }
    }

    fn flush(&mut self) {
        if !self.is_usable() {
            return;
        }
        let Some(session) = &self.session else {
            return;
        };
        let Some(item) = self.queue.pop() else {
            return;
        };

        if let Err(e) = session.link.send_chat_line(&item.text) {
            warn!(bot = %self.config.name, error = %e, "Queued send failed, will retry");
            self.queue.requeue_front(item);
        }
        if !self.queue.is_empty() {
            self.schedule_flush();
        }
    }

    fn set_phase(&mut self, next: Phase) -> bool {
        match self.state.transition(next, Utc::now()) {
            Ok(prev) => {
                debug!(bot = %self.config.name, from = %prev, to = %next, "Phase changed");
                self.events
                    .publish(ConnectionEvent::PhaseChanged { from: prev, to: next });
                true
            }
            Err(e) => {
                warn!(bot = %self.config.name, error = %e, "Rejected phase change");
                false
            }
        }
    }

    fn publish_status(&mut self) {
        self.state.queued = self.queue.len();
        let mut status = self.state.project(&self.config, Utc::now());
        // Uptime is filled in by status(); a ticking value would wake watchers
        status.up_for_ms = 0;
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

async fn pending_connect(pending: &mut Option<PendingConnect>) -> Result<GameSession> {
    match pending {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn next_event(session: &mut Option<GameSession>) -> Option<TransportEvent> {
    match session {
        Some(session) => session.events.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
