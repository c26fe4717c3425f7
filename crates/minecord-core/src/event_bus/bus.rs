use super::types::ConnectionEvent;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Broadcast-based event bus for connection events.
///
/// Uses `tokio::broadcast` so multiple subscribers can receive the same events.
/// Slow subscribers will miss events (lagged) rather than blocking the publisher.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ConnectionEvent>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events. The subscription receives every event published
    /// after this call, in publish order.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish an event to all active subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// If there are no subscribers, the event is silently dropped.
    pub fn publish(&self, event: ConnectionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Get the current number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Deliver every future event to `listener` on its own task.
    ///
    /// Errors and panics raised by the listener are logged and delivery
    /// continues with the next event; other subscribers are unaffected.
    /// The subscription is taken before this returns, so no event published
    /// afterwards is missed.
    pub fn listen<L>(&self, name: impl Into<String>, mut listener: L) -> ListenerHandle
    where
        L: EventListener,
    {
        let name = name.into();
        let mut subscription = self.subscribe();
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = task_token.cancelled() => break,
                    event = subscription.recv() => event,
                };
                let Some(event) = event else {
                    debug!(listener = %name, "Event bus closed, listener exiting");
                    break;
                };

                let kind = event.kind();
                match AssertUnwindSafe(listener.on_event(event)).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(listener = %name, event = kind, error = %e, "Event listener failed");
                    }
                    Err(_) => {
                        warn!(listener = %name, event = kind, "Event listener panicked");
                    }
                }
            }
        });

        ListenerHandle { token, task }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Receiving side of an [`EventBus`] subscription.
///
/// Dropping it (or calling [`Subscription::unsubscribe`]) detaches from the bus.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ConnectionEvent>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once the bus is gone.
    ///
    /// Lagged gaps are logged and skipped.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event subscriber lagged by {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<ConnectionEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Event subscriber lagged by {} events", n);
                }
                Err(_) => return None,
            }
        }
    }

    /// Detach from the bus.
    pub fn unsubscribe(self) {}
}

/// Consumer of bus events driven by [`EventBus::listen`].
#[async_trait]
pub trait EventListener: Send + 'static {
    /// Handle one event. An error is logged; it does not stop delivery.
    async fn on_event(&mut self, event: ConnectionEvent) -> anyhow::Result<()>;
}

/// Handle to a listener task started by [`EventBus::listen`].
///
/// Dropping the handle leaves the listener running; call
/// [`ListenerHandle::unsubscribe`] to stop it.
#[derive(Debug)]
pub struct ListenerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Stop delivering events to this listener.
    pub fn unsubscribe(self) {
        self.token.cancel();
    }

    /// Whether the listener task is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}
