use super::phase::{IllegalTransition, Phase};
use crate::config::ConnectionConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Mutable lifecycle state of one connection.
///
/// Owned by the manager task. `connected_at` is `Some` exactly while
/// `phase == Connected`; [`ConnectionState::transition`] is the only place
/// the phase changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    /// Current phase
    pub phase: Phase,
    /// When the current session spawned
    pub connected_at: Option<DateTime<Utc>>,
    /// When the last connected session ended
    pub last_disconnect_at: Option<DateTime<Utc>>,
    /// Most recent kick reason
    pub last_kick_reason: Option<String>,
    /// Most recent transport error
    pub last_error: Option<String>,
    /// Number of retries scheduled since boot
    pub reconnect_count: u64,
    /// Delay of the most recently scheduled retry
    pub next_retry_delay_ms: Option<u64>,
    /// When the pending retry fires, if one is scheduled
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Outbound queue length
    pub queued: usize,
}

impl ConnectionState {
    /// Fresh idle state
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            connected_at: None,
            last_disconnect_at: None,
            last_kick_reason: None,
            last_error: None,
            reconnect_count: 0,
            next_retry_delay_ms: None,
            next_retry_at: None,
            queued: 0,
        }
    }

    /// Move to `next`, keeping the timestamp invariants.
    ///
    /// Returns the previous phase, or an error (state untouched) when the
    /// transition is not legal from the current phase.
    pub fn transition(
        &mut self,
        next: Phase,
        now: DateTime<Utc>,
    ) -> Result<Phase, IllegalTransition> {
        let prev = self.phase;
        if !prev.can_transition_to(next) {
            return Err(IllegalTransition {
                from: prev,
                to: next,
            });
        }

        if prev == Phase::Connected {
            self.last_disconnect_at = Some(now);
        }
        self.connected_at = (next == Phase::Connected).then_some(now);
        if next != Phase::Disconnected {
            self.next_retry_at = None;
        }
        self.phase = next;
        Ok(prev)
    }

    /// Milliseconds since spawn while connected, else 0
    #[must_use]
    pub fn up_for_ms(&self, now: DateTime<Utc>) -> u64 {
        match (self.phase, self.connected_at) {
            (Phase::Connected, Some(at)) => {
                u64::try_from((now - at).num_milliseconds()).unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Pure status projection
    #[must_use]
    pub fn project(&self, config: &ConnectionConfig, now: DateTime<Utc>) -> ConnectionStatus {
        ConnectionStatus {
            name: config.name.clone(),
            host: config.host.clone(),
            port: config.port,
            phase: self.phase,
            connected_at: self.connected_at,
            last_disconnect_at: self.last_disconnect_at,
            last_kick_reason: self.last_kick_reason.clone(),
            last_error: self.last_error.clone(),
            reconnect_count: self.reconnect_count,
            next_retry_delay_ms: self.next_retry_delay_ms,
            next_retry_at: self.next_retry_at,
            queued: self.queued,
            up_for_ms: self.up_for_ms(now),
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a connection, as served to the router and the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    /// Endpoint name
    pub name: String,
    /// Game server host
    pub host: String,
    /// Game server port
    pub port: u16,
    /// Current phase
    pub phase: Phase,
    /// When the current session spawned
    pub connected_at: Option<DateTime<Utc>>,
    /// When the last connected session ended
    pub last_disconnect_at: Option<DateTime<Utc>>,
    /// Most recent kick reason
    pub last_kick_reason: Option<String>,
    /// Most recent transport error
    pub last_error: Option<String>,
    /// Number of retries scheduled since boot
    pub reconnect_count: u64,
    /// Delay of the most recently scheduled retry
    pub next_retry_delay_ms: Option<u64>,
    /// When the pending retry fires
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Outbound queue length
    pub queued: usize,
    /// Uptime of the current session
    pub up_for_ms: u64,
}

impl ConnectionStatus {
    /// Milliseconds until the pending retry, if one is scheduled in the future
    #[must_use]
    pub fn retry_in_ms(&self, now: DateTime<Utc>) -> Option<u64> {
        if self.phase != Phase::Disconnected {
            return None;
        }
        let at = self.next_retry_at?;
        u64::try_from((at - now).num_milliseconds()).ok()
    }

    /// Connecting or connected
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_transition_table() {
        use Phase::*;
        let legal = [
            (Idle, Connecting),
            (Disconnected, Connecting),
            (Stopped, Connecting),
            (Connected, Connecting),
            (Connecting, Connected),
            (Connecting, Disconnected),
            (Connected, Disconnected),
            (Idle, Stopped),
            (Connecting, Stopped),
            (Connected, Stopped),
            (Disconnected, Stopped),
        ];
        for from in Phase::ALL {
            for to in Phase::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_illegal_transition_leaves_state() {
        let mut state = ConnectionState::new();
        let now = Utc::now();
        state.transition(Phase::Connecting, now).unwrap();

        let err = state.transition(Phase::Connecting, now).unwrap_err();
        assert_eq!(err.from, Phase::Connecting);
        assert_eq!(state.phase, Phase::Connecting);
        assert!(state.transition(Phase::Idle, now).is_err());
    }

    #[test]
    fn test_connected_at_tracks_phase() {
        let mut state = ConnectionState::new();
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(90);

        state.transition(Phase::Connecting, t0).unwrap();
        assert!(state.connected_at.is_none());

        state.transition(Phase::Connected, t0).unwrap();
        assert_eq!(state.connected_at, Some(t0));
        assert_eq!(state.up_for_ms(t1), 90_000);

        state.transition(Phase::Disconnected, t1).unwrap();
        assert!(state.connected_at.is_none());
        assert_eq!(state.last_disconnect_at, Some(t1));
        assert_eq!(state.up_for_ms(t1), 0);
    }

    #[test]
    fn test_project() {
        let config = ConnectionConfig::new("Fisher-1", "mc.example.net", "fisher");
        let mut state = ConnectionState::new();
        let now = Utc::now();
        state.transition(Phase::Connecting, now).unwrap();
        state.transition(Phase::Connected, now).unwrap();
        state.last_kick_reason = Some("banned".to_string());

        let status = state.project(&config, now + Duration::seconds(5));
        assert_eq!(status.name, "Fisher-1");
        assert_eq!(status.port, 25565);
        assert_eq!(status.phase, Phase::Connected);
        assert_eq!(status.up_for_ms, 5_000);
        assert_eq!(status.last_kick_reason.as_deref(), Some("banned"));
        assert!(status.is_running());
        assert!(status.retry_in_ms(now).is_none());
    }

    #[test]
    fn test_retry_countdown() {
        let config = ConnectionConfig::new("a", "h", "u");
        let mut state = ConnectionState::new();
        let now = Utc::now();
        state.transition(Phase::Connecting, now).unwrap();
        state.transition(Phase::Disconnected, now).unwrap();
        state.next_retry_at = Some(now + Duration::milliseconds(4_500));

        let status = state.project(&config, now);
        assert_eq!(status.retry_in_ms(now), Some(4_500));
        assert!(status.retry_in_ms(now + Duration::seconds(10)).is_none());
    }
}
