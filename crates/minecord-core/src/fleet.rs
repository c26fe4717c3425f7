//! Fleet - every connection manager plus the policies that span them
//!
//! Boot stagger, manual-action cooldown, broadcast and status-all live here;
//! a single [`ConnectionManager`] knows nothing about its siblings.

use crate::config::{validate_endpoints, ConnectionConfig};
use crate::connection::{ConnectionManager, ConnectionStatus, ManagerOptions, SendReport};
use crate::error::{Error, Result};
use crate::event_bus::ListenerHandle;
use crate::logs::{LogAggregator, LogForwarder};
use crate::transport::GameConnector;
use futures::future::join_all;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Fleet-level policy knobs
#[derive(Debug, Clone)]
pub struct FleetOptions {
    /// Base delay before each boot start after the first
    pub start_delay: Duration,
    /// Upper bound of the random extra boot delay
    pub start_jitter: Duration,
    /// Minimum time between manual actions on one endpoint
    pub manual_cooldown: Duration,
    /// Options for every manager
    pub manager: ManagerOptions,
}

impl Default for FleetOptions {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_millis(15_000),
            start_jitter: Duration::from_millis(3_000),
            manual_cooldown: Duration::from_millis(15_000),
            manager: ManagerOptions::default(),
        }
    }
}

/// Result of a manual start/stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    /// Whether the action was accepted
    pub ok: bool,
    /// Accepted start on an endpoint that was already connecting or connected
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub already_running: bool,
    /// Rejection reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionReport {
    /// Accepted
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            ok: true,
            already_running: false,
            error: None,
        }
    }

    /// Accepted, but the endpoint was already running
    #[must_use]
    pub fn already_running() -> Self {
        Self {
            already_running: true,
            ..Self::accepted()
        }
    }

    /// Rejected with a reason
    #[must_use]
    pub fn rejected(error: impl ToString) -> Self {
        Self {
            ok: false,
            already_running: false,
            error: Some(error.to_string()),
        }
    }
}

/// Config plus live status of one endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EndpointStatus {
    /// Endpoint configuration
    #[serde(flatten)]
    pub config: ConnectionConfig,
    /// Connecting or connected
    pub running: bool,
    /// Connection status
    pub mc: ConnectionStatus,
}

/// Ordered set of connection managers
pub struct Fleet {
    managers: Vec<Arc<ConnectionManager>>,
    index: HashMap<String, usize>,
    logs: Arc<LogAggregator>,
    options: FleetOptions,
    last_manual: Mutex<HashMap<String, Instant>>,
    forwarders: Vec<ListenerHandle>,
}

impl Fleet {
    /// Validate `configs` and spawn one idle manager per endpoint
    pub fn new(
        mut configs: Vec<ConnectionConfig>,
        connector: Arc<dyn GameConnector>,
        logs: Arc<LogAggregator>,
        options: FleetOptions,
    ) -> Result<Self> {
        validate_endpoints(&mut configs)?;

        let mut managers = Vec::with_capacity(configs.len());
        let mut index = HashMap::with_capacity(configs.len());
        let mut forwarders = Vec::with_capacity(configs.len());

        for (i, config) in configs.into_iter().enumerate() {
            let name = config.name.clone();
            logs.ensure_source(&name);
            let manager =
                ConnectionManager::spawn(config, connector.clone(), options.manager.clone());
            forwarders.push(
                manager
                    .events()
                    .listen(format!("logs:{}", name), LogForwarder::new(logs.clone(), &name)),
            );
            index.insert(name, i);
            managers.push(manager);
        }

        info!(endpoints = managers.len(), "Fleet ready");
        Ok(Self {
            managers,
            index,
            logs,
            options,
            last_manual: Mutex::new(HashMap::new()),
            forwarders,
        })
    }

    /// Number of endpoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Whether the fleet has no endpoints
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Manager for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<ConnectionManager>> {
        self.index.get(name).map(|&i| &self.managers[i])
    }

    /// Whether `name` is a configured endpoint
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Endpoint names in config order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.managers.iter().map(|m| m.name())
    }

    /// Managers in config order
    #[must_use]
    pub fn managers(&self) -> &[Arc<ConnectionManager>] {
        &self.managers
    }

    /// Shared log aggregator
    #[must_use]
    pub fn logs(&self) -> &Arc<LogAggregator> {
        &self.logs
    }

    /// Start every enabled endpoint in config order, staggered.
    ///
    /// The first enabled endpoint starts at once; each later one waits
    /// `start_delay` plus a random share of `start_jitter`.
    pub async fn boot(&self) {
        let mut first = true;
        for manager in &self.managers {
            let name = manager.name();
            if !manager.config().enabled {
                warn!(bot = %name, "Disabled on boot");
                continue;
            }

            info!(bot = %name, "Boot starting");
            if !first {
                let wait = self.boot_delay();
                info!(bot = %name, "Waiting {}s before start...", wait.as_secs_f64().round());
                tokio::time::sleep(wait).await;
            }
            first = false;

            match manager.start().await {
                Ok(_) => info!(bot = %name, "Start requested"),
                Err(e) => warn!(bot = %name, error = %e, "Boot start failed"),
            }
        }
        info!("Boot sequence finished");
    }

    fn boot_delay(&self) -> Duration {
        let jitter_ms = u64::try_from(self.options.start_jitter.as_millis()).unwrap_or(u64::MAX);
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.options.start_delay + Duration::from_millis(extra)
    }

    /// Manual start, subject to the cooldown
    pub async fn start(&self, name: &str) -> ActionReport {
        let manager = match self.manual_action(name) {
            Ok(manager) => manager,
            Err(e) => return ActionReport::rejected(e),
        };
        match manager.start().await {
            Ok(true) => {
                info!(bot = %name, "Start requested");
                ActionReport::accepted()
            }
            Ok(false) => {
                info!(bot = %name, "Start requested, already running");
                ActionReport::already_running()
            }
            Err(e) => ActionReport::rejected(e),
        }
    }

    /// Manual stop, subject to the cooldown
    pub async fn stop(&self, name: &str) -> ActionReport {
        let manager = match self.manual_action(name) {
            Ok(manager) => manager,
            Err(e) => return ActionReport::rejected(e),
        };
        match manager.stop().await {
            Ok(()) => {
                info!(bot = %name, "Stop requested");
                ActionReport::accepted()
            }
            Err(e) => ActionReport::rejected(e),
        }
    }

    fn manual_action(&self, name: &str) -> Result<&Arc<ConnectionManager>> {
        let manager = self
            .get(name)
            .ok_or_else(|| Error::UnknownEndpoint(name.to_string()))?;

        let now = Instant::now();
        let mut last = self
            .last_manual
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(at) = last.get(name) {
            let elapsed = now.duration_since(*at);
            if elapsed < self.options.manual_cooldown {
                let remaining_ms = u64::try_from((self.options.manual_cooldown - elapsed).as_millis())
                    .unwrap_or(u64::MAX);
                debug!(bot = %name, remaining_ms, "Manual action rejected");
                return Err(Error::Cooldown {
                    name: name.to_string(),
                    remaining_ms,
                });
            }
        }
        last.insert(name.to_string(), now);
        Ok(manager)
    }

    /// Send `text` through every manager concurrently
    pub async fn broadcast(&self, text: &str) -> BTreeMap<String, SendReport> {
        let reports = join_all(self.managers.iter().map(|m| m.send_chat(text))).await;
        self.managers
            .iter()
            .map(|m| m.name().to_string())
            .zip(reports)
            .collect()
    }

    /// Config and status of every endpoint, config order
    #[must_use]
    pub fn status_all(&self) -> Vec<EndpointStatus> {
        self.managers
            .iter()
            .map(|m| {
                let mc = m.status();
                EndpointStatus {
                    config: m.config().clone(),
                    running: mc.is_running(),
                    mc,
                }
            })
            .collect()
    }

    /// Stop every manager (shutdown)
    pub async fn stop_all(&self) {
        for result in join_all(self.managers.iter().map(|m| m.stop())).await {
            if let Err(e) = result {
                debug!(error = %e, "Stop during shutdown failed");
            }
        }
        info!("All connections stopped");
    }
}

impl Drop for Fleet {
    fn drop(&mut self) {
        for handle in self.forwarders.drain(..) {
            handle.unsubscribe();
        }
    }
}

impl std::fmt::Debug for Fleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fleet")
            .field("endpoints", &self.managers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Phase;
    use crate::logs::{LogLevel, SYSTEM_SOURCE};
    use crate::transport::memory::MemoryConnector;
    use crate::transport::GameSession;
    use async_trait::async_trait;

    fn endpoints(names: &[&str]) -> Vec<ConnectionConfig> {
        names
            .iter()
            .map(|name| ConnectionConfig::new(*name, "mc.example.net", name.to_lowercase()))
            .collect()
    }

    fn fleet_with(configs: Vec<ConnectionConfig>, connector: Arc<dyn GameConnector>) -> Fleet {
        Fleet::new(
            configs,
            connector,
            Arc::new(LogAggregator::new(50)),
            FleetOptions::default(),
        )
        .unwrap()
    }

    async fn wait_connected(manager: &ConnectionManager) {
        let mut rx = manager.subscribe_state();
        tokio::time::timeout(
            Duration::from_secs(60),
            rx.wait_for(|s| s.phase == Phase::Connected),
        )
        .await
        .unwrap()
        .unwrap();
    }

    /// Routes each endpoint to its own in-memory connector
    struct PerEndpoint(HashMap<String, MemoryConnector>);

    #[async_trait]
    impl GameConnector for PerEndpoint {
        async fn connect(&self, config: &ConnectionConfig) -> Result<GameSession> {
            match self.0.get(&config.name) {
                Some(connector) => connector.connect(config).await,
                None => Err(Error::UnknownEndpoint(config.name.clone())),
            }
        }
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_configs() {
        let connector: Arc<dyn GameConnector> = Arc::new(MemoryConnector::new());
        let logs = Arc::new(LogAggregator::default());

        let empty = Fleet::new(vec![], connector.clone(), logs.clone(), FleetOptions::default());
        assert!(empty.unwrap_err().is_config());

        let dup = Fleet::new(
            endpoints(&["A", "A"]),
            connector,
            logs,
            FleetOptions::default(),
        );
        assert!(matches!(dup, Err(Error::DuplicateEndpoint(_))));
    }

    #[tokio::test]
    async fn test_lookup_and_log_buffers() {
        let fleet = fleet_with(endpoints(&["Fisher-1", "Fisher-2"]), Arc::new(MemoryConnector::new()));
        assert_eq!(fleet.len(), 2);
        assert!(fleet.contains("Fisher-2"));
        assert!(fleet.get("Fisher-3").is_none());
        assert_eq!(fleet.names().collect::<Vec<_>>(), vec!["Fisher-1", "Fisher-2"]);

        let sources = fleet.logs().sources();
        assert!(sources.contains(&"Fisher-1".to_string()));
        assert!(sources.contains(&"Fisher-2".to_string()));
        assert!(sources.contains(&SYSTEM_SOURCE.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_staggers_and_skips_disabled() {
        let connector = MemoryConnector::new();
        let mut configs = endpoints(&["A", "B", "C"]);
        configs[1].enabled = false;
        let fleet = fleet_with(configs, Arc::new(connector.clone()));

        let started = Instant::now();
        fleet.boot().await;
        let elapsed = started.elapsed();

        // One staggered wait, for C only
        assert!(elapsed >= Duration::from_millis(15_000), "{:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(18_000), "{:?}", elapsed);

        wait_connected(fleet.get("A").unwrap()).await;
        wait_connected(fleet.get("C").unwrap()).await;
        assert_eq!(fleet.get("B").unwrap().phase(), Phase::Idle);
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_manual_cooldown() {
        let fleet = fleet_with(endpoints(&["A", "B"]), Arc::new(MemoryConnector::new()));

        assert_eq!(fleet.start("A").await, ActionReport::accepted());

        let report = fleet.stop("A").await;
        assert!(!report.ok);
        assert_eq!(report.error.as_deref(), Some("Cooldown active for A"));

        // Cooldown is per endpoint
        assert!(fleet.stop("B").await.ok);

        let unknown = fleet.start("Z").await;
        assert!(!unknown.ok);
        assert_eq!(unknown.error.as_deref(), Some("unknown bot: Z"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_on_running_endpoint_reports_it() {
        let fleet = fleet_with(endpoints(&["A"]), Arc::new(MemoryConnector::new()));
        assert_eq!(fleet.start("A").await, ActionReport::accepted());
        wait_connected(fleet.get("A").unwrap()).await;

        tokio::time::sleep(Duration::from_millis(15_001)).await;
        let report = fleet.start("A").await;
        assert_eq!(report, ActionReport::already_running());
        assert!(report.ok);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"ok": true, "already_running": true})
        );
        assert_eq!(
            serde_json::to_value(ActionReport::accepted()).unwrap(),
            serde_json::json!({"ok": true})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_expires() {
        let fleet = fleet_with(endpoints(&["A"]), Arc::new(MemoryConnector::new()));
        assert!(fleet.start("A").await.ok);
        tokio::time::sleep(Duration::from_millis(15_001)).await;
        assert!(fleet.stop("A").await.ok);
        assert_eq!(fleet.get("A").unwrap().phase(), Phase::Stopped);
    }

    #[tokio::test]
    async fn test_broadcast_reports_per_endpoint() {
        let connectors: HashMap<String, MemoryConnector> = ["A", "B", "C"]
            .iter()
            .map(|name| (name.to_string(), MemoryConnector::new()))
            .collect();
        connectors["B"].fail_sends(true);
        let fleet = fleet_with(
            endpoints(&["A", "B", "C"]),
            Arc::new(PerEndpoint(connectors.clone())),
        );

        for manager in fleet.managers() {
            manager.start().await.unwrap();
            wait_connected(manager).await;
        }

        let reports = fleet.broadcast("/say restarting soon").await;
        assert_eq!(reports.len(), 3);
        assert_eq!(reports.values().filter(|r| !r.ok).count(), 1);
        assert!(!reports["B"].ok);
        assert!(reports["A"].ok && reports["C"].ok);
        assert_eq!(connectors["A"].sent_lines(), vec!["/say restarting soon"]);
    }

    #[tokio::test]
    async fn test_status_all_in_config_order() {
        let fleet = fleet_with(endpoints(&["Zed", "Alpha"]), Arc::new(MemoryConnector::new()));
        let manager = fleet.get("Alpha").unwrap();
        manager.start().await.unwrap();
        wait_connected(manager).await;

        let all = fleet.status_all();
        assert_eq!(all[0].config.name, "Zed");
        assert!(!all[0].running);
        assert_eq!(all[1].mc.phase, Phase::Connected);
        assert!(all[1].running);

        let json = serde_json::to_value(&all[1]).unwrap();
        assert_eq!(json["name"], "Alpha");
        assert_eq!(json["username"], "alpha");
        assert_eq!(json["running"], true);
        assert_eq!(json["mc"]["phase"], "connected");
    }

    #[tokio::test]
    async fn test_events_reach_log_buffers() {
        let fleet = fleet_with(endpoints(&["A"]), Arc::new(MemoryConnector::new()));
        let manager = fleet.get("A").unwrap();
        manager.start().await.unwrap();
        wait_connected(manager).await;

        for _ in 0..100 {
            if fleet
                .logs()
                .entries("A")
                .iter()
                .any(|e| e.level == LogLevel::Status)
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let entries = fleet.logs().entries("A");
        assert!(entries
            .iter()
            .any(|e| e.level == LogLevel::Status && e.text == "✅ Connected to Minecraft."));
        assert!(entries.iter().any(|e| e.text == "phase: connecting"));
    }

    #[tokio::test]
    async fn test_stop_all() {
        let fleet = fleet_with(endpoints(&["A", "B"]), Arc::new(MemoryConnector::new()));
        fleet.start("A").await;
        fleet.stop_all().await;
        assert!(fleet
            .managers()
            .iter()
            .all(|m| m.phase() == Phase::Stopped));
    }
}
