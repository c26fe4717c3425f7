use minecord_core::ConnectionConfig;
use std::collections::HashMap;

/// Result of looking up the endpoint(s) bridged to a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// No endpoint uses this channel
    Unmapped,
    /// Exactly one endpoint
    Single(&'a str),
    /// Several endpoints share the channel
    Ambiguous(&'a [String]),
}

/// Channel id <-> endpoint name table, built once at boot
#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    by_channel: HashMap<u64, Vec<String>>,
    by_endpoint: HashMap<String, u64>,
}

impl ChannelMap {
    /// Build from endpoint configs; endpoints without a channel are skipped
    #[must_use]
    pub fn new<'a>(configs: impl IntoIterator<Item = &'a ConnectionConfig>) -> Self {
        let mut map = Self::default();
        for config in configs {
            if let Some(channel_id) = config.channel_id {
                map.insert(&config.name, channel_id);
            }
        }
        map
    }

    fn insert(&mut self, endpoint: &str, channel_id: u64) {
        self.by_channel
            .entry(channel_id)
            .or_default()
            .push(endpoint.to_string());
        self.by_endpoint.insert(endpoint.to_string(), channel_id);
    }

    /// Channel bridged to `endpoint`
    #[must_use]
    pub fn channel_for(&self, endpoint: &str) -> Option<u64> {
        self.by_endpoint.get(endpoint).copied()
    }

    /// Whether any endpoint uses `channel_id`
    #[must_use]
    pub fn has_channel(&self, channel_id: u64) -> bool {
        self.by_channel.contains_key(&channel_id)
    }

    /// Resolve the channel a message was posted in, falling back to the
    /// thread's parent channel
    #[must_use]
    pub fn resolve(&self, channel_id: u64, parent_channel_id: Option<u64>) -> Resolution<'_> {
        let names = self.by_channel.get(&channel_id).or_else(|| {
            parent_channel_id.and_then(|parent| self.by_channel.get(&parent))
        });
        match names.map(Vec::as_slice) {
            None | Some([]) => Resolution::Unmapped,
            Some([name]) => Resolution::Single(name),
            Some(names) => Resolution::Ambiguous(names),
        }
    }

    /// Whether no endpoint has a channel
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_endpoint.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> ChannelMap {
        let configs = vec![
            ConnectionConfig::new("Fisher-1", "h", "u").with_channel(100),
            ConnectionConfig::new("Fisher-2", "h", "u").with_channel(200),
            ConnectionConfig::new("Miner-1", "h", "u").with_channel(200),
            ConnectionConfig::new("Idle", "h", "u"),
        ];
        ChannelMap::new(&configs)
    }

    #[test]
    fn test_resolution() {
        let map = map();
        assert_eq!(map.resolve(100, None), Resolution::Single("Fisher-1"));
        assert_eq!(map.resolve(999, None), Resolution::Unmapped);
        match map.resolve(200, None) {
            Resolution::Ambiguous(names) => assert_eq!(names, ["Fisher-2", "Miner-1"]),
            other => panic!("expected ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_thread_falls_back_to_parent() {
        let map = map();
        assert_eq!(map.resolve(555, Some(100)), Resolution::Single("Fisher-1"));
        assert_eq!(map.resolve(555, Some(999)), Resolution::Unmapped);
        // The thread's own mapping wins
        assert_eq!(map.resolve(100, Some(200)), Resolution::Single("Fisher-1"));
    }

    #[test]
    fn test_reverse_lookup() {
        let map = map();
        assert_eq!(map.channel_for("Fisher-2"), Some(200));
        assert_eq!(map.channel_for("Idle"), None);
        assert!(map.has_channel(100));
        assert!(!map.is_empty());
        assert!(ChannelMap::default().is_empty());
    }
}
