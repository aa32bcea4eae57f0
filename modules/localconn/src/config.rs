use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_NAME: &str = "localconnection";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// How a consume cycle rewrites the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    /// Plain read then write. A send that lands between the two is lost.
    #[default]
    Weak,
    /// Rewrite with compare-and-set, retrying on conflict. Needs a store
    /// that supports it.
    Strict,
}

impl FromStr for Consistency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weak" => Ok(Consistency::Weak),
            "strict" => Ok(Consistency::Strict),
            other => Err(format!("unknown consistency '{other}'")),
        }
    }
}

/// Channel options. Channels that share a store talk to each other only when
/// they share a `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Store key holding the slot.
    pub name: String,
    pub poll_interval_ms: u64,
    pub consistency: Consistency,
    /// Start polling on construction. When false the host calls `listen` or
    /// drives cycles with `consume_once`.
    pub auto_listen: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            consistency: Consistency::Weak,
            auto_listen: true,
        }
    }
}

impl ChannelConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn with_auto_listen(mut self, auto_listen: bool) -> Self {
        self.auto_listen = auto_listen;
        self
    }

    /// Delay between the end of one cycle and the start of the next.
    /// Never zero, so the poller always yields.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Defaults overridden by `LOCALCONN_NAME`, `LOCALCONN_POLL_INTERVAL_MS`
    /// and `LOCALCONN_CONSISTENCY`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let config = Self::from_lookup(|key| std::env::var(key).ok());
        config.log();
        config
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(name) = lookup("LOCALCONN_NAME").filter(|n| !n.trim().is_empty()) {
            config.name = name.trim().to_string();
        }

        if let Some(raw) = lookup("LOCALCONN_POLL_INTERVAL_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.poll_interval_ms = ms,
                Err(e) => warn!(value = raw.as_str(), error = %e, "Ignoring LOCALCONN_POLL_INTERVAL_MS"),
            }
        }

        if let Some(raw) = lookup("LOCALCONN_CONSISTENCY") {
            match raw.parse::<Consistency>() {
                Ok(consistency) => config.consistency = consistency,
                Err(e) => warn!(value = raw.as_str(), error = %e, "Ignoring LOCALCONN_CONSISTENCY"),
            }
        }

        config
    }

    pub fn log(&self) {
        info!(
            name = self.name.as_str(),
            poll_interval_ms = self.poll_interval_ms,
            consistency = ?self.consistency,
            auto_listen = self.auto_listen,
            "Channel config"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_protocol() {
        let config = ChannelConfig::default();
        assert_eq!(config.name, "localconnection");
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.consistency, Consistency::Weak);
        assert!(config.auto_listen);
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ChannelConfig::from_lookup(lookup(&[
            ("LOCALCONN_NAME", "editor-sync"),
            ("LOCALCONN_POLL_INTERVAL_MS", "250"),
            ("LOCALCONN_CONSISTENCY", "Strict"),
        ]));
        assert_eq!(config.name, "editor-sync");
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.consistency, Consistency::Strict);
    }

    #[test]
    fn bad_env_values_fall_back() {
        let config = ChannelConfig::from_lookup(lookup(&[
            ("LOCALCONN_NAME", "  "),
            ("LOCALCONN_POLL_INTERVAL_MS", "soon"),
            ("LOCALCONN_CONSISTENCY", "eventual"),
        ]));
        assert_eq!(config, ChannelConfig::default());
    }

    #[test]
    fn zero_interval_still_yields() {
        let config = ChannelConfig::default().with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ChannelConfig =
            serde_json::from_str(r#"{"name":"tabs","consistency":"strict"}"#).unwrap();
        assert_eq!(config.name, "tabs");
        assert_eq!(config.consistency, Consistency::Strict);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert!(config.auto_listen);
    }
}
