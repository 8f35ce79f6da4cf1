//! Router configuration.

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use factline_events::{Command, DomainEvent};

/// Settings shared by projection routers and the workers feeding them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Attribute whose value selects the transaction for an event.
    pub event_type_attribute: String,
    /// Attribute whose value selects the read operation for a query, unless
    /// the router's observer names another one.
    pub query_type_attribute: String,
    /// Receive timeout of a worker between shutdown checks.
    pub worker_poll_interval_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            event_type_attribute: DomainEvent::TYPE.to_string(),
            query_type_attribute: Command::TYPE.to_string(),
            worker_poll_interval_ms: 250,
        }
    }
}

impl RouterConfig {
    pub const EVENT_TYPE_ATTRIBUTE_ENV: &'static str = "FACTLINE_EVENT_TYPE_ATTRIBUTE";
    pub const QUERY_TYPE_ATTRIBUTE_ENV: &'static str = "FACTLINE_QUERY_TYPE_ATTRIBUTE";
    pub const WORKER_POLL_MS_ENV: &'static str = "FACTLINE_WORKER_POLL_MS";

    /// Load from `FACTLINE_*` variables; missing or invalid values keep defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(name) = attribute_name(&lookup, Self::EVENT_TYPE_ATTRIBUTE_ENV) {
            config.event_type_attribute = name;
        }
        if let Some(name) = attribute_name(&lookup, Self::QUERY_TYPE_ATTRIBUTE_ENV) {
            config.query_type_attribute = name;
        }
        if let Some(raw) = lookup(Self::WORKER_POLL_MS_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.worker_poll_interval_ms = ms,
                _ => warn!(
                    var = Self::WORKER_POLL_MS_ENV,
                    value = %raw,
                    default = config.worker_poll_interval_ms,
                    "invalid poll interval; using default"
                ),
            }
        }

        config
    }

    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_interval_ms)
    }
}

fn attribute_name(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<String> {
    let raw = lookup(var)?;
    let name = raw.trim();
    if name.is_empty() {
        warn!(var, "blank attribute name; using default");
        return None;
    }
    Some(name.to_string())
}
