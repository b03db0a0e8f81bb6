//! Session registry - active dials and their per-dial settings
//!
//! Settings arrive as free-form JSON from the host. Anything that is not a
//! usable step size is coerced rather than rejected.

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_STEP: u8 = 1;
pub const MAX_STEP: u8 = 25;

/// Settings key carrying the step size
const STEP_KEY: &str = "step";

/// Per-session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Volume change per dial tick (1-25)
    pub step: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { step: DEFAULT_STEP }
    }
}

impl SessionConfig {
    /// Build from host settings such as `{"step": "2"}` or `{"step": 2}`
    pub fn from_settings(settings: &Value) -> Self {
        Self {
            step: coerce_step(settings.get(STEP_KEY)),
        }
    }
}

/// Coerce a raw step value: missing, non-numeric or below 1 becomes 1,
/// above the maximum is capped
pub fn coerce_step(raw: Option<&Value>) -> u8 {
    let parsed = match raw {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(step) if step >= 1 => step.min(MAX_STEP as i64) as u8,
        _ => DEFAULT_STEP,
    }
}

/// Registry of active display sessions keyed by host context id
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, SessionConfig>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or refresh a session; returns true on the empty → non-empty edge
    pub fn register(&mut self, id: &str, config: SessionConfig) -> bool {
        let was_empty = self.sessions.is_empty();
        self.sessions.insert(id.to_string(), config);
        debug!(session = id, step = config.step, "Session registered");
        was_empty
    }

    /// Remove a session; returns true when this emptied the registry
    pub fn unregister(&mut self, id: &str) -> bool {
        if self.sessions.remove(id).is_none() {
            return false;
        }
        debug!(session = id, "Session unregistered");
        self.sessions.is_empty()
    }

    /// Refresh the stored config of a known session; unknown ids are ignored
    pub fn update_config(&mut self, id: &str, config: SessionConfig) -> bool {
        match self.sessions.get_mut(id) {
            Some(stored) => {
                *stored = config;
                true
            }
            None => false,
        }
    }

    pub fn step_for(&self, id: &str) -> u8 {
        self.sessions
            .get(id)
            .map(|config| config.step)
            .unwrap_or(DEFAULT_STEP)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_coercion() {
        assert_eq!(SessionConfig::from_settings(&json!({"step": 5})).step, 5);
        assert_eq!(SessionConfig::from_settings(&json!({"step": "12"})).step, 12);
        assert_eq!(SessionConfig::from_settings(&json!({"step": " 3 "})).step, 3);
        assert_eq!(SessionConfig::from_settings(&json!({"step": 4.7})).step, 4);
        assert_eq!(SessionConfig::from_settings(&json!({"step": 99})).step, MAX_STEP);
    }

    #[test]
    fn test_invalid_step_defaults() {
        for settings in [
            json!({}),
            json!({"step": "loud"}),
            json!({"step": 0}),
            json!({"step": -4}),
            json!({"step": null}),
            json!({"step": [2]}),
            json!(null),
        ] {
            assert_eq!(
                SessionConfig::from_settings(&settings).step,
                DEFAULT_STEP,
                "settings: {}",
                settings
            );
        }
    }

    #[test]
    fn test_registry_edges() {
        let mut registry = SessionRegistry::new();

        assert!(registry.register("a", SessionConfig::default()));
        assert!(!registry.register("b", SessionConfig { step: 3 }));
        // Refreshing an existing session is not an activation edge
        assert!(!registry.register("a", SessionConfig { step: 2 }));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.step_for("a"), 2);

        assert!(!registry.unregister("a"));
        assert!(!registry.unregister("missing"));
        assert!(registry.unregister("b"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_config_only_touches_known_sessions() {
        let mut registry = SessionRegistry::new();
        registry.register("a", SessionConfig::default());

        assert!(registry.update_config("a", SessionConfig { step: 7 }));
        assert_eq!(registry.step_for("a"), 7);

        assert!(!registry.update_config("ghost", SessionConfig { step: 7 }));
        assert!(!registry.contains("ghost"));
        assert_eq!(registry.step_for("ghost"), DEFAULT_STEP);
    }
}
