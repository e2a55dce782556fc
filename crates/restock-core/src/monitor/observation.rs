use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single configured check: which item to probe at which retailer.
///
/// Targets come from configuration and are never persisted; the `(source,
/// item)` pair is the key under which observations are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Retailer identifier. Case-sensitive key component.
    pub source: String,
    /// Item identifier. Key component together with `source`.
    pub item: String,
    /// Opaque reference (typically a product URL) handed to the probe.
    pub locator: String,
}

impl Target {
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            locator: locator.into(),
        }
    }
}

/// Immutable record of one availability check.
///
/// Appended to the state store after every successful probe; never mutated or
/// deleted by the engine. The last-appended observation for a `(source, item)`
/// key is what the dedup decision is made against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub source: String,
    pub item: String,
    /// Carried for audit only, not part of the key.
    pub locator: String,
    pub available: bool,
    pub observed_at: DateTime<Utc>,
}

impl Observation {
    /// Build a fresh observation for a target with a unique id.
    pub fn record(target: &Target, available: bool) -> Self {
        Self {
            id: format!("{}_{}_{}", target.source, target.item, Uuid::new_v4()),
            source: target.source.clone(),
            item: target.item.clone(),
            locator: target.locator.clone(),
            available,
            observed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_carries_target_fields() {
        let target = Target::new("argos", "console", "http://x");
        let obs = Observation::record(&target, true);
        assert_eq!(obs.source, "argos");
        assert_eq!(obs.item, "console");
        assert_eq!(obs.locator, "http://x");
        assert!(obs.available);
        assert!(obs.id.starts_with("argos_console_"));
    }

    #[test]
    fn record_generates_unique_ids() {
        let target = Target::new("argos", "console", "http://x");
        let a = Observation::record(&target, false);
        let b = Observation::record(&target, false);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn observation_roundtrips_through_json() {
        let obs = Observation::record(&Target::new("currys", "gpu", "http://y"), true);
        let json = serde_json::to_string(&obs).unwrap();
        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, obs.id);
        assert_eq!(back.available, obs.available);
        assert_eq!(back.observed_at, obs.observed_at);
    }
}
