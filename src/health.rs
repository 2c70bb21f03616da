//! Subsystem health registry.
//!
//! Owned by whoever assembles the process and injected into each subsystem
//! as an `Arc`. Created at startup, torn down at shutdown; nothing here is
//! process-global.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Starting,
    Healthy,
    Degraded,
    Stopped,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Starting => "starting",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Stopped => "stopped",
        }
    }
}

/// One subsystem's reported state.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsystemHealth {
    pub status: HealthStatus,
    pub detail: Option<String>,
}

/// Shared registry of per-subsystem health.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    inner: Mutex<HashMap<String, SubsystemHealth>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, subsystem: &str, status: HealthStatus) {
        self.set_with_detail(subsystem, status, None);
    }

    pub fn set_with_detail(&self, subsystem: &str, status: HealthStatus, detail: Option<String>) {
        let mut inner = self.lock();
        inner.insert(subsystem.to_string(), SubsystemHealth { status, detail });
    }

    pub fn get(&self, subsystem: &str) -> Option<SubsystemHealth> {
        self.lock().get(subsystem).cloned()
    }

    /// Removes a subsystem's entry at teardown.
    pub fn remove(&self, subsystem: &str) {
        self.lock().remove(subsystem);
    }

    /// All entries, sorted by subsystem name.
    pub fn snapshot(&self) -> Vec<(String, SubsystemHealth)> {
        let mut entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(name, health)| (name.clone(), health.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// True when every registered subsystem reports healthy.
    pub fn all_healthy(&self) -> bool {
        self.lock()
            .values()
            .all(|health| health.status == HealthStatus::Healthy)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SubsystemHealth>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn set_and_get_round_trip() {
        let registry = HealthRegistry::new();
        registry.set("speech", HealthStatus::Starting);
        assert_eq!(
            registry.get("speech"),
            Some(SubsystemHealth {
                status: HealthStatus::Starting,
                detail: None,
            })
        );
        assert!(registry.get("vision").is_none());
    }

    #[test]
    fn updates_replace_previous_state() {
        let registry = HealthRegistry::new();
        registry.set("speech", HealthStatus::Starting);
        registry.set_with_detail(
            "speech",
            HealthStatus::Degraded,
            Some("classifier failing".to_string()),
        );
        let health = registry.get("speech").unwrap();
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.detail.as_deref(), Some("classifier failing"));
    }

    #[test]
    fn all_healthy_reflects_every_entry() {
        let registry = HealthRegistry::new();
        assert!(registry.all_healthy());

        registry.set("speech", HealthStatus::Healthy);
        registry.set("vision", HealthStatus::Healthy);
        assert!(registry.all_healthy());

        registry.set("vision", HealthStatus::Stopped);
        assert!(!registry.all_healthy());
    }

    #[test]
    fn snapshot_is_sorted_and_remove_drops_entries() {
        let registry = HealthRegistry::new();
        registry.set("vision", HealthStatus::Healthy);
        registry.set("speech", HealthStatus::Healthy);

        let names: Vec<_> = registry
            .snapshot()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["speech", "vision"]);

        registry.remove("speech");
        assert!(registry.get("speech").is_none());
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        let registry = Arc::new(HealthRegistry::new());
        let worker = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry.set("worker", HealthStatus::Healthy);
            })
        };
        worker.join().unwrap();
        assert_eq!(
            registry.get("worker").map(|h| h.status),
            Some(HealthStatus::Healthy)
        );
    }
}
