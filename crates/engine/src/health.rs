use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub error: Option<String>,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineHealth {
    pub status: HealthStatus,
    pub initialised: bool,
    pub components: HashMap<String, ComponentHealth>,
}

impl EngineHealth {
    /// Degraded iff some but not all sub-components are healthy (spec.md §4.6).
    pub fn from_components(initialised: bool, components: HashMap<String, ComponentHealth>) -> Self {
        let total = components.len();
        let healthy = components
            .values()
            .filter(|c| c.status == HealthStatus::Healthy)
            .count();
        let status = if !initialised {
            HealthStatus::Unhealthy
        } else if healthy == total {
            HealthStatus::Healthy
        } else if healthy == 0 {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Degraded
        };
        Self {
            status,
            initialised,
            components,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_healthy_components_yield_healthy_status() {
        let mut components = HashMap::new();
        components.insert("storage".to_string(), ComponentHealth::healthy());
        components.insert("vector".to_string(), ComponentHealth::healthy());
        let health = EngineHealth::from_components(true, components);
        assert_eq!(health.status, HealthStatus::Healthy);
    }

    #[test]
    fn mixed_components_yield_degraded_status() {
        let mut components = HashMap::new();
        components.insert("storage".to_string(), ComponentHealth::healthy());
        components.insert("vector".to_string(), ComponentHealth::unhealthy("down"));
        let health = EngineHealth::from_components(true, components);
        assert_eq!(health.status, HealthStatus::Degraded);
    }

    #[test]
    fn uninitialised_engine_is_unhealthy() {
        let health = EngineHealth::from_components(false, HashMap::new());
        assert_eq!(health.status, HealthStatus::Unhealthy);
    }
}
