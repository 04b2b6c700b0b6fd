use std::time::Duration;

use serde::{Deserialize, Serialize};

use agentmem_config::AppConfig;

/// Capability level of the memory engine (spec.md §4.7, Glossary). Ordered
/// highest-to-lowest capability; `Ord` follows declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Advanced,
    Smart,
    Basic,
    Mock,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Advanced => "advanced",
            Tier::Smart => "smart",
            Tier::Basic => "basic",
            Tier::Mock => "mock",
        }
    }

    /// The fallback chain for this tier, ending at `Mock` (spec.md §4.7).
    pub fn fallback_chain(&self) -> Vec<Tier> {
        match self {
            Tier::Advanced => vec![Tier::Smart, Tier::Basic, Tier::Mock],
            Tier::Smart => vec![Tier::Basic, Tier::Mock],
            Tier::Basic => vec![Tier::Mock],
            Tier::Mock => vec![],
        }
    }
}

/// Probed capabilities behind each tier (spec.md §4.7).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub network_reachable: bool,
    pub embedding_credentials_present: bool,
    pub local_model_available: bool,
}

/// Probes required capabilities and returns the highest feasible tier plus
/// its fallback chain (spec.md §4.7). Detection never fails: worst case it
/// returns `Tier::Mock`.
pub struct TierDetector {
    client: reqwest::Client,
}

impl Default for TierDetector {
    fn default() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .expect("reqwest client with a fixed timeout always builds"),
        }
    }
}

impl TierDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cheap reachability probe: a `HEAD` request to `endpoint`. Any error
    /// (DNS, connect, TLS, timeout) is treated as "unreachable" rather than
    /// propagated — detection must never fail the caller.
    async fn probe_reachable(&self, endpoint: &str) -> bool {
        self.client
            .head(endpoint)
            .send()
            .await
            .map(|resp| resp.status().is_success() || resp.status().is_redirection())
            .unwrap_or(false)
    }

    pub async fn probe_capabilities(&self, config: &AppConfig) -> Capabilities {
        let embedding_credentials_present = match config.embedding.provider.as_str() {
            "remote" => config.embedding.api_key.is_some(),
            "local" => true,
            _ => false,
        };
        let network_reachable = if let Some(endpoint) = &config.embedding.endpoint {
            self.probe_reachable(endpoint).await
        } else {
            embedding_credentials_present
        };
        // The local provider in this workspace is a deterministic hashing
        // scheme (no model weights to load), so it is always "available".
        let local_model_available = config.embedding.provider == "local" || config.embedding.provider == "mock";

        Capabilities {
            network_reachable,
            embedding_credentials_present,
            local_model_available,
        }
    }

    /// Returns the highest feasible tier given `config` and its fallback
    /// chain (spec.md §4.7).
    pub async fn detect(&self, config: &AppConfig) -> (Tier, Vec<Tier>) {
        let capabilities = self.probe_capabilities(config).await;
        let tier = if config.embedding.provider == "remote"
            && capabilities.network_reachable
            && capabilities.embedding_credentials_present
        {
            Tier::Advanced
        } else if capabilities.local_model_available {
            Tier::Smart
        } else {
            Tier::Basic
        };
        (tier, tier.fallback_chain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_chain_ends_at_mock() {
        assert_eq!(
            Tier::Advanced.fallback_chain(),
            vec![Tier::Smart, Tier::Basic, Tier::Mock]
        );
        assert_eq!(Tier::Mock.fallback_chain(), Vec::<Tier>::new());
    }

    #[test]
    fn tiers_order_from_most_to_least_capable() {
        assert!(Tier::Advanced < Tier::Smart);
        assert!(Tier::Smart < Tier::Basic);
        assert!(Tier::Basic < Tier::Mock);
    }

    #[tokio::test]
    async fn detect_falls_back_to_basic_without_credentials_or_local_model() {
        let mut config = AppConfig::default();
        config.embedding.provider = "remote".to_string();
        config.embedding.api_key = None;
        config.embedding.endpoint = None;
        let detector = TierDetector::new();
        let (tier, chain) = detector.detect(&config).await;
        assert_eq!(tier, Tier::Basic);
        assert_eq!(chain, vec![Tier::Mock]);
    }

    #[tokio::test]
    async fn detect_prefers_smart_for_local_provider() {
        let mut config = AppConfig::default();
        config.embedding.provider = "local".to_string();
        let detector = TierDetector::new();
        let (tier, _) = detector.detect(&config).await;
        assert_eq!(tier, Tier::Smart);
    }
}
