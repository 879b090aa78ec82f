use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ml::model::REQUIRED_MODELS;
use crate::risk::DecisionThresholds;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheSettings,
    pub predictor: PredictorSettings,
    pub models: ModelSettings,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Cache validation
        if self.cache.max_size == 0 {
            errors.push("cache.max_size must be > 0".to_string());
        }
        if self.cache.default_ttl_secs == 0 {
            errors.push("cache.default_ttl_secs must be > 0".to_string());
        }

        // Predictor validation
        if self.predictor.cache_ttl_secs == 0 {
            errors.push("predictor.cache_ttl_secs must be > 0".to_string());
        }
        if self.predictor.inference_timeout_ms == 0 {
            errors.push("predictor.inference_timeout_ms must be > 0".to_string());
        }
        if self.predictor.batch_concurrency == 0 {
            errors.push("predictor.batch_concurrency must be > 0".to_string());
        }
        let thresholds = &self.predictor.thresholds;
        for (name, value) in [
            ("max_fraud_score", thresholds.max_fraud_score),
            ("max_default_probability", thresholds.max_default_probability),
            ("high_risk_score", thresholds.high_risk_score),
            ("low_affordability", thresholds.low_affordability),
            ("low_risk_score", thresholds.low_risk_score),
            ("high_affordability", thresholds.high_affordability),
            ("max_approval_fraud_score", thresholds.max_approval_fraud_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!("predictor.thresholds.{} must be between 0 and 1", name));
            }
        }
        // Approval bands must sit inside the reject bands
        for (low, low_value, high, high_value) in [
            ("low_risk_score", thresholds.low_risk_score, "high_risk_score", thresholds.high_risk_score),
            (
                "low_affordability",
                thresholds.low_affordability,
                "high_affordability",
                thresholds.high_affordability,
            ),
            (
                "max_approval_fraud_score",
                thresholds.max_approval_fraud_score,
                "max_fraud_score",
                thresholds.max_fraud_score,
            ),
        ] {
            if low_value > high_value {
                errors.push(format!(
                    "predictor.thresholds.{} must not exceed predictor.thresholds.{}",
                    low, high
                ));
            }
        }

        // Model validation
        if self.models.load_timeout_ms == 0 {
            errors.push("models.load_timeout_ms must be > 0".to_string());
        }
        if self.models.warm_up.iter().any(|name| name.trim().is_empty()) {
            errors.push("models.warm_up must not contain empty names".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_size: usize,
    pub default_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl_secs: 60 * 60,
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorSettings {
    /// TTL for cached predictions; credit conditions go stale faster than
    /// the cache's generic default
    pub cache_ttl_secs: u64,
    /// Upper bound on the model load + inference stage of one prediction.
    /// A cold load that outlives it surfaces as a timeout even when
    /// `models.load_timeout_ms` is longer; the load itself keeps running and
    /// commits for later callers.
    pub inference_timeout_ms: u64,
    /// Max predictions in flight for one batch
    pub batch_concurrency: usize,
    pub thresholds: DecisionThresholds,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 30 * 60,
            inference_timeout_ms: 5_000,
            batch_concurrency: 16,
            thresholds: DecisionThresholds::default(),
        }
    }
}

impl PredictorSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Models loaded in the background at startup
    pub warm_up: Vec<String>,
    /// Bound on one backend load, shared by every waiter on that load
    pub load_timeout_ms: u64,
    /// Artificial delay for the simulated backend
    pub mock_load_delay_ms: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            warm_up: REQUIRED_MODELS.iter().map(|name| name.to_string()).collect(),
            load_timeout_ms: 10_000,
            mock_load_delay_ms: 100,
        }
    }
}

impl ModelSettings {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn mock_load_delay(&self) -> Duration {
        Duration::from_millis(self.mock_load_delay_ms)
    }
}
