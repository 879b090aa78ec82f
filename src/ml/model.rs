use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::LoanFeatures;

pub const FRAUD_DETECTOR: &str = "fraud-detector";
pub const CREDIT_RISK: &str = "credit-risk";
pub const DEFAULT_PREDICTOR: &str = "default-predictor";

/// Models every loan prediction consults
pub const REQUIRED_MODELS: [&str; 3] = [FRAUD_DETECTOR, CREDIT_RISK, DEFAULT_PREDICTOR];

/// Raw output of a single model call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub prediction: f64,
    pub confidence: f64,
}

/// A loaded model that can score a loan application.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoringModel: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn is_loaded(&self) -> bool;
    async fn predict(&self, features: &LoanFeatures) -> Result<ModelOutput>;
}

/// Source of scoring models. Swap this out to point the engine at a real
/// model-serving client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn load(&self, name: &str) -> Result<Arc<dyn ScoringModel>>;
}

/// Stand-in model that reports a random prediction with high confidence
pub struct SimulatedModel {
    name: String,
    version: String,
}

impl SimulatedModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

#[async_trait]
impl ScoringModel for SimulatedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn is_loaded(&self) -> bool {
        true
    }

    async fn predict(&self, _features: &LoanFeatures) -> Result<ModelOutput> {
        let mut rng = rand::thread_rng();
        Ok(ModelOutput {
            prediction: rng.gen::<f64>(),
            confidence: 0.85 + rng.gen::<f64>() * 0.15,
        })
    }
}

/// Backend producing [`SimulatedModel`]s after an artificial load delay
pub struct SimulatedBackend {
    load_delay: Duration,
}

impl SimulatedBackend {
    pub fn new(load_delay: Duration) -> Self {
        Self { load_delay }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[async_trait]
impl ModelBackend for SimulatedBackend {
    async fn load(&self, name: &str) -> Result<Arc<dyn ScoringModel>> {
        debug!(model = %name, delay_ms = self.load_delay.as_millis() as u64, "Simulating model load");
        tokio::time::sleep(self.load_delay).await;
        Ok(Arc::new(SimulatedModel::new(name)))
    }
}
