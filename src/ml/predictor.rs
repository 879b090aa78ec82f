use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::cache::ResultCache;
use super::features::{clamp01, engineer_features};
use super::loader::ModelLoader;
use super::model::{ModelBackend, ModelOutput, ScoringModel, CREDIT_RISK, DEFAULT_PREDICTOR, FRAUD_DETECTOR};
use crate::config::{EngineConfig, PredictorSettings};
use crate::error::{EngineError, EngineResult};
use crate::risk::{default_probability, employment_stability, fraud_score, DecisionInputs};
use crate::types::{EngineeredFeatures, LoanFeatures, PredictionResult, RiskFactors};

/// Cache namespace for fused loan predictions
pub const LOAN_PREDICTOR: &str = "loan-predictor";

/// Entry point of the engine: fuses deterministic scoring with model
/// confidence, applies the decision policy and caches the outcome.
pub struct LoanPredictor {
    loader: ModelLoader,
    cache: Arc<ResultCache<PredictionResult>>,
    settings: PredictorSettings,
}

impl LoanPredictor {
    pub fn new(
        loader: ModelLoader,
        cache: Arc<ResultCache<PredictionResult>>,
        settings: PredictorSettings,
    ) -> Self {
        Self {
            loader,
            cache,
            settings,
        }
    }

    /// Wire a loader and cache from configuration around `backend`
    pub fn from_config(config: &EngineConfig, backend: Arc<dyn ModelBackend>) -> Self {
        let loader = ModelLoader::new(backend, &config.models);
        let cache = Arc::new(ResultCache::new(&config.cache));
        Self::new(loader, cache, config.predictor.clone())
    }

    pub fn loader(&self) -> &ModelLoader {
        &self.loader
    }

    pub fn cache(&self) -> &ResultCache<PredictionResult> {
        &self.cache
    }

    pub fn warm_up(&self, names: &[String]) -> JoinHandle<()> {
        self.loader.warm_up(names)
    }

    pub async fn predict(&self, features: &LoanFeatures) -> EngineResult<PredictionResult> {
        self.predict_with_cancel(features, &CancellationToken::new()).await
    }

    /// Like [`predict`](Self::predict), but the model stage is abandoned as soon
    /// as `cancel` fires. Cancelled and timed-out predictions are never cached.
    pub async fn predict_with_cancel(
        &self,
        features: &LoanFeatures,
        cancel: &CancellationToken,
    ) -> EngineResult<PredictionResult> {
        if let Some(cached) = self.cache.get(LOAN_PREDICTOR, features).await {
            debug!("Cache hit for loan prediction");
            return Ok(cached);
        }

        let engineered = engineer_features(features);

        let timeout = self.settings.inference_timeout();
        let confidence = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            outcome = tokio::time::timeout(timeout, self.model_confidence(features)) => match outcome {
                Ok(confidence) => confidence?,
                Err(_) => return Err(EngineError::Timeout(timeout)),
            },
        };

        let result = self.fuse(features, &engineered, confidence);
        self.cache
            .set(LOAN_PREDICTOR, features, result.clone(), Some(self.settings.cache_ttl()))
            .await;

        info!(
            recommendation = %result.recommendation,
            risk = result.risk_score,
            fraud = result.fraud_score,
            default = result.default_probability,
            "Loan prediction complete"
        );

        Ok(result)
    }

    /// Predict every application concurrently. Each item succeeds or fails on
    /// its own; results come back in input order.
    pub async fn predict_batch(&self, batch: &[LoanFeatures]) -> Vec<EngineResult<PredictionResult>> {
        stream::iter(batch)
            .map(|features| self.predict(features))
            .buffered(self.settings.batch_concurrency.max(1))
            .collect()
            .await
    }

    /// Abort pending model loads, unload models and drop cached predictions.
    pub async fn shutdown(&self) {
        self.loader.shutdown().await;
        self.cache.clear().await;
    }

    /// Load and run all three models; overall confidence is the weakest of them
    async fn model_confidence(&self, features: &LoanFeatures) -> EngineResult<f64> {
        let (fraud_model, risk_model, default_model) = tokio::try_join!(
            self.loader.load(FRAUD_DETECTOR),
            self.loader.load(CREDIT_RISK),
            self.loader.load(DEFAULT_PREDICTOR),
        )?;

        let (fraud, risk, default) = tokio::try_join!(
            invoke(&fraud_model, FRAUD_DETECTOR, features),
            invoke(&risk_model, CREDIT_RISK, features),
            invoke(&default_model, DEFAULT_PREDICTOR, features),
        )?;

        Ok(clamp01(fraud.confidence.min(risk.confidence).min(default.confidence)))
    }

    fn fuse(&self, features: &LoanFeatures, engineered: &EngineeredFeatures, confidence: f64) -> PredictionResult {
        let fraud_score = fraud_score(features);
        let default_probability = default_probability(features, engineered.risk_score);

        let recommendation = self.settings.thresholds.recommend(&DecisionInputs {
            fraud_score,
            risk_score: engineered.risk_score,
            affordability_index: engineered.affordability_index,
            default_probability,
        });

        PredictionResult {
            fraud_score,
            risk_score: engineered.risk_score,
            affordability_index: engineered.affordability_index,
            default_probability,
            recommendation,
            confidence,
            factors: RiskFactors {
                credit_score: features.credit_score,
                debt_to_income: features.debt_to_income,
                loan_to_income: engineered.loan_to_income_ratio,
                employment_stability: employment_stability(features),
            },
        }
    }
}

async fn invoke(
    model: &Arc<dyn ScoringModel>,
    name: &str,
    features: &LoanFeatures,
) -> EngineResult<ModelOutput> {
    model
        .predict(features)
        .await
        .map_err(|e| EngineError::model_invocation(name, format!("{:#}", e)))
}
