//! Loan risk decisioning engine.
//!
//! Given an applicant's financial features the engine produces a fraud score,
//! risk score, affordability index, default probability and a final
//! approve / review / reject recommendation. Scoring models are loaded lazily
//! (one load per model name, shared by concurrent callers) and fused results
//! are cached for a bounded time.

pub mod config;
pub mod error;
pub mod ml;
pub mod risk;
pub mod types;

pub use config::{load_config, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use ml::{LoanPredictor, ModelBackend, ModelLoader, ResultCache, ScoringModel, SimulatedBackend};
pub use types::{EngineeredFeatures, LoanFeatures, PredictionResult, Recommendation, RiskFactors};
