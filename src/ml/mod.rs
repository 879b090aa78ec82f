pub mod cache;
pub mod features;
pub mod loader;
pub mod model;
pub mod predictor;

pub use cache::{cache_key, CacheStats, ResultCache};
pub use features::engineer_features;
pub use loader::{ModelInfo, ModelLoader};
pub use model::{ModelBackend, ModelOutput, ScoringModel, SimulatedBackend, SimulatedModel};
pub use predictor::LoanPredictor;
