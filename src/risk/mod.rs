pub mod policy;
pub mod scoring;

pub use policy::{recommend, DecisionInputs, DecisionThresholds};
pub use scoring::{default_probability, employment_stability, fraud_score};
