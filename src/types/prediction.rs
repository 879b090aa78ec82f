use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Approve,
    Review,
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Approve => "approve",
            Recommendation::Review => "review",
            Recommendation::Reject => "reject",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw inputs echoed back so a reviewer can see what drove the decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    pub credit_score: u32,
    pub debt_to_income: f64,
    pub loan_to_income: f64,
    /// employment_years / 10, capped at 1
    pub employment_stability: f64,
}

/// Final fused decision for one loan application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub fraud_score: f64,
    pub risk_score: f64,
    pub affordability_index: f64,
    pub default_probability: f64,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub factors: RiskFactors,
}

impl PredictionResult {
    pub fn is_approved(&self) -> bool {
        self.recommendation == Recommendation::Approve
    }

    pub fn needs_review(&self) -> bool {
        self.recommendation == Recommendation::Review
    }
}
