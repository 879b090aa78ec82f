use serde::{Deserialize, Serialize};

use crate::types::Recommendation;

/// The four fused scores the decision policy looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionInputs {
    pub fraud_score: f64,
    pub risk_score: f64,
    pub affordability_index: f64,
    pub default_probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionThresholds {
    // Hard rejects
    pub max_fraud_score: f64,
    pub max_default_probability: f64,
    pub high_risk_score: f64,
    pub low_affordability: f64,

    // Automatic approval
    pub low_risk_score: f64,
    pub high_affordability: f64,
    pub max_approval_fraud_score: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            max_fraud_score: 0.7,
            max_default_probability: 0.6,
            high_risk_score: 0.7,
            low_affordability: 0.3,
            low_risk_score: 0.3,
            high_affordability: 0.6,
            max_approval_fraud_score: 0.2,
        }
    }
}

impl DecisionThresholds {
    /// Rules are checked in priority order; the first that matches decides.
    pub fn recommend(&self, inputs: &DecisionInputs) -> Recommendation {
        if inputs.fraud_score > self.max_fraud_score {
            return Recommendation::Reject;
        }

        if inputs.default_probability > self.max_default_probability {
            return Recommendation::Reject;
        }

        if inputs.risk_score > self.high_risk_score
            && inputs.affordability_index < self.low_affordability
        {
            return Recommendation::Reject;
        }

        if inputs.risk_score < self.low_risk_score
            && inputs.affordability_index > self.high_affordability
            && inputs.fraud_score < self.max_approval_fraud_score
        {
            return Recommendation::Approve;
        }

        Recommendation::Review
    }
}

/// Recommendation under the standard thresholds
pub fn recommend(inputs: &DecisionInputs) -> Recommendation {
    DecisionThresholds::default().recommend(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(fraud: f64, risk: f64, affordability: f64, default: f64) -> DecisionInputs {
        DecisionInputs {
            fraud_score: fraud,
            risk_score: risk,
            affordability_index: affordability,
            default_probability: default,
        }
    }

    #[test]
    fn test_fraud_rule_wins() {
        // Would also approve on risk/affordability alone
        assert_eq!(recommend(&inputs(0.8, 0.1, 0.9, 0.9)), Recommendation::Reject);
    }

    #[test]
    fn test_high_default_rejects() {
        assert_eq!(recommend(&inputs(0.0, 0.1, 0.9, 0.61)), Recommendation::Reject);
        assert_eq!(recommend(&inputs(0.0, 0.5, 0.5, 0.6)), Recommendation::Review);
    }

    #[test]
    fn test_high_risk_needs_low_affordability_to_reject() {
        assert_eq!(recommend(&inputs(0.0, 0.75, 0.2, 0.4)), Recommendation::Reject);
        assert_eq!(recommend(&inputs(0.0, 0.75, 0.4, 0.4)), Recommendation::Review);
    }

    #[test]
    fn test_approval_requires_all_three() {
        assert_eq!(recommend(&inputs(0.0, 0.2, 0.7, 0.1)), Recommendation::Approve);
        assert_eq!(recommend(&inputs(0.2, 0.2, 0.7, 0.1)), Recommendation::Review);
        assert_eq!(recommend(&inputs(0.0, 0.3, 0.7, 0.1)), Recommendation::Review);
        assert_eq!(recommend(&inputs(0.0, 0.2, 0.6, 0.1)), Recommendation::Review);
    }

    #[test]
    fn test_boundaries_are_strict() {
        assert_eq!(recommend(&inputs(0.7, 0.5, 0.5, 0.5)), Recommendation::Review);
    }
}
