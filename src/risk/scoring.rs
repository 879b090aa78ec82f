use crate::ml::features::clamp01;
use crate::types::LoanFeatures;

/// Rule-based fraud indicator (0-1, higher = more likely fraud)
pub fn fraud_score(features: &LoanFeatures) -> f64 {
    let mut score = 0.0;

    // Loan far out of proportion to income
    if features.loan_to_income() > 5.0 {
        score += 0.3;
    }

    if features.credit_score < 500 {
        score += 0.2;
    }

    if features.debt_to_income > 0.6 {
        score += 0.2;
    }

    // New job, large loan
    if features.employment_years < 1.0 && features.loan_amount > 50_000.0 {
        score += 0.3;
    }

    clamp01(score)
}

/// Probability of default built on top of the engineered risk score
pub fn default_probability(features: &LoanFeatures, risk_score: f64) -> f64 {
    let mut probability = risk_score * 0.5;

    if features.credit_score < 600 {
        probability += 0.2;
    } else if features.credit_score < 650 {
        probability += 0.1;
    }

    if features.debt_to_income > 0.5 {
        probability += 0.15;
    }

    if features.employment_years < 2.0 {
        probability += 0.1;
    }

    clamp01(probability)
}

/// employment_years / 10, capped at 1
pub fn employment_stability(features: &LoanFeatures) -> f64 {
    clamp01(features.employment_years / 10.0)
}
