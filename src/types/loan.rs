use serde::{Deserialize, Serialize};

pub const MIN_CREDIT_SCORE: u32 = 300;
pub const MAX_CREDIT_SCORE: u32 = 850;

/// Raw feature vector describing a single loan application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanFeatures {
    pub loan_amount: f64,
    /// Annual income
    pub income: f64,
    pub credit_score: u32,
    /// Existing debt payments as a fraction of income (0-1)
    pub debt_to_income: f64,
    pub employment_years: f64,
    /// Loan term in months
    pub loan_term: u32,
}

impl LoanFeatures {
    /// Range/type checks a caller runs before handing features to the engine.
    /// The engine itself assumes features already passed this.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.loan_amount.is_finite() && self.loan_amount > 0.0) {
            errors.push("loan_amount must be > 0".to_string());
        }
        if !(self.income.is_finite() && self.income > 0.0) {
            errors.push("income must be > 0".to_string());
        }
        if !(MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&self.credit_score) {
            errors.push(format!(
                "credit_score must be between {} and {}",
                MIN_CREDIT_SCORE, MAX_CREDIT_SCORE
            ));
        }
        if !(0.0..=1.0).contains(&self.debt_to_income) {
            errors.push("debt_to_income must be between 0 and 1".to_string());
        }
        if !(self.employment_years.is_finite() && self.employment_years >= 0.0) {
            errors.push("employment_years must be >= 0".to_string());
        }
        if self.loan_term == 0 {
            errors.push("loan_term must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn loan_to_income(&self) -> f64 {
        self.loan_amount / self.income
    }

    pub fn monthly_income(&self) -> f64 {
        self.income / 12.0
    }
}

/// Derived ratios and sub-scores, computed fresh for every prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineeredFeatures {
    /// 0-1, higher = riskier
    pub risk_score: f64,
    /// 0-1, higher = more affordable
    pub affordability_index: f64,
    pub debt_to_income_ratio: f64,
    pub loan_to_income_ratio: f64,
    pub monthly_payment: f64,
}
