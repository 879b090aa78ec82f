use crate::types::{EngineeredFeatures, LoanFeatures};

const CREDIT_WEIGHT: f64 = 0.35;
const DTI_WEIGHT: f64 = 0.30;
const EMPLOYMENT_WEIGHT: f64 = 0.20;
const LOAN_TO_INCOME_WEIGHT: f64 = 0.15;

/// DTI at which debt risk saturates
const MAX_RISK_DTI: f64 = 0.5;
/// Loan-to-income multiple at which loan size risk saturates
const MAX_RISK_LOAN_TO_INCOME: f64 = 5.0;

pub(crate) fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Compute every derived feature for a loan application
pub fn engineer_features(features: &LoanFeatures) -> EngineeredFeatures {
    let annual_rate = estimated_annual_rate(features.credit_score);
    let monthly_payment = monthly_payment(features.loan_amount, annual_rate, features.loan_term);

    EngineeredFeatures {
        risk_score: risk_score(features),
        affordability_index: affordability_index(features, monthly_payment),
        debt_to_income_ratio: features.debt_to_income,
        loan_to_income_ratio: features.loan_to_income(),
        monthly_payment,
    }
}

/// Weighted blend of credit, DTI, employment and loan-size risk (0-1, higher = riskier),
/// rounded to 3 decimals
pub fn risk_score(features: &LoanFeatures) -> f64 {
    let credit_risk = clamp01((850.0 - features.credit_score as f64) / 550.0);
    let dti_risk = clamp01(features.debt_to_income / MAX_RISK_DTI);
    let employment_risk = clamp01((10.0 - features.employment_years) / 10.0);
    let loan_to_income_risk = clamp01(features.loan_to_income() / MAX_RISK_LOAN_TO_INCOME);

    let score = credit_risk * CREDIT_WEIGHT
        + dti_risk * DTI_WEIGHT
        + employment_risk * EMPLOYMENT_WEIGHT
        + loan_to_income_risk * LOAN_TO_INCOME_WEIGHT;

    round3(clamp01(score))
}

/// Annual rate a lender would likely quote for this credit score
pub fn estimated_annual_rate(credit_score: u32) -> f64 {
    if credit_score >= 750 {
        0.05
    } else if credit_score >= 700 {
        0.07
    } else if credit_score >= 650 {
        0.10
    } else {
        0.15
    }
}

/// Standard amortized monthly payment
pub fn monthly_payment(principal: f64, annual_rate: f64, term_months: u32) -> f64 {
    let monthly_rate = annual_rate / 12.0;
    let n = term_months as f64;
    if monthly_rate == 0.0 {
        return principal / n;
    }

    let growth = (1.0 + monthly_rate).powf(n);
    principal * monthly_rate * growth / (growth - 1.0)
}

/// Share of post-debt monthly income left after the new payment (0-1),
/// rounded to 3 decimals. Zero when existing debt already consumes all income.
pub fn affordability_index(features: &LoanFeatures, monthly_payment: f64) -> f64 {
    let monthly_income = features.monthly_income();
    let available_income = monthly_income - monthly_income * features.debt_to_income;
    if available_income <= 0.0 {
        return 0.0;
    }

    round3(clamp01(1.0 - monthly_payment / available_income))
}
