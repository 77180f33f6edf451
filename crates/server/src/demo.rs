//! Built-in demo business profile
//!
//! Served by `/api/load-business-data` for the configured demo business id
//! so the chat frontend works without a populated database.

use serde_json::{json, Value};

/// Sample profile for `business_id`
pub fn sample_business_profile(business_id: &str) -> Value {
    json!({
        "business_id": business_id,
        "business_name": "XYZ Pvt Ltd",
        "credit_score": 720,
        "risk_factors": {
            "late_payments": "2 in last 6 months",
            "cash_flow_variability": "Moderate fluctuations",
            "high_debt_ratio": "45% of revenue"
        },
        "financial_summary": {
            "monthly_revenue": 500000,
            "profit_margin": 18,
            "loan_repayment_history": "Good"
        },
        "default_risk_prediction": {
            "probability": 0.12,
            "risk_category": "Low"
        },
        "explanation": "The credit score is strong, but slightly impacted by late payments. The business has stable revenue, a good repayment history, and a low default risk."
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_shape() {
        let profile = sample_business_profile("XYZ123");
        assert_eq!(profile["business_id"], "XYZ123");
        assert_eq!(profile["credit_score"], 720);
        assert_eq!(profile["default_risk_prediction"]["risk_category"], "Low");

        let keys: Vec<&str> = profile.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.first(), Some(&"business_id"));
        assert_eq!(keys.last(), Some(&"explanation"));
    }
}
