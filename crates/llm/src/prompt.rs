//! Prompt construction for business credit questions

use serde_json::Value;

/// Embed the business data and the user's question in one prompt
///
/// The data is pretty-printed with two-space indentation.
pub fn build_business_prompt(business_data: &Value, user_message: &str) -> String {
    let data = serde_json::to_string_pretty(business_data).unwrap_or_else(|_| business_data.to_string());
    format!(
        "Here is the business financial data in JSON format:\n{}\n\nThe user asked: {}\nAnswer based on the provided data.",
        data, user_message
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_layout() {
        let data = json!({ "business_id": "XYZ123", "credit_score": 720 });
        let prompt = build_business_prompt(&data, "Why is my score 720?");

        assert_eq!(
            prompt,
            "Here is the business financial data in JSON format:\n\
             {\n  \"business_id\": \"XYZ123\",\n  \"credit_score\": 720\n}\n\n\
             The user asked: Why is my score 720?\n\
             Answer based on the provided data."
        );
    }

    #[test]
    fn test_prompt_with_empty_data() {
        let prompt = build_business_prompt(&Value::Null, "hello");
        assert!(prompt.contains("JSON format:\nnull\n\nThe user asked: hello\n"));
    }
}
