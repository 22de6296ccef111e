use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate-idea`. The field is optional here so that a
/// missing value maps to the localized 400 instead of an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct IdeaRequest {
    #[serde(default)]
    pub business: Option<String>,
}

/// Body of `POST /api/explain-policy`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRequest {
    #[serde(default)]
    pub policy_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IdeaResponse {
    pub ideas: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PolicyResponse {
    pub explanation: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

/// 500 body for idea generation: the error plus usable fallback ideas.
#[derive(Debug, Serialize)]
pub struct IdeaErrorResponse {
    pub error: &'static str,
    pub ideas: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PolicyErrorResponse {
    pub error: &'static str,
    pub explanation: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// Returns the value untouched unless it is absent or `""`. Whitespace-only
/// and padded values count as present and reach the prompt as sent.
pub fn required(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_request_uses_camel_case() {
        let req: PolicyRequest = serde_json::from_str(r#"{"policyType":"소상공인 정책자금"}"#).unwrap();
        assert_eq!(req.policy_type.as_deref(), Some("소상공인 정책자금"));
    }

    #[test]
    fn missing_fields_deserialize_to_none() {
        let req: IdeaRequest = serde_json::from_str("{}").unwrap();
        assert!(req.business.is_none());
        let req: IdeaRequest = serde_json::from_str(r#"{"business":null}"#).unwrap();
        assert!(req.business.is_none());
    }

    #[test]
    fn required_rejects_only_absent_or_empty() {
        assert_eq!(required(None), None);
        assert_eq!(required(Some(String::new())), None);
        assert_eq!(required(Some(" \n\t".to_string())), Some(" \n\t".to_string()));
        assert_eq!(required(Some("  카페 ".to_string())), Some("  카페 ".to_string()));
    }
}
