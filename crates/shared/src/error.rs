use serde::{Deserialize, Serialize};

/// Error body the scoring API returns alongside non-success statuses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub error: String,
}

impl ApiErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    /// Extracts the server message from a raw response body, falling back to
    /// the trimmed text when the body is not the expected JSON shape.
    pub fn message_from_body(body: &str) -> Option<String> {
        if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
            return Some(parsed.error);
        }
        let trimmed = body.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_from_body_prefers_json_error_field() {
        assert_eq!(
            ApiErrorBody::message_from_body(r#"{"error":"answers must have 20 entries"}"#),
            Some("answers must have 20 entries".to_string())
        );
        assert_eq!(
            ApiErrorBody::message_from_body("  upstream down \n"),
            Some("upstream down".to_string())
        );
        assert_eq!(ApiErrorBody::message_from_body("   "), None);
    }
}
