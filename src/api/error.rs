use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    Json(String),

    #[error("Authentication failed: {0}")]
    Login(String),
}

impl ApiError {
    /// Build an error from a non-success response, preferring the
    /// server's own error description over the raw body.
    pub fn from_response(status: u16, reason: Option<&str>, body: &str) -> Self {
        let message = Self::message_from_body(body)
            .or_else(|| reason.map(str::to_string))
            .unwrap_or_else(|| "unknown error".to_string());

        ApiError::Http { status, message }
    }

    fn message_from_body(body: &str) -> Option<String> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return None;
        }

        let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
            return Some(trimmed.to_string());
        };

        // Parameter verification failures: {"errors": {"field": "reason"}}
        if let Some(errors) = value.get("errors").and_then(|e| e.as_object()) {
            let joined = errors
                .iter()
                .map(|(field, reason)| match reason.as_str() {
                    Some(reason) => format!("{field}: {}", reason.trim()),
                    None => format!("{field}: {reason}"),
                })
                .collect::<Vec<_>>()
                .join(", ");
            if !joined.is_empty() {
                return Some(joined);
            }
        }

        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return Some(message.trim().to_string());
        }

        None
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
