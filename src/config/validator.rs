use thiserror::Error;

use crate::config::{LlmSettings, McpSettings, ServerSettings, SessionSettings, Settings};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        errors.extend(Self::validate_server(&settings.server));
        errors.extend(Self::validate_mcp(&settings.mcp));
        errors.extend(Self::validate_llm(&settings.llm));
        errors.extend(Self::validate_session(&settings.session));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if server.max_body_bytes == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.max_body_bytes".to_string(),
                reason: "Body limit must be greater than 0".to_string(),
            });
        }

        errors
    }

    fn validate_mcp(mcp: &McpSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if mcp.server_url.is_empty() {
            errors.push(ValidationError::MissingField("mcp.server_url".to_string()));
        } else {
            match reqwest::Url::parse(&mcp.server_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(ValidationError::InvalidValue {
                    field: "mcp.server_url".to_string(),
                    reason: format!("Unsupported scheme '{}', expected http or https", url.scheme()),
                }),
                Err(e) => errors.push(ValidationError::InvalidValue {
                    field: "mcp.server_url".to_string(),
                    reason: e.to_string(),
                }),
            }
        }

        if mcp.timeout_seconds == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "mcp.timeout_seconds".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        errors
    }

    fn validate_llm(llm: &LlmSettings) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if llm.model.is_empty() {
            errors.push(ValidationError::MissingField("llm.model".to_string()));
        }

        if llm.max_turns == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "llm.max_turns".to_string(),
                reason: "At least one turn is required".to_string(),
            });
        }

        errors
    }

    fn validate_session(session: &SessionSettings) -> Vec<ValidationError> {
        if session.url.is_empty() {
            vec![ValidationError::MissingField("session.url".to_string())]
        } else {
            Vec::new()
        }
    }
}
