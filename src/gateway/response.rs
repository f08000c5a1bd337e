//! Helpers for turning API responses into typed results.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::FieldErrors;
use crate::{ClientError, Result};

/// Deserialize a successful response body.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Read a response body as JSON, treating an empty body as `Null`.
pub async fn read_json_or_null(response: Response) -> Result<serde_json::Value> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Consume a failed response and describe it.
///
/// The message is taken from a JSON `message` field, else the raw body,
/// else the status reason phrase.
pub async fn error_message(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    (status, message_from_body(status, &text))
}

/// Consume a failed response into `ClientError::Api`.
pub async fn api_error(response: Response) -> ClientError {
    let (status, message) = error_message(response).await;
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

pub(crate) fn message_from_body(status: StatusCode, text: &str) -> String {
    let trimmed = text.trim();
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(serde_json::Value::String(message)) = map.get("message") {
            return message.clone();
        }
    }
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}

/// Parse a validation error body into per-field messages.
///
/// Accepts `{field: [messages]}`, `{field: "message"}` and `{message: "..."}`.
/// Anything else is filed under `message`.
pub(crate) fn field_errors_from_body(status: StatusCode, text: &str) -> FieldErrors {
    let mut fields = FieldErrors::new();

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(text) {
        for (field, value) in map {
            let messages: Vec<String> = match value {
                serde_json::Value::String(s) => vec![s],
                serde_json::Value::Array(items) => items
                    .into_iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
                _ => continue,
            };
            if !messages.is_empty() {
                fields.insert(field, messages);
            }
        }
    }

    if fields.is_empty() {
        fields.insert(
            "message".to_string(),
            vec![message_from_body(status, text)],
        );
    }

    fields
}
