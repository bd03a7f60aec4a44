use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::utils::timing::log_call_timing;

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

pub(crate) fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn extract_message_content(response: &Value) -> Option<String> {
    let content = response
        .get("choices")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("message"))
        .and_then(|v| v.get("content"))
        .and_then(|v| v.as_str())?
        .trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// Minimal OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    settings: ChatSettings,
}

impl ChatClient {
    pub fn new(client: Client, settings: ChatSettings) -> Self {
        ChatClient { client, settings }
    }

    pub fn is_configured(&self) -> bool {
        !self.settings.api_key.trim().is_empty()
    }

    async fn call_api(&self, payload: &Value) -> Result<Value> {
        debug!(
            "Chat completion request: model={}, messages={}",
            self.settings.model,
            payload
                .get("messages")
                .and_then(|v| v.as_array())
                .map(|messages| messages.len())
                .unwrap_or(0)
        );

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.settings.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.settings.api_key)
            .timeout(self.settings.timeout)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!(
                "Chat completion API error: status={}, body={}",
                status, body_summary
            );
            let detail = message.unwrap_or(body_summary);
            return Err(anyhow!(
                "Chat completion request failed with status {}: {}",
                status,
                detail
            ));
        }

        Ok(response.json::<Value>().await?)
    }

    /// Runs one system+user exchange in JSON mode and returns the raw content.
    pub async fn complete_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        operation: &str,
        metadata: Option<Value>,
    ) -> Result<String> {
        if !self.is_configured() {
            return Err(anyhow!("OPENAI_API_KEY is not configured"));
        }

        let payload = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": self.settings.temperature,
            "response_format": { "type": "json_object" }
        });

        log_call_timing("openai", &self.settings.model, operation, metadata, || async {
            let response = self.call_api(&payload).await?;
            extract_message_content(&response).ok_or_else(|| {
                anyhow!(
                    "Chat completion returned no content: {}",
                    truncate_for_log(&response.to_string(), 500)
                )
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::testing::{route, stub_client, StubServer};

    #[test]
    fn error_body_prefers_nested_message() {
        let (message, summary) =
            summarize_error_body(r#"{"error":{"message":"Invalid API key","type":"auth"}}"#);
        assert_eq!(message.as_deref(), Some("Invalid API key"));
        assert!(summary.contains("Invalid API key"));

        let (message, summary) = summarize_error_body("  ");
        assert_eq!(message, None);
        assert_eq!(summary, "empty response body");
    }

    #[test]
    fn reads_first_choice_content() {
        let response = json!({ "choices": [{ "message": { "role": "assistant", "content": " {\"items\":[]} " } }] });
        assert_eq!(
            extract_message_content(&response).as_deref(),
            Some("{\"items\":[]}")
        );
        assert_eq!(extract_message_content(&json!({ "choices": [] })), None);
    }

    #[test]
    fn truncation_marks_long_values() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("abcdef", 3), "abc... (truncated)");
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_a_request() {
        let client = ChatClient::new(
            Client::new(),
            ChatSettings {
                api_key: String::new(),
                base_url: "https://api.openai.invalid/v1".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                temperature: 0.7,
                timeout: Duration::from_secs(5),
            },
        );
        assert!(!client.is_configured());
        assert!(client.complete_json("sys", "user", "test", None).await.is_err());
    }

    fn stub_settings(base_url: &str) -> ChatSettings {
        ChatSettings {
            api_key: "sk-test".to_string(),
            base_url: format!("{base_url}/v1"),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn returns_message_content_from_the_endpoint() {
        let server = StubServer::start(vec![route(
            "/v1/chat/completions",
            200,
            json!({ "choices": [{ "message": { "content": "{\"items\":[]}" } }] }),
        )])
        .await;
        let client = ChatClient::new(stub_client(), stub_settings(&server.base_url));

        let content = client
            .complete_json("sys", "user", "test", Some(json!({ "category": "artist" })))
            .await
            .unwrap();

        assert_eq!(content, "{\"items\":[]}");
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .head
            .to_lowercase()
            .contains("authorization: bearer sk-test"));
    }

    #[tokio::test]
    async fn error_status_surfaces_the_api_message() {
        let server = StubServer::start(vec![route(
            "/v1/chat/completions",
            401,
            json!({ "error": { "message": "Invalid API key" } }),
        )])
        .await;
        let client = ChatClient::new(stub_client(), stub_settings(&server.base_url));

        let err = client
            .complete_json("sys", "user", "test", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid API key"));
    }
}
