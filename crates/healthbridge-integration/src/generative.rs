//! 生成式AI客户端
//!
//! 对 `generateContent` 接口的薄封装，供病历摘要和智能分诊使用。

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::IntegrationError;

/// 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerativeClientConfig {
    /// 服务根地址
    pub endpoint: String,
    /// 模型名称
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// 访问凭据；缺失时所有调用都以 `MissingCredential` 失败
    pub api_key: Option<String>,
    /// 凭据来源的名称，仅用于错误提示
    pub credential_source: String,
}

impl Default for GenerativeClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            temperature: 0.7,
            max_output_tokens: 500,
            api_key: None,
            credential_source: "API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// 拼接第一个候选结果的全部文本片段
    pub(crate) fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// 生成式AI客户端
pub struct GenerativeClient {
    config: GenerativeClientConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for GenerativeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeClient")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .field("has_api_key", &self.config.api_key.is_some())
            .finish()
    }
}

impl GenerativeClient {
    pub fn new(config: GenerativeClientConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &GenerativeClientConfig {
        &self.config
    }

    /// 构造请求体
    pub(crate) fn build_request(
        &self,
        prompt: &str,
        response_schema: Option<serde_json::Value>,
    ) -> GenerateContentRequest {
        let structured = response_schema.is_some();
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: (!structured).then_some(self.config.temperature),
                max_output_tokens: (!structured).then_some(self.config.max_output_tokens),
                response_mime_type: structured.then(|| "application/json".to_string()),
                response_schema,
            },
        }
    }

    /// 调用模型并返回生成的文本；没有文本时返回 `Ok(None)`
    pub async fn generate(
        &self,
        prompt: &str,
        response_schema: Option<serde_json::Value>,
    ) -> Result<Option<String>, IntegrationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| IntegrationError::MissingCredential(self.config.credential_source.clone()))?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );
        let body = self.build_request(prompt, response_schema);

        debug!("Sending generateContent request to {}", url);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("generateContent returned status {}", response.status());
            return Err(IntegrationError::Status(response.status().as_u16()));
        }

        let payload: GenerateContentResponse = response.json().await?;
        Ok(payload.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_request_carries_generation_limits() {
        let client = GenerativeClient::new(GenerativeClientConfig::default());
        let body = serde_json::to_value(client.build_request("hello", None)).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 500);
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_structured_request_asks_for_json() {
        let client = GenerativeClient::new(GenerativeClientConfig::default());
        let schema = serde_json::json!({ "type": "OBJECT" });
        let body = serde_json::to_value(client.build_request("x", Some(schema))).unwrap();

        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Key "},{"text":"points"}]}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text().as_deref(), Some("Key points"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.text().is_none());
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_network() {
        let client = GenerativeClient::new(GenerativeClientConfig::default());
        let err = client.generate("note", None).await.unwrap_err();
        assert!(matches!(err, IntegrationError::MissingCredential(ref source) if source == "API_KEY"));
    }
}
