//! Google Gemini provider implementation (Generative Language API)

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Gemini `generateContent` provider
pub struct GeminiProvider {
    client: Client,
    config: ProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> std::result::Result<Self, ProviderError> {
        let client = http_client(&config)?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com/v1beta")
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or("gemini-2.5-flash")
    }

    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(self.default_model());
        let api_request = GeminiRequest::build(&request);

        let api_key = self.config.api_key.as_ref()
            .ok_or(ProviderError::AuthenticationFailed)?;

        let mut req = self.client
            .post(format!("{}/models/{}:generateContent", self.base_url(), model))
            .header("x-goog-api-key", api_key)
            .json(&api_request);

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        tracing::debug!(model, "sending gemini generateContent");

        let response = req.send().await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = retry_after_secs(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, text));
        }

        let api_response: GeminiResponse = response.json().await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(api_response.into_completion(model))
    }
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl GeminiRequest {
    fn build(request: &CompletionRequest) -> Self {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for msg in &request.messages {
            let part = GeminiPart { text: Some(msg.content.clone()) };
            match msg.role {
                Role::System => system_parts.push(part),
                Role::User => contents.push(GeminiContent { role: Some("user".into()), parts: vec![part] }),
                Role::Assistant => contents.push(GeminiContent { role: Some("model".into()), parts: vec![part] }),
            }
        }

        let generation_config = if request.temperature.is_some()
            || request.max_tokens.is_some()
            || request.stop.is_some()
        {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                stop_sequences: request.stop.clone(),
            })
        } else {
            None
        };

        Self {
            contents,
            system_instruction: if system_parts.is_empty() {
                None
            } else {
                Some(GeminiContent { role: None, parts: system_parts })
            },
            generation_config,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
    response_id: Option<String>,
}

impl GeminiResponse {
    fn into_completion(self, requested_model: &str) -> CompletionResponse {
        let candidate = self.candidates.into_iter().next();

        let finish_reason = match candidate.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            Some("STOP") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") => FinishReason::ContentFilter,
            _ => FinishReason::Unknown,
        };

        let content: String = candidate
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let usage = self
            .usage_metadata
            .map(|u| {
                // thinking tokens are billed as output
                let completion_tokens = u.candidates_token_count + u.thoughts_token_count;
                Usage {
                    prompt_tokens: u.prompt_token_count,
                    completion_tokens,
                    total_tokens: u.total_token_count.max(u.prompt_token_count + completion_tokens),
                }
            })
            .unwrap_or_default();

        CompletionResponse {
            id: self.response_id.unwrap_or_default(),
            model: self.model_version.unwrap_or_else(|| requested_model.to_string()),
            content: if content.is_empty() { None } else { Some(content) },
            finish_reason,
            usage,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
    #[serde(default)]
    thoughts_token_count: usize,
    #[serde(default)]
    total_token_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_system_instruction_and_model_role() {
        let request = CompletionRequest::new(vec![
            ChatMessage::system("Return only JSON."),
            ChatMessage::user("Parse this"),
            ChatMessage::assistant("{}"),
        ])
        .with_temperature(0.1);

        let json = serde_json::to_value(GeminiRequest::build(&request)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Return only JSON.");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        let temperature = json["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.1).abs() < 1e-6);
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_request_without_tuning_has_no_generation_config() {
        let request = CompletionRequest::new(vec![ChatMessage::user("hi")]);
        let json = serde_json::to_value(GeminiRequest::build(&request)).unwrap();

        assert!(json.get("generationConfig").is_none());
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "```json\n{}\n```" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 80,
                "candidatesTokenCount": 20,
                "totalTokenCount": 100
            },
            "modelVersion": "gemini-2.5-flash",
            "responseId": "abc"
        });
        let response: GeminiResponse = serde_json::from_value(body).unwrap();
        let completion = response.into_completion("gemini-2.5-flash");

        assert_eq!(completion.content.as_deref(), Some("```json\n{}\n```"));
        assert_eq!(completion.finish_reason, FinishReason::Stop);
        assert_eq!(completion.usage, Usage::new(80, 20));
        assert_eq!(completion.id, "abc");
    }

    #[test]
    fn test_thinking_tokens_count_as_completion() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "ok" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 80,
                "candidatesTokenCount": 20,
                "thoughtsTokenCount": 50,
                "totalTokenCount": 150
            }
        });
        let response: GeminiResponse = serde_json::from_value(body).unwrap();
        let completion = response.into_completion("gemini-2.5-flash");

        assert_eq!(completion.usage, Usage::new(80, 70));
        assert_eq!(completion.usage.total_tokens, 150);
    }

    #[test]
    fn test_blocked_response_has_no_content() {
        let body = serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        });
        let response: GeminiResponse = serde_json::from_value(body).unwrap();
        let completion = response.into_completion("gemini-2.5-pro");

        assert!(completion.content.is_none());
        assert_eq!(completion.finish_reason, FinishReason::ContentFilter);
        assert_eq!(completion.model, "gemini-2.5-pro");
        assert!(completion.usage.is_empty());
    }
}
