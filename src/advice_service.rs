use crate::config::Config;
use crate::errors::AdviceError;
use crate::models::{PeriodProgress, SalesMetric, SalesRep};
use crate::prompt::{build_advice_prompt, ADVICE_COUNT, ADVICE_MAX_CHARS};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

/// Shape the model is constrained to return.
#[derive(Debug, Deserialize)]
struct AdviceEnvelope {
    advice: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Validates generated text against the `{"advice": [string, ...]}` contract.
///
/// Returns at most [`ADVICE_COUNT`] items, verbatim.
pub fn parse_advice_response(text: &str) -> Result<Vec<String>, AdviceError> {
    let trimmed = text.trim();
    let envelope: AdviceEnvelope = serde_json::from_str(trimmed).map_err(|e| {
        tracing::error!("AI response did not match expected format: {} ({})", e, trimmed);
        AdviceError::MalformedResponse(e.to_string())
    })?;

    if envelope.advice.is_empty() {
        tracing::error!("AI response contained an empty advice list");
        return Err(AdviceError::MalformedResponse(
            "advice list is empty".to_string(),
        ));
    }

    Ok(envelope.advice.into_iter().take(ADVICE_COUNT).collect())
}

/// JSON schema the model output is constrained to.
pub fn advice_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "advice": {
                "type": "ARRAY",
                "description": format!("モチベーションを高めるための{}つの具体的なアドバイスのリスト。", ADVICE_COUNT),
                "items": {
                    "type": "STRING",
                    "description": format!("{}文字以内のポジティブなアドバイス", ADVICE_MAX_CHARS)
                }
            }
        },
        "required": ["advice"]
    })
}

/// Maps a non-success provider response to an error kind.
fn classify_provider_error(status: StatusCode, body: &str) -> AdviceError {
    let provider_status = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("status"))
                .and_then(|s| s.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default();
    let detail = format!("{}: {}", status, body);

    if status == StatusCode::TOO_MANY_REQUESTS
        || provider_status == "RESOURCE_EXHAUSTED"
        || body.contains("RESOURCE_EXHAUSTED")
    {
        AdviceError::QuotaExceeded(detail)
    } else if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || body.contains("API_KEY")
    {
        AdviceError::CredentialRejected(detail)
    } else {
        AdviceError::ProviderUnavailable(detail)
    }
}

/// Client for Gemini structured-output generation.
#[derive(Clone)]
pub struct GeminiAdviceService {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiAdviceService {
    /// Fails with `MissingCredential` when no API key is configured.
    pub fn new(config: &Config) -> Result<Self, AdviceError> {
        let api_key = config
            .gemini_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AdviceError::MissingCredential)?;

        let client = Client::builder().build().map_err(|e| {
            AdviceError::ProviderUnavailable(format!("Failed to create Gemini client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Sends one prompt and returns the raw generated text.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, AdviceError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": advice_response_schema()
            }
        });

        tracing::info!("Requesting advice from Gemini model {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdviceError::ProviderUnavailable(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let error = classify_provider_error(status, &error_text);
            tracing::error!("Gemini returned error: {}", error);
            return Err(error);
        }

        let envelope: GenerateContentResponse = response.json().await.map_err(|e| {
            AdviceError::ProviderUnavailable(format!("Failed to parse Gemini response: {}", e))
        })?;

        Ok(envelope.text())
    }

    /// Builds the prompt, calls the model and validates the advice list.
    pub async fn generate_advice(
        &self,
        metrics: &[SalesMetric],
        period_progress: &PeriodProgress,
        daily_ranking: &[SalesRep],
    ) -> Result<Vec<String>, AdviceError> {
        let prompt = build_advice_prompt(metrics, period_progress, daily_ranking);
        let text = self.generate_text(&prompt).await?;
        let advice = parse_advice_response(&text)?;

        tracing::info!("✓ Received {} advice item(s)", advice.len());
        Ok(advice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(api_key: Option<&str>) -> Config {
        Config {
            port: 3000,
            dashboard_data_url: "https://example.com/exec".to_string(),
            refresh_interval_secs: 300,
            gemini_api_key: api_key.map(str::to_string),
            gemini_base_url: "https://example.com/".to_string(),
            gemini_model: "gemini-2.5-flash".to_string(),
        }
    }

    #[test]
    fn test_missing_credential_at_construction() {
        assert_eq!(
            GeminiAdviceService::new(&test_config(None)).err(),
            Some(AdviceError::MissingCredential)
        );
        assert_eq!(
            GeminiAdviceService::new(&test_config(Some("  "))).err(),
            Some(AdviceError::MissingCredential)
        );
    }

    #[test]
    fn test_endpoint_joins_base_and_model() {
        let service = GeminiAdviceService::new(&test_config(Some("key"))).unwrap();
        assert_eq!(
            service.endpoint(),
            "https://example.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_parse_advice_exact() {
        let advice = parse_advice_response(r#"{"advice": ["a","b","c"]}"#).unwrap();
        assert_eq!(advice, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_advice_truncates_to_count() {
        let advice = parse_advice_response(r#" {"advice": ["a","b","c","d"]} "#).unwrap();
        assert_eq!(advice.len(), ADVICE_COUNT);
    }

    #[test]
    fn test_parse_advice_malformed() {
        for text in [r#"{"advice": []}"#, "{}", "not json", "", r#"{"advice": "a"}"#, r#"{"advice": [1]}"#] {
            assert!(
                matches!(parse_advice_response(text), Err(AdviceError::MalformedResponse(_))),
                "expected MalformedResponse for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_classify_provider_error() {
        let quota = classify_provider_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(matches!(quota, AdviceError::QuotaExceeded(_)));

        let quota_by_status = classify_provider_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#,
        );
        assert!(matches!(quota_by_status, AdviceError::QuotaExceeded(_)));

        let rejected = classify_provider_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#,
        );
        assert!(matches!(rejected, AdviceError::CredentialRejected(_)));

        let unavailable = classify_provider_error(StatusCode::SERVICE_UNAVAILABLE, "overloaded");
        assert!(matches!(unavailable, AdviceError::ProviderUnavailable(_)));
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let envelope: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"advice\":" }, { "text": "[\"a\"]}" }] } }]
        }))
        .unwrap();
        assert_eq!(envelope.text(), r#"{"advice":["a"]}"#);

        let empty: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.text(), "");
    }
}
