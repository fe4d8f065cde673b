//! Gemini `generateContent` over REST.
//!
//! One request per call: the stylist does not retry failed generations.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::advisor::{AdvisorError, StyleAdvisor};
use super::outfit::InlineImage;
use super::schema::fashion_advice_schema;
use crate::config::GeminiConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    #[serde(rename_all = "camelCase")]
    Inline { inline_data: InlineRef<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineRef<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<InlineImage>,
}

impl GenerateResponse {
    fn first_parts(&self) -> &[ResponsePart] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// Every inline image of the first candidate.
    pub fn images(&self) -> Vec<InlineImage> {
        self.first_parts()
            .iter()
            .filter_map(|p| p.inline_data.clone())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(cfg: &GeminiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build gemini http client")?;
        Ok(Self {
            client,
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            image_model: cfg.image_model.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<GenerateResponse, AdvisorError> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!(%status, model, "gemini call failed");
            return Err(AdvisorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        debug!(model, candidates = parsed.candidates.len(), "gemini call succeeded");
        Ok(parsed)
    }
}

fn image_and_text<'a>(image: &'a InlineImage, prompt: &'a str) -> Vec<Content<'a>> {
    vec![Content {
        parts: vec![
            RequestPart::Inline {
                inline_data: InlineRef {
                    mime_type: &image.mime_type,
                    data: &image.data,
                },
            },
            RequestPart::Text { text: prompt },
        ],
    }]
}

#[async_trait]
impl StyleAdvisor for GeminiClient {
    async fn analyze(&self, image: &InlineImage, prompt: &str) -> Result<String, AdvisorError> {
        let request = GenerateRequest {
            contents: image_and_text(image, prompt),
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(fashion_advice_schema()),
                ..Default::default()
            },
        };
        let response = self.generate(&self.model, &request).await?;
        response.text().ok_or(AdvisorError::EmptyContent)
    }

    async fn synthesize_image(
        &self,
        image: &InlineImage,
        prompt: &str,
    ) -> Result<Vec<InlineImage>, AdvisorError> {
        let request = GenerateRequest {
            contents: image_and_text(image, prompt),
            generation_config: GenerationConfig {
                response_modalities: Some(vec!["IMAGE", "TEXT"]),
                ..Default::default()
            },
        };
        let response = self.generate(&self.image_model, &request).await?;
        Ok(response.images())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_gemini_wire_names() {
        let image = InlineImage::new("image/png", "aGVsbG8=");
        let request = GenerateRequest {
            contents: image_and_text(&image, "dress me"),
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json"),
                ..Default::default()
            },
        };
        let v = serde_json::to_value(&request).unwrap();
        let parts = &v["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(parts[1]["text"], "dress me");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert!(v["generationConfig"].get("responseModalities").is_none());
    }

    #[test]
    fn response_collects_text_and_images_of_first_candidate() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [
                    {"text": "[{\"a\":"},
                    {"text": "1}]"},
                    {"inlineData": {"mimeType": "image/png", "data": "AAAA"}}
                ]}},
                {"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "BBBB"}}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("[{\"a\":1}]"));
        let images = parsed.images();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].data, "AAAA");
    }

    #[test]
    fn empty_response_has_no_text_or_images() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.text().is_none());
        assert!(parsed.images().is_empty());
    }

    #[test]
    fn endpoint_joins_model_name() {
        let client = GeminiClient::new(&GeminiConfig {
            api_key: "k".into(),
            base_url: "https://example.test/v1beta/".into(),
            model: "m".into(),
            image_model: "im".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(
            client.endpoint("m"),
            "https://example.test/v1beta/models/m:generateContent"
        );
    }
}
