use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{
    repositories::image_generator::ImageGenerator, value_objects::generations::ReferenceImage,
};

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Image generation over the `generateContent` REST endpoint: reference images go in as
/// inline base64 parts followed by the text prompt, the first inline image part of the
/// first candidate comes back.
pub struct GeminiImageGenerator {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

impl GeminiImageGenerator {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build image generator http client")?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key,
        })
    }
}

fn build_request(reference_images: &[ReferenceImage], prompt: String) -> GenerateContentRequest {
    let mut parts: Vec<Part> = reference_images
        .iter()
        .map(|image| Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.bytes),
            }),
        })
        .collect();

    parts.push(Part {
        text: Some(prompt),
        inline_data: None,
    });

    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            response_modalities: vec!["TEXT", "IMAGE"],
        },
    }
}

fn extract_image(response: GenerateContentResponse) -> Result<Vec<u8>> {
    let mut finish_reason = None;

    for candidate in response.candidates {
        finish_reason = finish_reason.or(candidate.finish_reason);
        let Some(content) = candidate.content else {
            continue;
        };

        if let Some(inline) = content.parts.into_iter().find_map(|part| part.inline_data) {
            return STANDARD
                .decode(inline.data.as_bytes())
                .context("image generator returned invalid base64 image data");
        }
    }

    Err(anyhow!(
        "image generator returned no image (finish reason: {})",
        finish_reason.unwrap_or_else(|| "unknown".to_string())
    ))
}

#[async_trait]
impl ImageGenerator for GeminiImageGenerator {
    async fn generate(
        &self,
        reference_images: Vec<ReferenceImage>,
        prompt: String,
    ) -> Result<Vec<u8>> {
        let reference_count = reference_images.len();
        let body = build_request(&reference_images, prompt);

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    anyhow!("image generator timed out: {}", err)
                } else {
                    anyhow!("image generator request failed: {}", err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview = body.chars().take(512).collect::<String>();
            warn!(
                status = status.as_u16(),
                body = %preview,
                "image_generator: non-success response"
            );
            bail!("image generator returned status {}: {}", status.as_u16(), preview);
        }

        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .context("failed to decode image generator response")?;

        let image = extract_image(parsed)?;
        debug!(
            reference_count,
            size_bytes = image.len(),
            "image_generator: image received"
        );

        Ok(image)
    }
}
