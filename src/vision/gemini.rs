//! Gemini API連携
//!
//! - models: ページングしながら全モデルを列挙
//! - models/{id}:generateContent: テキスト + 画像（inline_data）

use super::VisionBackend;
use crate::error::{CactusError, Result};
use crate::http::build_client;
use crate::intake::PreparedImage;
use async_trait::async_trait;
use cactus_common::ModelInfo;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const LIST_PAGE_SIZE: u32 = 100;

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// モデル一覧レスポンス
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key,
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    async fn fetch_page(&self, page_token: Option<&str>) -> Result<ListModelsResponse> {
        let url = format!("{}/models", self.base_url);
        let page_size = LIST_PAGE_SIZE.to_string();
        let mut query = vec![("key", self.api_key.as_str()), ("pageSize", page_size.as_str())];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let resp = self.client.get(&url).query(&query).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CactusError::ApiCall(format!("モデル一覧 {}: {}", status, text)));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl VisionBackend for GeminiClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(page_token.as_deref()).await?;
            models.extend(page.models);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        log::debug!("Gemini models listed: {}", models.len());
        Ok(models)
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        image: Option<&PreparedImage>,
    ) -> Result<String> {
        let mut parts = vec![Part::Text { text: prompt.to_string() }];
        let mut generation_config = None;

        if let Some(image) = image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: PreparedImage::MIME_TYPE.to_string(),
                    data: image.to_base64(),
                },
            });
            generation_config = Some(GenerationConfig {
                temperature: 0.1,
                response_mime_type: "application/json".to_string(),
            });
        }

        let request = GeminiRequest {
            contents: vec![Content { parts }],
            generation_config,
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CactusError::ApiCall(format!("{} {}: {}", model, status, text)));
        }

        let response: GeminiResponse = resp.json().await?;
        let text = response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(CactusError::ApiCall(format!("{}: 空のレスポンス", model)));
        }
        Ok(text)
    }
}
