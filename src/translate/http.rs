use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::{ProviderKind, ProviderSpec};
use super::{Provider, ProviderError};

/// Config-driven provider client. The wire protocol is selected by
/// `ProviderKind`; adding another endpoint of an existing kind is purely a
/// configuration change.
pub struct HttpProvider {
    client: Client,
    spec: ProviderSpec,
    source_lang: String,
    target_lang: String,
}

impl HttpProvider {
    pub fn new(client: Client, spec: ProviderSpec, source_lang: &str, target_lang: &str) -> Self {
        Self {
            client,
            spec,
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        }
    }

    async fn fetch_mymemory(&self, text: &str) -> Result<String, ProviderError> {
        let langpair = format!("{}|{}", self.source_lang, self.target_lang);
        let response = self
            .client
            .get(&self.spec.endpoint)
            .query(&[("q", text), ("langpair", &langpair)])
            .send()
            .await
            .map_err(request_error)?;

        let body = read_body(response).await?;
        parse_mymemory(&body, text)
    }

    async fn fetch_libretranslate(&self, text: &str) -> Result<String, ProviderError> {
        let payload = json!({
            "q": text,
            "source": self.source_lang,
            "target": self.target_lang,
            "format": "text",
        });

        let response = self
            .client
            .post(&self.spec.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;

        let body = read_body(response).await?;
        parse_libretranslate(&body)
    }

    async fn fetch_lingva(&self, text: &str) -> Result<String, ProviderError> {
        // Lingva encodes everything into the path: /{source}/{target}/{text}
        let encoded = utf8_percent_encode(text, NON_ALPHANUMERIC);
        let url = format!(
            "{}/{}/{}/{}",
            self.spec.endpoint.trim_end_matches('/'),
            self.source_lang,
            self.target_lang,
            encoded
        );

        let response = self.client.get(&url).send().await.map_err(request_error)?;

        let body = read_body(response).await?;
        parse_lingva(&body)
    }

    async fn fetch_google_translate(&self, text: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(&self.spec.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_lang.as_str()),
                ("tl", self.target_lang.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let body = read_body(response).await?;
        parse_google_translate(&body)
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn translate(&self, text: &str) -> Result<String, ProviderError> {
        debug!("Requesting translation of {:?} from {}", text, self.spec.name);
        match self.spec.kind {
            ProviderKind::MyMemory => self.fetch_mymemory(text).await,
            ProviderKind::LibreTranslate => self.fetch_libretranslate(text).await,
            ProviderKind::Lingva => self.fetch_lingva(text).await,
            ProviderKind::GoogleTranslate => self.fetch_google_translate(text).await,
        }
    }
}

fn request_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(e.to_string())
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    if status.as_u16() == 429 {
        return Err(ProviderError::RateLimited);
    }
    if !status.is_success() {
        return Err(ProviderError::Status(status.as_u16()));
    }
    response
        .text()
        .await
        .map_err(|e| ProviderError::Network(e.to_string()))
}

#[derive(Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseStatus")]
    response_status: i64,
    #[serde(rename = "responseData")]
    response_data: MyMemoryData,
}

#[derive(Deserialize)]
struct MyMemoryData {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

/// MyMemory reports errors in-band with a 200 status, and echoes the source
/// text back when it has no match. Both count as failed attempts.
fn parse_mymemory(body: &str, source_text: &str) -> Result<String, ProviderError> {
    let parsed: MyMemoryResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    if parsed.response_status != 200 {
        return Err(ProviderError::Status(parsed.response_status as u16));
    }

    let translation = parsed
        .response_data
        .translated_text
        .unwrap_or_default()
        .trim()
        .to_string();

    if translation.is_empty() || translation.to_lowercase() == source_text.to_lowercase() {
        return Err(ProviderError::EmptyResponse);
    }

    Ok(translation)
}

#[derive(Deserialize)]
struct LibreTranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

fn parse_libretranslate(body: &str) -> Result<String, ProviderError> {
    let parsed: LibreTranslateResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let translation = parsed.translated_text.trim().to_string();
    if translation.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    Ok(translation)
}

#[derive(Deserialize)]
struct LingvaResponse {
    translation: String,
}

fn parse_lingva(body: &str) -> Result<String, ProviderError> {
    let parsed: LingvaResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let translation = parsed.translation.trim().to_string();
    if translation.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    Ok(translation)
}

/// The gtx endpoint answers with nested arrays instead of an object; the
/// first element is a list of [translated, source, ...] segments covering
/// the input sentence by sentence.
fn parse_google_translate(body: &str) -> Result<String, ProviderError> {
    let parsed: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let segments = parsed
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| ProviderError::Parse("missing segment list".to_string()))?;

    let mut translation = String::new();
    for segment in segments {
        if let Some(part) = segment.get(0).and_then(|v| v.as_str()) {
            translation.push_str(part);
        }
    }

    let translation = translation.trim().to_string();
    if translation.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    Ok(translation)
}
