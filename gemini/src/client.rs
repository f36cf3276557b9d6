use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use prompttalk_core::backend::GeneratedText;
use prompttalk_core::backend::GenerationBackend;
use prompttalk_core::config::Config;
use prompttalk_core::error::Result;
use prompttalk_core::error::TalkErr;

/// Environment variable consulted when no API key is configured.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Client for the Google Generative Language `generateContent` endpoint.
///
/// One HTTP round trip per generation: the model's full text comes back in a
/// single response body. Cancellation works by dropping the `generate`
/// future, which aborts the underlying request.
pub struct GeminiClient {
    http: reqwest::Client,
    host_root: String,
    api_key: Option<String>,
    model: String,
}

impl GeminiClient {
    /// Build a client from the application config, falling back to
    /// `GEMINI_API_KEY` for the key.
    pub fn from_config(config: &Config) -> Self {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(GEMINI_API_KEY_ENV).ok());
        Self::new(&config.base_url, api_key, &config.model)
    }

    /// Low-level constructor given a raw host root, e.g.
    /// `https://generativelanguage.googleapis.com/v1beta`.
    pub fn new(base_url: &str, api_key: Option<String>, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            host_root: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.host_root, self.model)
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GeneratedText> {
        let url = self.endpoint();
        debug!(model = %self.model, "posting generateContent request");
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let mut request = self.http.post(url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-goog-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| TalkErr::Backend(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("generateContent returned HTTP {status}");
            return Err(TalkErr::Backend(format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| TalkErr::Backend(format!("malformed response body: {err}")))?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(TalkErr::Backend(
                "response contained no candidate text".to_string(),
            ));
        }
        Ok(GeneratedText { text })
    }
}
