use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as _;
use tracing::debug;

use crate::foundation::error::StillmotionError;

/// Default Gemini model used for image analysis.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
/// Public Gemini endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Failures of the external analysis service. All of them are recoverable by the Mapper's
/// fallback schema.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("service returned no content")]
    EmptyResponse,

    #[error("could not parse analysis response: {0}")]
    Parse(String),

    #[error("read image '{}': {source}", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<AnalysisError> for StillmotionError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::MissingCredentials(msg) => StillmotionError::config(msg),
            other => StillmotionError::analysis(other.to_string()),
        }
    }
}

/// Image bytes handed to an analysis service.
#[derive(Clone, Debug)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    /// Read an image from disk. The MIME type is sniffed from the content, then from the
    /// extension.
    pub async fn read(path: &Path) -> Result<Self, AnalysisError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| AnalysisError::ImageRead {
                path: path.to_path_buf(),
                source,
            })?;
        let mime_type = sniff_mime(&bytes, path).to_string();
        Ok(Self { bytes, mime_type })
    }
}

pub(crate) fn sniff_mime(bytes: &[u8], path: &Path) -> &'static str {
    image::guess_format(bytes)
        .or_else(|_| image::ImageFormat::from_path(path))
        .map(|f| f.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// An external vision service that answers a textual instruction about an image.
#[async_trait::async_trait]
pub trait VisionClient: Send + Sync {
    /// Short identifier used in logs and health reports.
    fn name(&self) -> &str;

    /// Ask the service about `image`; returns its raw textual answer.
    async fn analyze(&self, image: &ImageInput, instruction: &str)
    -> Result<String, AnalysisError>;
}

/// Connection settings for [`GeminiVisionClient`].
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Read `GEMINI_API_KEY` (required), `GEMINI_MODEL` and `GEMINI_BASE_URL`.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AnalysisError::MissingCredentials("GEMINI_API_KEY not set".into()))?;
        Ok(Self {
            api_key,
            model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: Duration::from_secs(60),
        })
    }
}

/// Gemini `generateContent` client sending the image inline.
pub struct GeminiVisionClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

#[derive(Debug, serde::Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, serde::Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, serde::Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Debug, serde::Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, serde::Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, serde::Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, serde::Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiVisionClient {
    /// Build a client. An empty API key is rejected here rather than on first use.
    pub fn new(config: GeminiConfig) -> Result<Self, AnalysisError> {
        if config.api_key.trim().is_empty() {
            return Err(AnalysisError::MissingCredentials(
                "Gemini API key is empty".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalysisError::Request(format!("build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// [`GeminiConfig::from_env`] followed by [`GeminiVisionClient::new`].
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::new(GeminiConfig::from_env()?)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait::async_trait]
impl VisionClient for GeminiVisionClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn analyze(
        &self,
        image: &ImageInput,
        instruction: &str,
    ) -> Result<String, AnalysisError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: instruction.to_string(),
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        debug!(model = %self.config.model, bytes = image.bytes.len(), "calling Gemini");
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Parse(format!("Gemini envelope: {e}")))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();
        if text.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }
        Ok(text)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/analysis/client.rs"]
mod tests;
