use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::models::{AnalysisFailure, AnalysisOutcome, AnalysisResult};

// ── Constants ────────────────────────────────────────────────────────────────

const SYSTEM_PROMPT: &str =
    "You are an expert text analyzer. Provide detailed, accurate analysis in JSON format.";
const TEMPERATURE: f32 = 0.5;
const MAX_TOKENS: u32 = 2048;

pub const CONNECT_FAILURE: &str = "Failed to connect to GROQ API";
pub const ANALYSIS_FAILURE: &str = "Failed to analyze text";

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid response format from GROQ API")]
    InvalidFormat,
    #[error("Invalid JSON response from GROQ: {0}")]
    InvalidJson(serde_json::Error),
    #[error("Missing required keys in analysis response")]
    MissingKeys(Vec<&'static str>),
}

impl From<AnalysisError> for AnalysisFailure {
    // Only transport problems get their own message; everything raised after a
    // successful round trip is reported under the generic one.
    fn from(err: AnalysisError) -> Self {
        let error = match err {
            AnalysisError::Transport(_) => CONNECT_FAILURE,
            _ => ANALYSIS_FAILURE,
        };
        AnalysisFailure {
            error: error.to_string(),
            details: err.to_string(),
        }
    }
}

// ── Prompt ───────────────────────────────────────────────────────────────────

/// Asks for six sections but only names four keys in the JSON contract;
/// validation in [`parse_analysis`] still requires all six.
pub fn build_prompt(title: &str, text: &str) -> String {
    format!(
        r#"Analyze the following article titled "{title}":

{text}

Provide a comprehensive analysis including:
1. A concise summary (2-3 sentences)
2. Key points (3-5 points)
3. Sentiment analysis (positive/negative/neutral with explanation)
4. Main topics discussed
5. Writing style analysis
6. Target audience assessment

Format the response as JSON with these exact keys:
- summary
- key_points (array)
- topics (array)
- writing_style"#
    )
}

// ── Client ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GroqAnalyzer {
    api_key: String,
    api_url: String,
    model: String,
}

impl GroqAnalyzer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api_key: config.groq_api_key.clone(),
            api_url: config.groq_api_url.clone(),
            model: config.groq_model.clone(),
        }
    }

    pub async fn analyze(&self, title: &str, text: &str) -> AnalysisOutcome {
        match self.request_analysis(title, text).await {
            Ok(result) => {
                info!(
                    model = %self.model,
                    summary_chars = result.summary().map_or(0, str::len),
                    key_points = result.key_points().len(),
                    topics = result.topics().len(),
                    "GROQ analysis succeeded"
                );
                AnalysisOutcome::Success(result)
            }
            Err(e) => {
                match &e {
                    AnalysisError::Transport(_) => error!(error = %e, "GROQ API request failed"),
                    _ => error!(error = %e, "error in GROQ analysis"),
                }
                AnalysisOutcome::Failure(e.into())
            }
        }
    }

    async fn request_analysis(&self, title: &str, text: &str) -> Result<AnalysisResult, AnalysisError> {
        let prompt = build_prompt(title, text);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let client = reqwest::Client::new();
        // Only a body that is not JSON at all counts as a transport failure;
        // shape problems inside the envelope are reported as invalid format.
        let envelope: Value = client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = first_choice_content(&envelope).ok_or(AnalysisError::InvalidFormat)?;

        parse_analysis(content)
    }
}

/// `choices[0].message.content` of a chat-completion envelope, if it is a string.
fn first_choice_content(envelope: &Value) -> Option<&str> {
    envelope
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
}

/// Parses the model's reply and checks it carries every required key.
pub fn parse_analysis(content: &str) -> Result<AnalysisResult, AnalysisError> {
    let value: Value = serde_json::from_str(content).map_err(|e| {
        error!(error = %e, "failed to parse GROQ response as JSON");
        AnalysisError::InvalidJson(e)
    })?;

    AnalysisResult::from_value(value).map_err(|missing| {
        warn!(?missing, "analysis response is missing required keys");
        AnalysisError::MissingKeys(missing)
    })
}
