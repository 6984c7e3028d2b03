//! Taglines for book descriptions, written by an OpenAI-compatible
//! chat-completion endpoint.
//!
//! [`InsightService::generate_insight`] never fails: transport, status and
//! decoding problems resolve to [`INSIGHT_FAILED`], and a well-formed reply
//! without a usable first choice resolves to [`NO_INSIGHT`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shelf_kernel::settings::InsightSettings;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";
const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const USER_PROMPT_PREFIX: &str = "Generate a short and engaging tagline for the following book: ";
const MAX_TOKENS: u32 = 60;

pub const INSIGHT_FAILED: &str = "Failed to generate insights";
pub const NO_INSIGHT: &str = "No insight available";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    fn first_text(self) -> Option<String> {
        let choice = self.choices.into_iter().next()?;
        choice
            .text
            .or_else(|| choice.message.and_then(|message| message.content))
    }
}

#[derive(Debug)]
pub struct InsightService {
    client: reqwest::Client,
    endpoint: String,
    settings: InsightSettings,
}

impl InsightService {
    pub fn new(settings: InsightSettings) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        let endpoint = format!(
            "{}{}",
            settings.api_url.trim_end_matches('/'),
            COMPLETIONS_PATH
        );

        Ok(Self {
            client,
            endpoint,
            settings,
        })
    }

    /// Ask for a tagline describing `description`.
    pub async fn generate_insight(&self, description: &str) -> String {
        match self.request_completion(description).await {
            Ok(response) => response
                .first_text()
                .unwrap_or_else(|| NO_INSIGHT.to_string()),
            Err(err) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    error = %err,
                    "insight request failed"
                );
                INSIGHT_FAILED.to_string()
            }
        }
    }

    async fn request_completion(&self, description: &str) -> reqwest::Result<CompletionResponse> {
        let prompt = format!("{USER_PROMPT_PREFIX}{description}");
        let body = CompletionRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: MAX_TOKENS,
        };

        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<CompletionResponse>()
            .await
    }
}
