//! OpenAI-compatible model client for emotion analysis
//!
//! Two calls back the pipeline: a multimodal classification request that
//! must answer with a single vocabulary word (or the not-a-cat sentinel),
//! and a text-only guidance request that must answer with a strict JSON
//! object.

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use emoticat_common::{Classification, Emotion, EmotionGuidance, Error, Result, NOT_A_CAT_SENTINEL};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;

/// Reply budget for the classification call; one word plus refusal slack
const CLASSIFY_MAX_TOKENS: u32 = 300;

/// Model calls the analysis pipeline depends on
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Classify the emotion shown in a cat photo
    async fn classify_emotion(&self, image: &[u8], content_type: &str) -> Result<Classification>;

    /// Produce care guidance for a classified emotion
    async fn emotion_guidance(&self, emotion: Emotion) -> Result<EmotionGuidance>;
}

/// Client for an OpenAI-compatible chat completions API
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

/// Chat message body; plain text or multimodal parts
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Instruction for the classification call, built from the vocabulary so
/// the prompt and the parser cannot drift apart
fn classify_prompt() -> String {
    let labels = Emotion::ALL
        .map(|emotion| format!("\"{}\"", emotion.label()))
        .join(", ");

    format!(
        "You are an AI picture analysis assistant that helps me figure out the emotion \
         of a cat based off of a given picture which I have provided. First check to see \
         if the animal is a cat. If the animal is a cat, only send back a one word \
         response of the emotion of the cat from the following categories: [{labels}]\n\n\
         If the animal is not a cat, send back this message strictly: '{NOT_A_CAT_SENTINEL}'"
    )
}

/// Instruction for the guidance call
fn guidance_prompt(emotion: Emotion) -> String {
    format!(
        "Return only a valid JSON object with the following structure, and no other text:\n\
         {{\n\
           \"description\": \"A sentence of what it means for a cat to be {emotion} and how to identify it.\",\n\
           \"tipsAndRecs\": [\"Tip 1\", \"Tip 2\", \"Tip 3\"]\n\
         }}\n\
         The tips and recommendations should be about what to do when a cat is in this emotional state."
    )
}

impl OpenAiClient {
    /// Create a new model client
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.openai_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: config.openai_api_base.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            client,
        })
    }

    /// Send a chat completion request and return the first choice's content
    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Model(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!(
                "Chat completion failed with status {}: {}",
                status, body
            )));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedModelResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::MalformedModelResponse("no choices in completion".to_string()))
    }
}

#[async_trait]
impl AnalysisProvider for OpenAiClient {
    async fn classify_emotion(&self, image: &[u8], content_type: &str) -> Result<Classification> {
        let data_url = format!("data:{};base64,{}", content_type, BASE64.encode(image));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Parts(vec![
                    ContentPart::Text {
                        text: classify_prompt(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url,
                            detail: "low",
                        },
                    },
                ]),
            }],
            max_tokens: Some(CLASSIFY_MAX_TOKENS),
        };

        debug!("Requesting emotion classification from {}", self.model);
        let reply = self.chat(&request).await?;
        Classification::parse(&reply)
    }

    async fn emotion_guidance(&self, emotion: Emotion) -> Result<EmotionGuidance> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: MessageContent::Text(guidance_prompt(emotion)),
            }],
            max_tokens: None,
        };

        debug!("Requesting care guidance for {}", emotion);
        let reply = self.chat(&request).await?;
        EmotionGuidance::parse(&reply)
    }
}
