//! Chat-completions client generating buyer identities.
//!
//! Asks the model for a Korean name as a bare JSON object
//! `{hangul, koreanName, pronunciation, meaning}`. Models sometimes wrap the
//! object in markdown fences anyway; those are stripped before parsing.

use crate::config::IdentityConfig;
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use soulpass_core::types::BuyerIdentity;
use soulpass_runtime::{IdentityError, IdentityProvider, IdentityRequest};

const TEMPERATURE: f32 = 0.9;

/// HTTP identity provider
#[derive(Clone)]
pub struct ChatIdentityClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl ChatIdentityClient {
    /// Create a client with explicit settings
    #[must_use]
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            model,
        }
    }

    /// Create a client from configuration; `None` without an API key
    #[must_use]
    pub fn from_config(config: &IdentityConfig) -> Option<Self> {
        config.api_key.as_ref().map(|key| {
            Self::new(config.api_url.clone(), key.clone(), config.model.clone())
        })
    }

    async fn request_identity(&self, request: &IdentityRequest) -> Result<BuyerIdentity, IdentityError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt(request),
            }],
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let completion = response
                    .json::<ChatResponse>()
                    .await
                    .map_err(|e| IdentityError::Malformed(e.to_string()))?;
                let content = completion
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .ok_or_else(|| IdentityError::Malformed("no choices returned".to_string()))?;
                parse_identity(&content)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(IdentityError::Provider(format!(
                    "status {}: {body}",
                    status.as_u16()
                )))
            }
        }
    }
}

impl std::fmt::Debug for ChatIdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatIdentityClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl IdentityProvider for ChatIdentityClient {
    fn generate<'a>(
        &'a self,
        request: &'a IdentityRequest,
    ) -> BoxFuture<'a, Result<BuyerIdentity, IdentityError>> {
        self.request_identity(request).boxed()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    content: String,
}

/// Shape the model is asked to answer with
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedName {
    hangul: String,
    korean_name: String,
    pronunciation: String,
    meaning: String,
}

fn gender_hint(gender: Option<&str>) -> &'static str {
    match gender {
        Some("male") => "masculine",
        Some("female") => "feminine",
        _ => "neutral or mixed",
    }
}

fn mood_hint(mood: Option<&str>) -> &'static str {
    match mood {
        Some("dreamy") => "dreamy, poetic, soft as a reverie",
        Some("energetic") => "energetic, lively, full of life",
        Some("elegant") => "elegant, refined, graceful",
        Some("mysterious") => "mysterious, deep, enchanting",
        Some("fierce") => "powerful, bold, intense as fire",
        Some("soft") => "gentle, tender, like a spring flower",
        Some("cosmic") => "cosmic, mystical, tied to the stars",
        Some("pure") => "pure, luminous, serene as light",
        _ => "warm and memorable",
    }
}

fn prompt(request: &IdentityRequest) -> String {
    let mood = mood_hint(request.mood.as_deref());
    format!(
        "Generate an authentic, uncommon Korean given name for a {gender} person with a {mood} vibe. \
         Be creative.\n\n\
         Answer ONLY with valid JSON, no text before or after, no markdown:\n\
         {{\"hangul\": \"the Korean characters\", \
         \"koreanName\": \"the romanization (e.g. Ji-woo)\", \
         \"pronunciation\": \"how to pronounce it\", \
         \"meaning\": \"a four-word poetic meaning tied to the {mood} vibe\"}}",
        gender = gender_hint(request.gender.as_deref()),
    )
}

/// Parse the model's answer, tolerating markdown fences
///
/// # Errors
///
/// [`IdentityError::Malformed`] if the text is not the expected object or a
/// field is blank.
pub fn parse_identity(text: &str) -> Result<BuyerIdentity, IdentityError> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let name: GeneratedName = serde_json::from_str(cleaned.trim())
        .map_err(|e| IdentityError::Malformed(e.to_string()))?;

    if [&name.hangul, &name.korean_name, &name.pronunciation, &name.meaning]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(IdentityError::Malformed("blank identity field".to_string()));
    }

    Ok(BuyerIdentity {
        native_script: name.hangul,
        display_name: name.korean_name,
        pronunciation: name.pronunciation,
        meaning: name.meaning,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let identity = parse_identity(
            r#"{"hangul":"하늘","koreanName":"Haneul","pronunciation":"ha-nool","meaning":"Sky wide and calm"}"#,
        )
        .unwrap();
        assert_eq!(identity.native_script, "하늘");
        assert_eq!(identity.display_name, "Haneul");
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"hangul\":\"별\",\"koreanName\":\"Byeol\",\"pronunciation\":\"byul\",\"meaning\":\"Star of quiet nights\"}\n```";
        let identity = parse_identity(text).unwrap();
        assert_eq!(identity.display_name, "Byeol");
    }

    #[test]
    fn test_parse_rejects_prose_and_blanks() {
        assert!(matches!(
            parse_identity("Here is a name: Haneul"),
            Err(IdentityError::Malformed(_))
        ));
        assert!(matches!(
            parse_identity(r#"{"hangul":"","koreanName":"X","pronunciation":"x","meaning":"m"}"#),
            Err(IdentityError::Malformed(_))
        ));
    }

    #[test]
    fn test_prompt_uses_hints() {
        let prompt = prompt(&IdentityRequest {
            gender: Some("female".to_string()),
            mood: Some("cosmic".to_string()),
        });
        assert!(prompt.contains("feminine"));
        assert!(prompt.contains("cosmic, mystical"));
    }

    #[test]
    fn test_client_requires_api_key() {
        let mut config = IdentityConfig {
            api_url: "http://localhost/v1/chat/completions".to_string(),
            api_key: None,
            model: "test-model".to_string(),
        };
        assert!(ChatIdentityClient::from_config(&config).is_none());
        config.api_key = Some("key".to_string());
        assert!(ChatIdentityClient::from_config(&config).is_some());
    }
}
