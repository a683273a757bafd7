use anyhow::Context;
use axum::async_trait;
use base64::prelude::{Engine, BASE64_STANDARD};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const PROMPT: &str = "Identify the food and estimate nutritional values in this image. \
     Respond in JSON format with fields 'food', 'calories', 'protein', 'carbs', \
     'fats', and 'confidence'.";

/// Candidate food values produced by the vision model. These feed the normal
/// item-creation path; the core does not treat them specially.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedFood {
    pub food: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default, alias = "fat")]
    pub fats: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[async_trait]
pub trait FoodRecognizer: Send + Sync {
    async fn recognize(&self, image: Bytes, content_type: &str) -> anyhow::Result<RecognizedFood>;
}

pub struct OpenAiRecognizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiRecognizer {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn parse_response(body: &serde_json::Value) -> anyhow::Result<RecognizedFood> {
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .context("missing message content in response")?;
        serde_json::from_str(content).context("recognition content is not the expected JSON")
    }
}

#[async_trait]
impl FoodRecognizer for OpenAiRecognizer {
    async fn recognize(&self, image: Bytes, content_type: &str) -> anyhow::Result<RecognizedFood> {
        anyhow::ensure!(!self.api_key.is_empty(), "OPENAI_API_KEY is not configured");

        let data_url = format!("data:{};base64,{}", content_type, BASE64_STANDARD.encode(&image));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }],
            "response_format": { "type": "json_object" }
        });

        let resp = self
            .http
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("openai request failed")?;
        anyhow::ensure!(
            resp.status().is_success(),
            "openai returned {}",
            resp.status()
        );

        let body: serde_json::Value = resp.json().await.context("openai response body")?;
        let food = Self::parse_response(&body)?;
        debug!(food = %food.food, calories = food.calories, "image recognized");
        Ok(food)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_completion_content() {
        let body = serde_json::json!({
            "choices": [{
                "message": {
                    "content": "{\"food\":\"Caesar salad\",\"calories\":420,\"protein\":18,\"carbs\":22,\"fats\":30,\"confidence\":0.82}"
                }
            }]
        });
        let food = OpenAiRecognizer::parse_response(&body).unwrap();
        assert_eq!(food.food, "Caesar salad");
        assert_eq!(food.fats, 30.0);
        assert_eq!(food.confidence, Some(0.82));
    }

    #[test]
    fn accepts_fat_as_alias_and_missing_confidence() {
        let food: RecognizedFood =
            serde_json::from_str(r#"{"food":"Apple","calories":95,"fat":0.3}"#).unwrap();
        assert_eq!(food.fats, 0.3);
        assert_eq!(food.confidence, None);
    }

    #[test]
    fn rejects_non_json_content() {
        let body = serde_json::json!({
            "choices": [{ "message": { "content": "sorry, I cannot tell" } }]
        });
        assert!(OpenAiRecognizer::parse_response(&body).is_err());
    }

    #[tokio::test]
    async fn unconfigured_key_is_a_config_error() {
        let recognizer = OpenAiRecognizer::new("", "gpt-4o-mini");
        let err = recognizer
            .recognize(Bytes::from_static(b"img"), "image/jpeg")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
