// Thin AI-generation helpers. The provider is an external collaborator
// behind the `AiProvider` trait; this module only builds prompts and
// relays the generated text.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI provider returned status {0}")]
    Rejected(u16),

    #[error("AI provider returned an empty response")]
    EmptyResponse,

    #[error("AI provider credentials are not configured")]
    NotConfigured,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, AiError>;
}

/// Chat-completions HTTP client.
pub struct HttpAiProvider {
    client: reqwest::Client,
}

impl HttpAiProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl AiProvider for HttpAiProvider {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, AiError> {
        let ai_config = &config::config().ai;
        if ai_config.api_key.is_empty() {
            return Err(AiError::NotConfigured);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", ai_config.base_url))
            .bearer_auth(&ai_config.api_key)
            .json(&json!({
                "model": ai_config.model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": prompt},
                ],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::Rejected(response.status().as_u16()));
        }

        let completion = response.json::<ChatCompletion>().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AiError::EmptyResponse)
    }
}

pub const TUTOR_SYSTEM_PROMPT: &str =
    "You are an experienced school curriculum assistant. Answer with \
     practical, classroom-ready material only.";

pub fn lesson_plan_prompt(subject: &str, topic: &str, grade: i64, duration_minutes: i64) -> String {
    format!(
        "Write a lesson plan for a grade {} class on the subject '{}', topic '{}'. \
         The lesson is {} minutes long. Include objectives, materials, a timed \
         activity breakdown, and an assessment idea.",
        grade, subject, topic, duration_minutes
    )
}

pub fn flashcards_prompt(subject: &str, topic: &str, count: i64) -> String {
    format!(
        "Create {} flashcards for the subject '{}', topic '{}'. \
         Format each as 'Q: ...' and 'A: ...' on separate lines.",
        count, subject, topic
    )
}

pub fn adaptive_questions_prompt(subject: &str, topic: &str, difficulty: &str, count: i64) -> String {
    format!(
        "Write {} multiple-choice questions at {} difficulty for the subject \
         '{}', topic '{}'. Give four options per question and mark the correct \
         answer.",
        count, difficulty, subject, topic
    )
}

pub fn timetable_suggestion_prompt(grade: i64, subjects: &[String], periods_per_day: i64) -> String {
    format!(
        "Suggest a weekly timetable for a grade {} class with {} periods per \
         day covering these subjects: {}. Balance heavy subjects across \
         mornings and avoid scheduling the same subject twice in a day.",
        grade,
        periods_per_day,
        subjects.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_embed_inputs() {
        let prompt = lesson_plan_prompt("Mathematics", "Fractions", 5, 40);
        assert!(prompt.contains("grade 5"));
        assert!(prompt.contains("Fractions"));
        assert!(prompt.contains("40 minutes"));

        let prompt = timetable_suggestion_prompt(7, &["Maths".into(), "Science".into()], 8);
        assert!(prompt.contains("Maths, Science"));
    }
}
