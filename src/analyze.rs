//! Reading-aloud feedback: transcribe a child's recording, then have a
//! chat model grade the transcription as an encouraging teacher.
//!
//! Models routinely wrap their JSON in chatter, so grading tolerates that
//! by pulling out the first JSON block and falling back to plain-text
//! feedback when even that fails.

use std::sync::LazyLock;

use anyhow::Context as _;
use regex::Regex;
use serde::Deserialize;

use crate::formats::ReadingFeedback;

const FEEDBACK_PROMPT: &str = r#"You are a friendly and encouraging English teacher.
Your student just read a passage aloud. I will provide you with the text they spoke (transcribed from audio).

Please provide feedback in the following JSON format:
{
    "score": number (0-100),
    "feedback": "string (1-2 sentences of encouraging feedback)",
    "pronunciation_issues": ["word1", "word2"] (list of words that look incorrect or misspelled in the transcription, max 3)
}

The student's transcription is below. Focus on fluency and clarity. If the text is gibberish, give a low score."#;

/// Default score when the model ignores the JSON format and we fall back
/// to its raw text as feedback.
const FALLBACK_SCORE: u32 = 70;

static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("json block pattern"));

#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub base_url: String,
    pub api_key: String,
    pub transcribe_model: String,
    pub chat_model: String,
}

impl AnalyzeConfig {
    /// `None` when no API key is configured; the server then disables the
    /// analyze endpoint instead of failing at startup.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("RAZSHELF_AI_API_KEY")
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())?;
        let base_url = std::env::var("RAZSHELF_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_owned());
        let transcribe_model = std::env::var("RAZSHELF_AI_TRANSCRIBE_MODEL")
            .unwrap_or_else(|_| "whisper-1".to_owned());
        let chat_model =
            std::env::var("RAZSHELF_AI_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_owned());
        Some(Self {
            base_url,
            api_key,
            transcribe_model,
            chat_model,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

pub async fn analyze_reading(
    client: &reqwest::Client,
    config: &AnalyzeConfig,
    audio: Vec<u8>,
) -> anyhow::Result<ReadingFeedback> {
    let transcription = transcribe(client, config, audio)
        .await
        .context("transcribe recording")?;
    let raw = grade(client, config, &transcription)
        .await
        .context("grade transcription")?;
    Ok(feedback_from_model_text(&raw, transcription))
}

async fn transcribe(
    client: &reqwest::Client,
    config: &AnalyzeConfig,
    audio: Vec<u8>,
) -> anyhow::Result<String> {
    #[derive(Debug, Deserialize)]
    struct Transcription {
        text: String,
    }

    let endpoint = config.endpoint("audio/transcriptions");
    let part = reqwest::multipart::Part::bytes(audio)
        .file_name("recording.webm")
        .mime_str("application/octet-stream")
        .context("build audio part")?;
    let form = reqwest::multipart::Form::new()
        .text("model", config.transcribe_model.clone())
        .part("file", part);

    let response = client
        .post(&endpoint)
        .bearer_auth(&config.api_key)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("POST {endpoint}"))?;

    let status = response.status();
    let raw = response.text().await.context("read transcription body")?;
    if !status.is_success() {
        anyhow::bail!("transcription API error ({status}): {raw}");
    }

    let parsed: Transcription = serde_json::from_str(&raw).context("parse transcription")?;
    Ok(parsed.text)
}

async fn grade(
    client: &reqwest::Client,
    config: &AnalyzeConfig,
    transcription: &str,
) -> anyhow::Result<String> {
    let endpoint = config.endpoint("chat/completions");
    let body = serde_json::json!({
        "model": config.chat_model,
        "messages": [
            { "role": "system", "content": FEEDBACK_PROMPT },
            { "role": "user", "content": format!("Student's transcription: \"{transcription}\"") },
        ],
    });

    let response = client
        .post(&endpoint)
        .bearer_auth(&config.api_key)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("POST {endpoint}"))?;

    let status = response.status();
    let raw = response.text().await.context("read feedback body")?;
    if !status.is_success() {
        anyhow::bail!("feedback API error ({status}): {raw}");
    }

    let value: serde_json::Value = serde_json::from_str(&raw).context("parse feedback response")?;
    let content = value
        .get("choices")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("message"))
        .and_then(|v| v.get("content"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing message content in feedback response"))?;
    Ok(content.to_owned())
}

/// Parse the model's answer into feedback, tolerating surrounding prose.
fn feedback_from_model_text(raw: &str, transcription: String) -> ReadingFeedback {
    #[derive(Debug, Deserialize)]
    struct ModelFeedback {
        score: u32,
        feedback: String,
        #[serde(default)]
        pronunciation_issues: Vec<String>,
    }

    let candidate = JSON_BLOCK
        .find(raw)
        .map(|m| m.as_str())
        .unwrap_or(raw);

    match serde_json::from_str::<ModelFeedback>(candidate) {
        Ok(parsed) => ReadingFeedback {
            transcription,
            score: parsed.score.min(100),
            feedback: parsed.feedback,
            pronunciation_issues: parsed.pronunciation_issues,
        },
        Err(_) => ReadingFeedback {
            transcription,
            score: FALLBACK_SCORE,
            feedback: raw.trim().to_owned(),
            pronunciation_issues: Vec::new(),
        },
    }
}
