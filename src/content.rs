//! Quiz and vocabulary synthesis for catalogued books.
//!
//! Text extraction (OCR) happens upstream; this command pairs each book
//! with its extracted story text and asks a chat model for strict-JSON
//! quiz/vocabulary content, saving the merged output after every book so
//! long runs are resumable.

use std::collections::BTreeMap;

use anyhow::Context as _;

use crate::cli::ContentArgs;
use crate::formats::{Book, BookContent};

/// Characters of story text sent to the model per book.
const MAX_STORY_CHARS: usize = 3000;

const SYSTEM_PROMPT: &str = "You are a helpful assistant for kids' reading content.";

pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl LlmConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("DEEPSEEK_API_KEY")
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow::anyhow!("DEEPSEEK_API_KEY is not set"))?;
        let base_url = std::env::var("RAZSHELF_LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.deepseek.com".to_owned());
        let model =
            std::env::var("RAZSHELF_LLM_MODEL").unwrap_or_else(|_| "deepseek-chat".to_owned());
        Ok(Self {
            base_url,
            api_key,
            model,
        })
    }
}

pub fn chat_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/chat/completions")
}

/// One chat-completions call with a JSON response format; returns the
/// assistant message content.
pub async fn chat_json(
    client: &reqwest::Client,
    config: &LlmConfig,
    user_prompt: &str,
) -> anyhow::Result<String> {
    let endpoint = chat_endpoint(&config.base_url);
    let body = serde_json::json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": user_prompt },
        ],
        "response_format": { "type": "json_object" },
    });

    let response = client
        .post(&endpoint)
        .bearer_auth(&config.api_key)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("POST {endpoint}"))?;

    let status = response.status();
    let raw = response.text().await.context("read chat response body")?;
    if !status.is_success() {
        let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
        anyhow::bail!("chat API error ({status}): {message}");
    }

    let value: serde_json::Value = serde_json::from_str(&raw).context("parse chat response")?;
    let content = value
        .get("choices")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("message"))
        .and_then(|v| v.get("content"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing message content in chat response"))?;
    Ok(content.to_owned())
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn content_prompt(story_text: &str) -> String {
    let snippet: String = story_text.chars().take(MAX_STORY_CHARS).collect();
    format!(
        r#"Based on the following story text (extracted via OCR), please generate:
1. 3 multiple choice quiz questions (simple English, suitable for kids).
2. ALL vocabulary words that seem to be part of a "Glossary" or "Vocabulary" list; if no explicit list is found, identify key difficult words. Do NOT limit the number of words.
3. Simple English definitions for the vocabulary words.

Story text:
"{snippet}"

Return ONLY valid JSON in the following format:
{{
  "quiz": [
    {{ "question": "...", "options": ["A", "B", "C"], "correctAnswer": 0 }}
  ],
  "vocabulary": [
    {{ "word": "...", "definition": "..." }}
  ]
}}"#
    )
}

type ContentFile = BTreeMap<String, BTreeMap<String, BookContent>>;

pub async fn run(args: ContentArgs) -> anyhow::Result<()> {
    let config = LlmConfig::from_env()?;
    let client = reqwest::Client::new();

    let catalog_json = std::fs::read_to_string(&args.books)
        .with_context(|| format!("read catalog: {}", args.books.display()))?;
    let catalog: BTreeMap<String, Vec<Book>> =
        serde_json::from_str(&catalog_json).context("parse catalog")?;

    let mut content: ContentFile = if args.out.exists() {
        let existing = std::fs::read_to_string(&args.out)
            .with_context(|| format!("read existing content: {}", args.out.display()))?;
        serde_json::from_str(&existing).context("parse existing content")?
    } else {
        ContentFile::new()
    };

    let mut queue: Vec<&Book> = Vec::new();
    for (level, books) in &catalog {
        if args.level.as_deref().is_some_and(|l| l != level.as_str()) {
            continue;
        }
        for book in books {
            if args.book_id.as_deref().is_some_and(|id| id != book.id.as_str()) {
                continue;
            }
            queue.push(book);
        }
    }
    if args.limit > 0 {
        queue.truncate(args.limit);
    }
    tracing::info!(books = queue.len(), "selected books");

    for book in queue {
        let text_path = args
            .text_dir
            .join(&book.level)
            .join(format!("{}.txt", book.id));
        let story_text = match std::fs::read_to_string(&text_path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    level = %book.level,
                    id = %book.id,
                    path = %text_path.display(),
                    "no extracted text; skipping"
                );
                continue;
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read story text: {}", text_path.display()));
            }
        };
        if story_text.trim().len() < 50 {
            tracing::warn!(level = %book.level, id = %book.id, "story text is suspiciously short");
        }

        tracing::info!(level = %book.level, id = %book.id, title = %book.title, "generating content");
        let raw = match chat_json(&client, &config, &content_prompt(&story_text)).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!(
                    level = %book.level,
                    id = %book.id,
                    error = %format!("{err:#}"),
                    "content generation failed"
                );
                continue;
            }
        };
        let generated: BookContent = match serde_json::from_str(&raw) {
            Ok(generated) => generated,
            Err(err) => {
                tracing::error!(level = %book.level, id = %book.id, %err, "model returned invalid JSON");
                continue;
            }
        };

        content
            .entry(book.level.clone())
            .or_default()
            .insert(book.id.clone(), generated);

        // Save after every book so an interrupted run loses nothing.
        let json = serde_json::to_string_pretty(&content).context("serialize content")?;
        std::fs::write(&args.out, json)
            .with_context(|| format!("write content: {}", args.out.display()))?;
    }

    tracing::info!(out = %args.out.display(), "content generation finished");
    Ok(())
}
