use serde::{Deserialize, Serialize};

/// One catalog entry. The field set and camelCase spelling are a persisted
/// contract: the front end reads `books.json` and the listing endpoint
/// verbatim, so every field stays a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub number: String,
    pub title: String,
    pub level: String,
    /// Original PDF filename within its level (not a full path).
    pub pdf_path: String,
    /// Matched audio filename, or empty when no audio pairs up.
    pub audio_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSummary {
    pub id: String,
    pub name: String,
    pub book_count: usize,
}

/// Generated quiz/vocabulary content for one book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookContent {
    pub quiz: Vec<QuizQuestion>,
    pub vocabulary: Vec<VocabularyEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub word: String,
    pub definition: String,
}

/// Response of the analyze-reading endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingFeedback {
    pub transcription: String,
    pub score: u32,
    pub feedback: String,
    pub pronunciation_issues: Vec<String>,
}
