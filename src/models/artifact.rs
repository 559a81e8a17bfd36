// src/models/artifact.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const ANSWER_MIME_TYPE: &str = "video/webm";
pub const NO_QUESTION_TEXT: &str = "No question text";

/// Encoded media produced by the platform encoder.
/// The bytes are shared, cloning a blob never copies the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaBlob {
    pub mime_type: String,
    pub data: Arc<Vec<u8>>,
}

impl MediaBlob {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: Arc::new(data),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// The single live recording, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    pub page_number: i64,
    pub started_at: DateTime<Utc>,
}

impl RecordingSession {
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_seconds().max(0) as u64
    }
}

/// A finalized per-page answer. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerArtifact {
    pub id: Uuid,
    pub page_number: i64,
    pub question_text: String,
    pub blob: MediaBlob,
    pub size: usize,
    pub created_at: DateTime<Utc>,
    pub random_question_number: u32,
}

impl AnswerArtifact {
    pub fn file_name(&self) -> String {
        format!("answer_page_{}.webm", self.page_number)
    }
}

/// Append-only, insertion-ordered answer list with at most one entry per page.
#[derive(Debug, Clone, Default)]
pub struct AnswerCollection {
    answers: Vec<AnswerArtifact>,
}

impl AnswerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `artifact` unless its page already has one.
    /// Returns whether it was appended.
    pub fn push(&mut self, artifact: AnswerArtifact) -> bool {
        if self.contains_page(artifact.page_number) {
            tracing::warn!(
                page_number = artifact.page_number,
                "Discarding second answer for an already answered page"
            );
            return false;
        }
        self.answers.push(artifact);
        true
    }

    pub fn contains_page(&self, page_number: i64) -> bool {
        self.answers.iter().any(|a| a.page_number == page_number)
    }

    pub fn get(&self, id: Uuid) -> Option<&AnswerArtifact> {
        self.answers.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnswerArtifact> {
        self.answers.iter()
    }

    pub fn as_slice(&self) -> &[AnswerArtifact] {
        &self.answers
    }
}

impl<'a> IntoIterator for &'a AnswerCollection {
    type Item = &'a AnswerArtifact;
    type IntoIter = std::slice::Iter<'a, AnswerArtifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.answers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(page_number: i64) -> AnswerArtifact {
        let blob = MediaBlob::new(ANSWER_MIME_TYPE, vec![1, 2, 3]);
        AnswerArtifact {
            id: Uuid::new_v4(),
            page_number,
            question_text: "Q".to_string(),
            size: blob.size(),
            blob,
            created_at: Utc::now(),
            random_question_number: 1,
        }
    }

    #[test]
    fn test_push_keeps_insertion_order() {
        let mut answers = AnswerCollection::new();
        assert!(answers.push(artifact(3)));
        assert!(answers.push(artifact(1)));
        let pages: Vec<i64> = answers.iter().map(|a| a.page_number).collect();
        assert_eq!(pages, vec![3, 1]);
    }

    #[test]
    fn test_push_rejects_duplicate_page() {
        let mut answers = AnswerCollection::new();
        assert!(answers.push(artifact(2)));
        assert!(!answers.push(artifact(2)));
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn test_file_name_uses_page_number() {
        assert_eq!(artifact(4).file_name(), "answer_page_4.webm");
    }
}
