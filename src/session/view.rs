// src/session/view.rs

use serde::Serialize;

use crate::{
    models::{page::ProcessedPage, proctoring::ProctoringSnapshot},
    utils::html::clean_html,
};

/// What the current page asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuestionView {
    /// Sanitized paragraph HTML.
    Paragraph { html: String },
    /// The page's pool is smaller than the drawn index.
    NotAvailable { question_number: u32 },
}

impl QuestionView {
    pub fn for_page(page: &ProcessedPage, question_number: u32) -> Self {
        match page.question_text() {
            Some(content) => QuestionView::Paragraph {
                html: clean_html(content),
            },
            None => QuestionView::NotAvailable { question_number },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, QuestionView::Paragraph { .. })
    }

    /// Text shown in place of a missing paragraph.
    pub fn unavailable_message(&self) -> Option<String> {
        match self {
            QuestionView::Paragraph { .. } => None,
            QuestionView::NotAvailable { question_number } => Some(format!(
                "No paragraph available for question {} on this page.",
                question_number
            )),
        }
    }
}

/// Render-ready state of the exam step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamView {
    pub title: String,
    pub course_name: String,
    pub page_number: i64,
    /// 1-based position among the loaded pages.
    pub position: usize,
    pub total_pages: usize,
    pub question_number: u32,
    pub question_bound: u32,
    pub total_paragraphs: usize,
    pub question: QuestionView,
    pub recording_required: bool,
    pub answered: bool,
    /// Seconds since the live recording on this page started.
    pub recording_elapsed_secs: Option<u64>,
    pub is_last_page: bool,
    pub fullscreen: bool,
    pub monitoring: bool,
    pub proctoring: ProctoringSnapshot,
    pub recorded_answers: usize,
}

impl ExamView {
    pub fn progress_label(&self) -> String {
        format!("Page {} of {}", self.position, self.total_pages)
    }

    pub fn selection_label(&self) -> String {
        format!(
            "Question {} selected randomly from {} available questions",
            self.question_number, self.question_bound
        )
    }

    pub fn is_recording(&self) -> bool {
        self.recording_elapsed_secs.is_some()
    }

    pub fn can_advance(&self) -> bool {
        !self.is_last_page && !self.is_recording()
    }

    pub fn can_submit(&self) -> bool {
        self.is_last_page && !self.is_recording()
    }

    pub fn can_record(&self) -> bool {
        self.recording_required && !self.answered && !self.is_recording()
    }
}
