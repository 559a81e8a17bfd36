// src/models/page.rs

use serde::Serialize;

use super::definition::Element;

/// Read-only view of one page for the drawn question index.
/// Computed once when the definition loads and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedPage {
    pub page_number: i64,

    /// The paragraph at rank `index` after sorting by sequence, if the pool is large enough.
    pub selected_paragraph: Option<Element>,

    pub has_video_recording: bool,
    pub video_recording: Option<Element>,

    /// Number of candidate paragraphs on the page.
    pub total_paragraphs: usize,
}

impl ProcessedPage {
    pub fn question_text(&self) -> Option<&str> {
        self.selected_paragraph
            .as_ref()
            .map(|paragraph| paragraph.content.as_str())
    }
}
