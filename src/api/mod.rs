// src/api/mod.rs

//! Client side of the LMS REST backend.

pub mod http;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        artifact::AnswerArtifact, definition::AssignmentDefinition,
        submission::SubmissionPayload, target::AttemptTarget,
    },
};

pub use http::HttpApi;

/// Endpoints the attempt flow consumes.
#[async_trait]
pub trait AssignmentApi: Send + Sync {
    /// `GET /api/jotforms`
    async fn list_jotforms(&self) -> Result<Vec<AssignmentDefinition>, AppError>;

    /// `POST /api/submit-answer`
    async fn submit_answer(&self, upload: &AnswerUpload) -> Result<(), AppError>;

    /// `POST /api/submit-assignment`
    async fn submit_assignment(&self, payload: &SubmissionPayload) -> Result<(), AppError>;
}

/// Fetches the jotform list and picks the record matching `key` by name, then by id.
pub async fn fetch_definition(
    api: &dyn AssignmentApi,
    key: &str,
) -> Result<AssignmentDefinition, AppError> {
    let mut forms = api.list_jotforms().await?;
    tracing::debug!(count = forms.len(), "Fetched jotform list");

    let by_name = forms.iter().position(|form| form.jotform_name == key);
    let index = by_name.or_else(|| forms.iter().position(|form| form.id == key));

    match index {
        Some(i) => Ok(forms.swap_remove(i)),
        None => Err(AppError::NotFound(format!("No jotform found with name: {}", key))),
    }
}

/// One recorded answer plus the routing fields the backend files it under.
#[derive(Debug, Clone)]
pub struct AnswerUpload {
    pub artifact: AnswerArtifact,
    pub jotform_id: String,
    pub course_name: String,
}

impl AnswerUpload {
    pub fn new(artifact: AnswerArtifact, target: &AttemptTarget) -> Self {
        Self {
            artifact,
            jotform_id: target.jotform_name.clone(),
            course_name: target.course_name.clone(),
        }
    }

    /// Text fields of the multipart form, in submission order.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("questionText", self.artifact.question_text.clone()),
            ("pageNumber", self.artifact.page_number.to_string()),
            (
                "randomQuestionNumber",
                self.artifact.random_question_number.to_string(),
            ),
            ("timestamp", format_timestamp(&self.artifact.created_at)),
            ("jotformId", self.jotform_id.clone()),
            ("courseName", self.course_name.clone()),
        ]
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(at: &chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
