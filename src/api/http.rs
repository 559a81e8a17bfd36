// src/api/http.rs

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use url::Url;

use super::{AnswerUpload, AssignmentApi, format_timestamp};
use crate::{
    config::Config,
    error::AppError,
    models::{
        definition::AssignmentDefinition,
        identity::IDENTITY_PHOTO_FILE_NAME,
        submission::SubmissionPayload,
    },
};

const USER_AGENT: &str = concat!("proctor/", env!("CARGO_PKG_VERSION"));

/// `AssignmentApi` over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpApi {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.http_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Self::with_client(client, &config.api_base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, AppError> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl AssignmentApi for HttpApi {
    async fn list_jotforms(&self) -> Result<Vec<AssignmentDefinition>, AppError> {
        let url = self.endpoint("api/jotforms")?;
        tracing::debug!(%url, "Fetching jotforms");

        let forms = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<AssignmentDefinition>>()
            .await?;

        Ok(forms)
    }

    async fn submit_answer(&self, upload: &AnswerUpload) -> Result<(), AppError> {
        let url = self.endpoint("api/submit-answer")?;
        let artifact = &upload.artifact;

        let video = Part::bytes(artifact.blob.data.to_vec())
            .file_name(artifact.file_name())
            .mime_str(&artifact.blob.mime_type)?;

        let mut form = Form::new().part("video", video);
        for (name, value) in upload.text_fields() {
            form = form.text(name, value);
        }

        self.client
            .post(url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(
            artifact_id = %artifact.id,
            page_number = artifact.page_number,
            "Answer sent to backend"
        );
        Ok(())
    }

    async fn submit_assignment(&self, payload: &SubmissionPayload) -> Result<(), AppError> {
        let url = self.endpoint("api/submit-assignment")?;

        let mut form = Form::new();
        for (index, answer) in payload.videos.iter().enumerate() {
            let video = Part::bytes(answer.blob.data.to_vec())
                .file_name(answer.file_name())
                .mime_str(&answer.blob.mime_type)?;
            form = form
                .part(format!("video_{}", index), video)
                .text(format!("question_{}", index), answer.question_text.clone())
                .text(format!("page_{}", index), answer.page_number.to_string())
                .text(format!("timestamp_{}", index), format_timestamp(&answer.created_at));
        }

        if let Some(photo) = &payload.identity_photo {
            let part = Part::bytes(photo.data.to_vec())
                .file_name(IDENTITY_PHOTO_FILE_NAME)
                .mime_str(&photo.mime_type)?;
            form = form.part("identity_photo", part);
        }

        form = form.text("submission_data", serde_json::to_string(payload)?);

        self.client
            .post(url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(answers = payload.videos.len(), "Assignment submitted to backend");
        Ok(())
    }
}
