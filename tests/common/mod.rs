// tests/common/mod.rs

//! Mock LMS backend served by axum on a random port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};

/// One multipart file part as the backend received it.
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// One multipart request, split into text fields and file parts.
#[derive(Debug, Clone, Default)]
pub struct Received {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, ReceivedFile>,
}

#[derive(Clone, Default)]
pub struct Backend {
    pub forms: Arc<Mutex<Value>>,
    pub answers: Arc<Mutex<Vec<Received>>>,
    pub submissions: Arc<Mutex<Vec<Received>>>,
    /// Status returned by the upload endpoints.
    pub upload_status: Arc<Mutex<Option<StatusCode>>>,
}

impl Backend {
    pub fn with_forms(forms: Value) -> Self {
        Self {
            forms: Arc::new(Mutex::new(forms)),
            ..Self::default()
        }
    }

    pub fn set_forms(&self, forms: Value) {
        *self.forms.lock().unwrap() = forms;
    }

    pub fn fail_uploads(&self, status: StatusCode) {
        *self.upload_status.lock().unwrap() = Some(status);
    }

    pub fn answers(&self) -> Vec<Received> {
        self.answers.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<Received> {
        self.submissions.lock().unwrap().clone()
    }

    fn status(&self) -> StatusCode {
        self.upload_status.lock().unwrap().unwrap_or(StatusCode::OK)
    }
}

async fn read_multipart(mut multipart: Multipart) -> Received {
    let mut received = Received::default();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap().to_vec();

        if file_name.is_some() {
            received.files.insert(
                name,
                ReceivedFile {
                    file_name,
                    content_type,
                    bytes,
                },
            );
        } else {
            received
                .fields
                .insert(name, String::from_utf8(bytes).unwrap());
        }
    }
    received
}

async fn list_jotforms(State(backend): State<Backend>) -> Json<Value> {
    let forms = backend.forms.lock().unwrap().clone();
    Json(forms)
}

async fn submit_answer(State(backend): State<Backend>, multipart: Multipart) -> StatusCode {
    let received = read_multipart(multipart).await;
    backend.answers.lock().unwrap().push(received);
    backend.status()
}

async fn submit_assignment(State(backend): State<Backend>, multipart: Multipart) -> StatusCode {
    let received = read_multipart(multipart).await;
    backend.submissions.lock().unwrap().push(received);
    backend.status()
}

/// Spawns the mock backend on a random port.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
pub async fn spawn_app(backend: Backend) -> String {
    let app = Router::new()
        .route("/api/jotforms", get(list_jotforms))
        .route("/api/submit-answer", post(submit_answer))
        .route("/api/submit-assignment", post(submit_assignment))
        .layer(DefaultBodyLimit::max(64 * 1024 * 1024))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Three pages; N = 3. Page 1 has three paragraphs (authored out of order),
/// page 2 only two, page 3 has no recording marker.
pub fn pharma_forms() -> Value {
    json!([
        { "id": 7, "jotformName": "Other Form", "pages": [] },
        {
            "id": 12,
            "jotformName": "Pharma Assignment Form",
            "title": "GMP Basics",
            "pages": [
                {
                    "page": 1,
                    "elements": [
                        { "id": "h1", "tagName": "heading", "content": "Welcome", "sequence": 0 },
                        { "id": "n", "tagName": "randominteger", "content": 3, "sequence": 1 },
                        { "id": "p3", "tagName": "paragraph", "content": "Third question", "sequence": 30 },
                        { "id": "p1", "tagName": "paragraph", "content": "First question", "sequence": 10 },
                        { "id": "p2", "tagName": "paragraph", "content": "<b>Second</b> question", "sequence": 20 },
                        { "id": "v1", "tagName": "videorecording", "content": "", "sequence": 40 }
                    ]
                },
                {
                    "page": 2,
                    "elements": [
                        { "id": "q1", "tagName": "paragraph", "content": "Only one", "sequence": 1 },
                        { "id": "q2", "tagName": "paragraph", "content": "Only two", "sequence": 2 },
                        { "id": "v2", "tagName": "videorecording", "content": null, "sequence": 3 }
                    ]
                },
                {
                    "page": 3,
                    "elements": [
                        { "id": "r1", "tagName": "paragraph", "content": "Closing one", "sequence": 1 },
                        { "id": "r2", "tagName": "paragraph", "content": "Closing two", "sequence": 2 },
                        { "id": "r3", "tagName": "paragraph", "content": "Closing three", "sequence": 3 }
                    ]
                }
            ]
        }
    ])
}
