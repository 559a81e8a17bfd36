// src/screen.rs

use async_trait::async_trait;

use crate::error::AppError;

/// Fullscreen lock-in offered by the host window.
#[async_trait]
pub trait Fullscreen: Send + Sync {
    async fn request_fullscreen(&self) -> Result<(), AppError>;

    async fn exit_fullscreen(&self);
}
