// src/media/mod.rs

//! Camera / microphone acquisition.
//!
//! The platform capability is abstracted behind [`MediaDevices`] and
//! [`CaptureStream`]. [`MediaAcquisition`] owns the one live stream of an
//! attempt and lends [`StreamHandle`] clones to the photo step, the recorder
//! and the monitoring loop. The stream never outlives the service: it is
//! released explicitly on attempt exit and again on drop.

pub mod frame;

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::identity::StillImage;

pub use frame::VideoFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    User,
    Environment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub facing_mode: FacingMode,
    pub frame_rate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: VideoConstraints,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: VideoConstraints {
                width: 640,
                height: 480,
                facing_mode: FacingMode::User,
                frame_rate: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: String,
    pub kind: TrackKind,
    pub label: String,
    pub live: bool,
}

/// Raw platform failure, identified by its DOM-style error name
/// (`NotAllowedError`, `NotFoundError`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceError {
    pub name: String,
    pub message: String,
}

impl DeviceError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Why the camera / microphone could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("No capture device: {0}")]
    NoDevice(String),

    #[error("Media acquisition failed: {0}")]
    Other(String),
}

impl From<DeviceError> for AcquireError {
    fn from(err: DeviceError) -> Self {
        match err.name.as_str() {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                AcquireError::PermissionDenied(err.message)
            }
            "NotFoundError" | "DevicesNotFoundError" | "OverconstrainedError" => {
                AcquireError::NoDevice(err.message)
            }
            _ => AcquireError::Other(err.message),
        }
    }
}

impl AcquireError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AcquireError::PermissionDenied(_) => {
                "Permission denied. Please allow camera access and try again."
            }
            AcquireError::NoDevice(_) => "No camera found on this device.",
            AcquireError::Other(_) => "Camera access is required for the exam",
        }
    }
}

/// A live audio+video capture as exposed by the platform.
pub trait CaptureStream: Send + Sync {
    fn tracks(&self) -> Vec<TrackInfo>;

    /// Latest preview frame, `None` until the video is ready.
    fn current_frame(&self) -> Option<VideoFrame>;

    /// JPEG screenshot of the preview, `None` until the video is ready.
    fn take_photo(&self) -> Option<StillImage>;

    fn stop_track(&self, track_id: &str);

    fn is_active(&self) -> bool {
        self.tracks().iter().any(|track| track.live)
    }
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_user_media(
        &self,
        constraints: &MediaConstraints,
    ) -> Result<Arc<dyn CaptureStream>, DeviceError>;
}

/// Shared, read-only borrow of the live stream.
#[derive(Clone)]
pub struct StreamHandle {
    inner: Arc<dyn CaptureStream>,
}

impl StreamHandle {
    pub fn new(inner: Arc<dyn CaptureStream>) -> Self {
        Self { inner }
    }

    pub fn current_frame(&self) -> Option<VideoFrame> {
        self.inner.current_frame()
    }

    pub fn take_photo(&self) -> Option<StillImage> {
        self.inner.take_photo()
    }

    pub fn tracks(&self) -> Vec<TrackInfo> {
        self.inner.tracks()
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    pub fn stream(&self) -> &Arc<dyn CaptureStream> {
        &self.inner
    }

    fn stop(&self) {
        for track in self.inner.tracks() {
            if track.live {
                self.inner.stop_track(&track.id);
            }
        }
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("tracks", &self.inner.tracks())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    Ready,
    Failed(AcquireError),
    Released,
}

/// Owner of the attempt's camera / microphone stream.
pub struct MediaAcquisition {
    devices: Arc<dyn MediaDevices>,
    stream: Option<StreamHandle>,
    state: AcquisitionState,
    timeout: Option<Duration>,
}

impl MediaAcquisition {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            stream: None,
            state: AcquisitionState::Idle,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Requests the stream. While a stream is already held, returns it again.
    pub async fn acquire(
        &mut self,
        constraints: &MediaConstraints,
    ) -> Result<StreamHandle, AcquireError> {
        if let Some(stream) = &self.stream {
            return Ok(stream.clone());
        }

        let request = self.devices.get_user_media(constraints);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, request).await {
                Ok(result) => result.map_err(AcquireError::from),
                Err(_) => Err(AcquireError::Other(format!(
                    "no response from media devices after {:?}",
                    limit
                ))),
            },
            None => request.await.map_err(AcquireError::from),
        };

        match result {
            Ok(stream) => {
                let handle = StreamHandle::new(stream);
                tracing::info!(tracks = handle.tracks().len(), "Camera and microphone ready");
                self.stream = Some(handle.clone());
                self.state = AcquisitionState::Ready;
                Ok(handle)
            }
            Err(reason) => {
                tracing::warn!(error = %reason, "Media acquisition failed");
                self.state = AcquisitionState::Failed(reason.clone());
                Err(reason)
            }
        }
    }

    /// Stops every track of the held stream. Safe to call any number of times.
    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop();
            tracing::info!("Media stream released");
        }
        self.state = AcquisitionState::Released;
    }

    pub fn stream(&self) -> Option<&StreamHandle> {
        self.stream.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.state == AcquisitionState::Ready && self.stream.is_some()
    }

    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }
}

impl Drop for MediaAcquisition {
    fn drop(&mut self) {
        self.release();
    }
}
