// src/events.rs

//! Completions of background work, delivered back into the session.
//!
//! Monitoring ticks and uploads run on their own tasks; their only way to
//! affect the attempt is to push a [`SessionEvent`] onto this queue, which the
//! session drains in order on its own timeline.

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::proctoring::monitor::MonitorReport;

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Monitor(MonitorReport),

    AnswerDelivery {
        artifact_id: Uuid,
        page_number: i64,
        outcome: Result<(), String>,
    },

    SubmissionDelivery {
        outcome: Result<(), String>,
    },
}

/// Delivery state of one upload, as far as this client knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed(String),
    /// Dispatch disabled by configuration.
    Skipped,
}

impl DeliveryStatus {
    pub fn from_outcome(outcome: Result<(), String>) -> Self {
        match outcome {
            Ok(()) => DeliveryStatus::Delivered,
            Err(reason) => DeliveryStatus::Failed(reason),
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, DeliveryStatus::Pending)
    }
}
