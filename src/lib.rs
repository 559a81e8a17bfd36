// src/lib.rs

pub mod api;
pub mod config;
pub mod devices;
pub mod error;
pub mod events;
pub mod media;
pub mod models;
pub mod notify;
pub mod proctoring;
pub mod recording;
pub mod screen;
pub mod session;
pub mod submission;
pub mod utils;

// Re-export the entry points a host needs
pub use session::{Platform, Session, Step};
