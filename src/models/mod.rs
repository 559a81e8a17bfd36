// src/models/mod.rs

pub mod artifact;
pub mod definition;
pub mod identity;
pub mod page;
pub mod proctoring;
pub mod submission;
pub mod target;
