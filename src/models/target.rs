// src/models/target.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Which jotform is being attempted, and for which course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AttemptTarget {
    /// Name (or id) used to pick the definition out of `GET /api/jotforms`.
    /// Sent as `jotformId` with every answer upload.
    #[validate(length(min = 1, max = 200))]
    pub jotform_name: String,

    #[validate(length(min = 1, max = 200))]
    pub course_name: String,
}

impl AttemptTarget {
    pub fn new(jotform_name: impl Into<String>, course_name: impl Into<String>) -> Self {
        Self {
            jotform_name: jotform_name.into(),
            course_name: course_name.into(),
        }
    }
}
