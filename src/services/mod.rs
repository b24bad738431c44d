// src/services/mod.rs

pub mod availability;
pub mod grading;
pub mod locks;
pub mod recorder;
pub mod scheduling;

use crate::error::AppError;

pub use availability::AvailabilityResolver;
pub use recorder::AttemptRecorder;
pub use scheduling::QuizScheduler;

/// Identifiers are positive database ids.
pub(crate) fn require_positive_id(what: &str, id: i64) -> Result<(), AppError> {
    if id <= 0 {
        return Err(AppError::InvalidInput(format!("Invalid {}: {}", what, id)));
    }
    Ok(())
}
