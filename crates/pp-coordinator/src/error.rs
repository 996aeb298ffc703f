//! Failure taxonomy for coordinator transitions.

/// Failure reported by a platform adapter call (storage, rule engine, tab
/// host). Carries the platform's message verbatim.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct PlatformError {
    pub message: String,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Error type for coordinator transitions. None of these are fatal: every
/// transition leaves the system in a state a subsequent transition can
/// recover from, and the message boundary folds all of them into a
/// structured failure response.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Caller supplied an association with no asset filenames.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Reading or writing a durable record failed.
    #[error("storage failure: {0}")]
    Storage(PlatformError),

    /// The rule engine rejected the replace call. The persisted table is
    /// already updated, so the next transition re-derives the full rule set
    /// and may self-heal.
    #[error("rule engine rejected update: {0}")]
    PlatformRejected(PlatformError),

    /// Tab creation, navigation or reload failed. The table is not rolled
    /// back; closing the tab cleans the entry up via the tab-removal path.
    #[error("tab navigation failed: {0}")]
    NavigationFailed(PlatformError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_carry_the_platform_message() {
        let err = CoordinatorError::PlatformRejected(PlatformError::new("quota exceeded"));
        assert_eq!(err.to_string(), "rule engine rejected update: quota exceeded");

        let err = CoordinatorError::InvalidRequest("PR 7 has no asset filenames".to_string());
        assert!(err.to_string().contains("no asset filenames"));
    }
}
