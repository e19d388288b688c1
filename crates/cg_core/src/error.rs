use thiserror::Error;

/// A GameSpec that cannot be simulated.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Invalid GameSpec: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("GameSpec JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SpecError {
    /// Individual violations, empty for parse failures.
    pub fn violations(&self) -> &[String] {
        match self {
            SpecError::Invalid(errors) => errors,
            SpecError::Json(_) => &[],
        }
    }
}

/// Configuration errors. Raised before any simulation starts.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Seed list is empty")]
    EmptySeeds,

    #[error("Policy roster is empty")]
    EmptyRoster,

    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("No patch candidates to evaluate")]
    NoCandidates,

    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("Failed to build simulation worker pool: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Spec(#[from] SpecError),
}

impl CoreError {
    /// Whether the error comes from a caller-supplied input that could be fixed and retried.
    pub fn is_input_error(&self) -> bool {
        match self {
            CoreError::EmptySeeds
            | CoreError::EmptyRoster
            | CoreError::UnknownPolicy(_)
            | CoreError::ZeroAttempts
            | CoreError::Spec(_) => true,
            CoreError::NoCandidates | CoreError::WorkerPool(_) => false,
        }
    }
}

/// Failures of the external text oracle. Never propagated out of the pipeline.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle credentials are not configured")]
    MissingCredentials,

    #[error("Transport error: {0}")]
    Transport(#[from] Box<ureq::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_spec_lists_every_violation() {
        let err = SpecError::Invalid(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "Invalid GameSpec: a; b");
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_spec_error_is_input_error() {
        let err: CoreError = SpecError::Invalid(vec![]).into();
        assert!(err.is_input_error());
        assert!(!CoreError::NoCandidates.is_input_error());
    }
}
