/// Convenience alias used across the crate.
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Error type for every stage of a composition.
///
/// `Validation` carries the full list of input problems so a caller sees
/// everything wrong with a request at once, before any external process is
/// spawned. `Compile` marks broken internal invariants (defects, not user
/// input). `Execution` carries the engine's diagnostic output verbatim.
#[derive(thiserror::Error, Debug)]
pub enum ComposeError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("compile error: {0}")]
    Compile(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ComposeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }

    pub fn validation_all(msgs: Vec<String>) -> Self {
        Self::Validation(msgs)
    }

    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ComposeError::validation("x")
                .to_string()
                .contains("validation failed:")
        );
        assert!(
            ComposeError::compile("x")
                .to_string()
                .contains("compile error:")
        );
        assert!(
            ComposeError::execution("x")
                .to_string()
                .contains("execution error:")
        );
    }

    #[test]
    fn validation_joins_all_messages() {
        let err = ComposeError::validation_all(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "validation failed: a; b");
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ComposeError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
