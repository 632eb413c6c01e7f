use thiserror::Error;

/// Failures raised while scanning unified diff text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// A `@@` line whose ranges could not be parsed. `line` is the 1-based
    /// position of the offending line within the whole diff.
    #[error("malformed hunk header at diff line {line}: {text:?}")]
    MalformedHunkHeader { line: usize, text: String },
}
