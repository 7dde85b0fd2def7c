use thiserror::Error;

/// Distinguishable failures surfaced by this crate
///
/// Errors are wrapped in `anyhow::Error` at call sites; callers needing to
/// branch on the kind use `err.downcast_ref::<LlmError>()`. None of these is
/// ever retried by this crate.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Non-success provider status; the raw body is kept for inspection
    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Message content the target provider cannot represent
    ///
    /// Raised before any network call is made.
    #[error("unsupported prompt: {0}")]
    Prompt(String),

    /// Pending batch mixes completion-mode and response-mode entries
    ///
    /// A contract violation by the caller, failed loud before any I/O.
    #[error("pending batch mixes completion and response entries")]
    MixedModes,
}
