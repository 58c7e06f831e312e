use thiserror::Error;

/// Failures that can occur while relaying a single event.
///
/// Only write failures ([`RelayError::StatusUpdateFailed`],
/// [`RelayError::CommentCreateFailed`]) and [`RelayError::RenderError`] are
/// returned to the invoker; everything else ends processing of the event and
/// is logged.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Malformed {kind} '{input}'")]
    MalformedReference { kind: &'static str, input: String },
    #[error("Failed to resolve {0}")]
    ResolutionFailure(String),
    #[error("Unsupported build source type {0}, only GITHUB is supported")]
    UnsupportedSource(String),
    #[error("Failed to query {what}")]
    Query {
        what: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Invalid {detail_type} event detail")]
    InvalidEvent {
        detail_type: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to render log comment")]
    RenderError(#[source] anyhow::Error),
    #[error("Failed to create commit status on {owner}/{repo}@{commit}")]
    StatusUpdateFailed {
        owner: String,
        repo: String,
        commit: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to create comment on {owner}/{repo}#{pull_request}")]
    CommentCreateFailed {
        owner: String,
        repo: String,
        pull_request: u64,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to clean up previous comments on {owner}/{repo}")]
    BestEffortCleanupFailed {
        owner: String,
        repo: String,
        comment_id: Option<u64>,
        #[source]
        source: anyhow::Error,
    },
}

impl RelayError {
    pub fn malformed(kind: &'static str, input: impl Into<String>) -> Self {
        Self::MalformedReference { kind, input: input.into() }
    }

    pub fn query(what: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Query { what: what.into(), source: source.into() }
    }

    /// Whether the error means the user-visible artifact was not written.
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            Self::StatusUpdateFailed { .. }
                | Self::CommentCreateFailed { .. }
                | Self::RenderError(_)
        )
    }
}
