//! Routes build and pipeline events to commit statuses and pull request
//! comments.

pub mod events;
mod flows;

use std::sync::Arc;

use pipeline_monitor_aws::BuildSystem;
use pipeline_monitor_core::{
    RelayError,
    config::RelayConfig,
    models::{BuildRef, NormalizedStatus, RevisionIdentity},
};
use pipeline_monitor_github::Collaboration;

use crate::events::{CloudEvent, EventKind};

/// What happened to a single event.
#[derive(Debug)]
pub enum Outcome {
    /// The event is outside the relay's scope.
    Ignored(String),
    /// The event could not be resolved to a revision and was dropped.
    Dropped(RelayError),
    StatusPublished(NormalizedStatus),
    CommentPublished { revision: RevisionIdentity, tag: String, removed: usize },
}

impl Outcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Ignored(_) => "ignored",
            Outcome::Dropped(_) => "dropped",
            Outcome::StatusPublished(_) => "status",
            Outcome::CommentPublished { .. } => "comment",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Ignored(reason) => write!(f, "ignored: {reason}"),
            Outcome::Dropped(e) => write!(f, "dropped: {e}"),
            Outcome::StatusPublished(status) => write!(
                f,
                "{} status '{}' on {}/{}@{}",
                status.state, status.label, status.owner, status.repo, status.commit
            ),
            Outcome::CommentPublished { revision, tag, removed } => {
                write!(f, "comment {tag} on {revision} (replaced {removed})")
            }
        }
    }
}

/// Stateless event router. Each call handles one event from start to finish.
#[derive(Clone)]
pub struct Relay {
    github: Arc<dyn Collaboration>,
    builds: Arc<dyn BuildSystem>,
    config: RelayConfig,
}

impl Relay {
    pub fn new(
        github: Arc<dyn Collaboration>,
        builds: Arc<dyn BuildSystem>,
        config: RelayConfig,
    ) -> Self {
        Self { github, builds, config }
    }

    /// Handle one event.
    ///
    /// Resolution and parsing failures are logged and reported as
    /// [`Outcome::Dropped`]; only failures to write the status or comment are
    /// returned as errors.
    pub async fn handle_event(&self, event: &CloudEvent) -> Result<Outcome, RelayError> {
        tracing::info!("Processing {} event {}", event.detail_type, event.id);
        let result = match event.classify() {
            Ok(EventKind::PipelineAction(detail)) => {
                flows::pipeline_action::process(self, event, &detail).await
            }
            Ok(EventKind::BuildState(detail)) => flows::build_state::process(self, &detail).await,
            Ok(EventKind::Other) => {
                tracing::debug!("Ignoring {}", event.detail_type);
                Ok(Outcome::Ignored(format!("unhandled detail type {}", event.detail_type)))
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_write_failure() => {
                tracing::error!(
                    "Failed to process {} event {}: {:?}",
                    event.detail_type,
                    event.id,
                    e
                );
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Dropping {} event {}: {:?}", event.detail_type, event.id, e);
                Ok(Outcome::Dropped(e))
            }
        }
    }

    /// Re-post the log comment for a build regardless of its current phase.
    /// Every failure is returned to the caller.
    pub async fn publish_build_log(
        &self,
        build: &BuildRef,
        line_limit: Option<u32>,
    ) -> Result<Outcome, RelayError> {
        let line_limit = line_limit.unwrap_or(self.config.log_line_limit);
        flows::build_state::publish_log_comment(self, build, line_limit).await
    }
}
