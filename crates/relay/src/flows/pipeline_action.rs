use pipeline_monitor_aws::BuildSystem;
use pipeline_monitor_core::{
    RelayError,
    identity::parse_commit_url,
    models::{NormalizedStatus, PipelineExecutionRef, RevisionIdentity},
    status::{pipeline_console_url, status_description, status_label, translate},
};
use pipeline_monitor_github::upsert::upsert_status;

use crate::{
    Outcome, Relay,
    events::{CloudEvent, PipelineActionDetail},
};

/// Reflect a pipeline action state change as a commit status.
pub async fn process(
    relay: &Relay,
    event: &CloudEvent,
    detail: &PipelineActionDetail,
) -> Result<Outcome, RelayError> {
    let region = detail.region.as_deref().filter(|r| !r.is_empty()).unwrap_or(&event.region);
    let execution = PipelineExecutionRef {
        pipeline_name: detail.pipeline.clone(),
        execution_id: detail.execution_id.clone(),
    };
    let console_url =
        pipeline_console_url(region, &execution.pipeline_name, &execution.execution_id);

    // The source stage is the webhook trigger itself, not a build or deploy.
    if detail.stage == relay.config.source_stage {
        tracing::info!("Ignoring the {} stage for {}", detail.stage, console_url);
        return Ok(Outcome::Ignored(format!("source stage {}", detail.stage)));
    }
    tracing::info!("Processing the {} stage for {}", detail.stage, console_url);

    let revision = resolve_revision(relay.builds.as_ref(), &execution).await?;
    let Some(commit) = revision.commit_sha() else {
        return Err(RelayError::ResolutionFailure(format!("commit for {revision}")));
    };
    let status = NormalizedStatus {
        owner: revision.owner().to_string(),
        repo: revision.repo().to_string(),
        commit: commit.to_string(),
        state: translate(&detail.state),
        label: status_label(&detail.action),
        description: status_description(&detail.stage, region),
        details_url: console_url,
    };
    upsert_status(relay.github.as_ref(), &status).await?;
    Ok(Outcome::StatusPublished(status))
}

/// Resolve the single source revision of a pipeline execution.
///
/// The commit parsed from the revision URL must agree with the revision id.
pub async fn resolve_revision(
    builds: &dyn BuildSystem,
    execution: &PipelineExecutionRef,
) -> Result<RevisionIdentity, RelayError> {
    let revisions = builds.query_pipeline_execution(execution).await.map_err(|e| {
        RelayError::query(
            format!("pipeline execution {} of {}", execution.execution_id, execution.pipeline_name),
            e,
        )
    })?;
    let [artifact] = revisions.as_slice() else {
        return Err(RelayError::ResolutionFailure(format!(
            "pipeline execution {} of {}: expected exactly one artifact revision, got {}",
            execution.execution_id,
            execution.pipeline_name,
            revisions.len()
        )));
    };
    let Some(revision_url) = artifact.revision_url.as_deref() else {
        return Err(RelayError::ResolutionFailure(format!(
            "pipeline execution {}: artifact revision has no URL",
            execution.execution_id
        )));
    };
    let revision = parse_commit_url(revision_url)?;
    if revision.commit_sha() != artifact.revision_id.as_deref() {
        return Err(RelayError::ResolutionFailure(format!(
            "pipeline execution {}: revision URL {} does not match revision id {}",
            execution.execution_id,
            revision_url,
            artifact.revision_id.as_deref().unwrap_or("[none]")
        )));
    }
    Ok(revision)
}
