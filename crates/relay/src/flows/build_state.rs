use pipeline_monitor_aws::BuildSystem;
use pipeline_monitor_core::{
    RelayError,
    identity::{parse_pull_request_tag, parse_repository_url},
    models::{BuildDetails, BuildRef, RevisionIdentity},
};
use pipeline_monitor_github::{comment::LogComment, upsert::upsert_comment};

use crate::{
    Outcome, Relay,
    events::{BUILD_COMPLETED_PHASE, BuildStateDetail},
};

const SUPPORTED_SOURCE_TYPE: &str = "GITHUB";

/// Post the log of a completed pull request build as a PR comment.
pub async fn process(relay: &Relay, detail: &BuildStateDetail) -> Result<Outcome, RelayError> {
    if detail.current_phase != BUILD_COMPLETED_PHASE {
        tracing::info!("Ignoring build notification for phase {}", detail.current_phase);
        return Ok(Outcome::Ignored(format!("build phase {}", detail.current_phase)));
    }

    // Build state events carry different fields depending on how the build
    // was triggered (webhook vs. retry), so only the build id is used.
    let build =
        BuildRef { build_id: detail.build_id.clone(), project_name: detail.project_name.clone() };
    publish_log_comment(relay, &build, relay.config.log_line_limit).await
}

/// Resolve a build to its pull request and replace the build log comment there.
pub async fn publish_log_comment(
    relay: &Relay,
    build: &BuildRef,
    line_limit: u32,
) -> Result<Outcome, RelayError> {
    let details = resolve_build(relay.builds.as_ref(), build).await?;
    if details.source_type != SUPPORTED_SOURCE_TYPE {
        return Err(RelayError::UnsupportedSource(details.source_type));
    }
    let Some(location) = details.source_location.as_deref() else {
        return Err(RelayError::ResolutionFailure(format!(
            "source location of build {}",
            build.build_id
        )));
    };
    let repository = parse_repository_url(location)?;

    let source_version = details.source_version.as_deref().unwrap_or_default();
    let pull_request = match parse_pull_request_tag(source_version) {
        Ok(number) => number,
        Err(_) => {
            tracing::info!(
                "Build {} of {} is not a pull request build (source version '{}'), skipping log comment",
                build.build_id,
                repository,
                source_version
            );
            return Ok(Outcome::Ignored(format!("build {} has no pull request", build.build_id)));
        }
    };
    let revision =
        RevisionIdentity::pull_request(repository, pull_request, details.resolved_commit.clone());

    let (Some(group), Some(stream)) =
        (details.log_group_name.as_deref(), details.log_stream_name.as_deref())
    else {
        let what = format!("log stream of build {}", build.build_id);
        return Err(RelayError::ResolutionFailure(what));
    };
    let lines = relay
        .builds
        .fetch_log_lines(group, stream, line_limit)
        .await
        .map_err(|e| RelayError::query(format!("log stream {group}/{stream}"), e))?;

    let project_name = project_name(&details, build);
    let comment = LogComment::render(
        project_name,
        &lines,
        details.deep_link.as_deref().unwrap_or_default(),
        line_limit,
    )?;
    if comment.is_truncated() {
        tracing::info!(
            "Log of build {} exceeds the comment size limit, posting a truncated excerpt",
            build.build_id
        );
    }
    let result = upsert_comment(relay.github.as_ref(), &revision, &comment).await?;
    Ok(Outcome::CommentPublished {
        revision,
        tag: comment.tag().to_string(),
        removed: result.removed.len(),
    })
}

/// Fetch the authoritative details of exactly one build.
pub async fn resolve_build(
    builds: &dyn BuildSystem,
    build: &BuildRef,
) -> Result<BuildDetails, RelayError> {
    let mut results = builds
        .query_build_details(build)
        .await
        .map_err(|e| RelayError::query(format!("build {}", build.build_id), e))?;
    if results.len() != 1 {
        return Err(RelayError::ResolutionFailure(format!(
            "build {}: expected exactly one result, got {}",
            build.build_id,
            results.len()
        )));
    }
    Ok(results.remove(0))
}

/// Project name for the comment tag: CodeBuild's answer, then the event's,
/// then the `project:uuid` prefix of the build id.
fn project_name<'a>(details: &'a BuildDetails, build: &'a BuildRef) -> &'a str {
    details
        .project_name
        .as_deref()
        .or(build.project_name.as_deref())
        .unwrap_or_else(|| build_id_project(&build.build_id))
}

fn build_id_project(build_id: &str) -> &str {
    // Build ids may be full ARNs: arn:aws:codebuild:region:account:build/project:uuid
    let id = build_id.rsplit_once("build/").map_or(build_id, |(_, id)| id);
    id.split_once(':').map_or(id, |(project, _)| project)
}
