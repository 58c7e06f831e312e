pub mod secrets;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_codebuild::types::Build;
use pipeline_monitor_core::{
    config::AwsConfig,
    models::{ArtifactRevision, BuildDetails, BuildRef, PipelineExecutionRef},
};

/// GetLogEvents returns at most this many events per page.
const MAX_LOG_EVENTS_PER_PAGE: u32 = 10_000;

/// Authoritative build and pipeline data, queried instead of trusting event
/// payloads.
#[async_trait]
pub trait BuildSystem: Send + Sync {
    async fn query_pipeline_execution(
        &self,
        execution: &PipelineExecutionRef,
    ) -> Result<Vec<ArtifactRevision>>;

    async fn query_build_details(&self, build: &BuildRef) -> Result<Vec<BuildDetails>>;

    /// The first `limit` lines of a log stream, oldest first.
    async fn fetch_log_lines(&self, group: &str, stream: &str, limit: u32) -> Result<Vec<String>>;
}

pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    loader.load().await
}

#[derive(Clone)]
pub struct Aws {
    codepipeline: aws_sdk_codepipeline::Client,
    codebuild: aws_sdk_codebuild::Client,
    logs: aws_sdk_cloudwatchlogs::Client,
}

impl Aws {
    pub async fn new(config: &AwsConfig) -> Arc<Self> {
        let sdk_config = load_sdk_config(config.region.as_deref()).await;
        tracing::info!(
            "AWS clients using region {}",
            sdk_config.region().map(|r| r.as_ref()).unwrap_or("[default]")
        );
        Arc::new(Self::from_sdk_config(&sdk_config))
    }

    pub fn from_sdk_config(sdk_config: &SdkConfig) -> Self {
        Self {
            codepipeline: aws_sdk_codepipeline::Client::new(sdk_config),
            codebuild: aws_sdk_codebuild::Client::new(sdk_config),
            logs: aws_sdk_cloudwatchlogs::Client::new(sdk_config),
        }
    }
}

fn build_details(build: &Build) -> BuildDetails {
    let source = build.source();
    let logs = build.logs();
    BuildDetails {
        project_name: build.project_name().map(str::to_string),
        source_type: source.map(|s| s.r#type().as_str().to_string()).unwrap_or_default(),
        source_location: source.and_then(|s| s.location()).map(str::to_string),
        resolved_commit: build.resolved_source_version().map(str::to_string),
        source_version: build.source_version().map(str::to_string),
        log_group_name: logs.and_then(|l| l.group_name()).map(str::to_string),
        log_stream_name: logs.and_then(|l| l.stream_name()).map(str::to_string),
        deep_link: logs.and_then(|l| l.deep_link()).map(str::to_string),
    }
}

#[async_trait]
impl BuildSystem for Aws {
    async fn query_pipeline_execution(
        &self,
        execution: &PipelineExecutionRef,
    ) -> Result<Vec<ArtifactRevision>> {
        let output = self
            .codepipeline
            .get_pipeline_execution()
            .pipeline_name(&execution.pipeline_name)
            .pipeline_execution_id(&execution.execution_id)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to fetch pipeline execution {} of {}",
                    execution.execution_id, execution.pipeline_name
                )
            })?;
        let revisions =
            output.pipeline_execution().map(|e| e.artifact_revisions()).unwrap_or_default();
        Ok(revisions
            .iter()
            .map(|r| ArtifactRevision {
                revision_url: r.revision_url().map(str::to_string),
                revision_id: r.revision_id().map(str::to_string),
            })
            .collect())
    }

    async fn query_build_details(&self, build: &BuildRef) -> Result<Vec<BuildDetails>> {
        let output = self
            .codebuild
            .batch_get_builds()
            .ids(&build.build_id)
            .send()
            .await
            .with_context(|| format!("Failed to fetch build {}", build.build_id))?;
        Ok(output.builds().iter().map(build_details).collect())
    }

    async fn fetch_log_lines(&self, group: &str, stream: &str, limit: u32) -> Result<Vec<String>> {
        let mut cursor = LogCursor::new(limit as usize);
        while let Some(page_size) = cursor.page_size() {
            let output = self
                .logs
                .get_log_events()
                .log_group_name(group)
                .log_stream_name(stream)
                .start_from_head(true)
                .limit(page_size as i32)
                .set_next_token(cursor.token().map(str::to_string))
                .send()
                .await
                .with_context(|| format!("Failed to fetch log events from {group}/{stream}"))?;
            cursor.push_page(
                output.events().iter().filter_map(|e| e.message()).map(str::to_string),
                output.next_forward_token(),
            );
        }
        let lines = cursor.into_lines();
        tracing::debug!("Fetched {} log lines from {}/{}", lines.len(), group, stream);
        Ok(lines)
    }
}

/// Paging state for reading a log stream forward from its head.
///
/// Pages may be empty while more events are still available, so only the
/// forward token decides when the stream is exhausted: it is absent or comes
/// back unchanged at the end.
#[derive(Debug, Default)]
struct LogCursor {
    limit: usize,
    lines: Vec<String>,
    token: Option<String>,
    exhausted: bool,
}

impl LogCursor {
    fn new(limit: usize) -> Self { Self { limit, ..Default::default() } }

    /// Size of the next page to request, or `None` when reading is done.
    fn page_size(&self) -> Option<usize> {
        if self.exhausted || self.lines.len() >= self.limit {
            return None;
        }
        Some((self.limit - self.lines.len()).min(MAX_LOG_EVENTS_PER_PAGE as usize))
    }

    fn token(&self) -> Option<&str> { self.token.as_deref() }

    fn push_page(&mut self, messages: impl IntoIterator<Item = String>, next_token: Option<&str>) {
        self.lines.extend(messages);
        match next_token {
            Some(next) if self.token.as_deref() != Some(next) => {
                self.token = Some(next.to_string())
            }
            _ => self.exhausted = true,
        }
    }

    fn into_lines(mut self) -> Vec<String> {
        self.lines.truncate(self.limit);
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_codebuild::types::{LogsLocation, ProjectSource, SourceType};

    use super::*;

    #[test]
    fn test_build_details_from_build() {
        let build = Build::builder()
            .project_name("pipeline-monitor-lint")
            .source_version("pr/39")
            .resolved_source_version("8873423234e34ea1da93f92d1557a7b9b")
            .source(
                ProjectSource::builder()
                    .r#type(SourceType::Github)
                    .location("https://github.com/owner/repo.git")
                    .build()
                    .unwrap(),
            )
            .logs(
                LogsLocation::builder()
                    .group_name("/aws/codebuild/pipeline-monitor-lint")
                    .stream_name("b1ce3a16")
                    .deep_link("https://console.aws.amazon.com/cloudwatch/home")
                    .build(),
            )
            .build();

        let details = build_details(&build);

        assert_eq!(details.project_name.as_deref(), Some("pipeline-monitor-lint"));
        assert_eq!(details.source_type, "GITHUB");
        assert_eq!(details.source_location.as_deref(), Some("https://github.com/owner/repo.git"));
        assert_eq!(details.source_version.as_deref(), Some("pr/39"));
        assert_eq!(details.resolved_commit.as_deref(), Some("8873423234e34ea1da93f92d1557a7b9b"));
        assert_eq!(details.log_group_name.as_deref(), Some("/aws/codebuild/pipeline-monitor-lint"));
        assert_eq!(details.log_stream_name.as_deref(), Some("b1ce3a16"));
        assert_eq!(
            details.deep_link.as_deref(),
            Some("https://console.aws.amazon.com/cloudwatch/home")
        );
    }

    fn page(prefix: &str, count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{prefix} {i}")).collect()
    }

    #[test]
    fn test_log_cursor_continues_past_empty_page() {
        let mut cursor = LogCursor::new(100);
        assert_eq!(cursor.page_size(), Some(100));
        assert_eq!(cursor.token(), None);

        cursor.push_page(Vec::new(), Some("f/1"));
        assert_eq!(cursor.page_size(), Some(100));
        assert_eq!(cursor.token(), Some("f/1"));

        cursor.push_page(page("line", 3), Some("f/2"));
        cursor.push_page(Vec::new(), Some("f/2"));
        assert_eq!(cursor.page_size(), None);
        assert_eq!(cursor.into_lines(), vec!["line 0", "line 1", "line 2"]);
    }

    #[test]
    fn test_log_cursor_stops_on_repeated_or_missing_token() {
        let mut cursor = LogCursor::new(100);
        cursor.push_page(page("a", 2), Some("f/1"));
        cursor.push_page(page("b", 1), Some("f/1"));
        assert_eq!(cursor.page_size(), None);
        assert_eq!(cursor.into_lines().len(), 3);

        let mut cursor = LogCursor::new(100);
        cursor.push_page(page("a", 2), None);
        assert_eq!(cursor.page_size(), None);
    }

    #[test]
    fn test_log_cursor_limit_spans_pages() {
        let mut cursor = LogCursor::new(15_000);
        assert_eq!(cursor.page_size(), Some(10_000));
        cursor.push_page(page("first", 10_000), Some("f/1"));
        assert_eq!(cursor.page_size(), Some(5_000));
        cursor.push_page(page("second", 5_000), Some("f/2"));
        assert_eq!(cursor.page_size(), None);

        let lines = cursor.into_lines();
        assert_eq!(lines.len(), 15_000);
        assert_eq!(lines[9_999], "first 9999");
        assert_eq!(lines[10_000], "second 0");
    }

    #[test]
    fn test_log_cursor_truncates_to_limit() {
        let mut cursor = LogCursor::new(2);
        cursor.push_page(page("line", 5), Some("f/1"));
        assert_eq!(cursor.page_size(), None);
        assert_eq!(cursor.into_lines(), vec!["line 0", "line 1"]);
    }

    #[test]
    fn test_build_details_without_source() {
        let details = build_details(&Build::builder().id("lint:1").build());
        assert_eq!(details, BuildDetails::default());
    }
}
