//! Idempotent publication of commit statuses and build log comments.

use pipeline_monitor_core::{
    RelayError,
    models::{NormalizedStatus, RevisionIdentity},
};

use crate::{Collaboration, comment::LogComment};

/// Publish a commit status.
///
/// GitHub keys statuses by (commit, context), so a new status with the same
/// label supersedes the previous one without any cleanup.
pub async fn upsert_status(
    api: &dyn Collaboration,
    status: &NormalizedStatus,
) -> Result<(), RelayError> {
    api.create_commit_status(status).await.map_err(|source| RelayError::StatusUpdateFailed {
        owner: status.owner.clone(),
        repo: status.repo.clone(),
        commit: status.commit.clone(),
        source,
    })?;
    tracing::info!(
        "Set {} status '{}' on {}/{}@{}",
        status.state,
        status.label,
        status.owner,
        status.repo,
        status.commit
    );
    Ok(())
}

/// Result of a comment upsert.
#[derive(Debug, Default)]
pub struct CommentUpsert {
    /// Previous comments that were removed.
    pub removed: Vec<u64>,
    /// Cleanup steps that failed; the new comment was created regardless.
    pub cleanup_failures: Vec<RelayError>,
}

/// Replace this project's log comment on a pull request.
///
/// Every previous comment carrying the same marker is deleted before the new
/// one is created, so the latest log always sorts last in the timeline.
/// Cleanup is best-effort; only failure to create the new comment is an error.
pub async fn upsert_comment(
    api: &dyn Collaboration,
    revision: &RevisionIdentity,
    comment: &LogComment,
) -> Result<CommentUpsert, RelayError> {
    let Some(pull_request) = revision.pull_request_number() else {
        return Err(RelayError::ResolutionFailure(format!(
            "pull request for {revision}, needed to post a log comment"
        )));
    };
    let repo = revision.repository();
    let mut result = CommentUpsert::default();

    match api.list_pull_request_comments(repo, pull_request).await {
        Ok(mut existing) => {
            existing.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            for previous in existing.iter().filter(|c| comment.matches(&c.body)) {
                match api.delete_comment(repo, previous.id).await {
                    Ok(()) => {
                        tracing::debug!("Deleted previous comment {} on {}", previous.id, repo);
                        result.removed.push(previous.id);
                    }
                    Err(source) => {
                        let err = RelayError::BestEffortCleanupFailed {
                            owner: repo.owner.clone(),
                            repo: repo.repo.clone(),
                            comment_id: Some(previous.id),
                            source,
                        };
                        tracing::warn!("{:?}", err);
                        result.cleanup_failures.push(err);
                    }
                }
            }
        }
        Err(source) => {
            let err = RelayError::BestEffortCleanupFailed {
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
                comment_id: None,
                source,
            };
            tracing::warn!("{:?}", err);
            result.cleanup_failures.push(err);
        }
    }

    api.create_comment(repo, pull_request, comment.body()).await.map_err(|source| {
        RelayError::CommentCreateFailed {
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
            pull_request,
            source,
        }
    })?;
    tracing::info!(
        "Posted {} log comment on {}#{} (replaced {})",
        comment.tag(),
        repo,
        pull_request,
        result.removed.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use pipeline_monitor_core::models::{ExistingComment, RepositoryRef, StatusState};

    use super::*;

    #[derive(Default)]
    struct FakeGitHub {
        comments: Mutex<Vec<ExistingComment>>,
        statuses: Mutex<Vec<NormalizedStatus>>,
        next_id: Mutex<u64>,
        clock: Mutex<i64>,
        fail_list: bool,
        fail_delete: Vec<u64>,
        fail_create: bool,
    }

    impl FakeGitHub {
        fn seed(&self, body: &str) -> u64 {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            let mut clock = self.clock.lock().unwrap();
            *clock += 1;
            self.comments.lock().unwrap().push(ExistingComment {
                id: *next_id,
                body: body.to_string(),
                updated_at: Some(*clock),
            });
            *next_id
        }

        fn bodies(&self) -> Vec<String> {
            self.comments.lock().unwrap().iter().map(|c| c.body.clone()).collect()
        }
    }

    #[async_trait]
    impl Collaboration for FakeGitHub {
        async fn create_commit_status(&self, status: &NormalizedStatus) -> Result<()> {
            self.statuses.lock().unwrap().push(status.clone());
            Ok(())
        }

        async fn list_pull_request_comments(
            &self,
            _repo: &RepositoryRef,
            _pull_request: u64,
        ) -> Result<Vec<ExistingComment>> {
            if self.fail_list {
                return Err(anyhow!("list unavailable"));
            }
            Ok(self.comments.lock().unwrap().clone())
        }

        async fn delete_comment(&self, _repo: &RepositoryRef, comment_id: u64) -> Result<()> {
            if self.fail_delete.contains(&comment_id) {
                return Err(anyhow!("delete refused"));
            }
            self.comments.lock().unwrap().retain(|c| c.id != comment_id);
            Ok(())
        }

        async fn create_comment(
            &self,
            _repo: &RepositoryRef,
            _pull_request: u64,
            body: &str,
        ) -> Result<()> {
            if self.fail_create {
                return Err(anyhow!("create refused"));
            }
            self.seed(body);
            Ok(())
        }
    }

    fn pr() -> RevisionIdentity {
        RevisionIdentity::pull_request(RepositoryRef::new("owner", "repo"), 39, None)
    }

    fn log_comment(project: &str, line: &str) -> LogComment {
        LogComment::render(project, &[line.to_string()], "https://example.com/log", 100).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_twice_leaves_one_latest_comment() {
        let github = FakeGitHub::default();
        github.seed("unrelated review comment");

        upsert_comment(&github, &pr(), &log_comment("lint", "first run")).await.unwrap();
        let second = log_comment("lint", "second run");
        let result = upsert_comment(&github, &pr(), &second).await.unwrap();

        assert_eq!(result.removed.len(), 1);
        assert!(result.cleanup_failures.is_empty());
        let bodies = github.bodies();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0], "unrelated review comment");
        assert_eq!(bodies[1], second.body());
    }

    #[tokio::test]
    async fn test_upsert_removes_every_duplicate() {
        let github = FakeGitHub::default();
        let old = log_comment("lint", "old");
        github.seed(old.body());
        github.seed(old.body());
        github.seed(log_comment("unit-tests", "other project").body());

        let result = upsert_comment(&github, &pr(), &log_comment("lint", "new")).await.unwrap();

        assert_eq!(result.removed.len(), 2);
        let bodies = github.bodies();
        assert_eq!(bodies.len(), 2);
        assert!(bodies[0].contains("other project"));
        assert!(bodies[1].contains("new"));
    }

    #[tokio::test]
    async fn test_cleanup_failure_does_not_block_creation() {
        let mut github = FakeGitHub::default();
        github.fail_delete = vec![1];
        github.seed(log_comment("lint", "stale").body());

        let result = upsert_comment(&github, &pr(), &log_comment("lint", "fresh")).await.unwrap();

        assert!(result.removed.is_empty());
        assert!(matches!(
            result.cleanup_failures.as_slice(),
            [RelayError::BestEffortCleanupFailed { comment_id: Some(1), .. }]
        ));
        let bodies = github.bodies();
        assert_eq!(bodies.len(), 2);
        assert!(bodies[1].contains("fresh"));
    }

    #[tokio::test]
    async fn test_list_failure_still_creates_comment() {
        let github = FakeGitHub { fail_list: true, ..Default::default() };

        let result = upsert_comment(&github, &pr(), &log_comment("lint", "fresh")).await.unwrap();

        assert!(matches!(
            result.cleanup_failures.as_slice(),
            [RelayError::BestEffortCleanupFailed { comment_id: None, .. }]
        ));
        assert_eq!(github.bodies().len(), 1);
    }

    #[tokio::test]
    async fn test_create_failure_is_fatal() {
        let github = FakeGitHub { fail_create: true, ..Default::default() };

        let err = upsert_comment(&github, &pr(), &log_comment("lint", "x")).await.unwrap_err();

        assert!(matches!(err, RelayError::CommentCreateFailed { pull_request: 39, .. }));
        assert!(err.is_write_failure());
    }

    #[tokio::test]
    async fn test_comment_requires_pull_request() {
        let github = FakeGitHub::default();
        let revision = RevisionIdentity::commit(RepositoryRef::new("owner", "repo"), "abc123");

        let err = upsert_comment(&github, &revision, &log_comment("lint", "x")).await.unwrap_err();

        assert!(matches!(err, RelayError::ResolutionFailure(_)));
        assert!(github.bodies().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_status() {
        let github = FakeGitHub::default();
        let status = NormalizedStatus {
            owner: "owner".to_string(),
            repo: "repo".to_string(),
            commit: "abc123".to_string(),
            state: StatusState::Pending,
            label: "deploy for prod".to_string(),
            description: "Deploy stage executing in us-west-2".to_string(),
            details_url: "https://example.com".to_string(),
        };

        upsert_status(&github, &status).await.unwrap();

        assert_eq!(github.statuses.lock().unwrap().as_slice(), &[status]);
    }
}
