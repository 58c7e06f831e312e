pub mod comment;
pub mod upsert;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::{Octocrab, models::CommentId};
use pipeline_monitor_core::models::{
    ExistingComment, NormalizedStatus, RepositoryRef, StatusState,
};

/// The collaboration-system operations the relay needs.
#[async_trait]
pub trait Collaboration: Send + Sync {
    async fn create_commit_status(&self, status: &NormalizedStatus) -> Result<()>;

    async fn list_pull_request_comments(
        &self,
        repo: &RepositoryRef,
        pull_request: u64,
    ) -> Result<Vec<ExistingComment>>;

    async fn delete_comment(&self, repo: &RepositoryRef, comment_id: u64) -> Result<()>;

    async fn create_comment(
        &self,
        repo: &RepositoryRef,
        pull_request: u64,
        body: &str,
    ) -> Result<()>;
}

#[derive(Clone)]
pub struct GitHub {
    pub client: Octocrab,
}

impl GitHub {
    /// Build a client around a token loaded once at startup.
    pub async fn new(token: &str) -> Result<Arc<Self>> {
        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .context("Failed to create GitHub client")?;
        let profile = client.current().user().await.context("Failed to fetch current user")?;
        tracing::info!("Logged in as {}", profile.login);
        Ok(Arc::new(Self { client }))
    }
}

fn status_state(state: StatusState) -> octocrab::models::StatusState {
    match state {
        StatusState::Pending => octocrab::models::StatusState::Pending,
        StatusState::Success => octocrab::models::StatusState::Success,
        StatusState::Failure => octocrab::models::StatusState::Failure,
        StatusState::Error => octocrab::models::StatusState::Error,
    }
}

#[async_trait]
impl Collaboration for GitHub {
    async fn create_commit_status(&self, status: &NormalizedStatus) -> Result<()> {
        self.client
            .repos(&status.owner, &status.repo)
            .create_status(status.commit.clone(), status_state(status.state))
            .context(status.label.clone())
            .description(status.description.clone())
            .target(status.details_url.clone())
            .send()
            .await
            .context("Failed to create commit status")?;
        Ok(())
    }

    async fn list_pull_request_comments(
        &self,
        repo: &RepositoryRef,
        pull_request: u64,
    ) -> Result<Vec<ExistingComment>> {
        let page = self
            .client
            .issues(&repo.owner, &repo.repo)
            .list_comments(pull_request)
            .per_page(100)
            .send()
            .await
            .with_context(|| format!("Failed to list comments on {repo}#{pull_request}"))?;
        // No sort parameter on this endpoint; callers order by `updated_at`.
        let comments = self.client.all_pages(page).await?;
        Ok(comments
            .into_iter()
            .map(|comment| ExistingComment {
                id: comment.id.into_inner(),
                body: comment.body.unwrap_or_default(),
                updated_at: comment.updated_at.map(|t| t.timestamp()),
            })
            .collect())
    }

    async fn delete_comment(&self, repo: &RepositoryRef, comment_id: u64) -> Result<()> {
        self.client
            .issues(&repo.owner, &repo.repo)
            .delete_comment(CommentId::from(comment_id))
            .await
            .with_context(|| format!("Failed to delete comment {comment_id} on {repo}"))
    }

    async fn create_comment(
        &self,
        repo: &RepositoryRef,
        pull_request: u64,
        body: &str,
    ) -> Result<()> {
        self.client
            .issues(&repo.owner, &repo.repo)
            .create_comment(pull_request, body)
            .await
            .with_context(|| format!("Failed to create comment on {repo}#{pull_request}"))?;
        Ok(())
    }
}
