use std::fmt;

use serde::{Deserialize, Serialize};

/// An owner/repository pair parsed from a repository URL.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub repo: String,
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self { owner: owner.into(), repo: repo.into() }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// The source-control revision an event refers to.
///
/// Always carries a commit, a pull request number, or both.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct RevisionIdentity {
    repository: RepositoryRef,
    commit: Option<String>,
    pull_request: Option<u64>,
}

impl RevisionIdentity {
    pub fn commit(repository: RepositoryRef, commit: impl Into<String>) -> Self {
        Self { repository, commit: Some(commit.into()), pull_request: None }
    }

    pub fn pull_request(repository: RepositoryRef, number: u64, commit: Option<String>) -> Self {
        Self { repository, commit, pull_request: Some(number) }
    }

    pub fn repository(&self) -> &RepositoryRef { &self.repository }

    pub fn owner(&self) -> &str { &self.repository.owner }

    pub fn repo(&self) -> &str { &self.repository.repo }

    pub fn commit_sha(&self) -> Option<&str> { self.commit.as_deref() }

    pub fn pull_request_number(&self) -> Option<u64> { self.pull_request }
}

impl fmt::Display for RevisionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(number) = self.pull_request {
            write!(f, "#{number}")?;
        }
        if let Some(commit) = &self.commit {
            write!(f, "@{commit}")?;
        }
        Ok(())
    }
}

/// Normalized commit status state.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Pending,
    Success,
    Failure,
    Error,
}

impl StatusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A commit status ready to be published.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct NormalizedStatus {
    pub owner: String,
    pub repo: String,
    pub commit: String,
    pub state: StatusState,
    pub label: String,
    pub description: String,
    pub details_url: String,
}

/// Handle for a pipeline execution, resolved against the pipeline API.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PipelineExecutionRef {
    pub pipeline_name: String,
    pub execution_id: String,
}

/// Handle for a build, resolved against the build API.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BuildRef {
    pub build_id: String,
    pub project_name: Option<String>,
}

/// A source revision recorded on a pipeline execution.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ArtifactRevision {
    pub revision_url: Option<String>,
    pub revision_id: Option<String>,
}

/// Authoritative details of a finished build.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BuildDetails {
    pub project_name: Option<String>,
    pub source_type: String,
    pub source_location: Option<String>,
    pub resolved_commit: Option<String>,
    pub source_version: Option<String>,
    pub log_group_name: Option<String>,
    pub log_stream_name: Option<String>,
    pub deep_link: Option<String>,
}

/// A comment already present on a pull request.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExistingComment {
    pub id: u64,
    pub body: String,
    /// Seconds since the Unix epoch, when known.
    pub updated_at: Option<i64>,
}
