//! Revision identity extraction from repository URLs, commit URLs and build
//! source-version tags.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::{
    error::RelayError,
    models::{RepositoryRef, RevisionIdentity},
};

fn url_path(kind: &'static str, input: &str) -> Result<String, RelayError> {
    let url = Url::parse(input).map_err(|_| RelayError::malformed(kind, input))?;
    Ok(url.path().to_string())
}

/// Parse `https://github.com/{owner}/{repo}.git` into its owner and repository.
pub fn parse_repository_url(input: &str) -> Result<RepositoryRef, RelayError> {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = REGEX.get_or_init(|| {
        Regex::new(r"/(?P<owner>[A-Za-z0-9_-]+)/(?P<repo>[A-Za-z0-9_-]+)\.git$").unwrap()
    });
    let path = url_path("repository URL", input)?;
    let caps =
        regex.captures(&path).ok_or_else(|| RelayError::malformed("repository URL", input))?;
    Ok(RepositoryRef::new(&caps["owner"], &caps["repo"]))
}

/// Parse `https://github.com/{owner}/{repo}/commit/{sha}` into a commit revision.
pub fn parse_commit_url(input: &str) -> Result<RevisionIdentity, RelayError> {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = REGEX.get_or_init(|| {
        Regex::new(
            r"/(?P<owner>[A-Za-z0-9_-]+)/(?P<repo>[A-Za-z0-9_-]+)/commit/(?P<commit>[A-Za-z0-9_]+)$",
        )
        .unwrap()
    });
    let path = url_path("commit URL", input)?;
    let caps = regex.captures(&path).ok_or_else(|| RelayError::malformed("commit URL", input))?;
    Ok(RevisionIdentity::commit(RepositoryRef::new(&caps["owner"], &caps["repo"]), &caps["commit"]))
}

/// Parse the pull request number out of a build source version like `pr/39`.
///
/// Push-triggered builds carry a bare commit hash and fail here; callers treat
/// that as "no pull request to report to".
pub fn parse_pull_request_tag(source_version: &str) -> Result<u64, RelayError> {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = REGEX.get_or_init(|| Regex::new(r"pr/(?P<number>[0-9]+)$").unwrap());
    regex
        .captures(source_version)
        .and_then(|caps| caps["number"].parse().ok())
        .ok_or_else(|| RelayError::malformed("pull request source version", source_version))
}
