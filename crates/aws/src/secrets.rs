use anyhow::{Context, Result, bail};
use pipeline_monitor_core::config::Config;
use serde::Deserialize;

use crate::load_sdk_config;

/// Fallback for deployments that name the secret through the environment.
pub const TOKEN_SECRET_ENV: &str = "SECRETSMANAGER_GITHUBTOKEN_NAME";

#[derive(Deserialize)]
struct SecretToken {
    token: String,
}

/// Resolve the GitHub token once at startup: inline config first, then the
/// configured Secrets Manager secret, then the secret named by the environment.
pub async fn resolve_github_token(config: &Config) -> Result<String> {
    if let Some(token) = config.github.token.as_deref().filter(|t| !t.is_empty()) {
        tracing::info!("Using GitHub token from configuration");
        return Ok(token.to_string());
    }
    let secret_name = match &config.github.token_secret {
        Some(name) => name.clone(),
        None => match std::env::var(TOKEN_SECRET_ENV) {
            Ok(name) if !name.is_empty() => name,
            _ => bail!(
                "No GitHub token configured: set github.token, github.token_secret or {TOKEN_SECRET_ENV}"
            ),
        },
    };
    let region = config.aws.secrets_region.as_deref().or(config.aws.region.as_deref());
    let sdk_config = load_sdk_config(region).await;
    let client = aws_sdk_secretsmanager::Client::new(&sdk_config);
    let output = client
        .get_secret_value()
        .secret_id(&secret_name)
        .send()
        .await
        .with_context(|| format!("Unable to retrieve GitHub token secret {secret_name}"))?;
    let secret = output.secret_string().context("GitHub token secret has no string value")?;
    tracing::info!("Loaded GitHub token from secret {}", secret_name);
    parse_secret_token(secret)
}

pub fn parse_secret_token(secret: &str) -> Result<String> {
    let parsed: SecretToken =
        serde_json::from_str(secret).context("Unable to parse GitHub token secret")?;
    if parsed.token.is_empty() {
        bail!("GitHub token secret contains an empty token");
    }
    Ok(parsed.token)
}
