use crate::models::StatusState;

/// GitHub rejects commit status descriptions longer than this.
pub const MAX_DESCRIPTION_LEN: usize = 140;

/// Convert a CodePipeline action execution state to a commit status state.
///
/// Unknown states map to [`StatusState::Error`] so they still show up.
pub fn translate(provider_state: &str) -> StatusState {
    match provider_state {
        "STARTED" => StatusState::Pending,
        "SUCCEEDED" => StatusState::Success,
        "FAILED" => StatusState::Failure,
        _ => StatusState::Error,
    }
}

/// Human-facing status label: `deploy-prod` becomes `deploy for prod`.
pub fn status_label(action: &str) -> String {
    match action.split_once('-') {
        Some((prefix, suffix)) => format!("{prefix} for {suffix}"),
        None => action.to_string(),
    }
}

pub fn status_description(stage: &str, region: &str) -> String {
    let description = format!("{stage} stage executing in {region}");
    match description.char_indices().nth(MAX_DESCRIPTION_LEN) {
        Some((idx, _)) => description[..idx].to_string(),
        None => description,
    }
}

/// CodePipeline console page for an execution, used as the status target URL.
pub fn pipeline_console_url(region: &str, pipeline: &str, execution_id: &str) -> String {
    format!(
        "https://{region}.console.aws.amazon.com/codesuite/codepipeline/pipelines/{pipeline}/executions/{execution_id}/timeline"
    )
}
