use pipeline_monitor_core::RelayError;
use serde::{Deserialize, Serialize};

pub const PIPELINE_ACTION_DETAIL_TYPE: &str = "CodePipeline Action Execution State Change";
pub const BUILD_STATE_DETAIL_TYPE: &str = "CodeBuild Build State Change";
pub const BUILD_COMPLETED_PHASE: &str = "COMPLETED";

/// An EventBridge event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "detail-type")]
    pub detail_type: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

/// Detail of a CodePipeline action execution state change.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineActionDetail {
    pub pipeline: String,
    pub execution_id: String,
    pub stage: String,
    pub action: String,
    pub state: String,
    #[serde(default)]
    pub region: Option<String>,
}

/// Detail of a CodeBuild build state change. Only used as a handle; the
/// source and log fields are re-queried from CodeBuild.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildStateDetail {
    pub build_id: String,
    pub current_phase: String,
    #[serde(default)]
    pub project_name: Option<String>,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    PipelineAction(PipelineActionDetail),
    BuildState(BuildStateDetail),
    Other,
}

impl CloudEvent {
    pub fn classify(&self) -> Result<EventKind, RelayError> {
        match self.detail_type.as_str() {
            PIPELINE_ACTION_DETAIL_TYPE => self.decode_detail().map(EventKind::PipelineAction),
            BUILD_STATE_DETAIL_TYPE => self.decode_detail().map(EventKind::BuildState),
            _ => Ok(EventKind::Other),
        }
    }

    fn decode_detail<T>(&self) -> Result<T, RelayError>
    where T: serde::de::DeserializeOwned {
        T::deserialize(&self.detail).map_err(|source| RelayError::InvalidEvent {
            detail_type: self.detail_type.clone(),
            source,
        })
    }
}
