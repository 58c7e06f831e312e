use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use pipeline_monitor_core::AppError;
use pipeline_monitor_relay::events::CloudEvent;
use serde::Serialize;

use crate::AppState;

pub fn build_router() -> Router<AppState> {
    Router::new().route("/events", post(post_event)).route("/healthz", get(healthz))
}

#[derive(Serialize)]
struct EventResponse {
    outcome: &'static str,
    message: String,
}

/// Deliveries that were ignored or dropped still succeed so they are not
/// retried; only a failed write to GitHub is reported as an error.
async fn post_event(
    State(state): State<AppState>,
    Json(event): Json<CloudEvent>,
) -> Result<Json<EventResponse>, AppError> {
    let outcome = state.relay.handle_event(&event).await?;
    tracing::info!("Event {}: {}", event.id, outcome);
    Ok(Json(EventResponse { outcome: outcome.kind(), message: outcome.to_string() }))
}

async fn healthz() -> &'static str { "ok" }

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use pipeline_monitor_aws::BuildSystem;
    use pipeline_monitor_core::{
        config::RelayConfig,
        models::{
            ArtifactRevision, BuildDetails, BuildRef, ExistingComment, NormalizedStatus,
            PipelineExecutionRef, RepositoryRef,
        },
    };
    use pipeline_monitor_github::Collaboration;
    use pipeline_monitor_relay::Relay;
    use tower::ServiceExt;

    use super::*;

    /// Every call fails, so requests that reach a backend are visible as errors.
    struct Offline;

    #[async_trait]
    impl Collaboration for Offline {
        async fn create_commit_status(&self, _status: &NormalizedStatus) -> Result<()> {
            bail!("offline")
        }

        async fn list_pull_request_comments(
            &self,
            _repo: &RepositoryRef,
            _pull_request: u64,
        ) -> Result<Vec<ExistingComment>> {
            bail!("offline")
        }

        async fn delete_comment(&self, _repo: &RepositoryRef, _comment_id: u64) -> Result<()> {
            bail!("offline")
        }

        async fn create_comment(
            &self,
            _repo: &RepositoryRef,
            _pull_request: u64,
            _body: &str,
        ) -> Result<()> {
            bail!("offline")
        }
    }

    #[async_trait]
    impl BuildSystem for Offline {
        async fn query_pipeline_execution(
            &self,
            _execution: &PipelineExecutionRef,
        ) -> Result<Vec<ArtifactRevision>> {
            Ok(vec![ArtifactRevision {
                revision_url: Some("https://github.com/owner/repo/commit/abc123".to_string()),
                revision_id: Some("abc123".to_string()),
            }])
        }

        async fn query_build_details(&self, _build: &BuildRef) -> Result<Vec<BuildDetails>> {
            bail!("offline")
        }

        async fn fetch_log_lines(
            &self,
            _group: &str,
            _stream: &str,
            _limit: u32,
        ) -> Result<Vec<String>> {
            bail!("offline")
        }
    }

    fn router() -> Router {
        let relay = Relay::new(Arc::new(Offline), Arc::new(Offline), RelayConfig::default());
        build_router().with_state(AppState { relay: Arc::new(relay) })
    }

    fn event_request(body: serde_json::Value) -> Request<Body> {
        Request::post("/events")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let response =
            router().oneshot(Request::get("/healthz").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unhandled_event_is_acknowledged() {
        let response = router()
            .oneshot(event_request(serde_json::json!({
                "id": "1",
                "detail-type": "CodeBuild Build Phase Change",
                "source": "aws.codebuild",
                "region": "us-east-1",
                "detail": {},
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["outcome"], "ignored");
    }

    #[tokio::test]
    async fn test_dropped_event_is_acknowledged() {
        let response = router()
            .oneshot(event_request(serde_json::json!({
                "id": "2",
                "detail-type": "CodeBuild Build State Change",
                "region": "us-east-1",
                "detail": {"build-id": "lint:1", "current-phase": "COMPLETED"},
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["outcome"], "dropped");
    }

    #[tokio::test]
    async fn test_status_write_failure_is_server_error() {
        let response = router()
            .oneshot(event_request(serde_json::json!({
                "id": "3",
                "detail-type": "CodePipeline Action Execution State Change",
                "region": "us-east-1",
                "detail": {
                    "pipeline": "app",
                    "execution-id": "exec-1",
                    "stage": "Deploy",
                    "action": "deploy-prod",
                    "state": "STARTED",
                },
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let response =
            router().oneshot(event_request(serde_json::json!({"id": "4"}))).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
