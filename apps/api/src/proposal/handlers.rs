//! Axum route handlers for the Proposal API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::proposal::clipboard::{section_text, ProposalSection};
use crate::proposal::error::GenerationError;
use crate::proposal::session::SessionStatus;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateProposalRequest {
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/proposals
///
/// Runs one generation. 200 with the proposal, 204 if it was cancelled while
/// pending, or an error envelope (including for a malformed body).
pub async fn handle_generate_proposal(
    State(state): State<AppState>,
    payload: Result<Json<GenerateProposalRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    match state
        .proposals
        .generate_proposal(&request.job_description)
        .await
    {
        Ok(result) => Ok(Json(result).into_response()),
        Err(GenerationError::Cancelled) => Ok(StatusCode::NO_CONTENT.into_response()),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/v1/proposals/cancel
pub async fn handle_cancel(State(state): State<AppState>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.proposals.cancel(),
    })
}

/// GET /api/v1/proposals/status
pub async fn handle_status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.proposals.status())
}

/// GET /api/v1/proposals/latest/:section
///
/// Copy-ready plain text for one section of the latest successful proposal.
pub async fn handle_latest_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<Response, AppError> {
    let section: ProposalSection = section.parse().map_err(AppError::NotFound)?;
    let result = state
        .proposals
        .latest_result()
        .ok_or_else(|| AppError::NotFound("No proposal has been generated yet".to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        section_text(&result, section),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::backoff::BackoffPolicy;
    use crate::proposal::client::StubGenerationClient;
    use crate::proposal::request::ProposalRequestBuilder;
    use crate::proposal::session::ProposalService;
    use crate::routes::build_router;
    use crate::state::AppState;

    fn app(stub: StubGenerationClient, credential: Option<&str>) -> axum::Router {
        let service = ProposalService::new(
            ProposalRequestBuilder::default(),
            Arc::new(stub),
            BackoffPolicy::default(),
            credential.map(str::to_string),
        );
        build_router(AppState {
            proposals: Arc::new(service),
        })
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_camel_case_result() {
        let app = app(StubGenerationClient::default(), Some("key"));
        let response = app
            .oneshot(post_json(
                "/api/v1/proposals",
                json!({"job_description": "Need a React dashboard rebuilt."}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body = body_json(response).await;
        assert!(body["clientSummary"].is_array());
        assert!(body["proposalDraft"].is_string());
        assert!(body["suggestedSkills"].as_array().unwrap().len() >= 5);
    }

    #[tokio::test]
    async fn test_blank_input_is_bad_request() {
        let app = app(StubGenerationClient::default(), Some("key"));
        let response = app
            .oneshot(post_json("/api/v1/proposals", json!({"job_description": "  \n "})))
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        for (body, hint) in [
            (json!({}), "missing field `job_description`"),
            (json!({"job_description": 42}), "invalid type"),
        ] {
            let app = app(StubGenerationClient::default(), Some("key"));
            let response = app
                .oneshot(post_json("/api/v1/proposals", body))
                .await
                .unwrap();

            assert_eq!(response.status(), 400);
            let body = body_json(response).await;
            assert_eq!(body["error"]["code"], "INVALID_INPUT");
            assert!(body["error"]["message"].as_str().unwrap().contains(hint));
        }
    }

    #[tokio::test]
    async fn test_non_json_body_uses_error_envelope() {
        let app = app(StubGenerationClient::default(), Some("key"));
        let request = Request::post("/api/v1/proposals")
            .header("content-type", "text/plain")
            .body(Body::from("Need a React dashboard rebuilt."))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), 400);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_missing_credential_is_service_unavailable() {
        let app = app(StubGenerationClient::default(), None);
        let response = app
            .oneshot(post_json("/api/v1/proposals", json!({"job_description": "Write a Go API"})))
            .await
            .unwrap();

        assert_eq!(response.status(), 503);
        assert_eq!(body_json(response).await["error"]["code"], "MISSING_CREDENTIAL");
    }

    #[tokio::test]
    async fn test_embedded_error_is_bad_gateway_with_message() {
        let stub = StubGenerationClient::with_payload(r#"{"error": {"message": "quota exceeded"}}"#);
        let app = app(stub, Some("key"));
        let response = app
            .oneshot(post_json("/api/v1/proposals", json!({"job_description": "Write a Go API"})))
            .await
            .unwrap();

        assert_eq!(response.status(), 502);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "EMBEDDED_SERVICE_ERROR");
        assert_eq!(body["error"]["message"], "API error: quota exceeded");
    }

    #[tokio::test]
    async fn test_status_cancel_and_copy_flow() {
        let app = app(StubGenerationClient::default(), Some("key"));

        let status = app
            .clone()
            .oneshot(Request::get("/api/v1/proposals/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(status).await["state"], "idle");

        let missing = app
            .clone()
            .oneshot(
                Request::get("/api/v1/proposals/latest/proposal-draft")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);

        let generated = app
            .clone()
            .oneshot(post_json(
                "/api/v1/proposals",
                json!({"job_description": "Need a React dashboard rebuilt."}),
            ))
            .await
            .unwrap();
        assert_eq!(generated.status(), 200);

        let skills = app
            .clone()
            .oneshot(
                Request::get("/api/v1/proposals/latest/suggested-skills")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(skills.status(), 200);
        let text = to_bytes(skills.into_body(), usize::MAX).await.unwrap();
        assert!(std::str::from_utf8(&text).unwrap().starts_with("• React"));

        let cancel = app
            .clone()
            .oneshot(Request::post("/api/v1/proposals/cancel").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(cancel).await, json!({"cancelled": false}));

        let unknown = app
            .oneshot(Request::get("/api/v1/proposals/latest/budget").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(unknown.status(), 404);
    }
}
