//! HTTP handler for the mediator
//!
//! `GET /mhfr-facilities` answers with a hub envelope in every case,
//! including when the facilities API cannot be reached.

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::client::{DownstreamResponse, FacilitiesClient};
use crate::contracts::*;
use crate::error::FacilitiesError;

pub const FACILITIES_ROUTE: &str = "/mhfr-facilities";

/// Name of the orchestration record for the facilities call
pub const FACILITIES_ORCHESTRATION: &str = "Get Facilities";

/// Application state
pub struct AppState {
    pub mediator_urn: String,
    pub facilities: FacilitiesClient,
}

impl AppState {
    pub fn new(mediator_urn: impl Into<String>, facilities: FacilitiesClient) -> Self {
        Self {
            mediator_urn: mediator_urn.into(),
            facilities,
        }
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(FACILITIES_ROUTE, get(get_facilities))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub mediator_urn: String,
    pub version: String,
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        mediator_urn: state.mediator_urn.clone(),
        version: crate::MEDIATOR_VERSION.to_string(),
    })
}

/// Proxy the facilities API and wrap the answer for the hub
async fn get_facilities(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request_id = Uuid::new_v4();
    let inbound = OrchestrationRequest::capture(&method, &uri, &headers);

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %uri.path(),
        "Processing facilities request"
    );

    let outcome = state.facilities.fetch().await;

    if let Err(e) = &outcome {
        tracing::error!(
            request_id = %request_id,
            url = %state.facilities.url(),
            error = %e,
            "Failed to fetch facilities"
        );
    }

    match facilities_envelope(&state.mediator_urn, inbound, outcome) {
        Ok((status, envelope)) => {
            tracing::info!(
                request_id = %request_id,
                status = ?envelope.status,
                "Facilities request completed"
            );
            (
                status,
                [(header::CONTENT_TYPE, OPENHIM_CONTENT_TYPE)],
                Json(envelope),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build envelope");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "EnvelopeError", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Build the hub envelope for one facilities call
///
/// A downstream answer of any status is relayed with HTTP 200; a transport
/// failure becomes a `Failed` envelope with HTTP 502.
pub fn facilities_envelope(
    mediator_urn: &str,
    inbound: OrchestrationRequest,
    outcome: Result<DownstreamResponse, FacilitiesError>,
) -> Result<(StatusCode, MediatorResponse), serde_json::Error> {
    match outcome {
        Ok(downstream) => {
            let record = ResponseRecord::json(downstream.status, downstream.body.to_body_string());
            let orchestration = Orchestration::new(
                FACILITIES_ORCHESTRATION,
                inbound,
                OrchestrationResponse::new(downstream.status, downstream.body.to_value()),
            );
            let envelope = MediatorResponse::new(
                mediator_urn,
                MediatorStatus::from_downstream(downstream.status),
                &record,
            )?
            .with_orchestration(orchestration);

            Ok((StatusCode::OK, envelope))
        }
        Err(e) => {
            let status = StatusCode::BAD_GATEWAY.as_u16();
            let error_body = json!({ "error": "FacilitiesUnavailable", "message": e.to_string() });

            let record = ResponseRecord::json(status, error_body.to_string());
            let orchestration = Orchestration::new(
                FACILITIES_ORCHESTRATION,
                inbound,
                OrchestrationResponse::new(status, error_body),
            );
            let envelope = MediatorResponse::new(mediator_urn, MediatorStatus::Failed, &record)?
                .with_orchestration(orchestration);

            Ok((StatusCode::BAD_GATEWAY, envelope))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Payload;
    use serde_json::Value;

    fn inbound() -> OrchestrationRequest {
        let uri: Uri = "/mhfr-facilities".parse().unwrap();
        OrchestrationRequest::capture(&Method::GET, &uri, &HeaderMap::new())
    }

    #[test]
    fn test_successful_envelope() {
        let payload = json!({ "resourceType": "Bundle", "entry": [{ "id": "F-1" }] });
        let downstream = DownstreamResponse {
            status: 200,
            body: Payload::Json(payload.clone()),
        };

        let (status, envelope) =
            facilities_envelope("urn:mediator:test", inbound(), Ok(downstream)).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope.status, MediatorStatus::Successful);
        assert_eq!(envelope.orchestrations.len(), 1);
        assert_eq!(envelope.orchestrations[0].name, FACILITIES_ORCHESTRATION);
        assert_eq!(envelope.orchestrations[0].response.body, payload);

        let record = envelope.response_record().unwrap();
        assert_eq!(record.status, 200);
        let body: Value = serde_json::from_str(&record.body).unwrap();
        assert_eq!(body, payload);
    }

    #[test]
    fn test_non_success_downstream_is_completed() {
        let downstream = DownstreamResponse {
            status: 503,
            body: Payload::Text("maintenance".to_string()),
        };

        let (status, envelope) =
            facilities_envelope("urn:mediator:test", inbound(), Ok(downstream)).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope.status, MediatorStatus::Completed);
        let record = envelope.response_record().unwrap();
        assert_eq!(record.status, 503);
        assert_eq!(record.body, "maintenance");
    }

    #[test]
    fn test_transport_failure_is_failed_envelope() {
        let outcome = Err(FacilitiesError::Network("connection refused".to_string()));

        let (status, envelope) = facilities_envelope("urn:mediator:test", inbound(), outcome).unwrap();

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(envelope.status, MediatorStatus::Failed);
        assert_eq!(envelope.orchestrations[0].response.status, 502);

        let record = envelope.response_record().unwrap();
        assert_eq!(record.status, 502);
        assert!(record.body.contains("connection refused"));
    }
}
