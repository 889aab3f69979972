//! Integration tests for the MHFR facilities mediator

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use mhfr_mediator::config::FacilitiesConfig;
use mhfr_mediator::{
    create_router, AppState, BoundMediator, Environment, FacilitiesClient, MediatorError,
    MediatorResponse, MediatorStatus, Settings, OPENHIM_CONTENT_TYPE,
};
use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const URN: &str = "urn:mediator:mhfr-facilities";
const FACILITIES_PATH: &str = "/api/Facilities/fhir/location/_history";

fn facilities_bundle() -> Value {
    json!({
        "resourceType": "Bundle",
        "type": "history",
        "total": 2,
        "entry": [
            { "resource": { "resourceType": "Location", "id": "MFL-13023", "name": "Kenyatta National Hospital" } },
            { "resource": { "resourceType": "Location", "id": "MFL-17755", "name": "Mbagathi District Hospital" } }
        ]
    })
}

async fn mhfr_returning(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FACILITIES_PATH))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

fn router_for(facilities_url: String) -> axum::Router {
    let config = FacilitiesConfig {
        url: facilities_url,
        timeout_ms: 2_000,
    };
    let facilities = FacilitiesClient::new(&config).unwrap();
    create_router(Arc::new(AppState::new(URN, facilities)))
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, Option<String>, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, serde_json::from_slice(&bytes).unwrap())
}

/// An address nothing listens on
async fn unused_addr() -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn mediator_descriptor(port: u16) -> String {
    json!({
        "urn": URN,
        "version": "0.1.0",
        "name": "MHFR Facilities Mediator",
        "defaultChannelConfig": [],
        "endpoints": [{
            "name": "MHFR Facilities Route",
            "host": "localhost",
            "path": "/mhfr-facilities",
            "port": port.to_string(),
            "primary": true,
            "type": "http"
        }],
        "configDefs": [],
        "config": { "source": "descriptor" }
    })
    .to_string()
}

fn config_dir(config: Value, port: u16) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.json"), config.to_string()).unwrap();
    fs::write(dir.path().join("mediator.json"), mediator_descriptor(port)).unwrap();
    dir
}

#[tokio::test]
async fn test_envelope_contains_downstream_payload() {
    let mhfr = mhfr_returning(ResponseTemplate::new(200).set_body_json(facilities_bundle())).await;
    let router = router_for(format!("{}{}", mhfr.uri(), FACILITIES_PATH));

    let (status, content_type, body) = get(router, "/mhfr-facilities?county=Nairobi").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(OPENHIM_CONTENT_TYPE));

    let envelope: MediatorResponse = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(body["x-mediator-urn"], URN);
    assert_eq!(envelope.status, MediatorStatus::Successful);
    assert!(envelope.properties.is_empty());

    let record = envelope.response_record().unwrap();
    assert_eq!(record.status, 200);
    let relayed: Value = serde_json::from_str(&record.body).unwrap();
    assert_eq!(relayed, facilities_bundle());

    let orchestration = &envelope.orchestrations[0];
    assert_eq!(orchestration.name, "Get Facilities");
    assert_eq!(orchestration.request.path, "/mhfr-facilities");
    assert_eq!(orchestration.request.querystring, "county=Nairobi");
    assert_eq!(orchestration.request.method, "GET");
    assert_eq!(orchestration.response.status, 200);
    assert_eq!(orchestration.response.body, facilities_bundle());
}

#[tokio::test]
async fn test_relayed_body_keeps_downstream_key_order() {
    let mhfr = mhfr_returning(ResponseTemplate::new(200).set_body_string(
        r#"{"resourceType":"Bundle","type":"history","total":1,"entry":[]}"#,
    ))
    .await;
    let router = router_for(format!("{}{}", mhfr.uri(), FACILITIES_PATH));

    let (_, _, body) = get(router, "/mhfr-facilities").await;

    let envelope: MediatorResponse = serde_json::from_value(body).unwrap();
    let record = envelope.response_record().unwrap();
    assert_eq!(
        record.body,
        "{\n    \"resourceType\": \"Bundle\",\n    \"type\": \"history\",\n    \"total\": 1,\n    \"entry\": []\n}"
    );
}

#[tokio::test]
async fn test_downstream_error_status_is_relayed() {
    let mhfr = mhfr_returning(ResponseTemplate::new(500).set_body_string("registry offline")).await;
    let router = router_for(format!("{}{}", mhfr.uri(), FACILITIES_PATH));

    let (status, _, body) = get(router, "/mhfr-facilities").await;

    assert_eq!(status, StatusCode::OK);
    let envelope: MediatorResponse = serde_json::from_value(body).unwrap();
    assert_eq!(envelope.status, MediatorStatus::Completed);

    let record = envelope.response_record().unwrap();
    assert_eq!(record.status, 500);
    assert_eq!(record.body, "registry offline");
}

#[tokio::test]
async fn test_unreachable_downstream_answers_failed_envelope() {
    let addr = unused_addr().await;
    let router = router_for(format!("http://{}{}", addr, FACILITIES_PATH));

    let (status, content_type, body) = get(router.clone(), "/mhfr-facilities").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(content_type.as_deref(), Some(OPENHIM_CONTENT_TYPE));
    let envelope: MediatorResponse = serde_json::from_value(body).unwrap();
    assert_eq!(envelope.status, MediatorStatus::Failed);
    assert_eq!(envelope.orchestrations[0].response.status, 502);

    // The router keeps serving after a failure
    let (status, _, _) = get(router, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoint() {
    let router = router_for("http://127.0.0.1:9/unused".to_string());

    let (status, _, body) = get(router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["mediator_urn"], URN);
}

#[tokio::test]
async fn test_server_listens_on_configured_port() {
    let mhfr = mhfr_returning(ResponseTemplate::new(200).set_body_json(facilities_bundle())).await;
    let port = unused_addr().await.port();
    let dir = config_dir(
        json!({
            "register": false,
            "facilities": { "url": format!("{}{}", mhfr.uri(), FACILITIES_PATH) }
        }),
        port,
    );

    let settings = Settings::load(dir.path(), Environment::Default)
        .unwrap()
        .with_host("127.0.0.1");
    assert_eq!(settings.port, port);

    let mediator = BoundMediator::bind(settings).await.unwrap();
    assert_eq!(mediator.local_addr().unwrap().port(), port);
    assert_eq!(mediator.config().snapshot(), json!({ "source": "descriptor" }));

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(mediator.serve(async move {
        let _ = stopped.await;
    }));

    let response = reqwest::get(format!("http://127.0.0.1:{}/mhfr-facilities", port))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        OPENHIM_CONTENT_TYPE
    );
    let envelope: MediatorResponse = response.json().await.unwrap();
    assert_eq!(envelope.status, MediatorStatus::Successful);

    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

async fn hub_accepting_auth() -> MockServer {
    let hub = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/authenticate/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "salt": "s", "ts": "t" })))
        .mount(&hub)
        .await;
    hub
}

fn hub_config(hub: &MockServer) -> Value {
    json!({
        "api": {
            "username": "root",
            "password": "openhim-password",
            "apiURL": hub.uri(),
            "trustSelfSigned": false
        },
        "register": true,
        "heartbeat": true,
        "heartbeatIntervalMs": 20
    })
}

#[tokio::test]
async fn test_registration_fetches_config_and_heartbeat_updates_it() {
    let hub = hub_accepting_auth().await;
    Mock::given(method("POST"))
        .and(path("/mediators"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&hub)
        .await;
    // Initial fetch, then heartbeats carrying a new config
    Mock::given(method("POST"))
        .and(path(format!("/mediators/{}/heartbeat", URN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "revision": 1 })))
        .up_to_n_times(1)
        .mount(&hub)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/mediators/{}/heartbeat", URN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "revision": 2 })))
        .mount(&hub)
        .await;

    let dir = config_dir(hub_config(&hub), 0);
    let settings = Settings::load(dir.path(), Environment::Default)
        .unwrap()
        .with_host("127.0.0.1");

    let mediator = BoundMediator::bind(settings).await.unwrap();
    let config = mediator.config();
    assert_eq!(config.snapshot(), json!({ "revision": 1 }));

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(mediator.serve(async move {
        let _ = stopped.await;
    }));

    let updated = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if config.snapshot() == json!({ "revision": 2 }) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(updated.is_ok(), "heartbeat config update was not stored");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_registration_failure_aborts_startup() {
    let hub = hub_accepting_auth().await;
    Mock::given(method("POST"))
        .and(path("/mediators"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid mediator"))
        .mount(&hub)
        .await;

    let dir = config_dir(hub_config(&hub), 0);
    let settings = Settings::load(dir.path(), Environment::Default)
        .unwrap()
        .with_host("127.0.0.1");

    let err = BoundMediator::bind(settings).await.err().unwrap();
    assert!(matches!(err, MediatorError::Hub(_)));
    assert!(err.to_string().contains("invalid mediator"));
}

#[tokio::test]
async fn test_initial_config_fetch_failure_aborts_startup() {
    let hub = hub_accepting_auth().await;
    Mock::given(method("POST"))
        .and(path("/mediators"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&hub)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/mediators/{}/heartbeat", URN)))
        .respond_with(ResponseTemplate::new(404).set_body_string("mediator not found"))
        .mount(&hub)
        .await;

    let dir = config_dir(hub_config(&hub), 0);
    let settings = Settings::load(dir.path(), Environment::Default)
        .unwrap()
        .with_host("127.0.0.1");

    let err = BoundMediator::bind(settings).await.err().unwrap();
    assert!(matches!(err, MediatorError::Hub(_)));
}
