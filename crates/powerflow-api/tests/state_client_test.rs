#![allow(clippy::unwrap_used)]
// Integration tests for `StateClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use powerflow_api::{Connection, Error, FailureKind, StateClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, StateClient, Connection) {
    let server = MockServer::start().await;
    let client = StateClient::with_client(reqwest::Client::new());
    let connection = Connection::new(server.uri(), SecretString::from("test-token".to_owned()));
    (server, client, connection)
}

// ── State fetch ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_state_success() {
    let (server, client, connection) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/states/sensor.solar_power"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entity_id": "sensor.solar_power",
            "state": "1234.5",
            "attributes": {
                "unit_of_measurement": "W",
                "friendly_name": "Solar Power"
            },
            "last_changed": "2024-06-15T10:30:00+00:00",
            "last_updated": "2024-06-15T10:30:05+00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = client
        .get_state(&connection, "sensor.solar_power")
        .await
        .unwrap();

    assert_eq!(state.entity_id, "sensor.solar_power");
    assert_eq!(state.state, "1234.5");
    assert_eq!(state.unit_of_measurement(), Some("W"));
    assert_eq!(state.friendly_name(), Some("Solar Power"));
    assert!(state.last_updated.is_some());
}

#[tokio::test]
async fn test_get_state_minimal_body() {
    let (server, client, connection) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/states/sensor.grid_power"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "unavailable" })))
        .mount(&server)
        .await;

    let state = client
        .get_state(&connection, "sensor.grid_power")
        .await
        .unwrap();

    assert_eq!(state.state, "unavailable");
    assert!(state.attributes.is_empty());
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized() {
    let (server, client, connection) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("401: Unauthorized"))
        .mount(&server)
        .await;

    let result = client.get_state(&connection, "sensor.solar_power").await;

    assert!(
        matches!(result, Err(Error::Unauthorized)),
        "expected Unauthorized, got: {result:?}"
    );
}

#[tokio::test]
async fn test_not_found() {
    let (server, client, connection) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/states/sensor.missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Entity not found." })),
        )
        .mount(&server)
        .await;

    let result = client.get_state(&connection, "sensor.missing").await;

    match result {
        Err(Error::NotFound { ref entity_id }) => assert_eq!(entity_id, "sensor.missing"),
        other => panic!("expected NotFound, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body() {
    let (server, client, connection) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy login</html>"))
        .mount(&server)
        .await;

    let err = client
        .get_state(&connection, "sensor.solar_power")
        .await
        .unwrap_err();

    assert_eq!(err.failure_kind(), FailureKind::MalformedResponse);
    match err {
        Error::MalformedResponse { body, .. } => assert!(body.contains("proxy login")),
        other => panic!("expected MalformedResponse, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transport() {
    let (server, client, connection) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("starting"))
        .mount(&server)
        .await;

    let err = client
        .get_state(&connection, "sensor.solar_power")
        .await
        .unwrap_err();

    assert_eq!(err.failure_kind(), FailureKind::Transport);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_connection_refused_is_transport() {
    let client = StateClient::with_client(reqwest::Client::new());
    let connection = Connection::new("http://127.0.0.1:1", SecretString::from("t".to_owned()));

    let err = client
        .get_state(&connection, "sensor.solar_power")
        .await
        .unwrap_err();

    assert_eq!(err.failure_kind(), FailureKind::Transport);
}

// ── Configuration short-circuit ─────────────────────────────────────

#[tokio::test]
async fn test_missing_token_fails_without_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "1" })))
        .expect(0)
        .mount(&server)
        .await;

    let client = StateClient::with_client(reqwest::Client::new());
    let connection = Connection {
        base_url: Some(server.uri()),
        token: None,
    };

    let err = client
        .get_state(&connection, "sensor.solar_power")
        .await
        .unwrap_err();

    assert!(err.is_configuration(), "expected configuration error, got: {err:?}");
}

#[tokio::test]
async fn test_empty_identifier_rejected() {
    let (_server, client, connection) = setup().await;

    let err = client.get_state(&connection, "  ").await.unwrap_err();

    assert!(matches!(err, Error::InvalidEntityId { .. }));
    assert!(!err.is_configuration());
}

// ── Ping ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ping() {
    let (server, client, connection) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "API running." })),
        )
        .mount(&server)
        .await;

    let message = client.ping(&connection).await.unwrap();

    assert_eq!(message, "API running.");
}

#[tokio::test]
async fn test_ping_unauthorized() {
    let (server, client, connection) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = client.ping(&connection).await;

    assert!(matches!(result, Err(Error::Unauthorized)));
}
