//! End-to-end tests for keepalive handling against mocked PuppetDB and
//! Sensu backends.

use sensu_puppet_core::events::NODE_NAME_LABEL;
use sensu_puppet_core::{ConfigError, Event, EventError, HandlerConfig};
use sensu_puppet_handler::error::Backend;
use sensu_puppet_handler::puppetdb::PuppetDbClient;
use sensu_puppet_handler::sensu::DeletionOutcome;
use sensu_puppet_handler::{handle_event, reconcile, HandlerError, HandlerOutcome};

use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NODES_PATH: &str = "/pdb/query/v4/nodes";
const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

struct Backends {
    puppetdb: MockServer,
    sensu: MockServer,
}

impl Backends {
    async fn start() -> Self {
        Self {
            puppetdb: MockServer::start().await,
            sensu: MockServer::start().await,
        }
    }

    fn config(&self) -> HandlerConfig {
        HandlerConfig {
            endpoint: format!("{}{NODES_PATH}", self.puppetdb.uri()),
            cert: "/nonexistent/cert.pem".to_string(),
            key: "/nonexistent/key.pem".to_string(),
            ca_cert: "/nonexistent/ca.pem".to_string(),
            sensu_api_url: self.sensu.uri(),
            sensu_api_key: "secret".to_string(),
            ..Default::default()
        }
    }

    fn puppetdb_client(&self) -> PuppetDbClient {
        PuppetDbClient::new(
            format!("{}{NODES_PATH}", self.puppetdb.uri()),
            reqwest::Client::new(),
        )
    }

    async fn node_responds(&self, node: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("{NODES_PATH}/{node}")))
            .respond_with(response)
            .expect(1)
            .mount(&self.puppetdb)
            .await;
    }

    async fn expect_deletes(&self, entity: &str, status: u16, times: u64) {
        Mock::given(method("DELETE"))
            .and(path(format!(
                "/api/core/v2/namespaces/default/entities/{entity}"
            )))
            .respond_with(ResponseTemplate::new(status))
            .expect(times)
            .mount(&self.sensu)
            .await;
    }

    async fn expect_no_traffic(&self) {
        for server in [&self.puppetdb, &self.sensu] {
            Mock::given(any())
                .respond_with(ResponseTemplate::new(500))
                .expect(0)
                .mount(server)
                .await;
        }
    }
}

#[tokio::test]
async fn test_non_keepalive_event_is_skipped() {
    let backends = Backends::start().await;
    backends.expect_no_traffic().await;

    let event = Event::fixture("foo", "check-cpu");
    let outcome = handle_event(backends.config(), &event).await.unwrap();
    assert_eq!(outcome, HandlerOutcome::Skipped);
}

#[tokio::test]
async fn test_invalid_event_fails_before_io() {
    let backends = Backends::start().await;
    backends.expect_no_traffic().await;

    let mut event = Event::fixture("foo", "keepalive");
    event.check = None;
    let err = handle_event(backends.config(), &event).await.unwrap_err();
    assert!(matches!(err, HandlerError::Event(EventError::MissingCheck)));

    let mut event = Event::fixture("foo", "keepalive");
    event.entity = None;
    let err = handle_event(backends.config(), &event).await.unwrap_err();
    assert!(matches!(err, HandlerError::Event(EventError::MissingEntity)));
}

#[tokio::test]
async fn test_invalid_config_fails_before_io() {
    let backends = Backends::start().await;
    backends.expect_no_traffic().await;

    let mut config = backends.config();
    config.sensu_api_key.clear();
    let err = handle_event(config, &Event::fixture("foo", "keepalive"))
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::Config(ConfigError::MissingApiKey)));
}

#[tokio::test]
async fn test_unreadable_client_certificate_is_fatal() {
    let backends = Backends::start().await;
    backends.expect_no_traffic().await;

    let err = handle_event(backends.config(), &Event::fixture("foo", "keepalive"))
        .await
        .unwrap_err();
    assert!(matches!(err, HandlerError::Tls(_)));
}

#[tokio::test]
async fn test_existing_node_is_left_alone() {
    let backends = Backends::start().await;
    backends
        .node_responds(
            "foo",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"certname": "foo"})),
        )
        .await;
    backends.expect_deletes("foo", 204, 0).await;

    let event = Event::fixture("foo", "keepalive");
    let outcome = reconcile(&backends.config(), &backends.puppetdb_client(), &event)
        .await
        .unwrap();
    assert_eq!(outcome, HandlerOutcome::NodeExists);
}

#[tokio::test]
async fn test_deactivated_node_deregisters_entity() {
    let backends = Backends::start().await;
    backends
        .node_responds(
            "foo",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "certname": "foo",
                "deactivated": "2024-03-01T12:00:00.000Z"
            })),
        )
        .await;
    backends.expect_deletes("foo", 204, 1).await;

    let event = Event::fixture("foo", "keepalive");
    let outcome = reconcile(&backends.config(), &backends.puppetdb_client(), &event)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        HandlerOutcome::Deregistered(DeletionOutcome::Deleted)
    );
}

#[tokio::test]
async fn test_missing_node_with_entity_already_gone() {
    let backends = Backends::start().await;
    backends
        .node_responds("foo", ResponseTemplate::new(404))
        .await;
    backends.expect_deletes("foo", 404, 1).await;

    let event = Event::fixture("foo", "keepalive");
    let outcome = reconcile(&backends.config(), &backends.puppetdb_client(), &event)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        HandlerOutcome::Deregistered(DeletionOutcome::AlreadyAbsent)
    );
}

#[tokio::test]
async fn test_puppetdb_failure_never_deletes() {
    let backends = Backends::start().await;
    backends
        .node_responds("foo", ResponseTemplate::new(503))
        .await;
    backends.expect_deletes("foo", 204, 0).await;

    let event = Event::fixture("foo", "keepalive");
    let err = reconcile(&backends.config(), &backends.puppetdb_client(), &event)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HandlerError::UnexpectedStatus {
            backend: Backend::PuppetDb,
            ..
        }
    ));
}

#[tokio::test]
async fn test_sensu_server_error_is_returned() {
    let backends = Backends::start().await;
    backends
        .node_responds("foo", ResponseTemplate::new(404))
        .await;
    backends.expect_deletes("foo", 502, 1).await;

    let event = Event::fixture("foo", "keepalive");
    let err = reconcile(&backends.config(), &backends.puppetdb_client(), &event)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HandlerError::UnexpectedStatus {
            backend: Backend::Sensu,
            ..
        }
    ));
}

#[tokio::test]
async fn test_node_name_label_used_for_lookup_only() {
    let backends = Backends::start().await;
    backends
        .node_responds("foo.example.com", ResponseTemplate::new(404))
        .await;
    backends.expect_deletes("foo", 204, 1).await;

    let mut config = backends.config();
    config.node_name = Some("ignored.example.com".to_string());

    let mut event = Event::fixture("foo", "keepalive");
    event.entity.as_mut().unwrap().metadata.labels.insert(
        NODE_NAME_LABEL.to_string(),
        "foo.example.com".to_string(),
    );

    let outcome = reconcile(&config, &backends.puppetdb_client(), &event)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        HandlerOutcome::Deregistered(DeletionOutcome::Deleted)
    );
}

async fn deregister_with_key(key_file: &str) {
    let backends = Backends::start().await;
    backends
        .node_responds("foo", ResponseTemplate::new(404))
        .await;
    backends.expect_deletes("foo", 204, 1).await;

    let mut config = backends.config();
    config.cert = format!("{FIXTURES}/client.pem");
    config.key = format!("{FIXTURES}/{key_file}");
    config.ca_cert = format!("{FIXTURES}/ca.pem");
    config.sensu_ca_cert = Some(format!("{FIXTURES}/ca.pem"));

    let outcome = handle_event(config, &Event::fixture("foo", "keepalive"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        HandlerOutcome::Deregistered(DeletionOutcome::Deleted)
    );
}

#[tokio::test]
async fn test_keepalive_deregisters_with_pkcs8_key() {
    deregister_with_key("client-key-pkcs8.pem").await;
}

#[tokio::test]
async fn test_keepalive_deregisters_with_rsa_key() {
    deregister_with_key("client-key-rsa.pem").await;
}

#[tokio::test]
async fn test_keepalive_with_existing_node_keeps_entity() {
    let backends = Backends::start().await;
    backends
        .node_responds(
            "foo",
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"deactivated": null})),
        )
        .await;
    backends.expect_deletes("foo", 204, 0).await;

    let mut config = backends.config();
    config.cert = format!("{FIXTURES}/client.pem");
    config.key = format!("{FIXTURES}/client-key-pkcs8.pem");
    config.ca_cert = format!("{FIXTURES}/ca.pem");

    let outcome = handle_event(config, &Event::fixture("foo", "keepalive"))
        .await
        .unwrap();
    assert_eq!(outcome, HandlerOutcome::NodeExists);
}
