//! End-to-end relay tests: raw message in, wiremock upstream, reply out.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reset_relay::config::RelayConfig;
use reset_relay::host::PrintHost;
use reset_relay::inbound::InboundMessage;
use reset_relay::relay::{Outcome, handle_email};
use reset_relay::upstream::{API_TOKEN_HEADER, ResetApiClient};

const RAW: &str = "From: Someone <user@example.com>\r\n\
To: reset@service.example.org\r\n\
Subject: please reset\r\n\
Message-ID: <thread-42@mail.example.com>\r\n\
\r\n\
hello\r\n";

async fn upstream(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reset-password"))
        .and(query_param("email", "user@example.com"))
        .and(header(API_TOKEN_HEADER, "integration-token"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn config_for(server: &MockServer) -> RelayConfig {
    RelayConfig::new(
        format!("{}/reset-password", server.uri()),
        "integration-token",
    )
}

#[tokio::test]
async fn accepted_reset_replies_to_sender() {
    let server = upstream(200, json!({"resetpassword": {"status": "success"}})).await;
    let config = config_for(&server);
    let authority = ResetApiClient::new(&config);
    let host = PrintHost::new(Vec::new());
    let inbound = InboundMessage::parse(RAW.as_bytes(), None, None).unwrap();

    let outcome = handle_email(&config, &authority, &host, &inbound).await;

    assert_eq!(outcome, Outcome::Replied);
    let raw_reply = String::from_utf8(host.into_inner()).unwrap();
    assert!(raw_reply.contains("To: user@example.com"));
    assert!(raw_reply.contains("reset@service.example.org"));
    assert!(raw_reply.contains("In-Reply-To: <thread-42@mail.example.com>"));
    assert!(raw_reply.contains("Subject: Re: Reset Wikipedia Password"));
}

#[tokio::test]
async fn refused_reset_rejects_without_reply() {
    let server = upstream(200, json!({"resetpassword": {"status": "failed"}})).await;
    let config = config_for(&server);
    let authority = ResetApiClient::new(&config);
    let host = PrintHost::new(Vec::new());
    let inbound = InboundMessage::parse(RAW.as_bytes(), None, None).unwrap();

    let outcome = handle_email(&config, &authority, &host, &inbound).await;

    let Outcome::Rejected { reason } = outcome else {
        panic!("expected rejection");
    };
    assert!(reason.contains("failed"));
    assert!(host.into_inner().is_empty());
}

#[tokio::test]
async fn upstream_error_status_rejects() {
    let server = upstream(503, json!({})).await;
    let config = config_for(&server);
    let authority = ResetApiClient::new(&config);
    let host = PrintHost::new(Vec::new());
    let inbound = InboundMessage::parse(RAW.as_bytes(), None, None).unwrap();

    let outcome = handle_email(&config, &authority, &host, &inbound).await;

    let Outcome::Rejected { reason } = outcome else {
        panic!("expected rejection");
    };
    assert!(reason.contains("503 Service Unavailable"));
    assert!(host.into_inner().is_empty());
}

#[tokio::test]
async fn wrong_token_forbidden_rejects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header(API_TOKEN_HEADER, "integration-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"resetpassword": {"status": "success"}})),
        )
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<h1>Forbidden</h1>"))
        .with_priority(10)
        .expect(1)
        .mount(&server)
        .await;

    let config = RelayConfig::new(format!("{}/reset-password", server.uri()), "stale-token");
    let authority = ResetApiClient::new(&config);
    let host = PrintHost::new(Vec::new());
    let inbound = InboundMessage::parse(RAW.as_bytes(), None, None).unwrap();

    let outcome = handle_email(&config, &authority, &host, &inbound).await;

    let Outcome::Rejected { reason } = outcome else {
        panic!("expected rejection");
    };
    assert!(reason.contains("403 Forbidden"));
    assert!(host.into_inner().is_empty());
}

#[tokio::test]
async fn unprocessable_email_rejects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reset-password"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;
    let config = config_for(&server);
    let authority = ResetApiClient::new(&config);
    let host = PrintHost::new(Vec::new());
    let inbound = InboundMessage::parse(RAW.as_bytes(), None, None).unwrap();

    let outcome = handle_email(&config, &authority, &host, &inbound).await;

    let Outcome::Rejected { reason } = outcome else {
        panic!("expected rejection");
    };
    assert!(reason.contains("422 Unprocessable Entity"));
    assert!(host.into_inner().is_empty());
}

#[tokio::test]
async fn null_envelope_sender_rejects_without_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let config = config_for(&server);
    let authority = ResetApiClient::new(&config);
    let host = PrintHost::new(Vec::new());
    let inbound = InboundMessage::parse(RAW.as_bytes(), Some("<>"), None).unwrap();

    let outcome = handle_email(&config, &authority, &host, &inbound).await;

    let Outcome::Rejected { reason } = outcome else {
        panic!("expected rejection");
    };
    assert!(reason.contains("Invalid sender address"));
    assert!(host.into_inner().is_empty());
}
