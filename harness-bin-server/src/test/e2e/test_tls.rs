use rama::{
    http::{StatusCode, service::client::HttpClientExt as _},
    telemetry::tracing,
};

use echo_harness_lib::tls::{Scenario, TlsPolicy};

use crate::test::e2e;

#[tokio::test]
#[tracing_test::traced_test]
async fn test_insecure_scenarios_complete_handshake() {
    let runtime = e2e::runtime::get().await;

    for scenario in [
        Scenario::InsecureAny,
        Scenario::PinnedMaxTls12,
        Scenario::PinnedMinTls13,
    ] {
        let resp = runtime
            .client_with_policy(&scenario.policy())
            .post(runtime.echo_uri("size=3&sleep=0"))
            .body("payload")
            .send()
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, resp.status(), "scenario: {scenario}");
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_verify_peer_rejects_self_signed_server() {
    let runtime = e2e::runtime::get().await;

    let result = runtime
        .client_with_policy(&TlsPolicy::VERIFY_PEER)
        .post(runtime.echo_uri("size=3&sleep=0"))
        .body("payload")
        .send()
        .await;
    assert!(result.is_err());

    // a failed handshake leaves the server untouched
    let resp = runtime
        .client()
        .post(runtime.echo_uri("size=3&sleep=0"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, resp.status());
}
