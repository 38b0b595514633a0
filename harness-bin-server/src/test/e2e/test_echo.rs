use std::time::{Duration, Instant};

use rama::{
    http::{
        BodyExtractExt as _, StatusCode,
        header::{CONNECTION, CONTENT_LENGTH, SERVER},
        service::client::HttpClientExt as _,
    },
    telemetry::tracing,
};

use crate::test::e2e;

#[tokio::test]
#[tracing_test::traced_test]
async fn test_echo_body_size_matches_content_length() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();

    for size in [1usize, 16, 100, 4096] {
        let resp = client
            .post(runtime.echo_uri(&format!("size={size}&sleep=0")))
            .body("hello")
            .send()
            .await
            .unwrap();

        assert_eq!(StatusCode::OK, resp.status());
        assert_eq!(
            size.to_string(),
            resp.headers()[CONTENT_LENGTH].to_str().unwrap()
        );
        assert_eq!("close", resp.headers()[CONNECTION]);
        assert!(resp.headers().contains_key(SERVER));

        let payload = resp.try_into_string().await.unwrap();
        assert_eq!(size, payload.len());
        assert!(payload.bytes().all(|b| b.is_ascii_alphabetic()), "{payload}");
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_echo_size_zero_empty_body() {
    let runtime = e2e::runtime::get().await;

    let resp = runtime
        .client()
        .post(runtime.echo_uri("size=0&sleep=0"))
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, resp.status());
    assert_eq!("0", resp.headers()[CONTENT_LENGTH]);
    assert!(resp.try_into_string().await.unwrap().is_empty());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_echo_malformed_size_rejected_and_server_survives() {
    let runtime = e2e::runtime::get().await;
    let client = runtime.client();
    let payload = "p".repeat(10_000);

    for query in ["size=abc", "size=-5", "sleep=soon", "sleep=600"] {
        let resp = client
            .post(runtime.echo_uri(query))
            .body(payload.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(StatusCode::BAD_REQUEST, resp.status(), "query: {query}");
    }

    let resp = client
        .post(runtime.echo_uri("size=8&sleep=0"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, resp.status());
    assert_eq!(8, resp.try_into_string().await.unwrap().len());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_echo_only_post_implemented() {
    let runtime = e2e::runtime::get().await;

    let resp = runtime
        .client()
        .get(runtime.echo_uri("size=8"))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NOT_IMPLEMENTED, resp.status());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_echo_sleep_delays_response() {
    let runtime = e2e::runtime::get().await;

    let start = Instant::now();
    let resp = runtime
        .client()
        .post(runtime.echo_uri("size=4&sleep=2"))
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, resp.status());
    assert!(start.elapsed() >= Duration::from_secs(2), "{:?}", start.elapsed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[tracing_test::traced_test]
async fn test_echo_slow_request_does_not_block_fast_request() {
    let runtime = e2e::runtime::get().await;

    let start = Instant::now();

    let slow = tokio::spawn({
        let runtime = runtime.clone();
        async move {
            let resp = runtime
                .client()
                .post(runtime.echo_uri("size=2&sleep=4"))
                .body("slow")
                .send()
                .await
                .unwrap();
            assert_eq!(StatusCode::OK, resp.status());
            start.elapsed()
        }
    });

    let fast = tokio::spawn({
        let runtime = runtime.clone();
        async move {
            let resp = runtime
                .client()
                .post(runtime.echo_uri("size=2&sleep=0"))
                .body("fast")
                .send()
                .await
                .unwrap();
            assert_eq!(StatusCode::OK, resp.status());
            start.elapsed()
        }
    });

    let (slow, fast) = (slow.await.unwrap(), fast.await.unwrap());
    assert!(fast < slow, "fast={fast:?} slow={slow:?}");
    assert!(fast < Duration::from_secs(4), "fast={fast:?}");
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_echo_custom_max_size() {
    let runtime = e2e::runtime::spawn_with_args(&["--max-size", "10"]).await;
    let client = runtime.client();

    let resp = client
        .post(runtime.echo_uri("size=10"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, resp.status());

    let resp = client
        .post(runtime.echo_uri("size=11"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_REQUEST, resp.status());
}
