use clap::Parser;
use rama::telemetry::tracing;

use crate::{Args, test::e2e::runtime::new_identity_dir};

#[tokio::test]
#[tracing_test::traced_test]
async fn test_missing_identity_is_fatal() {
    let (dir, _, _) = new_identity_dir("echo_harness_server_missing_identity");
    let missing = dir.join("missing.pem").display().to_string();

    let args = Args::try_parse_from([
        "echo-harness-server",
        "--bind",
        "127.0.0.1:0",
        "--cert",
        &missing,
        "--key",
        &missing,
    ])
    .unwrap();

    let err = crate::run_with_args(std::future::pending::<()>(), args)
        .await
        .unwrap_err();
    let msg = format!("{err} {err:?}");
    assert!(msg.contains("missing.pem"), "{msg}");
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_invalid_key_is_fatal() {
    let (_, crt_path, key_path) = new_identity_dir("echo_harness_server_invalid_key");
    std::fs::write(&key_path, "not a key").unwrap();

    let args = Args::try_parse_from([
        "echo-harness-server",
        "--bind",
        "127.0.0.1:0",
        "--cert",
        &crt_path.display().to_string(),
        "--key",
        &key_path.display().to_string(),
    ])
    .unwrap();

    assert!(
        crate::run_with_args(std::future::pending::<()>(), args)
            .await
            .is_err()
    );
}

#[test]
fn test_default_args() {
    let args = Args::try_parse_from(["echo-harness-server"]).unwrap();
    assert_eq!("cert.pem", args.cert.display().to_string());
    assert_eq!("key.pem", args.key.display().to_string());
    assert_eq!(1024 * 1024, args.max_size);
    assert_eq!(60, args.max_sleep);
    assert!(args.data.is_none());
}
