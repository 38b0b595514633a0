use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, LazyLock, OnceLock},
    time::Duration,
};

use clap::Parser;
use rama::{
    Layer as _, Service,
    error::BoxError,
    http::{Request, Response},
    layer::TimeoutLayer,
    net::address::SocketAddress,
};

use echo_harness_lib::{
    client::new_web_client,
    tls::{TlsPolicy, self_signed_pem_pair},
    utils::io::tmp_dir,
};

use crate::Args;

#[derive(Clone)]
pub(super) struct Runtime {
    _app: App,

    echo_addr: SocketAddress,
}

impl Runtime {
    #[inline(always)]
    pub fn echo_socket_addr(&self) -> SocketAddress {
        self.echo_addr
    }

    pub fn echo_uri(&self, query: &str) -> String {
        format!("https://{}/?{query}", self.echo_socket_addr())
    }

    pub fn client_with_policy(
        &self,
        policy: &TlsPolicy,
    ) -> impl Service<Request, Output = Response, Error = BoxError> {
        TimeoutLayer::new(Duration::from_secs(60))
            .into_layer(new_web_client(policy, None).unwrap())
    }

    #[inline(always)]
    pub fn client(&self) -> impl Service<Request, Output = Response, Error = BoxError> {
        self.client_with_policy(&TlsPolicy::INSECURE_ANY)
    }
}

#[derive(Clone)]
struct App {
    data_dir: PathBuf,
}

impl App {
    fn new() -> Self {
        let data_dir = spawn_echo_server_app(&[]);
        Self { data_dir }
    }
}

pub(super) async fn get() -> Runtime {
    static APP: LazyLock<App> = LazyLock::new(App::new);

    let app = APP.clone();
    runtime_for_app(app).await
}

pub(super) async fn spawn_with_args(extra_args: &[&str]) -> Runtime {
    let app = App {
        data_dir: spawn_echo_server_app(extra_args),
    };
    runtime_for_app(app).await
}

async fn runtime_for_app(app: App) -> Runtime {
    let echo_addr = tokio::time::timeout(
        Duration::from_secs(60),
        read_file_or_wait(app.data_dir.join("echo.addr.txt")),
    )
    .await
    .unwrap();

    assert!(echo_addr.ip_addr.is_loopback());

    Runtime {
        _app: app,
        echo_addr,
    }
}

async fn read_file_or_wait(path: PathBuf) -> SocketAddress {
    loop {
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => {
                let s = s.trim();
                if s.is_empty() {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
                match s.parse() {
                    Ok(addr) => return addr,
                    Err(err) => {
                        eprintln!("unexpected error parsing socket addr (content={s:?}): {err}");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                }
            }
            Err(err) => {
                if err.kind() == ErrorKind::NotFound {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                } else {
                    panic!("unexpected error: {err}");
                }
            }
        }
    }
}

/// Write a fresh self-signed identity into a new tmp dir,
/// returning the dir and the paths of the crt and key PEM files.
pub(super) fn new_identity_dir(prefix: &str) -> (PathBuf, PathBuf, PathBuf) {
    let dir = tmp_dir::try_new(prefix).unwrap();
    let (crt_pem, key_pem) = self_signed_pem_pair().unwrap();

    let crt_path = dir.join("cert.pem");
    let key_path = dir.join("key.pem");
    std::fs::write(&crt_path, crt_pem).unwrap();
    std::fs::write(&key_path, key_pem).unwrap();

    (dir, crt_path, key_path)
}

fn spawn_echo_server_app(extra_args: &[&str]) -> PathBuf {
    let (data_dir, crt_path, key_path) = new_identity_dir("echo_harness_server_e2e");
    eprintln!("echo_harness_server_e2e all data stored under: {data_dir:?}");

    let data_dir_str = data_dir.display().to_string().leak();
    let crt_path_str = crt_path.display().to_string().leak();
    let key_path_str = key_path.display().to_string().leak();

    let mut argv: Vec<&str> = vec![
        "echo-harness-server",
        "--bind",
        "127.0.0.1:0",
        "--cert",
        crt_path_str,
        "--key",
        key_path_str,
        "--data",
        data_dir_str,
        "--max-sleep",
        "5",
        "--graceful",
        "0.42",
    ];
    argv.extend(extra_args);

    let args = Args::try_parse_from(argv).unwrap();

    let wait_server_ready = Arc::new(OnceLock::new());
    let notify_server_ready = wait_server_ready.clone();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        let server_future = crate::run_with_args(std::future::pending::<()>(), args);

        notify_server_ready.set(()).expect("waiter to be nofified");

        rt.block_on(server_future).expect("serve without errors");
    });

    wait_server_ready.wait();

    data_dir
}
