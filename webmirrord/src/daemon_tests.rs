use super::*;
use crate::sync::fingerprints::{FingerprintStore, content_hash};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX: &str = "<!DOCTYPE html><html><body>Hi</body></html>";

fn config_for(server: &MockServer, root: &Path, interval: Duration) -> MirrorConfig {
    MirrorConfig {
        remote_url: format!("{}/site", server.uri()),
        local_root: root.to_path_buf(),
        check_interval: interval,
        files: Vec::new(),
    }
}

fn index_ok(times: Option<u64>) -> Mock {
    let mock = Mock::given(method("GET"))
        .and(path("/site"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INDEX));
    match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    }
}

#[test]
fn bootstrap_rejects_invalid_remote_url() {
    let dir = tempdir().unwrap();
    let config = MirrorConfig {
        remote_url: "no scheme here".into(),
        local_root: dir.path().join("mirror"),
        check_interval: Duration::from_secs(60),
        files: Vec::new(),
    };
    assert!(MirrorRuntime::bootstrap(config).is_err());
}

#[tokio::test]
async fn first_check_mirrors_index_then_stops_on_shutdown() {
    let server = MockServer::start().await;
    index_ok(None).mount(&server).await;
    let dir = tempdir().unwrap();
    let root = dir.path().join("mirror");
    let mut runtime =
        MirrorRuntime::bootstrap(config_for(&server, &root, Duration::from_secs(3600))).unwrap();
    assert_eq!(runtime.state(), PollState::Idle);

    runtime
        .run_until(tokio::time::sleep(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(runtime.state(), PollState::Stopped);
    assert_eq!(std::fs::read_to_string(root.join("index.html")).unwrap(), INDEX);
    assert_eq!(runtime.engine().store().len(), 1);
}

#[tokio::test]
async fn failed_probe_aborts_startup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/site"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let dir = tempdir().unwrap();
    let root = dir.path().join("mirror");
    let mut runtime =
        MirrorRuntime::bootstrap(config_for(&server, &root, Duration::from_millis(10))).unwrap();

    let err = runtime
        .run_until(std::future::pending::<()>())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("initial connectivity check failed"));
    assert!(!root.join("index.html").exists());
}

#[tokio::test]
async fn failed_cycle_does_not_stop_monitoring() {
    let server = MockServer::start().await;
    // probe succeeds, first check hits a server error, later checks succeed
    index_ok(Some(1)).mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/site"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    index_ok(None).mount(&server).await;
    let dir = tempdir().unwrap();
    let root = dir.path().join("mirror");
    let mut runtime =
        MirrorRuntime::bootstrap(config_for(&server, &root, Duration::from_millis(20))).unwrap();

    runtime
        .run_until(tokio::time::sleep(Duration::from_millis(500)))
        .await
        .unwrap();

    assert_eq!(runtime.state(), PollState::Stopped);
    assert!(root.join("index.html").exists());
    assert!(server.received_requests().await.unwrap().len() >= 3);
}

#[tokio::test]
async fn run_once_reports_change_then_no_change() {
    let server = MockServer::start().await;
    index_ok(None).mount(&server).await;
    let dir = tempdir().unwrap();
    let root = dir.path().join("mirror");

    let mut first =
        MirrorRuntime::bootstrap(config_for(&server, &root, Duration::from_secs(60))).unwrap();
    assert!(first.run_once().await.unwrap());

    let mut second =
        MirrorRuntime::bootstrap(config_for(&server, &root, Duration::from_secs(60))).unwrap();
    assert!(!second.run_once().await.unwrap());
    assert_eq!(second.state(), PollState::Stopped);
}

#[tokio::test]
async fn shutdown_mid_pass_persists_fingerprints_of_written_files() {
    let server = MockServer::start().await;
    index_ok(None).mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/site/a.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a{}"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/site/b.css"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("b{}")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    let dir = tempdir().unwrap();
    let root = dir.path().join("mirror");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("index.html"), "<html>old</html>").unwrap();
    std::fs::write(root.join("a.css"), "old").unwrap();
    std::fs::write(root.join("b.css"), "old").unwrap();
    let mut runtime =
        MirrorRuntime::bootstrap(config_for(&server, &root, Duration::from_secs(3600))).unwrap();

    runtime
        .run_until(tokio::time::sleep(Duration::from_millis(800)))
        .await
        .unwrap();

    assert_eq!(runtime.state(), PollState::Stopped);
    assert_eq!(std::fs::read_to_string(root.join("a.css")).unwrap(), "a{}");
    assert_eq!(std::fs::read_to_string(root.join("b.css")).unwrap(), "old");
    let persisted = FingerprintStore::load(&root);
    assert_eq!(persisted.get("a.css"), Some(content_hash(b"a{}").as_str()));
    assert_eq!(persisted.get("b.css"), None);
    assert_eq!(persisted.get("index.html"), None);
}
