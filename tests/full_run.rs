//! End-to-end run against a mocked catalog HTTP server: configure, start,
//! drain to completion, verify persisted state.

use std::sync::Arc;

use imageset_dl::{
    BatchWorker, CatalogStore, DownloadConfiguration, Runtime, RuntimeOptions, StateMachine,
    State, StubFetcher, StubValidator, SystemClock,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn configure_start_and_drain_to_completion() {
    let data_dir = tempfile::tempdir().unwrap();
    let dest_dir = tempfile::tempdir().unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/word_net_ids"))
        .respond_with(ResponseTemplate::new(200).set_body_string("catA\ncatB\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/synset/catA"))
        .respond_with(ResponseTemplate::new(200).set_body_string("u1\nu2\n\nu3\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/synset/catB"))
        .respond_with(ResponseTemplate::new(200).set_body_string("u4\n"))
        .mount(&server)
        .await;

    let runtime = Runtime::new(data_dir.path(), RuntimeOptions::default()).unwrap();
    let catalog = Arc::new(CatalogStore::new(runtime.clone(), server.uri()));
    let worker = Arc::new(BatchWorker::new(
        Arc::new(StubFetcher),
        Arc::new(StubValidator::default()),
        4,
    ));

    let mut machine = StateMachine::new(
        runtime.app_state_path(),
        catalog,
        worker,
        Arc::new(SystemClock),
    )
    .await;

    machine
        .configure(DownloadConfiguration {
            number_of_images: 100,
            images_per_category: 100,
            download_destination: dest_dir.path().to_string_lossy().to_string(),
            batch_size: 2,
        })
        .await
        .unwrap();
    assert_eq!(machine.state(), State::Ready);

    machine.start().await.unwrap();
    assert_eq!(machine.state(), State::Running);

    // Let the tiny 4-url catalog drain; poll until the run reports finished.
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        machine.poll();
        if machine.state() == State::Finished {
            break;
        }
    }
    assert_eq!(machine.state(), State::Finished);

    let saved = imageset_dl::AppState::load(runtime.app_state_path()).await.unwrap();
    assert!(saved.progress_info.finished);
    assert!(saved.progress_info.total_downloaded > 0);
}

#[tokio::test]
async fn reset_after_finished_returns_to_initial() {
    let data_dir = tempfile::tempdir().unwrap();
    let dest_dir = tempfile::tempdir().unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/word_net_ids"))
        .respond_with(ResponseTemplate::new(200).set_body_string("catA\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/synset/catA"))
        .respond_with(ResponseTemplate::new(200).set_body_string("u1\n"))
        .mount(&server)
        .await;

    let runtime = Runtime::new(data_dir.path(), RuntimeOptions::default()).unwrap();
    let catalog = Arc::new(CatalogStore::new(runtime.clone(), server.uri()));
    let worker = Arc::new(BatchWorker::new(
        Arc::new(StubFetcher),
        Arc::new(StubValidator::default()),
        4,
    ));

    let mut machine = StateMachine::new(
        runtime.app_state_path(),
        catalog,
        worker,
        Arc::new(SystemClock),
    )
    .await;

    machine
        .configure(DownloadConfiguration {
            number_of_images: 1,
            images_per_category: 1,
            download_destination: dest_dir.path().to_string_lossy().to_string(),
            batch_size: 1,
        })
        .await
        .unwrap();
    machine.start().await.unwrap();

    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        machine.poll();
        if machine.state() == State::Finished {
            break;
        }
    }
    assert_eq!(machine.state(), State::Finished);

    machine.reset().await.unwrap();
    assert_eq!(machine.state(), State::Initial);
}
