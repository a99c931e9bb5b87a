use chrono::{Duration, Utc};
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use release_packager::credentials::{Credentials, StaticProvider};
use release_packager::pipeline::{Pipeline, PipelinePhase};
use release_packager::publish::InMemoryConnector;
use release_packager::publish::PublishError;
use release_packager::{PackagerConfig, PackagerError};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

fn release_tree(root: &Path) {
    fs::write(root.join("a.txt"), "hello").unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("b.txt"), "world").unwrap();
}

fn config(source: &Path) -> PackagerConfig {
    PackagerConfig::new(source, "rel-bucket", "/utils/", "config_scripts").with_role(
        "123456789012",
        "release-uploader",
        "us-east-1",
    )
}

fn provider(expires_in: Duration) -> StaticProvider {
    StaticProvider::new(Credentials::new(
        "AKIDEXAMPLE",
        "secret",
        Some("session".to_string()),
        Some(Utc::now() + expires_in),
    ))
}

async fn stored_object(connector: &InMemoryConnector, key: &str) -> Option<Vec<u8>> {
    let store = connector.bucket("rel-bucket");
    match store.get(&ObjectPath::from(key)).await {
        Ok(result) => Some(result.bytes().await.unwrap().to_vec()),
        Err(object_store::Error::NotFound { .. }) => None,
        Err(e) => panic!("unexpected store error: {e}"),
    }
}

fn read_entry(archive: &[u8], name: &str) -> String {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut contents = String::new();
    zip.by_name(name)
        .unwrap()
        .read_to_string(&mut contents)
        .unwrap();
    contents
}

#[tokio::test]
async fn test_publish_uploads_tree_to_fixed_key() {
    let src = tempfile::tempdir().unwrap();
    release_tree(src.path());
    let connector = InMemoryConnector::new();

    let pipeline = Pipeline::new(
        config(src.path()),
        provider(Duration::hours(1)),
        connector.clone(),
    );
    let mut state = pipeline.new_state();
    let summary = pipeline.run(&mut state).await.unwrap();

    assert_eq!(summary.destination.to_string(), "rel-bucket/utils/config_scripts.zip");
    assert!(state.succeeded());
    for phase in [
        PipelinePhase::Archived,
        PipelinePhase::Authenticated,
        PipelinePhase::Published,
        PipelinePhase::Succeeded,
    ] {
        assert!(state.has_completed(phase), "missing checkpoint {phase}");
    }

    let published = summary.publish.unwrap();
    assert!(published.success);
    assert_eq!(published.remote_key, "rel-bucket/utils/config_scripts.zip");
    assert_eq!(published.sha256, summary.archive_sha256);

    let object = stored_object(&connector, "utils/config_scripts.zip")
        .await
        .unwrap();
    assert_eq!(object.len() as u64, summary.archive_size);
    assert_eq!(read_entry(&object, "a.txt"), "hello");
    assert_eq!(read_entry(&object, "sub/b.txt"), "world");
}

#[tokio::test]
async fn test_republish_overwrites_previous_object() {
    let src = tempfile::tempdir().unwrap();
    release_tree(src.path());
    let connector = InMemoryConnector::new();

    let pipeline = Pipeline::new(
        config(src.path()),
        provider(Duration::hours(1)),
        connector.clone(),
    );
    pipeline.run(&mut pipeline.new_state()).await.unwrap();

    fs::write(src.path().join("a.txt"), "hello again").unwrap();
    pipeline.run(&mut pipeline.new_state()).await.unwrap();

    let object = stored_object(&connector, "utils/config_scripts.zip")
        .await
        .unwrap();
    assert_eq!(read_entry(&object, "a.txt"), "hello again");
}

#[tokio::test]
async fn test_dry_run_uploads_nothing() {
    let src = tempfile::tempdir().unwrap();
    release_tree(src.path());
    let connector = InMemoryConnector::new();

    let mut cfg = config(src.path());
    cfg.dry_run = true;
    let pipeline = Pipeline::new(cfg, provider(Duration::hours(1)), connector.clone());
    let mut state = pipeline.new_state();
    let summary = pipeline.run(&mut state).await.unwrap();

    assert!(summary.publish.is_none());
    assert_eq!(summary.entries, 3);
    assert!(state.succeeded());
    assert!(!state.has_completed(PipelinePhase::Authenticated));
    assert!(
        stored_object(&connector, "utils/config_scripts.zip")
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_expired_credentials_fail_without_upload() {
    let src = tempfile::tempdir().unwrap();
    release_tree(src.path());
    let connector = InMemoryConnector::new();

    let pipeline = Pipeline::new(
        config(src.path()),
        provider(Duration::minutes(-5)),
        connector.clone(),
    );
    let mut state = pipeline.new_state();
    let err = pipeline.run(&mut state).await.unwrap_err();

    assert!(matches!(
        err,
        PackagerError::Publish(PublishError::AuthExpired { .. })
    ));
    assert_eq!(state.current_phase, PipelinePhase::Failed);
    assert!(state.failure.is_some());
    assert!(
        stored_object(&connector, "utils/config_scripts.zip")
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_empty_tree_fails_before_authentication() {
    let src = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        config(src.path()),
        provider(Duration::hours(1)),
        InMemoryConnector::new(),
    );
    let mut state = pipeline.new_state();
    let err = pipeline.run(&mut state).await.unwrap_err();

    assert!(matches!(err, PackagerError::Archive(_)));
    assert_eq!(state.current_phase, PipelinePhase::Failed);
    assert!(!state.has_completed(PipelinePhase::Archived));
}

#[tokio::test]
async fn test_invalid_key_fails_first() {
    let src = tempfile::tempdir().unwrap();
    release_tree(src.path());
    let cfg = PackagerConfig::new(src.path(), "", "utils", "config_scripts");
    let pipeline = Pipeline::new(cfg, provider(Duration::hours(1)), InMemoryConnector::new());
    let mut state = pipeline.new_state();

    let err = pipeline.run(&mut state).await.unwrap_err();
    assert!(matches!(err, PackagerError::Destination(_)));
    assert!(state.checkpoints.is_empty());
}

#[tokio::test]
async fn test_report_written_after_run() {
    let src = tempfile::tempdir().unwrap();
    release_tree(src.path());
    let out = tempfile::tempdir().unwrap();

    let pipeline = Pipeline::new(
        config(src.path()),
        provider(Duration::hours(1)),
        InMemoryConnector::new(),
    );
    let mut state = pipeline.new_state();
    pipeline.run(&mut state).await.unwrap();

    let report = out.path().join("report.json");
    state.save(&report).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["destination"], "rel-bucket/utils/config_scripts.zip");
    assert_eq!(json["result"]["remote_key"], "rel-bucket/utils/config_scripts.zip");
}
