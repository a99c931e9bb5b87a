use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

/// Binary with no packaging settings inherited from the caller's environment.
fn packager() -> Command {
    let mut cmd = Command::cargo_bin("release_packager").unwrap();
    for var in [
        "PACKAGER_SOURCE",
        "PACKAGER_BUCKET",
        "PACKAGER_PREFIX",
        "PACKAGER_NAME",
        "PACKAGER_ACCOUNT_ID",
        "PACKAGER_ROLE_NAME",
        "PACKAGER_S3_ENDPOINT",
        "PACKAGER_PUBLISH_RETRIES",
        "AWS_REGION",
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
        "AWS_SESSION_TOKEN",
        "AWS_WEB_IDENTITY_TOKEN_FILE",
        "ACTIONS_ID_TOKEN_REQUEST_URL",
        "ACTIONS_ID_TOKEN_REQUEST_TOKEN",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

fn release_tree(root: &Path) {
    fs::write(root.join("a.txt"), "hello").unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("b.txt"), "world").unwrap();
}

#[test]
fn test_key_prints_destination() {
    packager()
        .args([
            "key",
            "--bucket",
            "rel-bucket",
            "--prefix",
            "/utils/",
            "--name",
            "config_scripts",
        ])
        .assert()
        .success()
        .stdout("rel-bucket/utils/config_scripts.zip\n");
}

#[test]
fn test_key_as_uri_from_environment() {
    packager()
        .env("PACKAGER_BUCKET", "rel-bucket")
        .env("PACKAGER_PREFIX", "utils")
        .env("PACKAGER_NAME", "config_scripts.zip")
        .args(["key", "--uri"])
        .assert()
        .success()
        .stdout("s3://rel-bucket/utils/config_scripts.zip\n");
}

#[test]
fn test_key_defaults_name_to_source_directory() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("config_scripts");
    fs::create_dir(&source).unwrap();

    packager()
        .args(["key", "--bucket", "rel-bucket", "--source"])
        .arg(&source)
        .assert()
        .success()
        .stdout("rel-bucket/config_scripts.zip\n");
}

#[test]
fn test_key_rejects_bucket_with_slash() {
    packager()
        .args(["key", "--bucket", "rel/bucket", "--name", "n"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed"));
}

#[test]
fn test_package_writes_archive() {
    let src = tempfile::tempdir().unwrap();
    release_tree(src.path());
    let out = tempfile::tempdir().unwrap();

    let assert = packager()
        .args(["package", "--name", "config_scripts", "--source"])
        .arg(src.path())
        .arg("--output")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::ends_with("config_scripts.zip\n"));

    let printed = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert!(Path::new(printed.trim()).is_file());
}

#[test]
fn test_package_empty_tree_fails() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    packager()
        .args(["package", "--name", "empty", "--source"])
        .arg(src.path())
        .arg("--output")
        .arg(out.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("empty"));
}

#[test]
fn test_publish_requires_role() {
    let src = tempfile::tempdir().unwrap();
    release_tree(src.path());

    packager()
        .args(["publish", "--bucket", "rel-bucket", "--region", "us-east-1", "--source"])
        .arg(src.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--account-id"))
        .stderr(predicate::str::contains("--role-name"));
}

#[test]
fn test_publish_without_identity_token_fails() {
    let src = tempfile::tempdir().unwrap();
    release_tree(src.path());

    packager()
        .args([
            "publish",
            "--bucket",
            "rel-bucket",
            "--name",
            "config_scripts",
            "--region",
            "us-east-1",
            "--account-id",
            "123456789012",
            "--role-name",
            "release-uploader",
            "--credentials",
            "web-identity",
            "--source",
        ])
        .arg(src.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("identity token"));
}

#[test]
fn test_dry_run_writes_report() {
    let src = tempfile::tempdir().unwrap();
    release_tree(src.path());
    let out = tempfile::tempdir().unwrap();
    let report = out.path().join("report.json");

    packager()
        .args([
            "publish",
            "--dry-run",
            "--bucket",
            "rel-bucket",
            "--prefix",
            "/utils/",
            "--name",
            "config_scripts",
            "--source",
        ])
        .arg(src.path())
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout("rel-bucket/utils/config_scripts.zip\n");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["current_phase"], "Succeeded");
    assert_eq!(json["dry_run"], true);
    assert!(json["result"].is_null());
}

#[test]
fn test_package_rejects_name_with_separator() {
    let src = tempfile::tempdir().unwrap();
    release_tree(src.path());
    let out = tempfile::tempdir().unwrap();

    packager()
        .args(["package", "--name", "../escaped", "--source"])
        .arg(src.path())
        .arg("--output")
        .arg(out.path().join("dist"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid name"));

    assert!(!out.path().join("escaped.zip").exists());
}
