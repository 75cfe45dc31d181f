//! Driver list sync and lock file behaviour.

mod common;

use common::{library_bytes, pkg, Fixture, PLATFORM};
use dbc::core::version::DriverConstraint;
use dbc::core::DbcError;
use dbc::package::checksum::bytes_checksum;
use dbc::package::{DriverList, DriverSpec, InstallStatus, LockEntry, Lockfile, NoopObserver, SyncReconciler};
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};

fn write_list(dir: &Path, entries: &[(&str, Option<&str>)]) -> PathBuf {
    let path = DriverList::init(dir).unwrap();
    let mut list = DriverList::load(&path).unwrap();
    for (name, constraint) in entries {
        let constraint = constraint.map(|c| DriverConstraint::parse(c).unwrap());
        list.add(name, DriverSpec::new(constraint.as_ref(), false));
    }
    list.save(&path).unwrap();
    path
}

#[tokio::test]
async fn test_sync_installs_and_locks_every_driver() {
    let fixture = Fixture::new(&[
        pkg("duckdb", "1.2.0"),
        pkg("sqlite", "1.0.0"),
        pkg("sqlite", "1.1.0"),
    ]);
    let list = write_list(&fixture.project_dir(), &[("sqlite", Some("<1.1.0")), ("duckdb", None)]);
    let installer = fixture.default_installer();

    let report = SyncReconciler::new(&installer)
        .sync(&list, &fixture.scope(), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(report.installed_count(), 2);
    let names: Vec<_> = report.drivers.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["duckdb", "sqlite"]);

    let lock = Lockfile::load(&fixture.project_dir().join("dbc.lock")).unwrap();
    assert_eq!(lock, report.lock);
    assert_eq!(lock.drivers.len(), 2);
    let sqlite = lock.get("sqlite").unwrap();
    assert_eq!(sqlite.version, Version::new(1, 0, 0));
    assert_eq!(sqlite.platform, PLATFORM);
    assert_eq!(sqlite.checksum, bytes_checksum(&library_bytes("sqlite", "1.0.0")));
}

#[tokio::test]
async fn test_second_sync_is_a_noop() {
    let fixture = Fixture::new(&[pkg("duckdb", "1.2.0"), pkg("sqlite", "1.0.0")]);
    let list = write_list(&fixture.project_dir(), &[("sqlite", None), ("duckdb", None)]);
    let installer = fixture.default_installer();
    let reconciler = SyncReconciler::new(&installer);

    let first = reconciler.sync(&list, &fixture.scope(), &NoopObserver).await.unwrap();
    let downloads = fixture.http.downloads();

    let second = reconciler.sync(&list, &fixture.scope(), &NoopObserver).await.unwrap();
    assert_eq!(fixture.http.downloads(), downloads);
    assert_eq!(second.installed_count(), 0);
    assert!(second
        .drivers
        .iter()
        .all(|d| d.status == InstallStatus::AlreadyInstalled));
    assert_eq!(first.lock, second.lock);
}

#[tokio::test]
async fn test_tampered_library_fails_sync() {
    let fixture = Fixture::new(&[pkg("sqlite", "1.0.0")]);
    let list = write_list(&fixture.project_dir(), &[("sqlite", None)]);
    let installer = fixture.default_installer();
    let reconciler = SyncReconciler::new(&installer);

    reconciler.sync(&list, &fixture.scope(), &NoopObserver).await.unwrap();
    let lock_path = fixture.project_dir().join("dbc.lock");
    let lock_before = fs::read(&lock_path).unwrap();

    let library = fixture
        .user_dir()
        .join("sqlite_linux_amd64_v1.0.0")
        .join("libadbc_driver_sqlite.so");
    fs::write(&library, b"tampered").unwrap();

    let err = reconciler
        .sync(&list, &fixture.scope(), &NoopObserver)
        .await
        .unwrap_err();
    match err {
        DbcError::ChecksumMismatch { driver, actual, .. } => {
            assert_eq!(driver, "sqlite");
            assert_eq!(actual, bytes_checksum(b"tampered"));
        }
        other => panic!("expected checksum mismatch, got {:?}", other),
    }
    assert_eq!(fs::read(&lock_path).unwrap(), lock_before);
}

#[tokio::test]
async fn test_lock_pins_version() {
    let fixture = Fixture::new(&[pkg("sqlite", "1.0.0"), pkg("sqlite", "1.1.0")]);
    let project = fixture.project_dir();
    let list = write_list(&project, &[("sqlite", None)]);
    Lockfile {
        drivers: vec![LockEntry {
            name: "sqlite".to_string(),
            version: Version::new(1, 0, 0),
            platform: PLATFORM.to_string(),
            checksum: "sha256:from-another-machine".to_string(),
        }],
        ..Lockfile::default()
    }
    .save(&project.join("dbc.lock"))
    .unwrap();

    let installer = fixture.default_installer();
    let report = SyncReconciler::new(&installer)
        .sync(&list, &fixture.scope(), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(report.drivers[0].version, Version::new(1, 0, 0));
    assert_eq!(
        report.lock.get("sqlite").unwrap().checksum,
        bytes_checksum(&library_bytes("sqlite", "1.0.0"))
    );
}

#[tokio::test]
async fn test_constraint_overrides_stale_lock() {
    let fixture = Fixture::new(&[pkg("sqlite", "1.0.0"), pkg("sqlite", "1.1.0")]);
    let project = fixture.project_dir();
    let list = write_list(&project, &[("sqlite", Some(">=1.1.0"))]);
    Lockfile {
        drivers: vec![LockEntry {
            name: "sqlite".to_string(),
            version: Version::new(1, 0, 0),
            platform: PLATFORM.to_string(),
            checksum: "sha256:old".to_string(),
        }],
        ..Lockfile::default()
    }
    .save(&project.join("dbc.lock"))
    .unwrap();

    let installer = fixture.default_installer();
    let report = SyncReconciler::new(&installer)
        .sync(&list, &fixture.scope(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(report.lock.get("sqlite").unwrap().version, Version::new(1, 1, 0));
}

#[tokio::test]
async fn test_failure_halts_queue_and_keeps_lock() {
    let fixture = Fixture::new(&[pkg("aaa", "1.0.0").unsigned(), pkg("bbb", "1.0.0")]);
    let list = write_list(&fixture.project_dir(), &[("aaa", None), ("bbb", None)]);
    let installer = fixture.default_installer();

    let err = SyncReconciler::new(&installer)
        .sync(&list, &fixture.scope(), &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(err, DbcError::SignatureMissing(_)));
    assert!(!fixture.user_dir().join("bbb.toml").exists());
    assert!(!fixture.project_dir().join("dbc.lock").exists());
}

#[tokio::test]
async fn test_unknown_driver_installs_nothing() {
    let fixture = Fixture::new(&[pkg("sqlite", "1.0.0")]);
    let list = write_list(&fixture.project_dir(), &[("sqlite", None), ("oracle", None)]);
    let installer = fixture.default_installer();

    let err = SyncReconciler::new(&installer)
        .sync(&list, &fixture.scope(), &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(err, DbcError::NotFound(name) if name == "oracle"));
    assert_eq!(fixture.http.downloads(), 0);
}

#[tokio::test]
async fn test_empty_list_is_an_error() {
    let fixture = Fixture::new(&[pkg("sqlite", "1.0.0")]);
    let list = write_list(&fixture.project_dir(), &[]);
    let installer = fixture.default_installer();

    let err = SyncReconciler::new(&installer)
        .sync(&list, &fixture.scope(), &NoopObserver)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no drivers found"));
}
