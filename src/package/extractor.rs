use crate::core::path::remove_dir_if_exists;
use crate::core::{DbcError, DbcResult};
use dbc_core::package::manifest::{AdbcInfo, DriverEntry, SharedLibraries, DBC_SOURCE, MANIFEST_VERSION};
use dbc_core::InstalledDriver;
use flate2::read::GzDecoder;
use semver::Version;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive;

/// Name of the metadata entry inside a driver package
pub const MANIFEST_ENTRY: &str = "MANIFEST";

/// The `MANIFEST` document shipped inside every driver package
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub license: String,
    pub version: Version,
    #[serde(rename = "ADBC", default)]
    pub adbc: AdbcInfo,
    #[serde(rename = "Driver", default)]
    pub driver: PackageDriver,
    #[serde(rename = "Files")]
    pub files: PackageFiles,
    #[serde(rename = "PostInstall", default)]
    pub post_install: PostInstall,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageDriver {
    #[serde(default)]
    pub entrypoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageFiles {
    /// Library file name, relative to the package root
    pub driver: String,
    /// Detached signature file name, relative to the package root
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostInstall {
    #[serde(default)]
    pub messages: Vec<String>,
}

/// A package unpacked into its install directory
#[derive(Debug, Clone)]
pub struct ExtractedPackage {
    pub dir: PathBuf,
    pub manifest: PackageManifest,
}

impl ExtractedPackage {
    pub fn library_path(&self) -> PathBuf {
        self.dir.join(&self.manifest.files.driver)
    }

    pub fn signature_path(&self) -> Option<PathBuf> {
        self.manifest
            .files
            .signature
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| self.dir.join(s))
    }

    /// Installed record for this package under `id` on `platform`
    pub fn to_record(&self, id: &str, platform: &str) -> InstalledDriver {
        let mut shared = SharedLibraries::default();
        shared.set(platform, self.library_path().to_string_lossy().into_owned());
        InstalledDriver {
            id: id.to_string(),
            manifest_version: MANIFEST_VERSION,
            name: self.manifest.name.clone(),
            publisher: self.manifest.publisher.clone(),
            license: self.manifest.license.clone(),
            version: self.manifest.version.clone(),
            source: DBC_SOURCE.to_string(),
            adbc: self.manifest.adbc.clone(),
            driver: DriverEntry {
                entrypoint: self.manifest.driver.entrypoint.clone(),
                shared,
            },
        }
    }
}

/// Extracts `.tar.gz` driver packages
pub struct PackageExtractor;

impl PackageExtractor {
    /// Unpack `archive_path` into a fresh `dest_dir`.
    ///
    /// The `MANIFEST` entry is parsed rather than written. On failure the
    /// partially written directory is removed.
    pub fn extract(archive_path: &Path, dest_dir: &Path) -> DbcResult<ExtractedPackage> {
        if dest_dir.exists() {
            remove_dir_if_exists(dest_dir)?;
        }
        fs::create_dir_all(dest_dir)?;

        let result = Self::unpack(archive_path, dest_dir);
        if result.is_err() {
            let _ = remove_dir_if_exists(dest_dir);
        }
        result
    }

    fn unpack(archive_path: &Path, dest_dir: &Path) -> DbcResult<ExtractedPackage> {
        let file = File::open(archive_path)?;
        let mut archive = Archive::new(GzDecoder::new(file));
        let mut manifest = None;

        for entry in archive
            .entries()
            .map_err(|e| DbcError::Package(format!("Invalid package archive: {}", e)))?
        {
            let mut entry =
                entry.map_err(|e| DbcError::Package(format!("Invalid package archive: {}", e)))?;
            let entry_path = entry.path()?.into_owned();

            if entry_path.strip_prefix(".").unwrap_or(&entry_path) == Path::new(MANIFEST_ENTRY) {
                let mut content = String::new();
                entry.read_to_string(&mut content)?;
                let parsed: PackageManifest = toml::from_str(&content).map_err(|e| {
                    DbcError::Package(format!("Could not decode package MANIFEST: {}", e))
                })?;
                manifest = Some(parsed);
                continue;
            }

            // unpack_in refuses entries that would escape dest_dir
            if !entry.unpack_in(dest_dir)? {
                tracing::warn!("Skipped unsafe archive entry {}", entry_path.display());
            }
        }

        let manifest = manifest.ok_or_else(|| {
            DbcError::Package(format!(
                "{} has no {} entry",
                archive_path.display(),
                MANIFEST_ENTRY
            ))
        })?;

        let extracted = ExtractedPackage {
            dir: dest_dir.to_path_buf(),
            manifest,
        };
        if !extracted.library_path().is_file() {
            return Err(DbcError::Package(format!(
                "package MANIFEST names driver '{}' but the archive does not contain it",
                extracted.manifest.files.driver
            )));
        }
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn build_archive(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    const MANIFEST: &[u8] = br#"
name = "SQLite"
publisher = "ADBC"
license = "Apache-2.0"
version = "1.2.0"

[ADBC]
version = "1.1.0"

[Driver]
entrypoint = "AdbcDriverSqliteInit"

[Files]
driver = "libadbc_driver_sqlite.so"
signature = "libadbc_driver_sqlite.so.sig"

[PostInstall]
messages = ["Restart your application to pick up the driver"]
"#;

    #[test]
    fn test_extract_package() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("sqlite.tar.gz");
        build_archive(
            &archive,
            &[
                ("MANIFEST", MANIFEST),
                ("libadbc_driver_sqlite.so", b"lib"),
                ("libadbc_driver_sqlite.so.sig", b"sig"),
            ],
        );

        let dest = temp.path().join("drivers").join("sqlite_linux_amd64_v1.2.0");
        let extracted = PackageExtractor::extract(&archive, &dest).unwrap();

        assert_eq!(extracted.manifest.version, Version::new(1, 2, 0));
        assert!(extracted.library_path().is_file());
        assert!(extracted.signature_path().unwrap().is_file());
        assert!(!dest.join("MANIFEST").exists());
        assert_eq!(extracted.manifest.post_install.messages.len(), 1);

        let record = extracted.to_record("sqlite", "linux_amd64");
        assert!(record.is_dbc_managed());
        assert_eq!(record.driver.entrypoint.as_deref(), Some("AdbcDriverSqliteInit"));
        assert_eq!(
            record.library_path("linux_amd64").unwrap(),
            dest.join("libadbc_driver_sqlite.so")
        );
    }

    #[test]
    fn test_missing_manifest_cleans_up() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bad.tar.gz");
        build_archive(&archive, &[("libfoo.so", b"lib")]);

        let dest = temp.path().join("out");
        let err = PackageExtractor::extract(&archive, &dest).unwrap_err();
        assert!(matches!(err, DbcError::Package(msg) if msg.contains("MANIFEST")));
        assert!(!dest.exists());
    }

    #[test]
    fn test_not_an_archive() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("junk.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        assert!(PackageExtractor::extract(&archive, &temp.path().join("out")).is_err());
    }
}
