//! Shared fixtures: an in-memory registry serving signed driver packages.

#![allow(dead_code)]

use async_trait::async_trait;
use dbc::config::{InstallScope, LocationResolver, MapEnv, RegistrySource, ScopeConfig};
use dbc::core::DbcResult;
use dbc::package::{InstallOptions, Installer, SignatureVerifier};
use dbc::registry::{AuthenticatedFetcher, DownloadProgress, DriverRegistry, HttpClient, HttpResponse};
use ed25519_dalek::{Signer, SigningKey};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const BASE_URL: &str = "https://registry.test";
pub const PLATFORM: &str = "linux_amd64";

pub fn trusted_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

fn untrusted_key() -> SigningKey {
    SigningKey::from_bytes(&[9u8; 32])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signing {
    Trusted,
    Untrusted,
    Unsigned,
}

#[derive(Debug, Clone)]
pub struct TestPackage {
    pub name: String,
    pub version: String,
    pub platform: String,
    pub signing: Signing,
}

pub fn pkg(name: &str, version: &str) -> TestPackage {
    TestPackage {
        name: name.to_string(),
        version: version.to_string(),
        platform: PLATFORM.to_string(),
        signing: Signing::Trusted,
    }
}

impl TestPackage {
    pub fn unsigned(mut self) -> Self {
        self.signing = Signing::Unsigned;
        self
    }

    pub fn untrusted(mut self) -> Self {
        self.signing = Signing::Untrusted;
        self
    }

    pub fn on(mut self, platform: &str) -> Self {
        self.platform = platform.to_string();
        self
    }

    pub fn library_name(&self) -> String {
        format!("libadbc_driver_{}.so", self.name)
    }

    pub fn url(&self) -> String {
        format!(
            "{base}/{name}/{version}/{name}_{platform}-{version}.tar.gz",
            base = BASE_URL,
            name = self.name,
            version = self.version,
            platform = self.platform
        )
    }

    /// gzip tar with the library, an optional signature and a MANIFEST
    pub fn archive(&self) -> Vec<u8> {
        let library = library_bytes(&self.name, &self.version);
        let signature = match self.signing {
            Signing::Trusted => Some(trusted_key().sign(&library).to_bytes().to_vec()),
            Signing::Untrusted => Some(untrusted_key().sign(&library).to_bytes().to_vec()),
            Signing::Unsigned => None,
        };

        let mut manifest = format!(
            "name = \"{name} driver\"\npublisher = \"test\"\nlicense = \"Apache-2.0\"\nversion = \"{version}\"\n\n[ADBC]\nversion = \"1.1.0\"\n\n[Driver]\nentrypoint = \"AdbcDriverInit\"\n\n[Files]\ndriver = \"{lib}\"\n",
            name = self.name,
            version = self.version,
            lib = self.library_name()
        );
        if signature.is_some() {
            manifest.push_str(&format!("signature = \"{}.sig\"\n", self.library_name()));
        }
        manifest.push_str(&format!(
            "\n[PostInstall]\nmessages = [\"{} is ready\"]\n",
            self.name
        ));

        let mut files: Vec<(String, Vec<u8>)> = vec![
            ("MANIFEST".to_string(), manifest.into_bytes()),
            (self.library_name(), library),
        ];
        if let Some(sig) = signature {
            files.push((format!("{}.sig", self.library_name()), sig));
        }
        build_archive(&files)
    }
}

pub fn library_bytes(name: &str, version: &str) -> Vec<u8> {
    format!("\x7fELF {} {} driver library", name, version).into_bytes()
}

pub fn build_archive(files: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_slice()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Index YAML listing every package, grouped by driver and version
pub fn index_yaml(packages: &[TestPackage]) -> String {
    let mut drivers: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
    drivers.sort();
    drivers.dedup();

    let mut out = String::from("name: test\ndrivers:\n");
    for driver in drivers {
        out.push_str(&format!(
            "  - name: {d} driver\n    description: The {d} test driver\n    license: Apache-2.0\n    path: {d}\n    pkginfo:\n",
            d = driver
        ));
        let mut versions: Vec<&str> = packages
            .iter()
            .filter(|p| p.name == driver)
            .map(|p| p.version.as_str())
            .collect();
        versions.dedup();
        for version in versions {
            out.push_str(&format!("      - version: {}\n        packages:\n", version));
            for p in packages.iter().filter(|p| p.name == driver && p.version == version) {
                out.push_str(&format!("          - platform: {}\n", p.platform));
            }
        }
    }
    out
}

/// HTTP client answering from a fixed map and recording every request
#[derive(Default)]
pub struct MockHttp {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<String>>,
}

impl MockHttp {
    pub fn serve(&self, url: &str, body: Vec<u8>) {
        self.responses.lock().unwrap().insert(url.to_string(), body);
    }

    pub fn downloads(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.ends_with(".tar.gz"))
            .count()
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn get(
        &self,
        url: &str,
        _headers: &[(String, String)],
        progress: Option<&dyn DownloadProgress>,
    ) -> DbcResult<HttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        let body = self.responses.lock().unwrap().get(url).cloned();
        Ok(match body {
            Some(body) => {
                if let Some(progress) = progress {
                    progress.on_progress(body.len() as u64, Some(body.len() as u64));
                }
                HttpResponse { status: 200, body }
            }
            None => HttpResponse {
                status: 404,
                body: Vec::new(),
            },
        })
    }
}

/// A temp directory, a user scope inside it and a registry serving `packages`
pub struct Fixture {
    pub temp: TempDir,
    pub http: Arc<MockHttp>,
}

impl Fixture {
    pub fn new(packages: &[TestPackage]) -> Self {
        let http = Arc::new(MockHttp::default());
        http.serve(&format!("{}/index.yaml", BASE_URL), index_yaml(packages).into_bytes());
        for p in packages {
            http.serve(&p.url(), p.archive());
        }
        Self {
            temp: TempDir::new().unwrap(),
            http,
        }
    }

    pub fn user_dir(&self) -> PathBuf {
        self.temp.path().join("user")
    }

    pub fn project_dir(&self) -> PathBuf {
        let dir = self.temp.path().join("project");
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub fn scope(&self) -> ScopeConfig {
        LocationResolver::new(MapEnv::new(), self.user_dir(), self.temp.path().join("system"))
            .resolve_scope(InstallScope::User)
    }

    pub fn registry(&self) -> Arc<DriverRegistry> {
        let sources = vec![RegistrySource {
            name: "test".to_string(),
            base_url: BASE_URL.to_string(),
        }];
        Arc::new(DriverRegistry::new(
            &sources,
            AuthenticatedFetcher::anonymous(self.http.clone()),
        ))
    }

    pub fn installer(&self, options: InstallOptions) -> Installer {
        let verifier =
            SignatureVerifier::with_trust_anchor(&trusted_key().verifying_key().to_bytes()).unwrap();
        Installer::new(self.registry(), options)
            .unwrap()
            .with_verifier(verifier)
            .with_platform(PLATFORM)
    }

    pub fn default_installer(&self) -> Installer {
        self.installer(InstallOptions::default())
    }
}
