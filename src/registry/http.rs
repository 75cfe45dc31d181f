use crate::core::DbcResult;
use async_trait::async_trait;
use reqwest::Client;

/// Receives byte counts while a body streams in
pub trait DownloadProgress: Send + Sync {
    fn on_progress(&self, downloaded: u64, total: Option<u64>);
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Plain GET transport. Non-2xx statuses are returned, not raised.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        progress: Option<&dyn DownloadProgress>,
    ) -> DbcResult<HttpResponse>;
}

/// `dbc-cli/<version> (<os>; <arch>)`, plus ` CI` when running under CI
pub fn user_agent() -> String {
    let mut agent = format!(
        "dbc-cli/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    let ci = std::env::var("CI").unwrap_or_default();
    if matches!(ci.as_str(), "1" | "t" | "T" | "true" | "TRUE" | "True") {
        agent.push_str(" CI");
    }
    agent
}

/// reqwest-backed client used outside of tests
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> DbcResult<Self> {
        let client = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        progress: Option<&dyn DownloadProgress>,
    ) -> DbcResult<HttpResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        tracing::debug!("GET {}", url);
        let mut response = request.send().await?;
        let status = response.status().as_u16();
        let total = response.content_length();

        let mut body = Vec::with_capacity(initial_capacity(total));
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if let Some(progress) = progress {
                progress.on_progress(body.len() as u64, total);
            }
        }

        Ok(HttpResponse { status, body })
    }
}

/// Content-Length is only a hint; never reserve more than this up front
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length.unwrap_or(0).min(MAX_PREALLOCATION) as usize
}
