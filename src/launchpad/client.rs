use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};
use ureq::Agent;

/// Production API root, `devel` web service version.
pub const DEFAULT_API_ROOT: &str = "https://api.launchpad.net/devel/";

const USER_AGENT: &str = concat!("launchpad-mp/", env!("CARGO_PKG_VERSION"));

/// Global timeout for a single HTTP call.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest body we accept (preview diffs can be big).
const MAX_RESPONSE_SIZE: u64 = 64 * 1024 * 1024;

/// Read access to the review service.
///
/// Everything that talks to Launchpad takes one of these explicitly; there is
/// no process-wide logged-in client.
#[async_trait]
pub trait ReviewService: Send + Sync {
    /// Base URL that relative resource paths are joined onto
    fn api_root(&self) -> &str;

    async fn get_json(&self, url: &str) -> Result<Value>;

    async fn get_text(&self, url: &str) -> Result<String>;
}

/// OAuth access token obtained out of band (e.g. by a launchpadlib login).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub token: String,
    pub token_secret: String,
}

impl Credentials {
    /// PLAINTEXT-signed OAuth 1.0 header value.
    fn authorization_header(&self) -> String {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        format!(
            "OAuth realm=\"https://api.launchpad.net/\", oauth_consumer_key=\"{}\", \
             oauth_token=\"{}\", oauth_signature_method=\"PLAINTEXT\", \
             oauth_signature=\"%26{}\", oauth_timestamp=\"{}\", oauth_nonce=\"{}\", \
             oauth_version=\"1.0\"",
            encode(&self.consumer_key),
            encode(&self.token),
            encode(&self.token_secret),
            now.as_secs(),
            now.as_nanos(),
        )
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Session handle for the Launchpad REST API.
#[derive(Clone)]
pub struct LaunchpadSession {
    agent: Agent,
    api_root: String,
    credentials: Option<Credentials>,
}

impl LaunchpadSession {
    pub fn new(api_root: &str, credentials: Option<Credentials>) -> Self {
        let api_root = if api_root.ends_with('/') {
            api_root.to_string()
        } else {
            format!("{api_root}/")
        };
        Self {
            agent: agent(),
            api_root,
            credentials,
        }
    }

    /// Anonymous, read-only access to public data.
    pub fn anonymous(api_root: &str) -> Self {
        Self::new(api_root, None)
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Blocking GET run on the blocking pool so the runtime is not stalled.
    async fn get(&self, url: &str, accept: &'static str) -> Result<String> {
        let agent = self.agent.clone();
        let url = url.to_string();
        let authorization = self
            .credentials
            .as_ref()
            .map(Credentials::authorization_header);

        debug!(%url, "GET");
        tokio::task::spawn_blocking(move || {
            let mut request = agent
                .get(url.as_str())
                .header("Accept", accept)
                .header("User-Agent", USER_AGENT);
            if let Some(authorization) = &authorization {
                request = request.header("Authorization", authorization.as_str());
            }

            let mut response = request
                .call()
                .with_context(|| format!("Launchpad request failed: GET {url}"))?;

            response
                .body_mut()
                .with_config()
                .limit(MAX_RESPONSE_SIZE)
                .read_to_string()
                .with_context(|| format!("Failed to read response body from {url}"))
        })
        .await
        .context("spawn_blocking task panicked")?
    }
}

#[async_trait]
impl ReviewService for LaunchpadSession {
    fn api_root(&self) -> &str {
        &self.api_root
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let body = self.get(url, "application/json").await?;
        serde_json::from_str(&body).with_context(|| format!("Failed to parse JSON from {url}"))
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        self.get(url, "text/plain, */*").await
    }
}

/// HTTP agent using the platform TLS stack and a global timeout.
fn agent() -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        .timeout_global(Some(HTTP_TIMEOUT))
        .build()
        .into()
}

/// Absolute URL for `path`. Links returned by the service are already absolute.
pub fn api_url(service: &dyn ReviewService, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}{}", service.api_root(), path.trim_start_matches('/'))
    }
}

/// Fetch `path` and deserialize it.
pub async fn fetch_as<T: DeserializeOwned>(
    service: &dyn ReviewService,
    path: &str,
    error_context: &'static str,
) -> Result<T> {
    let json = service.get_json(&api_url(service, path)).await?;
    serde_json::from_value(json).context(error_context)
}

/// Fetch every entry of a collection, following `next_collection_link`.
pub async fn fetch_entries(service: &dyn ReviewService, path: &str) -> Result<Vec<Value>> {
    let mut entries = Vec::new();
    let mut next = Some(api_url(service, path));

    while let Some(url) = next.take() {
        let page = service.get_json(&url).await?;
        next = page
            .get("next_collection_link")
            .and_then(Value::as_str)
            .filter(|link| !link.is_empty())
            .map(str::to_string);

        match page {
            Value::Object(mut fields) => match fields.remove("entries") {
                Some(Value::Array(items)) => entries.extend(items),
                _ => anyhow::bail!("Expected a collection at {url}"),
            },
            // Named operations may return a bare list
            Value::Array(items) => entries.extend(items),
            _ => anyhow::bail!("Expected a collection at {url}"),
        }
    }

    debug!(count = entries.len(), "fetched collection");
    Ok(entries)
}
