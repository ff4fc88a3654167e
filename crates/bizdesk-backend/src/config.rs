//! Configuration for the backend clients

use crate::error::BackendError;
use http::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

/// Environment variable holding the project URL.
pub const ENV_PROJECT_URL: &str = "BIZDESK_SUPABASE_URL";
/// Environment variable holding the public (anon) API key.
pub const ENV_ANON_KEY: &str = "BIZDESK_SUPABASE_ANON_KEY";
/// Environment variable holding a user access token.
pub const ENV_ACCESS_TOKEN: &str = "BIZDESK_SUPABASE_ACCESS_TOKEN";
/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT: &str = "BIZDESK_TIMEOUT";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings shared by [`FunctionsClient`] and [`RestClient`].
///
/// Passed explicitly to each client; [`from_env`](Self::from_env) is only a
/// convenience constructor.
///
/// [`FunctionsClient`]: crate::FunctionsClient
/// [`RestClient`]: crate::RestClient
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project base URL, always ending in `/`
    pub project_url: Url,

    /// Public API key sent as `apikey` on every request
    pub anon_key: SecretString,

    /// User access token; the anon key is used as bearer when absent
    pub access_token: Option<SecretString>,

    /// Total request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,
}

impl BackendConfig {
    /// Create a configuration for a project URL and anon key.
    ///
    /// # Errors
    ///
    /// [`BackendError::Config`] if the URL is not an absolute http(s) URL or
    /// the key is empty.
    pub fn new(project_url: &str, anon_key: impl Into<String>) -> Result<Self, BackendError> {
        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(BackendError::Config("anon key is empty".into()));
        }

        Ok(Self {
            project_url: parse_project_url(project_url)?,
            anon_key: SecretString::new(anon_key.into_boxed_str()),
            access_token: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    /// Authenticate requests as a signed-in user.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::new(token.into().into_boxed_str()));
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first, without
    /// overriding variables that are already set. This will look for:
    /// - `BIZDESK_SUPABASE_URL` (required)
    /// - `BIZDESK_SUPABASE_ANON_KEY` (required)
    /// - `BIZDESK_SUPABASE_ACCESS_TOKEN`
    /// - `BIZDESK_TIMEOUT` for request timeout (in seconds)
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self, BackendError> {
        use std::env;

        dotenvy::dotenv().ok();

        let url = env::var(ENV_PROJECT_URL)
            .map_err(|_| BackendError::Config(format!("{ENV_PROJECT_URL} is not set")))?;
        let key = env::var(ENV_ANON_KEY)
            .map_err(|_| BackendError::Config(format!("{ENV_ANON_KEY} is not set")))?;
        let mut config = Self::new(&url, key)?;

        if let Ok(token) = env::var(ENV_ACCESS_TOKEN)
            && !token.is_empty()
        {
            config = config.with_access_token(token);
        }

        // Timeout
        if let Ok(timeout_str) = env::var(ENV_TIMEOUT)
            && let Ok(timeout_secs) = timeout_str.parse::<u64>()
        {
            config.timeout = Duration::from_secs(timeout_secs);
        }

        Ok(config)
    }

    /// Resolve `path` against the project URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.project_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| BackendError::Config(format!("invalid endpoint path {path:?}: {e}")))
    }

    /// Headers every request carries: `apikey` and a bearer token.
    ///
    /// Both values are marked sensitive so they are redacted from `Debug`.
    pub fn auth_headers(&self) -> Result<HeaderMap, BackendError> {
        let bearer = self.access_token.as_ref().unwrap_or(&self.anon_key);

        let mut apikey = HeaderValue::from_str(self.anon_key.expose_secret())
            .map_err(|_| BackendError::Config("anon key is not a valid header value".into()))?;
        apikey.set_sensitive(true);

        let mut authorization =
            HeaderValue::from_str(&format!("Bearer {}", bearer.expose_secret()))
                .map_err(|_| BackendError::Config("token is not a valid header value".into()))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", apikey);
        headers.insert(AUTHORIZATION, authorization);
        Ok(headers)
    }

    /// Build a reqwest client carrying the auth headers and timeouts.
    pub fn http_client(&self) -> Result<reqwest::Client, BackendError> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .default_headers(self.auth_headers()?)
            .build()?)
    }
}

fn parse_project_url(raw: &str) -> Result<Url, BackendError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| BackendError::Config(format!("invalid project URL {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BackendError::Config(format!(
            "project URL must be http(s), got {:?}",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
