use serde::Deserialize;
use thiserror::Error;
use url::Url;

const DEFAULT_UPSTREAM_URL: &str = "https://www.wixapis.com";
const DEFAULT_PAGE_SIZE: u32 = 1000;
const DEFAULT_MEMBER_PASSWORD: &str = "Password123!";
const DEFAULT_NEXT_HANDLER_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener and admin listener must not share an address")]
    ListenerConflict,

    #[error("Page size cannot be 0")]
    InvalidPageSize,

    #[error("Unsupported URL scheme for {name}: {scheme}")]
    UnsupportedScheme { name: &'static str, scheme: String },
}

/// Router configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener serving the `/api/headless-*` routes
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    pub admin_listener: Listener,
    /// Where the project list lives
    #[serde(default)]
    pub projects: projects::config::Config,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Next link in the request chain. Requests that match no route are
    /// forwarded here unmodified.
    pub next_handler: Option<NextHandlerConfig>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener == self.admin_listener {
            return Err(ValidationError::ListenerConflict);
        }

        self.upstream.validate()?;

        // The next handler is reached over plain HTTP only
        if let Some(next_handler) = &self.next_handler
            && next_handler.url.scheme() != "http"
        {
            return Err(ValidationError::UnsupportedScheme {
                name: "next_handler.url",
                scheme: next_handler.url.scheme().to_string(),
            });
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Settings for calls to the upstream provider
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_url")]
    pub base_url: Url,
    /// Members requested per page when listing all members
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Per-request timeout. Unset means upstream calls may wait indefinitely.
    pub timeout_secs: Option<u64>,
    /// Password given to members created through the register route
    #[serde(default = "default_member_password")]
    pub member_password: String,
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page_size == 0 {
            return Err(ValidationError::InvalidPageSize);
        }
        validate_scheme("upstream.base_url", &self.base_url)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            base_url: default_upstream_url(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: None,
            member_password: default_member_password(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct NextHandlerConfig {
    pub url: Url,
    #[serde(default = "default_next_handler_timeout")]
    pub timeout_secs: u64,
}

fn validate_scheme(name: &'static str, url: &Url) -> Result<(), ValidationError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ValidationError::UnsupportedScheme {
            name,
            scheme: scheme.to_string(),
        }),
    }
}

fn default_upstream_url() -> Url {
    Url::parse(DEFAULT_UPSTREAM_URL).expect("default upstream URL is valid")
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_member_password() -> String {
    DEFAULT_MEMBER_PASSWORD.to_string()
}

fn default_next_handler_timeout() -> u64 {
    DEFAULT_NEXT_HANDLER_TIMEOUT_SECS
}
