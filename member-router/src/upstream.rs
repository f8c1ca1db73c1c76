//! Calls to the upstream provider on behalf of a project.
//!
//! Every request carries the project's credentials:
//! - `Authorization`: the project's API key, verbatim
//! - `wix-site-id`: the project's site id
//! - `Content-Type: application/json`
//!
//! Pass-through calls relay the upstream status and body to the caller without
//! looking inside the payload.

use crate::config::UpstreamConfig;
use crate::errors::RouterError;
use crate::metrics_defs::UPSTREAM_REQUESTS;
use hyper::body::Bytes;
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use hyper::{Method, Response};
use projects::Project;
use serde_json::Value;
use shared::counter;
use std::time::Duration;
use url::Url;

pub const SITE_ID_HEADER: HeaderName = HeaderName::from_static("wix-site-id");

/// One upstream request, described independently of any project.
#[derive(Debug, Clone)]
pub struct UpstreamCall {
    pub operation: &'static str,
    pub method: Method,
    pub path: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl UpstreamCall {
    pub fn new<I, S>(operation: &'static str, method: Method, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        UpstreamCall {
            operation,
            method,
            path: path.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: Url,
    page_size: u32,
    member_password: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, RouterError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| RouterError::InternalError(format!("Failed to build HTTP client: {e}")))?;

        Ok(UpstreamClient {
            client,
            base_url: config.base_url.clone(),
            page_size: config.page_size,
            member_password: config.member_password.clone(),
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn member_password(&self) -> &str {
        &self.member_password
    }

    /// Builds the absolute URL for `segments`, percent-encoding each segment.
    pub(crate) fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url, RouterError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RouterError::InternalError(format!("Cannot use {} as a base URL", self.base_url))
            })?
            .clear()
            .extend(segments.iter().map(AsRef::as_ref));
        Ok(url)
    }

    pub(crate) fn project_headers(project: &Project) -> Result<HeaderMap, RouterError> {
        let invalid = |e: hyper::header::InvalidHeaderValue| RouterError::InvalidCredentials {
            site_id: project.site_id.clone(),
            reason: e.to_string(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&project.api_key).map_err(invalid)?,
        );
        headers.insert(
            SITE_ID_HEADER,
            HeaderValue::from_str(&project.site_id).map_err(invalid)?,
        );
        Ok(headers)
    }

    pub(crate) fn request(
        &self,
        project: &Project,
        call: &UpstreamCall,
    ) -> Result<reqwest::RequestBuilder, RouterError> {
        let url = self.endpoint(call.path.as_slice())?;
        let mut builder = self
            .client
            .request(call.method.clone(), url)
            .headers(Self::project_headers(project)?);

        if !call.query.is_empty() {
            builder = builder.query(&call.query);
        }
        if let Some(body) = &call.body {
            builder = builder.json(body);
        }
        Ok(builder)
    }

    /// Issues `call` and relays the upstream status, content type and body verbatim.
    pub async fn pass_through(
        &self,
        project: &Project,
        call: UpstreamCall,
    ) -> Result<Response<Bytes>, RouterError> {
        let operation = call.operation;
        let response = self
            .request(project, &call)?
            .send()
            .await
            .map_err(|e| {
                counter!(UPSTREAM_REQUESTS, "operation" => operation, "status" => "error")
                    .increment(1);
                tracing::error!(
                    site_id = %project.site_id,
                    operation,
                    error = %e,
                    "Upstream request failed"
                );
                RouterError::UpstreamRequestFailed(e.to_string())
            })?;

        let status = response.status();
        counter!(UPSTREAM_REQUESTS, "operation" => operation, "status" => status.as_str().to_owned())
            .increment(1);
        tracing::debug!(site_id = %project.site_id, operation, %status, "Upstream responded");

        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response
            .bytes()
            .await
            .map_err(|e| RouterError::UpstreamRequestFailed(e.to_string()))?;

        let mut relayed = Response::new(body);
        *relayed.status_mut() = status;
        if let Some(content_type) = content_type {
            relayed.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        Ok(relayed)
    }
}
