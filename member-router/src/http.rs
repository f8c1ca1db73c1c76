//! Hands requests that match no headless route to the next handler in the chain.

use crate::config::NextHandlerConfig;
use crate::errors::RouterError;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{
    CONNECTION, HeaderMap, HeaderName, HeaderValue, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE,
    TRAILER, TRANSFER_ENCODING, UPGRADE, VIA,
};
use hyper::{Request, Response, Uri, Version};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use url::Url;

// Scoped to a single connection, so never passed on in either direction.
const CONNECTION_HEADERS: [HeaderName; 8] = [
    CONNECTION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
    PROXY_AUTHORIZATION,
    PROXY_AUTHENTICATE,
    HeaderName::from_static("keep-alive"),
];

/// The next link in the request chain.
///
/// Method, path, query, body and end-to-end headers reach the next handler as
/// they arrived here. Its response comes back fully buffered.
#[derive(Clone)]
pub struct NextHandler {
    client: Client<HttpConnector, Full<Bytes>>,
    base_url: Url,
    timeout: Duration,
}

impl NextHandler {
    pub fn new(config: &NextHandlerConfig) -> Self {
        NextHandler {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            base_url: config.url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// The timeout covers the whole exchange, including reading the response body.
    pub async fn forward(&self, request: Request<Bytes>) -> Result<Response<Bytes>, RouterError> {
        let (mut parts, body) = request.into_parts();
        parts.uri = self.target(&parts.uri)?;
        strip_connection_headers(&mut parts.headers);
        append_via(&mut parts.headers, parts.version);
        // The pooled client talks HTTP/1.1 to the next handler, whatever the caller used
        parts.version = Version::HTTP_11;

        let failed = |e: &dyn std::fmt::Display| {
            RouterError::UpstreamRequestFailed(format!("next handler {}: {e}", self.base_url))
        };

        let exchange = async {
            let response = self
                .client
                .request(Request::from_parts(parts, Full::new(body)))
                .await
                .map_err(|e| failed(&e))?;

            let (mut parts, body) = response.into_parts();
            let body = body.collect().await.map_err(|e| failed(&e))?.to_bytes();
            strip_connection_headers(&mut parts.headers);
            append_via(&mut parts.headers, parts.version);
            Ok::<_, RouterError>(Response::from_parts(parts, body))
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                RouterError::UpstreamRequestFailed(format!(
                    "next handler {} timed out",
                    self.base_url
                ))
            })?
    }

    /// Re-targets the inbound path and query at the configured base URL.
    fn target(&self, uri: &Uri) -> Result<Uri, RouterError> {
        let mut url = self.base_url.clone();
        url.set_path(uri.path());
        url.set_query(uri.query());
        url.as_str()
            .parse::<Uri>()
            .map_err(|e| RouterError::InternalError(format!("invalid forwarding URI {url}: {e}")))
    }
}

/// Drops the fixed connection-scoped headers and any header the `Connection`
/// header lists.
fn strip_connection_headers(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in CONNECTION_HEADERS.iter().chain(&listed) {
        headers.remove(name);
    }
}

fn append_via(headers: &mut HeaderMap, version: Version) {
    let via = match version {
        Version::HTTP_09 => "0.9 headless",
        Version::HTTP_10 => "1.0 headless",
        Version::HTTP_2 => "2 headless",
        Version::HTTP_3 => "3 headless",
        _ => "1.1 headless",
    };
    headers.append(VIA, HeaderValue::from_static(via));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::MockUpstream;
    use hyper::{Method, StatusCode};
    use tokio::net::TcpListener;

    fn next_handler(url: Url, timeout_secs: u64) -> NextHandler {
        NextHandler::new(&NextHandlerConfig { url, timeout_secs })
    }

    #[tokio::test]
    async fn test_forward_passes_request_through() {
        let upstream = MockUpstream::start(|req| {
            (StatusCode::CREATED, String::from_utf8_lossy(&req.body).into_owned())
        })
        .await;
        let handler = next_handler(upstream.url(), 5);

        let request = Request::builder()
            .method(Method::POST)
            .uri("http://localhost:3000/src/main.tsx?import=1")
            .header(CONNECTION, "keep-alive, x-session-hop")
            .header("keep-alive", "timeout=5")
            .header("x-session-hop", "1")
            .header("x-custom", "test-value")
            .body(Bytes::from_static(b"hello world"))
            .unwrap();

        let response = handler.forward(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.body().as_ref(), b"hello world");
        assert_eq!(response.headers()[VIA], "1.1 headless");

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        let forwarded = &requests[0];
        assert_eq!(forwarded.method, Method::POST);
        assert_eq!(forwarded.path, "/src/main.tsx");
        assert_eq!(forwarded.query.as_deref(), Some("import=1"));
        assert_eq!(forwarded.headers["x-custom"], "test-value");
        assert_eq!(forwarded.headers[VIA], "1.1 headless");
        assert!(!forwarded.headers.contains_key("x-session-hop"));
        assert!(!forwarded.headers.contains_key("keep-alive"));
    }

    #[tokio::test]
    async fn test_forward_appends_to_existing_via() {
        let upstream = MockUpstream::start(|_req| (StatusCode::OK, "{}".to_string())).await;
        let handler = next_handler(upstream.url(), 5);

        let request = Request::builder()
            .uri("/index.html")
            .header(VIA, "1.1 edge")
            .body(Bytes::new())
            .unwrap();
        handler.forward(request).await.unwrap();

        let requests = upstream.requests();
        let via: Vec<_> = requests[0]
            .headers
            .get_all(VIA)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(via, vec!["1.1 edge", "1.1 headless"]);
    }

    #[tokio::test]
    async fn test_forward_times_out_on_silent_next_handler() {
        // Accepts connections and holds them open without ever answering
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let handler = next_handler(Url::parse(&format!("http://127.0.0.1:{port}")).unwrap(), 1);
        let request = Request::builder()
            .uri("/index.html")
            .body(Bytes::new())
            .unwrap();

        match handler.forward(request).await.unwrap_err() {
            RouterError::UpstreamRequestFailed(msg) => assert!(msg.contains("timed out"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_forward_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let handler = next_handler(Url::parse(&format!("http://127.0.0.1:{port}")).unwrap(), 5);
        let request = Request::builder()
            .uri("/index.html")
            .body(Bytes::new())
            .unwrap();

        match handler.forward(request).await.unwrap_err() {
            RouterError::UpstreamRequestFailed(msg) => assert!(!msg.contains("timed out"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
