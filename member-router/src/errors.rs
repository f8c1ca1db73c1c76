use crate::api::utils::json_response;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while routing a request.
///
/// Each variant maps to the status code the caller sees; see [`RouterError::status_code`].
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Invalid request body: {0}")]
    RequestBodyError(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Project configuration not found for siteId: {0}")]
    ProjectNotFound(String),

    #[error("Method {0} not allowed for this route.")]
    MethodNotAllowed(Method),

    #[error("Invalid project credentials for siteId {site_id}: {reason}")]
    InvalidCredentials { site_id: String, reason: String },

    #[error("Upstream request failed: {0}")]
    UpstreamRequestFailed(String),

    #[error("Upstream returned {status} for members page at offset {offset}")]
    UpstreamPageFailed { offset: u64, status: StatusCode },

    #[error("Failed to parse upstream response: {0}")]
    UpstreamResponseInvalid(String),

    #[error("Invalid project list: {0}")]
    InvalidProjectList(String),

    #[error("Failed to update project list: {0}")]
    ConfigWriteError(#[source] projects::RegistryError),

    #[error("Response serialization error: {0}")]
    ResponseSerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Failed to load project list: {0}")]
    RegistryError(#[from] projects::RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl RouterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RouterError::RequestBodyError(_)
            | RouterError::MissingField(_)
            | RouterError::InvalidProjectList(_) => StatusCode::BAD_REQUEST,
            RouterError::ProjectNotFound(_) => StatusCode::NOT_FOUND,
            RouterError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RouterError::InvalidCredentials { .. }
            | RouterError::UpstreamRequestFailed(_)
            | RouterError::UpstreamPageFailed { .. }
            | RouterError::UpstreamResponseInvalid(_)
            | RouterError::ConfigWriteError(_)
            | RouterError::ResponseSerializationError(_)
            | RouterError::InternalError(_)
            | RouterError::RegistryError(_)
            | RouterError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the error as a JSON `{message, error?}` body. Upstream failures get a
    /// generic message with the underlying detail in `error`.
    pub fn into_response(self) -> Response<Bytes> {
        let status = self.status_code();
        let body = match &self {
            RouterError::UpstreamRequestFailed(_)
            | RouterError::UpstreamPageFailed { .. }
            | RouterError::UpstreamResponseInvalid(_) => ErrorBody {
                message: "API call error.".to_string(),
                error: Some(self.to_string()),
            },
            RouterError::ConfigWriteError(e) => ErrorBody {
                message: "Failed to write config file.".to_string(),
                error: Some(e.to_string()),
            },
            _ => ErrorBody {
                message: self.to_string(),
                error: None,
            },
        };

        json_response(status, &body).unwrap_or_else(|_| shared::http::make_error_response(status))
    }
}

impl From<serde_json::Error> for RouterError {
    fn from(e: serde_json::Error) -> Self {
        RouterError::ResponseSerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_json(response: &Response<Bytes>) -> serde_json::Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RouterError::MissingField("html").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RouterError::ProjectNotFound("abc".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RouterError::MethodNotAllowed(Method::PUT).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            RouterError::UpstreamRequestFailed("connection refused".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message_names_site() {
        let response = RouterError::ProjectNotFound("site-42".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(&response),
            serde_json::json!({"message": "Project configuration not found for siteId: site-42"})
        );
    }

    #[test]
    fn test_method_not_allowed_message() {
        let response = RouterError::MethodNotAllowed(Method::DELETE).into_response();
        assert_eq!(
            body_json(&response)["message"],
            "Method DELETE not allowed for this route."
        );
    }

    #[test]
    fn test_upstream_error_carries_detail() {
        let response =
            RouterError::UpstreamRequestFailed("connection refused".into()).into_response();
        let body = body_json(&response);
        assert_eq!(body["message"], "API call error.");
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }
}
