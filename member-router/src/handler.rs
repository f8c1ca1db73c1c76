use crate::errors::RouterError;
use crate::upstream::UpstreamClient;
use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::{Method, Response};
use projects::{Project, ProjectRegistry};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub type HandlerResult = Result<Response<Bytes>, RouterError>;

/// Dependencies handed to every route handler.
#[derive(Clone)]
pub struct HandlerContext {
    pub registry: ProjectRegistry,
    pub upstream: UpstreamClient,
}

/// A parsed inbound request, ready to be handled.
pub struct OperationRequest {
    pub method: Method,
    pub body: Value,
    /// Resolved from the body's `siteId` when the handler requires a project
    pub project: Option<Project>,
}

impl OperationRequest {
    pub fn project(&self) -> Result<&Project, RouterError> {
        self.project
            .as_ref()
            .ok_or_else(|| RouterError::InternalError("handler requires a project".into()))
    }

    /// Deserializes the request body into the handler's own payload type.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, RouterError> {
        T::deserialize(&self.body).map_err(|e| RouterError::RequestBodyError(e.to_string()))
    }
}

/// Handler for one named operation of the dispatch table.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the router must resolve the body's `siteId` before calling `handle`
    fn requires_project(&self) -> bool {
        true
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult;
}
