use crate::api::utils::json_response;
use crate::errors::RouterError;
use crate::handler::{HandlerContext, HandlerResult, OperationRequest, RouteHandler};
use async_trait::async_trait;
use hyper::StatusCode;
use projects::{Project, RegistryError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /api/headless-get-config`: returns the installed project list.
pub struct GetConfigHandler;

#[async_trait]
impl RouteHandler for GetConfigHandler {
    fn name(&self) -> &'static str {
        "get_config"
    }

    fn requires_project(&self) -> bool {
        false
    }

    async fn handle(&self, _request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let projects = context.registry.get_all();
        json_response(StatusCode::OK, projects.as_slice())
    }
}

#[derive(Deserialize)]
struct UpdateConfigPayload {
    config: Option<Value>,
}

#[derive(Serialize)]
struct UpdateConfigResponse {
    message: &'static str,
}

/// `POST /api/headless-update-config`: persists and installs a new project list.
pub struct UpdateConfigHandler;

impl UpdateConfigHandler {
    /// Accepts a non-empty array of projects, or a single project object.
    fn parse_projects(config: Option<Value>) -> Result<Vec<Project>, RouterError> {
        let projects = match config {
            None | Some(Value::Null) => return Err(RouterError::MissingField("config")),
            Some(Value::Array(items)) if items.is_empty() => {
                return Err(RouterError::MissingField("config"));
            }
            Some(Value::Object(map)) if map.is_empty() => {
                return Err(RouterError::MissingField("config"));
            }
            Some(value @ Value::Array(_)) => serde_json::from_value::<Vec<Project>>(value),
            Some(value @ Value::Object(_)) => serde_json::from_value::<Project>(value).map(|p| vec![p]),
            Some(other) => {
                return Err(RouterError::InvalidProjectList(format!(
                    "expected an array of projects, got {other}"
                )));
            }
        };

        projects.map_err(|e| RouterError::InvalidProjectList(e.to_string()))
    }
}

#[async_trait]
impl RouteHandler for UpdateConfigHandler {
    fn name(&self) -> &'static str {
        "update_config"
    }

    fn requires_project(&self) -> bool {
        false
    }

    async fn handle(&self, request: OperationRequest, context: &HandlerContext) -> HandlerResult {
        let payload: UpdateConfigPayload = request.payload()?;
        let projects = Self::parse_projects(payload.config)?;

        context
            .registry
            .replace_all(projects)
            .await
            .map_err(|e| match e {
                RegistryError::EmptyProjectList => RouterError::MissingField("config"),
                e => RouterError::ConfigWriteError(e),
            })?;

        json_response(
            StatusCode::OK,
            &UpdateConfigResponse {
                message: "Configuration updated successfully.",
            },
        )
    }
}
