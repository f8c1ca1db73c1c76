use crate::api::campaigns::{
    GetRecipientsHandler, GetStatsHandler, SendTestEmailHandler, ValidateLinkHandler,
    ValidateLinksHandler,
};
use crate::api::members::{DeleteHandler, ListAllHandler, RegisterHandler, SearchHandler};
use crate::api::projects::{GetConfigHandler, UpdateConfigHandler};
use crate::api::sender_details::SenderDetailsHandler;
use crate::api::utils::parse_json_body;
use crate::errors::RouterError;
use crate::handler::{HandlerContext, OperationRequest, RouteHandler};
use crate::http::NextHandler;
use crate::metrics_defs::REQUEST_DURATION;
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::Value;
use shared::histogram;
use shared::http::{collect_body, make_error_response};
use std::sync::Arc;
use std::time::Instant;

/// One entry of the dispatch table
pub struct Route {
    pub path: &'static str,
    pub methods: Vec<Method>,
    pub handler: Arc<dyn RouteHandler>,
}

impl Route {
    fn new<H: RouteHandler + 'static>(path: &'static str, methods: &[Method], handler: H) -> Self {
        Route {
            path,
            methods: methods.to_vec(),
            handler: Arc::new(handler),
        }
    }
}

/// The fixed set of operations served by this service.
pub fn default_routes() -> Vec<Route> {
    vec![
        Route::new("/api/headless-get-config", &[Method::GET], GetConfigHandler),
        Route::new("/api/headless-update-config", &[Method::POST], UpdateConfigHandler),
        Route::new("/api/headless-register", &[Method::POST], RegisterHandler),
        Route::new("/api/headless-search", &[Method::POST], SearchHandler),
        Route::new("/api/headless-delete", &[Method::POST], DeleteHandler),
        Route::new("/api/headless-list-all", &[Method::POST], ListAllHandler),
        Route::new("/api/headless-validate-links", &[Method::POST], ValidateLinksHandler),
        Route::new("/api/headless-validate-link", &[Method::POST], ValidateLinkHandler),
        Route::new("/api/headless-send-test-email", &[Method::POST], SendTestEmailHandler),
        Route::new("/api/headless-get-stats", &[Method::POST], GetStatsHandler),
        Route::new("/api/headless-get-recipients", &[Method::POST], GetRecipientsHandler),
        // POST reads the sender details, PATCH updates them
        Route::new(
            "/api/headless-sender-details",
            &[Method::POST, Method::PATCH],
            SenderDetailsHandler,
        ),
    ]
}

/// Matches inbound requests against the dispatch table and runs the matched handler.
///
/// A matched request goes through these steps, each of which can end it early:
/// 1. method check (405)
/// 2. body accumulation and JSON parsing (400)
/// 3. project resolution from `siteId`, for handlers that need one (404)
/// 4. the handler itself
///
/// Requests that match no route are handed to the next handler when one is
/// configured, and answered with a plain 404 otherwise.
#[derive(Clone)]
pub struct Router {
    routes: Arc<Vec<Route>>,
    context: HandlerContext,
    next_handler: Option<NextHandler>,
}

impl Router {
    pub fn new(routes: Vec<Route>, context: HandlerContext, next_handler: Option<NextHandler>) -> Self {
        Self {
            routes: Arc::new(routes),
            context,
            next_handler,
        }
    }

    pub async fn route<B>(&self, req: Request<B>) -> Response<Bytes>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let Some(route) = self.find_matching_route(req.uri().path()) else {
            return self.handle_no_route(req).await;
        };

        let start = Instant::now();
        let handler_name = route.handler.name();
        let response = match self.handle_route(route, req).await {
            Ok(response) => response,
            Err(e) => {
                if e.status_code().is_server_error() {
                    tracing::error!(handler = handler_name, error = %e, "Request failed");
                } else {
                    tracing::info!(handler = handler_name, error = %e, "Request rejected");
                }
                e.into_response()
            }
        };

        histogram!(
            REQUEST_DURATION,
            "handler" => handler_name,
            "status" => response.status().as_str().to_owned()
        )
        .record(start.elapsed().as_secs_f64());

        response
    }

    fn find_matching_route(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.path == path)
    }

    async fn handle_route<B>(&self, route: &Route, req: Request<B>) -> Result<Response<Bytes>, RouterError>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let method = req.method().clone();
        if !route.methods.contains(&method) {
            return Err(RouterError::MethodNotAllowed(method));
        }

        let bytes = collect_body(req.into_body())
            .await
            .map_err(|e| RouterError::RequestBodyError(e.to_string()))?;
        let body = parse_json_body(&bytes)?;

        let handler = &route.handler;
        let project = if handler.requires_project() {
            // Ids that are absent or not strings can never match a configured project
            let project = match body.get("siteId") {
                Some(Value::String(site_id)) => self
                    .context
                    .registry
                    .find(site_id)
                    .ok_or_else(|| RouterError::ProjectNotFound(site_id.clone()))?,
                None | Some(Value::Null) => {
                    return Err(RouterError::ProjectNotFound("undefined".to_string()));
                }
                Some(other) => return Err(RouterError::ProjectNotFound(other.to_string())),
            };
            Some(project)
        } else {
            None
        };

        tracing::debug!(
            handler = handler.name(),
            site_id = project.as_ref().map(|p| p.site_id.as_str()),
            "Matched route"
        );

        let request = OperationRequest {
            method,
            body,
            project,
        };
        handler.handle(request, &self.context).await
    }

    async fn handle_no_route<B>(&self, req: Request<B>) -> Response<Bytes>
    where
        B: Body,
        B::Error: std::fmt::Display,
    {
        let Some(next_handler) = &self.next_handler else {
            tracing::debug!(
                method = %req.method(),
                path = %req.uri().path(),
                "No route matched"
            );
            return make_error_response(StatusCode::NOT_FOUND);
        };

        let (parts, body) = req.into_parts();
        let body = match collect_body(body).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read request body for next handler");
                return make_error_response(StatusCode::BAD_REQUEST);
            }
        };

        match next_handler.forward(Request::from_parts(parts, body)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Next handler unavailable");
                make_error_response(StatusCode::BAD_GATEWAY)
            }
        }
    }
}
