pub mod api;
pub mod config;
pub mod errors;
pub mod executor;
pub mod handler;
pub mod http;
pub mod metrics_defs;
pub mod pagination;
pub mod router;
pub mod service;
pub mod upstream;

#[cfg(test)]
mod testutils;

use crate::errors::RouterError;
use crate::handler::HandlerContext;
use crate::http::NextHandler;
use crate::router::{Router, default_routes};
use crate::service::HeadlessService;
use crate::upstream::UpstreamClient;
use projects::{FilesystemProjectStore, ProjectRegistry};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

/// Loads the project list and serves the headless routes and the admin probes
/// until either listener fails.
pub async fn run(config: config::Config) -> Result<(), RouterError> {
    let store = FilesystemProjectStore::new(config.projects.path.clone());
    tracing::info!(path = %store.path().display(), "Loading project list");
    let registry = ProjectRegistry::load(Arc::new(store)).await?;

    let context = HandlerContext {
        registry: registry.clone(),
        upstream: UpstreamClient::new(&config.upstream)?,
    };
    let next_handler = config.next_handler.as_ref().map(NextHandler::new);
    let router = Router::new(default_routes(), context, next_handler);

    let router_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        HeadlessService::new(router),
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::new(move || !registry.get_all().is_empty()),
    );

    tokio::try_join!(router_task, admin_task)?;
    Ok(())
}
