use crate::router::Router;
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response};
use shared::http::{ServiceBody, into_boxed};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

/// Hyper service for the public listener. Every error is rendered by the router,
/// so this service itself never fails.
pub struct HeadlessService {
    router: Router,
}

impl HeadlessService {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

impl Service<Request<Incoming>> for HeadlessService {
    type Response = Response<ServiceBody>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let router = self.router.clone();
        Box::pin(async move { Ok(into_boxed(router.route(req).await)) })
    }
}
