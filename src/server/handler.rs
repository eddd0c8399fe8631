// src/server/handler.rs
use crate::config::LIVENESS_PATH;
use crate::metrics::MetricsRegistry;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;

/// Serves the liveness probe and the Prometheus scrape endpoint.
#[derive(Clone)]
pub struct AdminHandler {
    metrics: Arc<MetricsRegistry>,
    metrics_path: Arc<str>,
}

impl AdminHandler {
    pub fn new(metrics: Arc<MetricsRegistry>, metrics_path: impl Into<Arc<str>>) -> Self {
        Self {
            metrics,
            metrics_path: metrics_path.into(),
        }
    }

    fn respond(&self, req: &Request<Body>) -> Response<Body> {
        let path = req.uri().path();

        if path == LIVENESS_PATH {
            text(StatusCode::OK, "Healthy")
        } else if path == &*self.metrics_path {
            let mut response = text(StatusCode::OK, self.metrics.gather());
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        } else {
            text(StatusCode::NOT_FOUND, "Not Found")
        }
    }
}

fn text(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response
}

impl Service<Request<Body>> for AdminHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        futures::future::ready(Ok(self.respond(&req)))
    }
}
