use crate::request::ApiRequest;
use reqwest::{RequestBuilder, StatusCode};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Hook applied around every outgoing request. Middleware run in the order
/// they were registered.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_request(&self, _req: &ApiRequest, builder: RequestBuilder) -> RequestBuilder {
        builder
    }

    fn on_response(&self, _req: &ApiRequest, _status: StatusCode, _elapsed: Duration) {}
}

/// Adds a static bearer token to each request.
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        BearerAuth {
            token: token.into(),
        }
    }
}

impl Middleware for BearerAuth {
    fn name(&self) -> &'static str {
        "bearer-auth"
    }

    fn on_request(&self, _req: &ApiRequest, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.token)
    }
}

pub struct RequestLogging;

impl Middleware for RequestLogging {
    fn name(&self) -> &'static str {
        "request-logging"
    }

    fn on_request(&self, req: &ApiRequest, builder: RequestBuilder) -> RequestBuilder {
        debug!(method = %req.method, path = %req.path, "Sending request");
        builder
    }

    fn on_response(&self, req: &ApiRequest, status: StatusCode, elapsed: Duration) {
        if status.is_success() {
            debug!(method = %req.method, path = %req.path, %status, ?elapsed, "Request completed");
        } else {
            warn!(method = %req.method, path = %req.path, %status, ?elapsed, "Request failed");
        }
    }
}

#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new(layers: Vec<Arc<dyn Middleware>>) -> Self {
        MiddlewareChain { layers }
    }

    pub fn push(&mut self, layer: Arc<dyn Middleware>) {
        self.layers.push(layer);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    pub fn apply_request(&self, req: &ApiRequest, builder: RequestBuilder) -> RequestBuilder {
        self.layers
            .iter()
            .fold(builder, |builder, layer| layer.on_request(req, builder))
    }

    pub fn apply_response(&self, req: &ApiRequest, status: StatusCode, elapsed: Duration) {
        for layer in &self.layers {
            layer.on_response(req, status, elapsed);
        }
    }
}
