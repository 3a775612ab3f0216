use crate::{
    Transport,
    error::TransportError,
    middleware::{Middleware, MiddlewareChain},
    request::{ApiRequest, Method},
    retry::classify_transport_error,
    settings::TransportSettings,
};
use async_trait::async_trait;
use serde_json::Value;
use std::{sync::Arc, time::Instant};
use tracing::debug;

/// [`Transport`] over HTTPS using a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    settings: TransportSettings,
    middleware: MiddlewareChain,
}

impl HttpTransport {
    pub fn new(
        settings: TransportSettings,
        middleware: Vec<Arc<dyn Middleware>>,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.request_timeout)
            .build()?;

        Ok(HttpTransport {
            client,
            settings,
            middleware: MiddlewareChain::new(middleware),
        })
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    async fn send_once(&self, req: &ApiRequest) -> Result<Value, TransportError> {
        let url = self.settings.url_for(&req.path);
        let method = match req.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &url)
            .query(&req.query)
            .timeout(self.settings.timeout_for(req));
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        builder = self.middleware.apply_request(req, builder);

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        self.middleware.apply_response(req, status, started.elapsed());

        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(TransportError::from_response(status.as_u16(), &bytes));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, req: ApiRequest) -> Result<Value, TransportError> {
        debug!(request = %req, "Dispatching API request");
        let req = &req;
        self.settings
            .retry
            .run(|| self.send_once(req), classify_transport_error)
            .await
            .map_err(|err| err.into_inner())
    }
}
