//! The request collaborator used by the job engine: a JSON-speaking transport
//! with retry and request middleware. Everything above this crate sees only
//! [`Transport::request`].

pub mod error;
pub mod http;
pub mod middleware;
pub mod request;
pub mod retry;
pub mod settings;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::TransportError;
pub use request::{ApiRequest, Method};

use async_trait::async_trait;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request and returns the parsed JSON body. An empty body is
    /// returned as `Value::Null`.
    async fn request(&self, req: ApiRequest) -> Result<serde_json::Value, TransportError>;
}
