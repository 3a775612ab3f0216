//! An in-memory [`Transport`] that replays scripted responses, for tests.

use crate::{
    Transport,
    error::TransportError,
    request::{ApiRequest, Method},
};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

type Script = VecDeque<Result<Value, TransportError>>;

/// Responses are keyed by method and path and consumed in order. A request
/// with nothing left in its script fails with `InvalidRequest`.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<(Method, String), Script>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, method: Method, path: impl Into<String>, body: Value) -> &Self {
        self.enqueue(method, path.into(), Ok(body));
        self
    }

    pub fn push_error(&self, method: Method, path: impl Into<String>, err: TransportError) -> &Self {
        self.enqueue(method, path.into(), Err(err));
        self
    }

    fn enqueue(&self, method: Method, path: String, response: Result<Value, TransportError>) {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        scripts.entry((method, path)).or_default().push_back(response);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn calls_to(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn remaining(&self, method: Method, path: &str) -> usize {
        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(method, path.to_string()))
            .map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, req: ApiRequest) -> Result<Value, TransportError> {
        let key = (req.method, req.path.clone());
        let display = req.to_string();
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(req);

        let next = self
            .scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&key)
            .and_then(VecDeque::pop_front);

        next.unwrap_or_else(|| Err(TransportError::InvalidRequest(format!("no scripted response for {display}"))))
    }
}
