//! Scripted in-process transport for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};

use super::{ApiRequest, ApiResponse, HttpTransport, RetryState};
use crate::error::TransportError;

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync>;

enum Reply {
    /// Pop responses in order; the last one repeats.
    Queue(VecDeque<ApiResponse>),
    Handler(Handler),
}

struct Route {
    reply: Reply,
    delay: Option<Duration>,
}

/// A request as the transport saw it.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub retry: RetryState,
    pub body: Option<serde_json::Value>,
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), Route>>,
    log: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method path`.
    pub fn on(&self, method: Method, path: &str, status: u16, body: &str) -> &Self {
        let response = ApiResponse::new(
            StatusCode::from_u16(status).expect("valid status"),
            body,
        );
        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .entry((method, path.to_string()))
            .or_insert_with(|| Route {
                reply: Reply::Queue(VecDeque::new()),
                delay: None,
            });
        match route.reply {
            Reply::Queue(ref mut queue) => queue.push_back(response),
            Reply::Handler(_) => route.reply = Reply::Queue(VecDeque::from([response])),
        }
        self
    }

    /// Answer `method path` by calling `handler`.
    pub fn on_fn<F>(&self, method: Method, path: &str, handler: F) -> &Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        let mut routes = self.routes.lock().unwrap();
        let delay = routes
            .get(&(method.clone(), path.to_string()))
            .and_then(|r| r.delay);
        routes.insert(
            (method, path.to_string()),
            Route {
                reply: Reply::Handler(Box::new(handler)),
                delay,
            },
        );
        self
    }

    /// Make every call to `method path` take `delay` before answering.
    pub fn delay(&self, method: Method, path: &str, delay: Duration) -> &Self {
        let mut routes = self.routes.lock().unwrap();
        if let Some(route) = routes.get_mut(&(method, path.to_string())) {
            route.delay = Some(delay);
        }
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.log.lock().unwrap().push(Recorded {
            method: request.method.clone(),
            path: request.path.clone(),
            authorization: request.authorization_header(),
            retry: request.retry,
            body: request.body.clone(),
        });

        let key = (request.method.clone(), request.path.clone());
        let delay = self.routes.lock().unwrap().get(&key).and_then(|r| r.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(Route {
                reply: Reply::Queue(queue),
                ..
            }) => {
                let response = if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                };
                Ok(response.unwrap_or_else(|| ApiResponse::new(StatusCode::NOT_FOUND, "{}")))
            }
            Some(Route {
                reply: Reply::Handler(handler),
                ..
            }) => handler(request),
            None => Ok(ApiResponse::new(StatusCode::NOT_FOUND, "{}")),
        }
    }
}
