#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, Response},
};
use materials_admin::{
    db::{ConnectionSettings, DatabaseConnector},
    ApplicationBuilder, DbError, Dispatcher, EnvironmentConfig, InMemoryMaterialRepository,
    MaterialRepository,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";
pub const PRODUCTION_SECRET: &str = "0123456789abcdef0123456789abcdef-production";

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Succeed,
    Fail,
    Hang,
    Panic,
}

/// Connector double that records every connection attempt.
pub struct FakeConnector {
    behavior: Behavior,
    delay: Duration,
    attempts: AtomicUsize,
}

impl FakeConnector {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Self::with_delay(behavior, Duration::ZERO)
    }

    pub fn with_delay(behavior: Behavior, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            delay,
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseConnector for FakeConnector {
    async fn connect(
        &self,
        _database_url: &str,
        _settings: &ConnectionSettings,
    ) -> Result<Arc<dyn MaterialRepository>, DbError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.behavior {
            Behavior::Succeed => Ok(InMemoryMaterialRepository::shared()),
            Behavior::Fail => Err(DbError::Connection("connection refused".to_string())),
            Behavior::Hang => std::future::pending().await,
            Behavior::Panic => panic!("connector exploded"),
        }
    }
}

pub fn env(pairs: &[(&str, &str)]) -> EnvironmentConfig {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    EnvironmentConfig::from_lookup(|key| vars.get(key).cloned())
}

/// Development environment with a database URL and admin credentials.
pub fn ready_env() -> EnvironmentConfig {
    env(&[
        ("DATABASE_URL", "postgres://materials@localhost/materials"),
        ("ADMIN_EMAIL", ADMIN_EMAIL),
        ("ADMIN_PASSWORD", ADMIN_PASSWORD),
    ])
}

pub fn dispatcher(connector: Arc<FakeConnector>, env: EnvironmentConfig) -> Dispatcher {
    Dispatcher::new(ApplicationBuilder::new(connector), env)
}

pub fn ready_dispatcher() -> Dispatcher {
    dispatcher(FakeConnector::new(Behavior::Succeed), ready_env())
}

pub async fn request(
    dispatcher: &Dispatcher,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> Response<Body> {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(match body {
            Some(b) => Body::from(b.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    dispatcher.handle(req).await
}

pub async fn form(
    dispatcher: &Dispatcher,
    uri: &str,
    body: &str,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    dispatcher
        .handle(builder.body(Body::from(body.to_string())).unwrap())
        .await
}

pub async fn get_with_cookie(dispatcher: &Dispatcher, uri: &str, cookie: &str) -> Response<Body> {
    let req = Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    dispatcher.handle(req).await
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// `name=value` pair from the response's `Set-Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|pair| pair.trim().to_string())
}

/// Log in with the configured admin credentials and return the session cookie.
pub async fn login(dispatcher: &Dispatcher) -> String {
    let body = format!(
        "email={}&password={}",
        urlencode(ADMIN_EMAIL),
        urlencode(ADMIN_PASSWORD)
    );
    let response = form(dispatcher, "/admin/login", &body, None).await;
    session_cookie(&response).expect("login sets a session cookie")
}

pub fn urlencode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            b' ' => "+".to_string(),
            other => format!("%{other:02X}"),
        })
        .collect()
}
