use std::net::SocketAddr;

use axum::http::{HeaderMap, Method, header};
use axum_extra::extract::cookie::Cookie;
use tokio::net::TcpListener;

use crate::alarm::{AlarmHandle, LogNotifier};
use crate::cache::CacheService;
use crate::config::Config;
use crate::controllers::AppState;
use crate::models::user;
use crate::services::Registration;

/// A running server for integration tests.
///
/// Spins up Keystone with an in-memory SQLite database and an in-memory
/// cache on a random port.
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_register() {
///     let app = TestApp::new().await;
///     let res = app.client.post(&app.url("/api/v1/users"), r#"{"name":"Jane"}"#).await;
///     assert_eq!(res.status, 422);
/// }
/// ```
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: TestClient,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::for_tests()).await
    }

    pub async fn with_config(config: Config) -> Self {
        Self::with_parts(
            config,
            CacheService::in_memory(),
            AlarmHandle::with_notifier(LogNotifier),
        )
        .await
    }

    /// Start with a specific cache backend and alarm handle, e.g. to observe
    /// alarms or simulate an unreachable cache.
    pub async fn with_parts(config: Config, cache: CacheService, alarm: AlarmHandle) -> Self {
        crate::logging::init_test_logging();

        let app = crate::App::with_parts(config, cache, alarm)
            .await
            .expect("Failed to create test app");
        let state = app.state().clone();
        let router = app.router();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        TestApp {
            addr,
            client: TestClient::new(addr),
            state,
        }
    }

    /// Get the full URL for a path on the test server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Insert a user directly through the service layer.
    pub async fn seed_user(&self, name: &str, email: &str, password: &str, role: &str) -> user::Model {
        self.state
            .users
            .create_with_role(
                Registration {
                    name: name.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                    phone: None,
                },
                role,
            )
            .await
            .expect("Failed to seed user")
    }

    /// Log in and return a client that carries the session cookie.
    pub async fn login(&self, email: &str, password: &str) -> TestClient {
        let body = serde_json::json!({ "email": email, "password": password });
        let res = self
            .client
            .post(&self.url("/api/v1/auth/login"), &body.to_string())
            .await;

        assert_eq!(res.status, 200, "Login failed: {}", res.body);
        self.client.with_cookies_from(&res)
    }

    /// Seed a user with `role` and log them in.
    pub async fn login_as(&self, role: &str) -> (user::Model, TestClient) {
        let email = format!("{role}@example.com");
        let user = self.seed_user("Tester", &email, "password123", role).await;
        let client = self.login(&email, "password123").await;
        (user, client)
    }
}

/// HTTP client for tests with explicit cookie handling: cookies are only
/// sent when attached with [`with_cookie`](Self::with_cookie) or
/// [`with_cookies_from`](Self::with_cookies_from).
#[derive(Clone)]
pub struct TestClient {
    inner: reqwest::Client,
    base_addr: SocketAddr,
    cookies: Vec<(String, String)>,
}

impl TestClient {
    pub fn new(addr: SocketAddr) -> Self {
        TestClient {
            inner: reqwest::Client::new(),
            base_addr: addr,
            cookies: Vec::new(),
        }
    }

    /// A copy of this client that also sends `name=value`.
    pub fn with_cookie(&self, name: &str, value: &str) -> Self {
        let mut client = self.clone();
        client.cookies.retain(|(n, _)| n != name);
        client.cookies.push((name.to_string(), value.to_string()));
        client
    }

    /// A copy of this client updated with the response's `Set-Cookie`
    /// headers, as a browser would apply them.
    pub fn with_cookies_from(&self, res: &TestResponse) -> Self {
        let mut client = self.clone();
        for cookie in res.set_cookies() {
            client.cookies.retain(|(n, _)| n != cookie.name());
            let expired = cookie.max_age().is_some_and(|age| age.is_zero());
            if !expired {
                client
                    .cookies
                    .push((cookie.name().to_string(), cookie.value().to_string()));
            }
        }
        client
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub async fn get(&self, url: &str) -> TestResponse {
        self.send(Method::GET, url, None).await
    }

    pub async fn post(&self, url: &str, body: &str) -> TestResponse {
        self.send(Method::POST, url, Some(body)).await
    }

    pub async fn put(&self, url: &str, body: &str) -> TestResponse {
        self.send(Method::PUT, url, Some(body)).await
    }

    pub async fn delete(&self, url: &str) -> TestResponse {
        self.send(Method::DELETE, url, None).await
    }

    /// Send any request. A body is sent as JSON.
    pub async fn send(&self, method: Method, url: &str, body: Option<&str>) -> TestResponse {
        let mut req = self.inner.request(method.clone(), url);
        if !self.cookies.is_empty() {
            let header = self
                .cookies
                .iter()
                .map(|(n, v)| format!("{n}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            req = req.header(header::COOKIE, header);
        }
        if let Some(body) = body {
            req = req
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let res = req
            .send()
            .await
            .unwrap_or_else(|e| panic!("{method} request failed: {e}"));
        TestResponse::from_response(res).await
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.base_addr)
    }
}

/// A simplified HTTP response for test assertions.
#[derive(Debug)]
pub struct TestResponse {
    pub status: u16,
    pub body: String,
    pub headers: HeaderMap,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let body = res.text().await.unwrap_or_default();
        TestResponse {
            status,
            body,
            headers,
        }
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("Failed to parse response as JSON")
    }

    pub fn is_error(&self) -> bool {
        self.json()["isError"].as_bool().unwrap_or(false)
    }

    pub fn code(&self) -> String {
        self.json()["code"].as_str().unwrap_or_default().to_string()
    }

    pub fn message(&self) -> String {
        self.json()["message"].as_str().unwrap_or_default().to_string()
    }

    pub fn data(&self) -> serde_json::Value {
        self.json()["data"].clone()
    }

    pub fn validation_errors(&self) -> Vec<serde_json::Value> {
        self.json()["validationErrors"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }

    /// Every `Set-Cookie` header, parsed.
    pub fn set_cookies(&self) -> Vec<Cookie<'static>> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|raw| Cookie::parse(raw.to_string()).ok())
            .collect()
    }

    pub fn set_cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.set_cookies().into_iter().find(|c| c.name() == name)
    }
}
