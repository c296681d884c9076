use std::sync::Arc;

use encore_domain::Config;
use encore_infra::api::{ApiClient, BroadcastNavigator};
use reqwest::cookie::Jar;
use reqwest::Url;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const STALE_SESSION: &str = "session=stale";
pub const FRESH_SESSION: &str = "session=fresh";

/// Origin of the mock backend, for seeding cookies.
pub fn origin(server: &MockServer) -> Url {
    Url::parse(&server.uri()).expect("mock server uri should parse")
}

/// Cookie jar pre-populated with `cookies` (`name=value` pairs) for the mock
/// backend's origin.
pub fn seeded_jar(server: &MockServer, cookies: &[&str]) -> Arc<Jar> {
    let jar = Arc::new(Jar::default());
    let origin = origin(server);
    for cookie in cookies {
        jar.add_cookie_str(&format!("{}; Path=/", cookie), &origin);
    }
    jar
}

/// Client against `server` sharing `jar` and reporting navigation to
/// `navigator`.
pub fn client(server: &MockServer, jar: Arc<Jar>, navigator: Arc<BroadcastNavigator>) -> ApiClient {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.api.timeout_ms = 5_000;

    ApiClient::builder()
        .config(config)
        .cookie_jar(jar)
        .navigator(navigator)
        .build()
        .expect("client should build")
}

/// Whether the request carried the `name=value` cookie pair.
pub fn has_cookie(request: &Request, pair: &str) -> bool {
    request
        .headers
        .get("cookie")
        .and_then(|value| value.to_str().ok())
        .map(|header| header.split(';').any(|c| c.trim() == pair))
        .unwrap_or(false)
}

/// Value of a request header, if present and printable.
pub fn header_value(request: &Request, name: &str) -> Option<String> {
    request.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
}

/// Responder that answers `401` unless the fresh session cookie is present.
pub fn session_gated(success: ResponseTemplate) -> impl Respond {
    move |request: &Request| {
        if has_cookie(request, FRESH_SESSION) {
            success.clone()
        } else {
            ResponseTemplate::new(401).set_body_string("session expired")
        }
    }
}

/// Successful refresh response that rotates the session cookie.
pub fn refresh_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).append_header("set-cookie", format!("{}; Path=/; HttpOnly", FRESH_SESSION))
}

/// Received requests for `path`, in arrival order.
pub async fn requests_to(server: &MockServer, path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == path)
        .collect()
}
