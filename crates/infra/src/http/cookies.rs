//! Read access to the ambient cookie store
//!
//! The session cookie itself is owned by the transport and never read here.
//! [`CookieSource`] exists so request middleware can pick individual values
//! (the anti-forgery token) out of whatever cookies the host environment
//! currently holds.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;

/// Snapshot read of named cookies.
///
/// Implementations must be cheap and non-blocking; they are consulted on every
/// outbound request. Cookie values are credentials and must never be logged.
pub trait CookieSource: Send + Sync {
    /// Current value of the cookie called `name`, if set.
    fn cookie(&self, name: &str) -> Option<String>;
}

/// Cookie source backed by the transport's own jar.
///
/// Cookies the backend sets through `Set-Cookie` (including a rotated
/// anti-forgery token) become visible here on the next lookup.
pub struct JarCookieSource {
    jar: Arc<Jar>,
    origin: Url,
}

impl JarCookieSource {
    /// Read cookies `jar` would send to `origin`.
    pub fn new(jar: Arc<Jar>, origin: Url) -> Self {
        Self { jar, origin }
    }
}

impl CookieSource for JarCookieSource {
    fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.origin)?;
        let header = header.to_str().ok()?;
        find_cookie(header, name).map(str::to_owned)
    }
}

/// In-memory cookie source for hosts that mirror cookies from elsewhere
/// (an embedded webview, a native cookie store).
#[derive(Default)]
pub struct MemoryCookieSource {
    cookies: RwLock<HashMap<String, String>>,
}

impl MemoryCookieSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`MemoryCookieSource::set`].
    pub fn with_cookie(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace a cookie.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.write().insert(name.into(), value.into());
    }

    /// Drop a cookie, returning its last value.
    pub fn remove(&self, name: &str) -> Option<String> {
        self.cookies.write().remove(name)
    }
}

impl CookieSource for MemoryCookieSource {
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.read().get(name).cloned()
    }
}

/// Find `name` in a `Cookie` header value (`a=1; b=2`).
fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_named_cookie_in_header() {
        assert_eq!(find_cookie("session=abc; csrftoken=xyz", "csrftoken"), Some("xyz"));
        assert_eq!(find_cookie("csrftoken=\"quoted\"", "csrftoken"), Some("quoted"));
        assert_eq!(find_cookie("csrftoken2=nope", "csrftoken"), None);
        assert_eq!(find_cookie("", "csrftoken"), None);
    }

    #[test]
    fn jar_source_reads_cookies_for_origin() {
        let origin = Url::parse("http://127.0.0.1:8000").unwrap();
        let jar = Arc::new(Jar::default());
        jar.add_cookie_str("csrftoken=from-jar; Path=/", &origin);

        let source = JarCookieSource::new(jar.clone(), origin.clone());
        assert_eq!(source.cookie("csrftoken").as_deref(), Some("from-jar"));
        assert_eq!(source.cookie("sessionid"), None);

        jar.add_cookie_str("csrftoken=rotated; Path=/", &origin);
        assert_eq!(source.cookie("csrftoken").as_deref(), Some("rotated"));
    }

    #[test]
    fn jar_source_ignores_other_origins() {
        let jar = Arc::new(Jar::default());
        jar.add_cookie_str("csrftoken=elsewhere", &Url::parse("http://other.test").unwrap());

        let source = JarCookieSource::new(jar, Url::parse("http://api.test").unwrap());
        assert_eq!(source.cookie("csrftoken"), None);
    }

    #[test]
    fn memory_source_set_and_remove() {
        let source = MemoryCookieSource::new().with_cookie("csrftoken", "one");
        assert_eq!(source.cookie("csrftoken").as_deref(), Some("one"));

        source.set("csrftoken", "two");
        assert_eq!(source.cookie("csrftoken").as_deref(), Some("two"));

        assert_eq!(source.remove("csrftoken").as_deref(), Some("two"));
        assert_eq!(source.cookie("csrftoken"), None);
    }
}
