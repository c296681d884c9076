//! HTTP transport and ambient cookie access

pub mod client;
pub mod cookies;

pub use client::{HttpClient, HttpClientBuilder};
pub use cookies::{CookieSource, JarCookieSource, MemoryCookieSource};
