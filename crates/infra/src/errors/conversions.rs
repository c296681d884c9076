//! Conversions from external infrastructure errors into domain errors.

use encore_domain::EncoreError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub EncoreError);

impl From<InfraError> for EncoreError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<EncoreError> for InfraError {
    fn from(value: EncoreError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoEncoreError {
    fn into_encore(self) -> EncoreError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → EncoreError */
/* -------------------------------------------------------------------------- */

impl IntoEncoreError for HttpError {
    fn into_encore(self) -> EncoreError {
        if self.is_timeout() {
            return EncoreError::Network("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return EncoreError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return EncoreError::InvalidInput(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => EncoreError::Auth(message),
                404 => EncoreError::NotFound(message),
                400..=499 => EncoreError::InvalidInput(message),
                _ => EncoreError::Network(message),
            };
        }

        EncoreError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_encore())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → EncoreError */
/* -------------------------------------------------------------------------- */

impl IntoEncoreError for serde_json::Error {
    fn into_encore(self) -> EncoreError {
        EncoreError::InvalidInput(format!("JSON error: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_encore())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn http_status_401_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: EncoreError = InfraError::from(error).into();
        match mapped {
            EncoreError::Auth(msg) => assert!(msg.contains("401")),
            other => panic!("expected auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connection_refused_maps_to_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: EncoreError = InfraError::from(error).into();
        assert!(matches!(mapped, EncoreError::Network(_)), "got {mapped:?}");
    }

    #[test]
    fn json_error_maps_to_invalid_input() {
        let error = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let mapped: EncoreError = InfraError::from(error).into();
        assert!(matches!(mapped, EncoreError::InvalidInput(msg) if msg.contains("JSON")));
    }
}
