//! Authenticated API client for the LearnHub REST API.
//!
//! `SessionClient` attaches the current bearer credential to every request
//! and transparently recovers from an expired session: on a 401 it refreshes
//! the credential once and replays the original request once. A request that
//! still fails with 401 after the refresh surfaces `ApiError::Auth` with the
//! session logged out - there is never a second retry.
//!
//! Concurrent 401s share one refresh: waiters queue on an internal gate and
//! skip their own refresh call if the credential changed while they waited.

use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::{Credential, SessionStore};
use crate::config::ClientConfig;
use crate::models::ApiEnvelope;

use super::transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
use super::ApiError;

/// Refresh endpoint. Deployments using cookie-scoped refresh tokens rely on
/// the transport's credentials mode to carry them.
const REFRESH_PATH: &str = "/auth/refresh";
const LOGIN_PATH: &str = "/auth/login";
const LOGOUT_PATH: &str = "/auth/logout";

#[derive(Debug, Deserialize)]
struct TokenData {
    token: String,
}

/// Authenticated client over an abstract transport.
pub struct SessionClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    store: Mutex<SessionStore>,
    /// Serializes credential refreshes across in-flight requests.
    refresh_gate: Mutex<()>,
}

impl SessionClient<HttpTransport> {
    /// Build a client over the production HTTP transport, loading any
    /// persisted credential from the configured storage directory.
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config)?;
        let mut store = SessionStore::new(config.storage_dir()?);
        store.load()?;
        Ok(Self::with_transport(config, transport, store))
    }
}

impl<T: Transport> SessionClient<T> {
    /// Build a client over an explicit transport and session store.
    pub fn with_transport(config: ClientConfig, transport: T, store: SessionStore) -> Self {
        Self {
            transport,
            config,
            store: Mutex::new(store),
            refresh_gate: Mutex::new(()),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.store.lock().await.is_authenticated()
    }

    // ===== Request pipeline =====

    /// Issue one request with the given bearer, no retry logic.
    async fn send_raw(
        &self,
        method: Method,
        path: &str,
        bearer: Option<String>,
        body: Option<Value>,
    ) -> Result<TransportResponse, ApiError> {
        self.transport
            .issue(TransportRequest {
                method,
                url: self.config.url(path),
                bearer,
                body,
            })
            .await
    }

    /// Unwrap the success envelope or map the status to a typed error.
    fn parse(response: TransportResponse) -> Result<Value, ApiError> {
        if !(200..300).contains(&response.status) {
            return Err(ApiError::from_status(response.status, &response.body));
        }
        let envelope: ApiEnvelope<Value> = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Unknown(format!("malformed response envelope: {}", e)))?;
        if !envelope.success {
            return Err(ApiError::Unknown(
                envelope
                    .message
                    .unwrap_or_else(|| "success=false in 2xx response".to_string()),
            ));
        }
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    /// Send an authenticated request, refreshing the credential and
    /// replaying exactly once if the server rejects the session.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let token = self.store.lock().await.token();
        let response = self
            .send_raw(method.clone(), path, token.clone(), body.clone())
            .await?;

        if response.status != 401 {
            return Self::parse(response);
        }

        // This request has not been retried yet: refresh once and replay.
        // A 401 on the replay falls through parse() as ApiError::Auth and is
        // never retried again.
        debug!(%method, path, "Session rejected, attempting credential refresh");
        self.refresh_credential(token).await?;

        let replay_token = self.store.lock().await.token();
        let response = self.send_raw(method, path, replay_token, body).await?;
        if response.status == 401 {
            // The server rejects even the refreshed credential: the session
            // is irrecoverable. Log out and surface the failure.
            warn!(path, "Request rejected after refresh, logging session out");
            let mut store = self.store.lock().await;
            if let Err(e) = store.clear() {
                warn!(error = %e, "Failed to remove persisted credential");
            }
            return Err(ApiError::Auth);
        }
        Self::parse(response)
    }

    /// Refresh the credential, sharing one in-flight refresh among
    /// concurrent callers. `observed` is the token the caller's failed
    /// request was sent with; if the stored credential no longer matches it,
    /// another caller already refreshed and this one just replays.
    async fn refresh_credential(&self, observed: Option<String>) -> Result<(), ApiError> {
        let _gate = self.refresh_gate.lock().await;

        {
            let store = self.store.lock().await;
            if store.is_authenticated() && store.token() != observed {
                debug!("Credential already refreshed by a concurrent request");
                return Ok(());
            }
        }

        let response = self
            .send_raw(Method::POST, REFRESH_PATH, observed, None)
            .await;

        let refreshed = match response {
            Ok(resp) if (200..300).contains(&resp.status) => Self::parse(resp)
                .and_then(|data| {
                    serde_json::from_value::<TokenData>(data)
                        .map_err(|e| ApiError::Unknown(format!("malformed refresh payload: {}", e)))
                }),
            Ok(resp) => Err(ApiError::from_status(resp.status, &resp.body)),
            Err(e) => Err(e),
        };

        match refreshed {
            Ok(data) => {
                let mut store = self.store.lock().await;
                if let Err(e) = store.set(Credential::new(data.token)) {
                    // The in-memory credential is updated either way.
                    warn!(error = %e, "Failed to persist refreshed credential");
                }
                info!("Credential refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Credential refresh failed, logging session out");
                let mut store = self.store.lock().await;
                if let Err(e) = store.clear() {
                    warn!(error = %e, "Failed to remove persisted credential");
                }
                Err(ApiError::Auth)
            }
        }
    }

    // ===== Typed helpers =====

    fn decode<D: DeserializeOwned>(data: Value) -> Result<D, ApiError> {
        serde_json::from_value(data)
            .map_err(|e| ApiError::Unknown(format!("unexpected response shape: {}", e)))
    }

    fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
        serde_json::to_value(body)
            .map_err(|e| ApiError::Unknown(format!("unencodable request body: {}", e)))
    }

    pub async fn get<D: DeserializeOwned>(&self, path: &str) -> Result<D, ApiError> {
        Self::decode(self.request(Method::GET, path, None).await?)
    }

    pub async fn post<D: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<D, ApiError> {
        let body = Self::encode(body)?;
        Self::decode(self.request(Method::POST, path, Some(body)).await?)
    }

    pub async fn patch<D: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<D, ApiError> {
        let body = Self::encode(body)?;
        Self::decode(self.request(Method::PATCH, path, Some(body)).await?)
    }

    // ===== Session lifecycle =====

    /// Authenticate and store the returned credential.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .send_raw(Method::POST, LOGIN_PATH, None, Some(body))
            .await?;
        let data: TokenData = Self::decode(Self::parse(response)?)?;

        let mut store = self.store.lock().await;
        if let Err(e) = store.set(Credential::new(data.token)) {
            warn!(error = %e, "Failed to persist credential after login");
        }
        info!("Logged in");
        Ok(())
    }

    /// Tell the server goodbye (best effort) and clear the local session.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let token = self.store.lock().await.token();
        if token.is_some() {
            if let Err(e) = self.send_raw(Method::POST, LOGOUT_PATH, token, None).await {
                debug!(error = %e, "Logout call failed, clearing session anyway");
            }
        }
        let mut store = self.store.lock().await;
        if let Err(e) = store.clear() {
            warn!(error = %e, "Failed to remove persisted credential");
        }
        info!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::super::transport::mock::MockTransport;
    use super::*;

    fn client_with(
        dir: &TempDir,
        token: Option<&str>,
        transport: MockTransport,
    ) -> SessionClient<MockTransport> {
        let config = ClientConfig {
            base_url: "https://api.test".to_string(),
            ..Default::default()
        };
        let mut store = SessionStore::new(dir.path().to_path_buf());
        if let Some(token) = token {
            store.set(Credential::new(token.to_string())).unwrap();
        }
        SessionClient::with_transport(config, transport, store)
    }

    #[tokio::test]
    async fn test_attaches_bearer_and_unwraps_envelope() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().respond_ok(json!({ "hello": "world" }));
        let client = client_with(&dir, Some("tok-1"), transport);

        let data = client.request(Method::GET, "/ping", None).await.unwrap();
        assert_eq!(data["hello"], "world");

        let requests = client.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].bearer.as_deref(), Some("tok-1"));
        assert_eq!(requests[0].url, "https://api.test/ping");
    }

    #[tokio::test]
    async fn test_single_refresh_then_successful_replay() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new()
            .respond_error(401, "TOKEN_EXPIRED", "expired")
            .respond_ok(json!({ "token": "tok-2" }))
            .respond_ok(json!({ "value": 42 }));
        let client = client_with(&dir, Some("tok-1"), transport);

        let data = client.request(Method::GET, "/courses", None).await.unwrap();
        assert_eq!(data["value"], 42);

        let requests = client.transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].url, "https://api.test/auth/refresh");
        // Replay carries the refreshed credential.
        assert_eq!(requests[2].bearer.as_deref(), Some("tok-2"));
        assert!(client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_persistent_401_clears_session_without_second_retry() {
        let dir = TempDir::new().unwrap();
        // Original 401, then the refresh itself is rejected.
        let transport = MockTransport::new()
            .respond_error(401, "TOKEN_EXPIRED", "expired")
            .respond_error(401, "REFRESH_REJECTED", "nope");
        let client = client_with(&dir, Some("tok-1"), transport);

        let err = client.request(Method::GET, "/courses", None).await.unwrap_err();
        assert!(err.is_auth());
        // Exactly one refresh attempt, no replay of the original request.
        assert_eq!(client.transport.requests().len(), 2);
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_replay_401_surfaces_auth_without_another_refresh() {
        let dir = TempDir::new().unwrap();
        // 401, successful refresh, then the replay still gets 401.
        let transport = MockTransport::new()
            .respond_error(401, "TOKEN_EXPIRED", "expired")
            .respond_ok(json!({ "token": "tok-2" }))
            .respond_error(401, "TOKEN_EXPIRED", "still expired");
        let client = client_with(&dir, Some("tok-1"), transport);

        let err = client.request(Method::GET, "/courses", None).await.unwrap_err();
        assert!(err.is_auth());
        // Three requests total: original, refresh, replay. Never a fourth,
        // and the session is logged out.
        assert_eq!(client.transport.requests().len(), 3);
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_refresh_skipped_when_credential_already_rotated() {
        let dir = TempDir::new().unwrap();
        // No scripted responses: any request would panic the mock.
        let transport = MockTransport::new();
        let client = client_with(&dir, Some("tok-2"), transport);

        // A waiter whose failed request used tok-1 finds the store already
        // holding tok-2: someone else refreshed, so no refresh is issued.
        client
            .refresh_credential(Some("tok-1".to_string()))
            .await
            .unwrap();
        assert!(client.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_non_auth_errors_pass_through_unretried() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().respond_error(404, "COURSE_MISSING", "no such course");
        let client = client_with(&dir, Some("tok-1"), transport);

        let err = client.request(Method::GET, "/courses/9", None).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(client.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_surfaces_as_network() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().fail_network("connection refused");
        let client = client_with(&dir, Some("tok-1"), transport);

        let err = client.request(Method::GET, "/courses", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn test_login_stores_credential() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().respond_ok(json!({ "token": "fresh" }));
        let client = client_with(&dir, None, transport);

        client.login("ada@example.com", "hunter2").await.unwrap();
        assert!(client.is_authenticated().await);

        let requests = client.transport.requests();
        assert_eq!(requests[0].url, "https://api.test/auth/login");
        assert!(requests[0].bearer.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_if_call_fails() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new().fail_network("offline");
        let client = client_with(&dir, Some("tok-1"), transport);

        client.logout().await.unwrap();
        assert!(!client.is_authenticated().await);
    }
}
