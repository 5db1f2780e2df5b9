use std::sync::{Arc, Mutex, PoisonError};

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{AuthClient, ClientError};
use crate::error::ErrorResponse;
use crate::requests::{SignInEmailRequest, SignUpEmailRequest};
use crate::responses::{AuthResponse, SessionData, SignOutResponse};
use crate::session_store::{SessionState, SessionStore};

const AUTH_PREFIX: &str = "/api/auth";

/// `AuthClient` over HTTP.
///
/// Keeps the credential issued at sign-in/sign-up and replays it as a bearer
/// token. Every state change is published to the session store.
pub struct HttpAuthClient {
    http: reqwest::Client,
    base_url: String,
    credential: Mutex<Option<String>>,
    store: Arc<SessionStore>,
}

impl HttpAuthClient {
    pub fn new(base_url: impl Into<String>, store: Arc<SessionStore>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, store)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            credential: Mutex::new(None),
            store,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}{AUTH_PREFIX}{path}", self.base_url.trim_end_matches('/'))
    }

    fn credential(&self) -> Option<String> {
        self.credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_credential(&self, value: Option<String>) {
        *self.credential.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credential() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()));
        }

        // Non-JSON error bodies (proxies, gateways) carry no usable message.
        let body = serde_json::from_str::<ErrorResponse>(&text)
            .unwrap_or_else(|_| ErrorResponse::new("HTTP_ERROR", ""));
        Err(ClientError::provider(status.as_u16(), body))
    }

    async fn authenticate(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<AuthResponse, ClientError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        let auth: AuthResponse = Self::read(response).await?;

        self.set_credential(Some(auth.token.clone()));
        self.refresh().await;
        Ok(auth)
    }

    /// Re-reads the session from the server and publishes the result.
    /// Failures publish an anonymous state.
    pub async fn refresh(&self) {
        match self.get_session().await {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed");
                self.store.set(SessionState::anonymous());
            }
        }
    }
}

impl AuthClient for HttpAuthClient {
    async fn sign_in_email(
        &self,
        request: SignInEmailRequest,
    ) -> Result<AuthResponse, ClientError> {
        self.authenticate("/sign-in/email", &request).await
    }

    async fn sign_up_email(
        &self,
        request: SignUpEmailRequest,
    ) -> Result<AuthResponse, ClientError> {
        self.authenticate("/sign-up/email", &request).await
    }

    /// The local credential is dropped and the store goes anonymous even
    /// when the request fails.
    async fn sign_out(&self) -> Result<SignOutResponse, ClientError> {
        let result = match self
            .authorize(self.http.post(self.url("/sign-out")))
            .send()
            .await
        {
            Ok(response) => Self::read::<SignOutResponse>(response).await,
            Err(e) => Err(e.into()),
        };

        self.set_credential(None);
        self.store.set(SessionState::anonymous());
        result
    }

    async fn get_session(&self) -> Result<Option<SessionData>, ClientError> {
        let response = self
            .authorize(self.http.get(self.url("/get-session")))
            .send()
            .await?;
        let data: Option<SessionData> = Self::read(response).await?;

        let state = match data.clone() {
            Some(data) => SessionState::authenticated(data),
            None => SessionState::anonymous(),
        };
        self.store.set(state);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_prefix() {
        let client = HttpAuthClient::new("http://localhost:8080/", Arc::new(SessionStore::new()));
        assert_eq!(
            client.url("/sign-in/email"),
            "http://localhost:8080/api/auth/sign-in/email"
        );
    }

    #[test]
    fn credential_starts_empty() {
        let client = HttpAuthClient::new("http://localhost:8080", Arc::new(SessionStore::new()));
        assert!(client.credential().is_none());

        client.set_credential(Some("signed".to_string()));
        assert_eq!(client.credential().as_deref(), Some("signed"));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let store = Arc::new(SessionStore::new());
        // port 9 (discard) on localhost is closed in test environments
        let client = HttpAuthClient::new("http://127.0.0.1:9", Arc::clone(&store));

        let err = client.get_session().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(store.current().is_pending);
    }

    #[tokio::test]
    async fn failed_sign_out_still_clears_local_session() {
        let store = Arc::new(SessionStore::new());
        let client = HttpAuthClient::new("http://127.0.0.1:9", Arc::clone(&store));
        client.set_credential(Some("stale.credential.value".to_string()));

        let err = client.sign_out().await.unwrap_err();

        assert!(matches!(err, ClientError::Transport(_)));
        assert!(client.credential().is_none());
        let state = store.current();
        assert!(!state.is_pending);
        assert!(state.data.is_none());
    }
}
