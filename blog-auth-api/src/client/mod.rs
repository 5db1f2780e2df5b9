//! Client binding for the `/api/auth` endpoints.

mod http;

pub use http::HttpAuthClient;

use std::future::Future;

use crate::error::ErrorResponse;
use crate::requests::{SignInEmailRequest, SignUpEmailRequest};
use crate::responses::{AuthResponse, SessionData, SignOutResponse};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with an error status.
    #[error("Auth provider returned {status}: {}", body.message)]
    Provider { status: u16, body: ErrorResponse },
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn provider(status: u16, body: ErrorResponse) -> Self {
        Self::Provider { status, body }
    }

    /// Message supplied by the server, if any.
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            Self::Provider { body, .. } if !body.message.is_empty() => Some(&body.message),
            _ => None,
        }
    }

    /// `true` for errors the server reported, `false` for transport or
    /// decoding failures.
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }
}

/// Email/password operations of the identity service.
pub trait AuthClient {
    fn sign_in_email(
        &self,
        request: SignInEmailRequest,
    ) -> impl Future<Output = Result<AuthResponse, ClientError>> + Send;

    fn sign_up_email(
        &self,
        request: SignUpEmailRequest,
    ) -> impl Future<Output = Result<AuthResponse, ClientError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<SignOutResponse, ClientError>> + Send;

    fn get_session(&self)
    -> impl Future<Output = Result<Option<SessionData>, ClientError>> + Send;
}
