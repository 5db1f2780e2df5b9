use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::cookies::SESSION_COOKIE;
use crate::auth::services::{AuthService, RequestMeta};
use crate::db::models::session::Session;
use crate::db::models::user::User;
use crate::error::AppError;

const BEARER: &str = "Bearer ";

/// Signed session credential, from the session cookie or else an
/// `Authorization: Bearer` header. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct SessionCredential(pub Option<String>);

impl SessionCredential {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let from_cookie = CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty());

        let credential = from_cookie.or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix(BEARER))
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(ToString::to_string)
        });

        Self(credential)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SessionCredential {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Authenticated caller for protected routes. Rejects with 401 when the
/// credential is missing, forged, or points at an expired session.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub session: Session,
    pub user: User,
}

impl FromRequestParts<Arc<AuthService>> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        auth_service: &Arc<AuthService>,
    ) -> Result<Self, Self::Rejection> {
        let SessionCredential(credential) = SessionCredential::from_headers(&parts.headers);
        let credential = credential.ok_or_else(|| AppError::unauthorized("Missing session"))?;

        let (session, user) = auth_service
            .resolve(&credential)?
            .ok_or_else(|| AppError::unauthorized("Invalid or expired session"))?;

        Ok(Self { session, user })
    }
}

impl RequestMeta {
    /// User agent plus client IP: first `X-Forwarded-For` hop, else
    /// `X-Real-IP`. Values that do not parse as an IP address are dropped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let parsed_ip = |value: &str| value.trim().parse::<IpAddr>().ok();

        let ip_address = header_str("x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .and_then(parsed_ip)
            .or_else(|| header_str("x-real-ip").and_then(parsed_ip))
            .map(|ip| ip.to_string());

        Self {
            ip_address,
            user_agent: header_str(header::USER_AGENT.as_str()).map(ToString::to_string),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
