use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use axum_extra::extract::cookie::CookieJar;
use blog_auth_api::{
    AuthResponse, SessionData, SignInEmailRequest, SignOutResponse, SignUpEmailRequest,
    StatusResponse, UserResponse, VerifyEmailQuery,
};

use crate::auth::cookies::{expired_session_cookie, session_cookie};
use crate::auth::extractors::{CurrentSession, SessionCredential};
use crate::auth::services::{AuthService, IssuedSession, RequestMeta};
use crate::error::AppError;

fn issued_response(
    auth_service: &AuthService,
    jar: CookieJar,
    issued: IssuedSession,
    url: Option<String>,
) -> (CookieJar, Json<AuthResponse>) {
    let policy = auth_service.policy();
    let jar = jar.add(session_cookie(
        issued.credential.clone(),
        policy.expires_in.num_seconds(),
        policy.secure_cookies,
    ));

    let body = AuthResponse {
        token: issued.credential,
        user: issued.user.into(),
        url,
    };
    (jar, Json(body))
}

/// POST /api/auth/sign-up/email
pub async fn sign_up_email(
    State(auth_service): State<Arc<AuthService>>,
    meta: RequestMeta,
    jar: CookieJar,
    payload: Result<Json<SignUpEmailRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let Json(payload) = payload?;
    let url = payload.callback_url.clone();

    let issued = auth_service.sign_up(payload, meta)?;
    Ok(issued_response(&auth_service, jar, issued, url))
}

/// POST /api/auth/sign-in/email
pub async fn sign_in_email(
    State(auth_service): State<Arc<AuthService>>,
    meta: RequestMeta,
    jar: CookieJar,
    payload: Result<Json<SignInEmailRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let Json(payload) = payload?;
    let url = payload.callback_url.clone();

    let issued = auth_service.sign_in(payload, meta)?;
    Ok(issued_response(&auth_service, jar, issued, url))
}

/// POST /api/auth/sign-out
/// Always expires the session cookie, with or without a live session.
pub async fn sign_out(
    State(auth_service): State<Arc<AuthService>>,
    SessionCredential(credential): SessionCredential,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SignOutResponse>), AppError> {
    if let Some(credential) = credential {
        auth_service.sign_out(&credential)?;
    }

    let jar = jar.add(expired_session_cookie(auth_service.policy().secure_cookies));
    Ok((jar, Json(SignOutResponse { success: true })))
}

/// GET /api/auth/get-session
/// `null` when the caller has no live session. A slid session re-issues
/// the cookie with a fresh max-age.
pub async fn get_session(
    State(auth_service): State<Arc<AuthService>>,
    SessionCredential(credential): SessionCredential,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Option<SessionData>>), AppError> {
    let Some(credential) = credential else {
        return Ok((jar, Json(None)));
    };

    let Some(lookup) = auth_service.get_session(&credential)? else {
        return Ok((jar, Json(None)));
    };

    let jar = match lookup.refreshed_credential {
        Some(refreshed) => {
            let policy = auth_service.policy();
            jar.add(session_cookie(
                refreshed,
                policy.expires_in.num_seconds(),
                policy.secure_cookies,
            ))
        }
        None => jar,
    };

    let data = SessionData {
        session: lookup.session.into(),
        user: lookup.user.into(),
    };
    Ok((jar, Json(Some(data))))
}

/// POST /api/auth/send-verification-email
pub async fn send_verification_email(
    State(auth_service): State<Arc<AuthService>>,
    current: CurrentSession,
) -> Result<Json<StatusResponse>, AppError> {
    auth_service.send_verification_email(&current.user)?;
    Ok(Json(StatusResponse { status: true }))
}

/// GET /api/auth/verify-email?token=
pub async fn verify_email(
    State(auth_service): State<Arc<AuthService>>,
    query: Result<Query<VerifyEmailQuery>, QueryRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Query(query) = query.map_err(|_| AppError::InvalidToken)?;
    let user = auth_service.verify_email(&query.token)?;
    Ok(Json(user.into()))
}
