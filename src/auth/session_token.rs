use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SessionTokenError {
    #[error("Credential signing failed: {0}")]
    SigningFailed(jsonwebtoken::errors::Error),
    #[error("Credential verification failed: {0}")]
    VerificationFailed(jsonwebtoken::errors::Error),
}

/// Payload of the signed credential handed to clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Opaque session token, as stored in `sessions.token`
    pub sid: String,
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Random opaque session token: 64 lowercase hex characters.
pub fn generate_session_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Signs session tokens into HS256 credentials and checks them back.
#[derive(Clone)]
pub struct SessionSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SessionSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
        }
    }

    pub fn sign(
        &self,
        session_token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<String, SessionTokenError> {
        let claims = SessionClaims {
            sid: session_token.to_string(),
            sub: user_id,
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(SessionTokenError::SigningFailed)
    }

    /// Checks the signature only. Expiry is decided by the session row,
    /// which may have been extended after this credential was issued.
    pub fn verify(&self, credential: &str) -> Result<SessionClaims, SessionTokenError> {
        let mut validation = Validation::default();
        validation.validate_exp = false;

        decode::<SessionClaims>(credential, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(SessionTokenError::VerificationFailed)
    }
}
