use serde::{Deserialize, Serialize};

// -------- REQUEST DTOs --------
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignUpEmailRequest {
    pub email: String,
    pub password: String, // Plain text, hashed server-side
    pub name: String,
    #[serde(
        rename = "callbackURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub callback_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignInEmailRequest {
    pub email: String,
    pub password: String, // Plain text
    #[serde(
        rename = "callbackURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub callback_url: Option<String>,
}

/// Query string of `GET /api/auth/verify-email`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VerifyEmailQuery {
    pub token: String,
}
