//! Dual-mode login/signup form.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{HOME_ROUTE, Navigator};
use crate::client::{AuthClient, ClientError};
use crate::requests::{SignInEmailRequest, SignUpEmailRequest};
use crate::validation::{Field, FieldErrors, FieldValues, FormMode, ValidCredentials};

const LOGIN_FAILED: &str = "Login failed";
const SIGNUP_FAILED: &str = "Signup failed";
const UNEXPECTED: &str = "An unexpected error occurred";

/// Everything the form can show the user.
///
/// `Field` errors are rendered next to their input; the other variants are
/// rendered as the banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    Field { field: Field, message: String },
    Provider(String),
    Unexpected,
}

impl FormError {
    pub fn message(&self) -> &str {
        match self {
            Self::Field { message, .. } => message,
            Self::Provider(message) => message,
            Self::Unexpected => UNEXPECTED,
        }
    }

    pub fn is_banner(&self) -> bool {
        !matches!(self, Self::Field { .. })
    }

    fn from_client(err: &ClientError, fallback: &str) -> Self {
        if err.is_provider() {
            Self::Provider(err.provider_message().unwrap_or(fallback).to_string())
        } else {
            tracing::error!(error = %err, "authentication request failed");
            Self::Unexpected
        }
    }
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Shared view of the form's in-flight flag, for disabling the submit control.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicBool>);

impl LoadingFlag {
    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn raise(&self) -> LoadingGuard {
        self.0.store(true, Ordering::SeqCst);
        LoadingGuard(self.clone())
    }
}

/// Lowers the flag when dropped, including when the submit future is dropped
/// mid-flight.
struct LoadingGuard(LoadingFlag);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        (self.0).0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Validation failed; nothing was sent.
    Invalid,
    /// The request was sent and failed; the banner is set.
    Failed,
    /// Authenticated; a full navigation to `/` was issued.
    Redirected,
}

#[derive(Debug, Default)]
pub struct AuthForm {
    mode: FormMode,
    values: FieldValues,
    field_errors: FieldErrors,
    banner: Option<FormError>,
    loading: LoadingFlag,
}

impl AuthForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: FormMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    /// Banner text, empty when there is nothing to show.
    pub fn auth_error(&self) -> &str {
        self.banner.as_ref().map_or("", FormError::message)
    }

    pub fn banner(&self) -> Option<&FormError> {
        self.banner.as_ref()
    }

    pub fn value(&self, field: Field) -> &str {
        self.values.get(field)
    }

    pub fn field_error(&self, field: Field) -> Option<&str> {
        self.field_errors.get(&field).map(String::as_str)
    }

    /// Field errors followed by the banner, in display order.
    pub fn errors(&self) -> Vec<FormError> {
        let mut errors: Vec<FormError> = self
            .mode
            .fields()
            .iter()
            .filter_map(|field| {
                self.field_errors.get(field).map(|message| FormError::Field {
                    field: *field,
                    message: message.clone(),
                })
            })
            .collect();
        errors.extend(self.banner.clone());
        errors
    }

    /// Updates a field and re-validates it. Fields absent from the current
    /// mode are ignored.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        if !self.mode.has_field(field) {
            return;
        }
        let value = value.into();

        match self.mode.validate_field(field, &value) {
            Some(message) => {
                self.field_errors.insert(field, message);
            }
            None => {
                self.field_errors.remove(&field);
            }
        }
        self.values.set(field, value);
    }

    /// Switches between login and signup, clearing every value and error.
    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
        self.banner = None;
        self.values = FieldValues::default();
        self.field_errors.clear();
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Login => "Login to your account",
            FormMode::Signup => "Create an account",
        }
    }

    pub fn description(&self) -> &'static str {
        match self.mode {
            FormMode::Login => "Enter your email below to login to your account",
            FormMode::Signup => "Enter your details below to create your account",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match (self.mode, self.is_loading()) {
            (FormMode::Login, false) => "Login",
            (FormMode::Login, true) => "Logging in...",
            (FormMode::Signup, false) => "Sign up",
            (FormMode::Signup, true) => "Signing up...",
        }
    }

    pub fn toggle_prompt(&self) -> (&'static str, &'static str) {
        match self.mode {
            FormMode::Login => ("Don't have an account?", "Sign up"),
            FormMode::Signup => ("Already have an account?", "Login"),
        }
    }

    /// Validates, sends the credentials and, on success, navigates to `/`
    /// with a full page load.
    pub async fn submit<C, N>(&mut self, client: &C, navigator: &mut N) -> SubmitOutcome
    where
        C: AuthClient,
        N: Navigator,
    {
        let credentials = match self.mode.validate(&self.values) {
            Ok(credentials) => credentials,
            Err(errors) => {
                self.field_errors = errors;
                return SubmitOutcome::Invalid;
            }
        };

        let _loading = self.loading.raise();
        self.banner = None;

        let (result, fallback) = match credentials {
            ValidCredentials::Login(form) => {
                let request = SignInEmailRequest {
                    email: form.email,
                    password: form.password,
                    callback_url: Some(HOME_ROUTE.to_string()),
                };
                (client.sign_in_email(request).await, LOGIN_FAILED)
            }
            ValidCredentials::Signup(form) => {
                let request = SignUpEmailRequest {
                    email: form.email,
                    password: form.password,
                    name: form.name,
                    callback_url: Some(HOME_ROUTE.to_string()),
                };
                (client.sign_up_email(request).await, SIGNUP_FAILED)
            }
        };

        match result {
            Ok(response) => {
                tracing::info!(user_id = %response.user.id, mode = ?self.mode, "authenticated");
                navigator.hard_navigate(HOME_ROUTE);
                SubmitOutcome::Redirected
            }
            Err(err) => {
                self.banner = Some(FormError::from_client(&err, fallback));
                SubmitOutcome::Failed
            }
        }
    }
}
