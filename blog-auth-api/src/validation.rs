//! Declarative field rules for the login and signup forms.
//!
//! The same schemas run in the client (on every change) and on the server
//! (before a sign-up touches the database).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 50;

static LOWERCASE: Lazy<Regex> = Lazy::new(|| Regex::new("[a-z]").expect("static regex"));
static UPPERCASE: Lazy<Regex> = Lazy::new(|| Regex::new("[A-Z]").expect("static regex"));
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new("[0-9]").expect("static regex"));
// Dotted domain with an alphabetic TLD of two or more letters.
static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z0-9_'+\-.]*[A-Z0-9_+\-]@([A-Z0-9][A-Z0-9\-]*\.)+[A-Z]{2,}$")
        .expect("static regex")
});

fn is_valid_email(email: &str) -> bool {
    let local = email.split('@').next().unwrap_or_default();
    !local.starts_with('.') && !email.contains("..") && EMAIL.is_match(email)
}

fn rule_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message));
    error
}

pub fn validate_email_field(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(rule_error("required", "Email is required"));
    }
    if !is_valid_email(email) {
        return Err(rule_error("email", "Please enter a valid email address"));
    }
    Ok(())
}

pub fn validate_login_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(rule_error("required", "Password is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(rule_error(
            "min_length",
            "Password must be at least 6 characters",
        ));
    }
    Ok(())
}

pub fn validate_signup_password(password: &str) -> Result<(), ValidationError> {
    validate_login_password(password)?;

    if !(LOWERCASE.is_match(password) && UPPERCASE.is_match(password) && DIGIT.is_match(password))
    {
        return Err(rule_error(
            "complexity",
            "Password must contain at least one uppercase letter, one lowercase letter, and one number",
        ));
    }
    Ok(())
}

pub fn validate_name_field(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if len == 0 {
        return Err(rule_error("required", "Name is required"));
    }
    if len < MIN_NAME_LENGTH {
        return Err(rule_error("min_length", "Name must be at least 2 characters"));
    }
    if len > MAX_NAME_LENGTH {
        return Err(rule_error("max_length", "Name must be at most 50 characters"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct LoginForm {
    #[validate(custom(function = "validate_email_field"))]
    pub email: String,
    #[validate(custom(function = "validate_login_password"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct SignupForm {
    #[validate(custom(function = "validate_name_field"))]
    pub name: String,
    #[validate(custom(function = "validate_email_field"))]
    pub email: String,
    #[validate(custom(function = "validate_signup_password"))]
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Password => "password",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "password" => Some(Self::Password),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First failing message for each invalid field.
pub type FieldErrors = BTreeMap<Field, String>;

pub fn first_messages(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .iter()
        .filter_map(|(name, errs)| {
            let field = Field::from_name(name)?;
            let message = errs.first()?.message.as_ref()?.to_string();
            Some((field, message))
        })
        .collect()
}

/// Raw values as typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl FieldValues {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Password => &self.password,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Name => self.name = value,
            Field::Email => self.email = value,
            Field::Password => self.password = value,
        }
    }
}

/// Credentials that passed the schema of their mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidCredentials {
    Login(LoginForm),
    Signup(SignupForm),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormMode {
    #[default]
    Login,
    Signup,
}

impl FormMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Login => Self::Signup,
            Self::Signup => Self::Login,
        }
    }

    /// Fields present in this mode, in display order.
    pub fn fields(self) -> &'static [Field] {
        match self {
            Self::Login => &[Field::Email, Field::Password],
            Self::Signup => &[Field::Name, Field::Email, Field::Password],
        }
    }

    pub fn has_field(self, field: Field) -> bool {
        self.fields().contains(&field)
    }

    /// Runs this mode's schema over the values; fields absent from the mode
    /// are ignored.
    pub fn validate(self, values: &FieldValues) -> Result<ValidCredentials, FieldErrors> {
        match self {
            Self::Login => {
                let form = LoginForm {
                    email: values.email.clone(),
                    password: values.password.clone(),
                };
                form.validate()
                    .map(|()| ValidCredentials::Login(form))
                    .map_err(|e| first_messages(&e))
            }
            Self::Signup => {
                let form = SignupForm {
                    name: values.name.clone(),
                    email: values.email.clone(),
                    password: values.password.clone(),
                };
                form.validate()
                    .map(|()| ValidCredentials::Signup(form))
                    .map_err(|e| first_messages(&e))
            }
        }
    }

    /// Error for a single field under this mode's rules.
    pub fn validate_field(self, field: Field, value: &str) -> Option<String> {
        let result = match (self, field) {
            (_, Field::Email) => validate_email_field(value),
            (Self::Login, Field::Password) => validate_login_password(value),
            (Self::Signup, Field::Password) => validate_signup_password(value),
            (Self::Signup, Field::Name) => validate_name_field(value),
            (Self::Login, Field::Name) => return None,
        };
        result
            .err()
            .and_then(|e| e.message.map(|m| m.into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup_password_ok(p: &str) -> bool {
        validate_signup_password(p).is_ok()
    }

    fn login_password_ok(p: &str) -> bool {
        validate_login_password(p).is_ok()
    }

    #[test]
    fn signup_password_requires_length_and_all_classes() {
        let cases = [
            ("Abc123", true),
            ("abcdef1A", true),
            ("Ab1", false),      // too short
            ("abcdef1", false),  // no uppercase
            ("ABCDEF1", false),  // no lowercase
            ("Abcdefg", false),  // no digit
            ("", false),
            ("Aa1Aa", false),    // five chars
            ("ÀÉÎõü1", false),   // non-ascii letters don't count
        ];
        for (password, expected) in cases {
            assert_eq!(signup_password_ok(password), expected, "password {password:?}");
        }
    }

    #[test]
    fn login_password_only_checks_length() {
        assert!(login_password_ok("aaaaaa"));
        assert!(login_password_ok("      "));
        assert!(login_password_ok("123456"));
        assert!(!login_password_ok("aaaaa"));
        assert!(!login_password_ok(""));
    }

    #[test]
    fn password_length_counts_characters() {
        // six characters, more than six bytes
        assert!(login_password_ok("éééééé"));
    }

    #[test]
    fn email_rule_accepts_only_addresses() {
        assert!(validate_email_field("a@x.com").is_ok());
        assert!(validate_email_field("first.last+tag@example.co.uk").is_ok());
        assert!(validate_email_field("o'brien_1@mail-host.example.org").is_ok());
        for bad in [
            "",
            "plain",
            "@x.com",
            "a@",
            "a b@x.com",
            "a@localhost",
            "a!b@x.com",
            "a@x.c",
            "a@x.c0m",
            ".a@x.com",
            "a..b@x.com",
            "a.@x.com",
            "a@-x.com",
        ] {
            assert!(validate_email_field(bad).is_err(), "email {bad:?}");
        }
    }

    #[test]
    fn empty_email_reports_required_first() {
        let err = validate_email_field("").unwrap_err();
        assert_eq!(err.message.unwrap(), "Email is required");
    }

    #[test]
    fn name_length_bounds() {
        assert!(validate_name_field("Al").is_ok());
        assert!(validate_name_field(&"x".repeat(50)).is_ok());
        assert!(validate_name_field("A").is_err());
        assert!(validate_name_field(&"x".repeat(51)).is_err());
        assert_eq!(
            validate_name_field("").unwrap_err().message.unwrap(),
            "Name is required"
        );
    }

    #[test]
    fn login_mode_ignores_name() {
        let values = FieldValues {
            name: String::new(),
            email: "a@x.com".to_string(),
            password: "simple".to_string(),
        };
        let creds = FormMode::Login.validate(&values).expect("valid login");
        assert!(matches!(creds, ValidCredentials::Login(_)));
    }

    #[test]
    fn signup_mode_reports_each_invalid_field_once() {
        let values = FieldValues {
            name: "A".to_string(),
            email: "nope".to_string(),
            password: "simple".to_string(),
        };
        let errors = FormMode::Signup.validate(&values).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[&Field::Name], "Name must be at least 2 characters");
        assert_eq!(errors[&Field::Email], "Please enter a valid email address");
        assert!(errors[&Field::Password].starts_with("Password must contain"));
    }

    #[test]
    fn same_password_differs_by_mode() {
        assert!(FormMode::Login.validate_field(Field::Password, "simple").is_none());
        assert!(FormMode::Signup.validate_field(Field::Password, "simple").is_some());
    }

    #[test]
    fn toggling_twice_returns_to_start() {
        assert_eq!(FormMode::Login.toggled(), FormMode::Signup);
        assert_eq!(FormMode::Login.toggled().toggled(), FormMode::Login);
        assert!(FormMode::Signup.has_field(Field::Name));
        assert!(!FormMode::Login.has_field(Field::Name));
    }
}
