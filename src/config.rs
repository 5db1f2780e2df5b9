use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const LAMBDA_FUNCTION_VAR: &str = "AWS_LAMBDA_FUNCTION_NAME";
const DEV_AUTH_SECRET: &str = "dev_auth_secret_change_me_in_production";
const MIN_PROD_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Lambda always counts as production; elsewhere `APP_ENV` decides.
    pub fn detect() -> Self {
        if env::var(LAMBDA_FUNCTION_VAR).is_ok() {
            return Self::Production;
        }

        match env::var("APP_ENV").as_deref() {
            Ok("production" | "prod") => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub database_url: String,
    pub auth_secret: String,
    pub session_expires_in_secs: i64,
    pub session_update_age_secs: i64,
    pub frontend_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // `.env` may set APP_ENV, so it is read before detection.
        Self::load_env_file_with(dotenv::dotenv);

        let environment = Environment::detect();
        tracing::info!(environment = environment.as_str(), "Environment detected");

        let database_url = Self::database_url(environment)?;
        let auth_secret = Self::auth_secret(environment)?;
        let session_expires_in_secs = parse_var("SESSION_EXPIRES_IN_SECS", 604_800)?;
        let session_update_age_secs = parse_var("SESSION_UPDATE_AGE_SECS", 86_400)?;
        let frontend_url = Self::frontend_url(environment);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = parse_var("SERVER_PORT", 8080)?;
        let run_migrations = parse_var("RUN_MIGRATIONS", !environment.is_production())?;

        if session_expires_in_secs <= 0 || session_update_age_secs < 0 {
            anyhow::bail!("Session durations must be positive");
        }

        tracing::info!("Configuration loaded");
        tracing::debug!(database = %mask_credentials(&database_url), "Database");
        tracing::debug!(%frontend_url, "Frontend origin");
        tracing::debug!("Server: {}:{}", server_host, server_port);

        Ok(Self {
            environment,
            database_url,
            auth_secret,
            session_expires_in_secs,
            session_update_age_secs,
            frontend_url,
            server_host,
            server_port,
            run_migrations,
        })
    }

    /// Development reads `.env` when present; production relies on
    /// injected variables.
    /// Runs `load` unless running on Lambda. Returns whether a file was loaded.
    fn load_env_file_with<F>(load: F) -> bool
    where
        F: FnOnce() -> dotenv::Result<PathBuf>,
    {
        if env::var_os(LAMBDA_FUNCTION_VAR).is_some() {
            return false;
        }

        match load() {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "Loaded .env");
                true
            }
            Err(_) => {
                tracing::debug!(".env file not found, using process environment");
                false
            }
        }
    }

    fn database_url(environment: Environment) -> Result<String> {
        if let Ok(url) = env::var("DATABASE_URL") {
            return Ok(url);
        }

        if environment.is_production() {
            anyhow::bail!("DATABASE_URL must be set in production");
        }

        let user = env::var("POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string());
        let password = env::var("POSTGRES_PASSWORD").unwrap_or_else(|_| "postgres".to_string());
        let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let database = env::var("POSTGRES_DB").unwrap_or_else(|_| "blog_auth".to_string());

        Ok(format!("postgres://{user}:{password}@{host}:{port}/{database}"))
    }

    fn auth_secret(environment: Environment) -> Result<String> {
        let secret = match env::var("AUTH_SECRET") {
            Ok(s) => s,
            Err(_) if environment.is_production() => {
                anyhow::bail!("AUTH_SECRET is required in production");
            }
            Err(_) => {
                tracing::warn!("AUTH_SECRET not set, using development secret");
                DEV_AUTH_SECRET.to_string()
            }
        };

        if environment.is_production() && secret.len() < MIN_PROD_SECRET_LEN {
            anyhow::bail!(
                "AUTH_SECRET must be at least {MIN_PROD_SECRET_LEN} characters in production (current: {})",
                secret.len()
            );
        }

        Ok(secret)
    }

    fn frontend_url(environment: Environment) -> String {
        env::var("FRONTEND_URL").unwrap_or_else(|_| {
            if environment.is_production() {
                "https://blog.example.com".to_string()
            } else {
                "http://localhost:3000".to_string()
            }
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// Hides the user/password part of a connection URL.
pub fn mask_credentials(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@')
        && let Some(scheme_end) = url.find("://")
        && scheme_end < at_pos
    {
        let scheme = &url[..scheme_end + 3];
        let after_at = &url[at_pos..];
        return format!("{scheme}***:***{after_at}");
    }
    url.to_string()
}
