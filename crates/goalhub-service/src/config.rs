//! Service configuration.

use std::fmt;
use std::str::FromStr;

/// Sandbox API host.
pub const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";

/// Production API host.
pub const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

/// Published Daraja sandbox passkey for shortcode 174379.
const SANDBOX_PASSKEY: &str = "bfb279f9aa9bdbcf158e97dd71a467cd2e0c893059b10f78e6b72ada1ed2c919";

/// Published Daraja sandbox paybill.
const SANDBOX_SHORTCODE: &str = "174379";

/// Default front-end origins for local development.
const DEV_CORS_ORIGINS: &str =
    "http://localhost:5173,http://localhost:5174,http://127.0.0.1:5173,http://127.0.0.1:5174";

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    /// Local or staging. Sandbox fallbacks and mock auth are allowed.
    #[default]
    Development,
    /// Live. Every failure surfaces.
    Production,
}

impl Environment {
    /// Whether this is production.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" | "test" | "staging" => Ok(Self::Development),
            other => Err(ConfigError::Invalid {
                key: "APP_ENV",
                value: other.to_string(),
            }),
        }
    }
}

/// Which Daraja deployment to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MpesaEnvironment {
    /// `sandbox.safaricom.co.ke`.
    #[default]
    Sandbox,
    /// `api.safaricom.co.ke`.
    Production,
}

impl MpesaEnvironment {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Production => "production",
        }
    }

    /// Default API host for this deployment.
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_BASE_URL,
            Self::Production => PRODUCTION_BASE_URL,
        }
    }
}

impl FromStr for MpesaEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "production" => Ok(Self::Production),
            other => Err(ConfigError::Invalid {
                key: "MPESA_ENV",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether one completed payment may back several bookings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaymentReusePolicy {
    /// A completed payment links to at most one booking.
    #[default]
    Reject,
    /// No uniqueness check.
    Allow,
}

impl FromStr for PaymentReusePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "allow" => Ok(Self::Allow),
            other => Err(ConfigError::Invalid {
                key: "PAYMENT_REUSE",
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an unusable value.
    #[error("invalid value for {key}: {value}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },

    /// A setting that production requires is missing.
    #[error("{0} must be set in production")]
    MissingInProduction(&'static str),

    /// The callback URL is not HTTPS in production.
    #[error("MPESA_CALLBACK_URL must be an https:// URL in production, got {0}")]
    InsecureCallbackUrl(String),
}

/// M-Pesa Daraja settings.
#[derive(Clone)]
pub struct MpesaConfig {
    /// Sandbox or production Daraja.
    pub environment: MpesaEnvironment,
    /// OAuth consumer key.
    pub consumer_key: Option<String>,
    /// OAuth consumer secret.
    pub consumer_secret: Option<String>,
    /// Lipa na M-Pesa passkey.
    pub passkey: String,
    /// Paybill / till shortcode.
    pub shortcode: String,
    /// API host override; `None` selects by `environment`.
    pub base_url: Option<String>,
    /// Explicit callback URL registered with each push.
    pub callback_url: Option<String>,
    /// Token request timeout.
    pub token_timeout_seconds: u64,
    /// Push request timeout.
    pub push_timeout_seconds: u64,
}

impl MpesaConfig {
    /// The API host in effect.
    #[must_use]
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
    }

    /// Whether both OAuth credentials are present.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.consumer_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.consumer_secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

impl fmt::Debug for MpesaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpesaConfig")
            .field("environment", &self.environment)
            .field("has_credentials", &self.has_credentials())
            .field("shortcode", &self.shortcode)
            .field("base_url", &self.effective_base_url())
            .field("callback_url", &self.callback_url)
            .finish_non_exhaustive()
    }
}

impl Default for MpesaConfig {
    fn default() -> Self {
        Self {
            environment: MpesaEnvironment::Sandbox,
            consumer_key: None,
            consumer_secret: None,
            passkey: SANDBOX_PASSKEY.into(),
            shortcode: SANDBOX_SHORTCODE.into(),
            base_url: None,
            callback_url: None,
            token_timeout_seconds: 10,
            push_timeout_seconds: 15,
        }
    }
}

/// Identity provider settings.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// JWKS endpoint.
    pub jwks_url: Option<String>,
    /// Expected `iss` claim.
    pub issuer: Option<String>,
    /// Expected `aud` claim.
    pub audience: Option<String>,
}

impl AuthConfig {
    /// Whether real token verification is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.jwks_url.is_some()
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Deployment environment (default: development).
    pub environment: Environment,

    /// Address to listen on (default: "0.0.0.0:8000").
    pub listen_addr: String,

    /// PostgreSQL URL; the in-memory store is used when unset.
    pub database_url: Option<String>,

    /// M-Pesa settings.
    pub mpesa: MpesaConfig,

    /// Identity provider settings.
    pub auth: AuthConfig,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Payment initiation requests allowed per client IP per window.
    pub rate_limit_max_requests: usize,

    /// Rate limit window in seconds.
    pub rate_limit_window_seconds: u64,

    /// Read the client IP from `X-Forwarded-For`.
    pub trust_forwarded_for: bool,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Payment-to-booking uniqueness.
    pub payment_reuse: PaymentReusePolicy,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if an enumerated variable has an
    /// unknown value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let environment = env_opt("APP_ENV")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();
        let mpesa_environment = env_opt("MPESA_ENV")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();
        let payment_reuse = env_opt("PAYMENT_REUSE")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();

        let mpesa = MpesaConfig {
            environment: mpesa_environment,
            consumer_key: env_opt("MPESA_CONSUMER_KEY"),
            consumer_secret: env_opt("MPESA_CONSUMER_SECRET"),
            passkey: env_opt("MPESA_PASSKEY").unwrap_or(defaults.mpesa.passkey),
            shortcode: env_opt("MPESA_SHORTCODE").unwrap_or(defaults.mpesa.shortcode),
            base_url: env_opt("MPESA_BASE_URL"),
            callback_url: env_opt("MPESA_CALLBACK_URL"),
            token_timeout_seconds: env_or(
                "MPESA_TOKEN_TIMEOUT_SECONDS",
                defaults.mpesa.token_timeout_seconds,
            ),
            push_timeout_seconds: env_or(
                "MPESA_PUSH_TIMEOUT_SECONDS",
                defaults.mpesa.push_timeout_seconds,
            ),
        };

        Ok(Self {
            environment,
            listen_addr: env_opt("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            database_url: env_opt("DATABASE_URL"),
            mpesa,
            auth: AuthConfig {
                jwks_url: env_opt("AUTH_JWKS_URL"),
                issuer: env_opt("AUTH_ISSUER"),
                audience: env_opt("AUTH_AUDIENCE"),
            },
            cors_origins: env_opt("CORS_ORIGINS")
                .unwrap_or_else(|| DEV_CORS_ORIGINS.into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            rate_limit_max_requests: env_or(
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            ),
            rate_limit_window_seconds: env_or(
                "RATE_LIMIT_WINDOW_SECONDS",
                defaults.rate_limit_window_seconds,
            ),
            trust_forwarded_for: env_or("TRUST_FORWARDED_FOR", defaults.trust_forwarded_for),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            payment_reuse,
        })
    }

    /// Refuse configurations that would silently fall back in production.
    ///
    /// # Errors
    ///
    /// Returns the first production requirement that is not met.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.environment.is_production() {
            return Ok(());
        }

        match self.mpesa.callback_url.as_deref() {
            None => return Err(ConfigError::MissingInProduction("MPESA_CALLBACK_URL")),
            Some(url) if !url.starts_with("https://") => {
                return Err(ConfigError::InsecureCallbackUrl(url.to_string()));
            }
            Some(_) => {}
        }
        if !self.mpesa.has_credentials() {
            return Err(ConfigError::MissingInProduction(
                "MPESA_CONSUMER_KEY and MPESA_CONSUMER_SECRET",
            ));
        }
        if !self.auth.is_configured() {
            return Err(ConfigError::MissingInProduction("AUTH_JWKS_URL"));
        }
        if self.database_url.is_none() {
            return Err(ConfigError::MissingInProduction("DATABASE_URL"));
        }
        Ok(())
    }

    /// Callback URL registered with each push.
    ///
    /// Falls back to the local listener outside production; `validate`
    /// rejects that fallback in production.
    #[must_use]
    pub fn callback_url(&self) -> String {
        self.mpesa.callback_url.clone().unwrap_or_else(|| {
            let port = self
                .listen_addr
                .rsplit_once(':')
                .map_or("8000", |(_, port)| port);
            format!("http://localhost:{port}/api/callback")
        })
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            listen_addr: "0.0.0.0:8000".into(),
            database_url: None,
            mpesa: MpesaConfig::default(),
            auth: AuthConfig::default(),
            cors_origins: DEV_CORS_ORIGINS.split(',').map(String::from).collect(),
            rate_limit_max_requests: 10,
            rate_limit_window_seconds: 900,
            trust_forwarded_for: false,
            max_body_bytes: 1024 * 1024, // 1MB
            request_timeout_seconds: 30,
            payment_reuse: PaymentReusePolicy::Reject,
        }
    }
}
