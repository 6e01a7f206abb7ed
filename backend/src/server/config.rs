//! Startup configuration.
//!
//! [`AppSettings`] is loaded by OrthoConfig from `STOCKDESK_*` environment
//! variables, command-line flags and configuration files. It is validated into
//! a [`ServerConfig`] before anything is bound or connected.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use rand::RngCore;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use zeroize::Zeroizing;

use stockdesk::domain::{EmailAddress, OtpSettings};
use stockdesk::inbound::http::throttle::RateLimit;
use stockdesk::outbound::crypto::{AesGcmPayloadCipher, CipherKeyError};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const EPHEMERAL_SECRET_LEN: usize = 32;

/// Raw settings before validation.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "STOCKDESK")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// Encrypt response leaves and decrypt request bodies.
    #[ortho_config(default = false)]
    pub encryption_enabled: bool,
    /// AES-256 key as 64 hex digits or base64.
    pub encryption_key: Option<String>,
    /// HS256 signing secret for bearer tokens.
    pub jwt_secret: Option<String>,
    /// Bearer token lifetime in seconds.
    #[ortho_config(default = 86_400)]
    pub token_ttl_secs: u64,
    /// One-time code lifetime in seconds.
    #[ortho_config(default = 600)]
    pub otp_ttl_secs: u64,
    /// Issue the fixed development code. Rejected in release builds.
    #[ortho_config(default = false)]
    pub debug_otp: bool,
    /// Shared Redis cache; the in-process cache is used when absent.
    pub redis_url: Option<String>,
    /// Lifetime of cached lookups in seconds.
    #[ortho_config(default = 3_600)]
    pub cache_ttl_secs: u64,
    /// Audit jobs held before new ones are dropped.
    #[ortho_config(default = 1_024)]
    pub audit_queue_capacity: usize,
    /// Credential requests admitted per client address and window.
    #[ortho_config(default = 5)]
    pub auth_rate_limit: u32,
    /// Credential throttling window in seconds.
    #[ortho_config(default = 60)]
    pub auth_rate_window_secs: u64,
    /// Email of a super admin created at startup when missing.
    pub admin_email: Option<String>,
    /// Password of the bootstrap super admin.
    pub admin_password: Option<String>,
}

/// Settings that cannot start a server.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings could not be read.
    #[error("failed to load settings: {0}")]
    Load(String),
    /// The bind address does not parse.
    #[error("invalid bind address {value}: {message}")]
    BindAddr {
        /// Rejected value.
        value: String,
        /// Parser message.
        message: String,
    },
    /// Encryption is on but no key was supplied.
    #[error("encryption is enabled but STOCKDESK_ENCRYPTION_KEY is not set")]
    MissingEncryptionKey,
    /// The encryption key is unusable.
    #[error(transparent)]
    EncryptionKey(#[from] CipherKeyError),
    /// Release builds need a stable token secret.
    #[error("STOCKDESK_JWT_SECRET must be set in release builds")]
    MissingJwtSecret,
    /// The fixed development code would let anyone pass verification.
    #[error("STOCKDESK_DEBUG_OTP must not be enabled in release builds")]
    DebugOtpInRelease,
    /// Bootstrap admin settings are incomplete or invalid.
    #[error("invalid bootstrap admin: {0}")]
    BootstrapAdmin(String),
}

/// Credentials of the super admin ensured at startup.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub(crate) email: EmailAddress,
    pub(crate) password: Zeroizing<String>,
}

/// Validated server configuration.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) cipher: Option<AesGcmPayloadCipher>,
    pub(crate) jwt_secret: Zeroizing<Vec<u8>>,
    pub(crate) token_ttl: TimeDelta,
    pub(crate) otp: OtpSettings,
    pub(crate) redis_url: Option<String>,
    pub(crate) cache_ttl: Duration,
    pub(crate) audit_capacity: usize,
    pub(crate) rate_limit: RateLimit,
    pub(crate) bootstrap_admin: Option<BootstrapAdmin>,
}

impl ServerConfig {
    /// Load settings from the process environment and arguments.
    pub fn load() -> Result<Self, ConfigError> {
        let settings =
            AppSettings::load().map_err(|error| ConfigError::Load(error.to_string()))?;
        Self::from_settings(settings, cfg!(debug_assertions))
    }

    /// Validate `settings`. `development` relaxes the release-only rules.
    pub fn from_settings(settings: AppSettings, development: bool) -> Result<Self, ConfigError> {
        let raw_addr = settings
            .bind_addr
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
        let bind_addr = raw_addr
            .parse()
            .map_err(|error: std::net::AddrParseError| ConfigError::BindAddr {
                message: error.to_string(),
                value: raw_addr.clone(),
            })?;

        let cipher = if settings.encryption_enabled {
            let material = settings
                .encryption_key
                .as_deref()
                .ok_or(ConfigError::MissingEncryptionKey)?;
            Some(AesGcmPayloadCipher::from_key_material(material)?)
        } else {
            None
        };

        let jwt_secret = match settings.jwt_secret {
            Some(secret) if !secret.is_empty() => Zeroizing::new(secret.into_bytes()),
            _ if development => {
                warn!("using an ephemeral token secret (development only)");
                let mut secret = vec![0_u8; EPHEMERAL_SECRET_LEN];
                rand::thread_rng().fill_bytes(&mut secret);
                Zeroizing::new(secret)
            }
            _ => return Err(ConfigError::MissingJwtSecret),
        };

        if settings.debug_otp && !development {
            return Err(ConfigError::DebugOtpInRelease);
        }

        let bootstrap_admin = match (settings.admin_email, settings.admin_password) {
            (None, None) => None,
            (Some(email), Some(password)) if !password.is_empty() => Some(BootstrapAdmin {
                email: EmailAddress::new(email)
                    .map_err(|error| ConfigError::BootstrapAdmin(error.to_string()))?,
                password: Zeroizing::new(password),
            }),
            _ => {
                return Err(ConfigError::BootstrapAdmin(
                    "email and password must both be set".to_owned(),
                ));
            }
        };

        Ok(Self {
            bind_addr,
            cipher,
            jwt_secret,
            token_ttl: seconds(settings.token_ttl_secs),
            otp: OtpSettings {
                ttl: seconds(settings.otp_ttl_secs),
                debug_otp: settings.debug_otp,
            },
            redis_url: settings.redis_url.filter(|url| !url.trim().is_empty()),
            cache_ttl: Duration::from_secs(settings.cache_ttl_secs),
            audit_capacity: settings.audit_queue_capacity,
            rate_limit: RateLimit {
                max_requests: settings.auth_rate_limit,
                window: seconds(settings.auth_rate_window_secs),
            },
            bootstrap_admin,
        })
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

fn seconds(value: u64) -> TimeDelta {
    TimeDelta::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    //! Settings loading and validation.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::{fixture, rstest};

    const VARS: [&str; 8] = [
        "STOCKDESK_BIND_ADDR",
        "STOCKDESK_ENCRYPTION_ENABLED",
        "STOCKDESK_ENCRYPTION_KEY",
        "STOCKDESK_JWT_SECRET",
        "STOCKDESK_DEBUG_OTP",
        "STOCKDESK_REDIS_URL",
        "STOCKDESK_AUTH_RATE_LIMIT",
        "STOCKDESK_AUTH_RATE_WINDOW_SECS",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("stockdesk")]).expect("settings should load")
    }

    #[fixture]
    fn settings() -> AppSettings {
        AppSettings {
            bind_addr: None,
            encryption_enabled: false,
            encryption_key: None,
            jwt_secret: Some("secret".to_owned()),
            token_ttl_secs: 60,
            otp_ttl_secs: 600,
            debug_otp: false,
            redis_url: None,
            cache_ttl_secs: 60,
            audit_queue_capacity: 8,
            auth_rate_limit: 5,
            auth_rate_window_secs: 60,
            admin_email: None,
            admin_password: None,
        }
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let loaded = load_from_empty_args();
        assert!(!loaded.encryption_enabled);
        assert!(!loaded.debug_otp);
        assert_eq!(loaded.token_ttl_secs, 86_400);
        assert_eq!(loaded.otp_ttl_secs, 600);
        assert_eq!(loaded.audit_queue_capacity, 1_024);
        assert_eq!(loaded.auth_rate_limit, 5);
        assert_eq!(loaded.auth_rate_window_secs, 60);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("STOCKDESK_BIND_ADDR", Some("127.0.0.1:9000".to_owned())),
            ("STOCKDESK_ENCRYPTION_ENABLED", Some("true".to_owned())),
            ("STOCKDESK_ENCRYPTION_KEY", Some("ab".repeat(32))),
            ("STOCKDESK_JWT_SECRET", Some("s3cret".to_owned())),
            ("STOCKDESK_DEBUG_OTP", None),
            ("STOCKDESK_REDIS_URL", None),
            ("STOCKDESK_AUTH_RATE_LIMIT", Some("10".to_owned())),
            ("STOCKDESK_AUTH_RATE_WINDOW_SECS", None),
        ]);

        let config =
            ServerConfig::from_settings(load_from_empty_args(), false).expect("valid settings");
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.rate_limit.window, TimeDelta::minutes(1));
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:9000");
        assert!(config.cipher.is_some());
        assert_eq!(config.jwt_secret.as_slice(), b"s3cret");
    }

    #[rstest]
    fn default_bind_addr_is_used(settings: AppSettings) {
        let config = ServerConfig::from_settings(settings, false).expect("valid settings");
        assert_eq!(config.bind_addr().to_string(), DEFAULT_BIND_ADDR);
        assert!(config.cipher.is_none());
        assert!(config.redis_url.is_none());
        assert_eq!(config.rate_limit, RateLimit::default());
    }

    #[rstest]
    fn enabled_encryption_needs_a_key(mut settings: AppSettings) {
        settings.encryption_enabled = true;
        let error = ServerConfig::from_settings(settings, true).err();
        assert!(matches!(error, Some(ConfigError::MissingEncryptionKey)));
    }

    #[rstest]
    fn malformed_keys_are_rejected(mut settings: AppSettings) {
        settings.encryption_enabled = true;
        settings.encryption_key = Some("not a key".to_owned());
        let error = ServerConfig::from_settings(settings, true).err();
        assert!(matches!(error, Some(ConfigError::EncryptionKey(_))));
    }

    #[rstest]
    #[case(true, true)]
    #[case(false, false)]
    fn token_secret_is_optional_only_in_development(
        mut settings: AppSettings,
        #[case] development: bool,
        #[case] accepted: bool,
    ) {
        settings.jwt_secret = None;
        let result = ServerConfig::from_settings(settings, development);
        assert_eq!(result.is_ok(), accepted);
        if let Ok(config) = result {
            assert_eq!(config.jwt_secret.len(), EPHEMERAL_SECRET_LEN);
        }
    }

    #[rstest]
    fn release_builds_reject_the_fixed_code(mut settings: AppSettings) {
        settings.debug_otp = true;
        let error = ServerConfig::from_settings(settings, false).err();
        assert!(matches!(error, Some(ConfigError::DebugOtpInRelease)));
    }

    #[rstest]
    #[case(Some("root@example.com"), None)]
    #[case(None, Some("Sup3r$ecret"))]
    #[case(Some("not-an-email"), Some("Sup3r$ecret"))]
    fn bootstrap_admin_needs_valid_pair(
        mut settings: AppSettings,
        #[case] email: Option<&str>,
        #[case] password: Option<&str>,
    ) {
        settings.admin_email = email.map(str::to_owned);
        settings.admin_password = password.map(str::to_owned);
        let error = ServerConfig::from_settings(settings, true).err();
        assert!(matches!(error, Some(ConfigError::BootstrapAdmin(_))));
    }

    #[rstest]
    fn invalid_bind_addr_is_reported(mut settings: AppSettings) {
        settings.bind_addr = Some("nowhere".to_owned());
        let error = ServerConfig::from_settings(settings, true).err();
        assert!(matches!(error, Some(ConfigError::BindAddr { .. })));
    }
}
