use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::workflows::documents::{
    AutomationConfig, AutomationFlags, ReadinessConfig, ReadinessWeights,
};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
///
/// The automation and readiness sections carry the product constants as
/// defaults; every threshold can be overridden per deployment through the
/// corresponding `APP_*` variable.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub automation_flags: AutomationFlags,
    pub automation: AutomationConfig,
    pub readiness: ReadinessConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let automation_flags = AutomationFlags {
            auto_link: flag_from_env("APP_AUTO_LINK", true)?,
            auto_create_draft: flag_from_env("APP_AUTO_CREATE_DRAFTS", true)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            automation_flags,
            automation: automation_from_env()?,
            readiness: readiness_from_env()?,
        })
    }
}

fn automation_from_env() -> Result<AutomationConfig, ConfigError> {
    let defaults = AutomationConfig::default();
    Ok(AutomationConfig {
        min_match_score: number_from_env("APP_MIN_MATCH_SCORE", defaults.min_match_score)?,
        min_ai_confidence: number_from_env("APP_MIN_AI_CONFIDENCE", defaults.min_ai_confidence)?,
        fuzzy_floor: number_from_env("APP_FUZZY_FLOOR", defaults.fuzzy_floor)?,
        duplicate_lookback_days: number_from_env(
            "APP_DUPLICATE_LOOKBACK_DAYS",
            defaults.duplicate_lookback_days,
        )?,
        ..defaults
    })
}

fn readiness_from_env() -> Result<ReadinessConfig, ConfigError> {
    let defaults = ReadinessConfig::default();
    let weights = defaults.weights;
    Ok(ReadinessConfig {
        min_confidence: number_from_env("APP_READINESS_MIN_CONFIDENCE", defaults.min_confidence)?,
        high_confidence_share_gate: number_from_env(
            "APP_READINESS_HIGH_CONFIDENCE_GATE",
            defaults.high_confidence_share_gate,
        )?,
        exception_rate_gate: number_from_env(
            "APP_READINESS_EXCEPTION_RATE_GATE",
            defaults.exception_rate_gate,
        )?,
        stable_counterparty_documents: number_from_env(
            "APP_READINESS_STABLE_DOCUMENTS",
            defaults.stable_counterparty_documents,
        )?,
        stable_counterparty_gate: number_from_env(
            "APP_READINESS_STABLE_COUNTERPARTIES",
            defaults.stable_counterparty_gate,
        )?,
        volume_gate: number_from_env("APP_READINESS_VOLUME_GATE", defaults.volume_gate)?,
        stuck_after_days: number_from_env(
            "APP_READINESS_STUCK_AFTER_DAYS",
            defaults.stuck_after_days,
        )?,
        weights: ReadinessWeights {
            high_confidence_share: number_from_env(
                "APP_READINESS_WEIGHT_CONFIDENCE",
                weights.high_confidence_share,
            )?,
            alias_exception_rate: number_from_env(
                "APP_READINESS_WEIGHT_EXCEPTIONS",
                weights.alias_exception_rate,
            )?,
            stable_counterparties: number_from_env(
                "APP_READINESS_WEIGHT_STABILITY",
                weights.stable_counterparties,
            )?,
            document_volume: number_from_env(
                "APP_READINESS_WEIGHT_VOLUME",
                weights.document_volume,
            )?,
        },
    })
}

fn flag_from_env(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name }),
        },
    }
}

fn number_from_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { name: &'static str },
    InvalidNumber { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag { name } => {
                write!(f, "{name} must be a boolean (true/false)")
            }
            ConfigError::InvalidNumber { name } => {
                write!(f, "{name} must be a number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidFlag { .. }
            | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_AUTO_LINK",
            "APP_AUTO_CREATE_DRAFTS",
            "APP_MIN_MATCH_SCORE",
            "APP_MIN_AI_CONFIDENCE",
            "APP_FUZZY_FLOOR",
            "APP_DUPLICATE_LOOKBACK_DAYS",
            "APP_READINESS_MIN_CONFIDENCE",
            "APP_READINESS_HIGH_CONFIDENCE_GATE",
            "APP_READINESS_EXCEPTION_RATE_GATE",
            "APP_READINESS_STABLE_DOCUMENTS",
            "APP_READINESS_STABLE_COUNTERPARTIES",
            "APP_READINESS_VOLUME_GATE",
            "APP_READINESS_STUCK_AFTER_DAYS",
            "APP_READINESS_WEIGHT_CONFIDENCE",
            "APP_READINESS_WEIGHT_EXCEPTIONS",
            "APP_READINESS_WEIGHT_STABILITY",
            "APP_READINESS_WEIGHT_VOLUME",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.automation_flags.auto_link);
        assert!(config.automation_flags.auto_create_draft);
        assert_eq!(config.automation, AutomationConfig::default());
        assert_eq!(config.readiness, ReadinessConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn automation_flags_parse_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_AUTO_CREATE_DRAFTS", "off");
        let config = AppConfig::load().expect("config loads");
        assert!(config.automation_flags.auto_link);
        assert!(!config.automation_flags.auto_create_draft);

        env::set_var("APP_AUTO_LINK", "maybe");
        let error = AppConfig::load().expect_err("invalid flag rejected");
        assert!(matches!(error, ConfigError::InvalidFlag { name: "APP_AUTO_LINK" }));
        reset_env();
    }

    #[test]
    fn thresholds_override_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MIN_MATCH_SCORE", "0.97");
        env::set_var("APP_DUPLICATE_LOOKBACK_DAYS", "90");
        env::set_var("APP_READINESS_VOLUME_GATE", "25");
        env::set_var("APP_READINESS_WEIGHT_VOLUME", "0.10");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.automation.min_match_score, 0.97);
        assert_eq!(config.automation.duplicate_lookback_days, 90);
        // Untouched knobs keep the product defaults.
        assert_eq!(config.automation.min_ai_confidence, 0.92);
        assert_eq!(config.readiness.volume_gate, 25);
        assert_eq!(config.readiness.weights.document_volume, 0.10);
        assert_eq!(config.readiness.weights.high_confidence_share, 0.35);
        reset_env();
    }

    #[test]
    fn garbage_thresholds_are_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_FUZZY_FLOOR", "very low");
        let error = AppConfig::load().expect_err("invalid number rejected");
        assert!(matches!(
            error,
            ConfigError::InvalidNumber { name: "APP_FUZZY_FLOOR" }
        ));
        reset_env();
    }
}
