use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            intake: IntakeConfig::from_env()?,
        })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Knobs for report intake: reward size, duplicate detection and photo acceptance.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeConfig {
    pub reward_amount: f64,
    pub duplicate_radius_meters: f64,
    pub duplicate_window: usize,
    pub photo_extensions: Vec<String>,
    pub max_photo_bytes: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            reward_amount: 20.0,
            duplicate_radius_meters: 30.0,
            duplicate_window: 200,
            photo_extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
            max_photo_bytes: 8 * 1024 * 1024,
        }
    }
}

impl IntakeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let reward_amount = match env::var("APP_REWARD_AMOUNT") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite() && *value > 0.0)
                .ok_or(ConfigError::InvalidRewardAmount)?,
            Err(_) => defaults.reward_amount,
        };

        let duplicate_radius_meters = match env::var("APP_DUPLICATE_RADIUS_M") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite() && *value >= 0.0)
                .ok_or(ConfigError::InvalidDuplicateRadius)?,
            Err(_) => defaults.duplicate_radius_meters,
        };

        let duplicate_window = match env::var("APP_DUPLICATE_WINDOW") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidDuplicateWindow)?,
            Err(_) => defaults.duplicate_window,
        };

        let photo_extensions = match env::var("APP_PHOTO_EXTENSIONS") {
            Ok(raw) => {
                let parsed: Vec<String> = raw
                    .split(',')
                    .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect();
                if parsed.is_empty() {
                    return Err(ConfigError::EmptyPhotoExtensions);
                }
                parsed
            }
            Err(_) => defaults.photo_extensions,
        };

        let max_photo_bytes = match env::var("APP_MAX_PHOTO_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidMaxPhotoBytes)?,
            Err(_) => defaults.max_photo_bytes,
        };

        Ok(Self {
            reward_amount,
            duplicate_radius_meters,
            duplicate_window,
            photo_extensions,
            max_photo_bytes,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidRewardAmount,
    InvalidDuplicateRadius,
    InvalidDuplicateWindow,
    EmptyPhotoExtensions,
    InvalidMaxPhotoBytes,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidRewardAmount => {
                write!(f, "APP_REWARD_AMOUNT must be a positive number")
            }
            ConfigError::InvalidDuplicateRadius => {
                write!(f, "APP_DUPLICATE_RADIUS_M must be a non-negative number")
            }
            ConfigError::InvalidDuplicateWindow => {
                write!(f, "APP_DUPLICATE_WINDOW must be a positive integer")
            }
            ConfigError::EmptyPhotoExtensions => {
                write!(f, "APP_PHOTO_EXTENSIONS must list at least one extension")
            }
            ConfigError::InvalidMaxPhotoBytes => {
                write!(f, "APP_MAX_PHOTO_BYTES must be a valid byte count")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_REWARD_AMOUNT",
            "APP_DUPLICATE_RADIUS_M",
            "APP_DUPLICATE_WINDOW",
            "APP_PHOTO_EXTENSIONS",
            "APP_MAX_PHOTO_BYTES",
        ] {
            env::remove_var(key);
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
        assert_eq!(config.intake, IntakeConfig::default());
        assert_eq!(config.intake.duplicate_window, 200);
        assert!((config.intake.reward_amount - 20.0).abs() < f64::EPSILON);
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
    fn intake_overrides_are_parsed() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_REWARD_AMOUNT", "35.5");
        env::set_var("APP_DUPLICATE_RADIUS_M", "12");
        env::set_var("APP_DUPLICATE_WINDOW", "50");
        env::set_var("APP_PHOTO_EXTENSIONS", ".JPG, png ,");
        let config = AppConfig::load().expect("config loads");
        assert!((config.intake.reward_amount - 35.5).abs() < f64::EPSILON);
        assert!((config.intake.duplicate_radius_meters - 12.0).abs() < f64::EPSILON);
        assert_eq!(config.intake.duplicate_window, 50);
        assert_eq!(config.intake.photo_extensions, vec!["jpg", "png"]);
        reset_env();
    }

    #[test]
    fn rejects_non_positive_reward() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_REWARD_AMOUNT", "-5");
        let err = AppConfig::load().expect_err("negative reward rejected");
        assert!(matches!(err, ConfigError::InvalidRewardAmount));
        reset_env();
    }

    #[test]
    fn rejects_zero_duplicate_window() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DUPLICATE_WINDOW", "0");
        let err = AppConfig::load().expect_err("zero window rejected");
        assert!(matches!(err, ConfigError::InvalidDuplicateWindow));
        reset_env();
    }
}
