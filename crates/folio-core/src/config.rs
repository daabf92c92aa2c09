//! Configuration module
//!
//! Server, upload and transcoder settings, loaded from the environment (and an
//! optional `.env` file).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const SERVER_PORT: u16 = 3000;
const MAX_FILE_SIZE_MB: usize = 10;
const MAX_REQUEST_BODY_MB: usize = 25;
const UPLOAD_RATE_LIMIT: u32 = 10;
const UPLOAD_RATE_WINDOW_SECS: u64 = 60;
const UPLOAD_TIMEOUT_SECS: u64 = 30;
const TRUSTED_PROXY_COUNT: usize = 1;
const MIN_TOKEN_LENGTH: usize = 32;

/// Settings for the image pipeline.
///
/// Built explicitly and handed to the pipeline, so several independent
/// pipelines (e.g. in tests) can coexist in one process.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscoderConfig {
    /// Longest edge allowed for a stored original.
    pub max_dimension: u32,
    pub webp_quality: f32,
    /// libwebp `method` (0 = fastest, 6 = slowest).
    pub webp_method: i32,
    pub thumbnail_width: u32,
    pub thumbnail_quality: f32,
    /// JPEG quality of the raster produced from HEIC input.
    pub heic_intermediate_quality: f32,
    pub max_input_pixels: u64,
    pub max_decode_bytes: u64,
    pub max_concurrent_jobs: usize,
}

impl TranscoderConfig {
    pub const DEFAULT_MAX_DIMENSION: u32 = 2500;
    pub const DEFAULT_MAX_INPUT_PIXELS: u64 = 268_402_689;
    pub const DEFAULT_MAX_DECODE_MB: u64 = 512;
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            max_dimension: Self::DEFAULT_MAX_DIMENSION,
            webp_quality: 85.0,
            webp_method: 4,
            thumbnail_width: 800,
            thumbnail_quality: 80.0,
            heic_intermediate_quality: 95.0,
            max_input_pixels: Self::DEFAULT_MAX_INPUT_PIXELS,
            max_decode_bytes: Self::DEFAULT_MAX_DECODE_MB * 1024 * 1024,
            max_concurrent_jobs: 1,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub upload_dir: PathBuf,
    /// URL prefix under which stored files are served, e.g. `/api/uploads`.
    pub upload_public_path: String,
    pub max_file_size_bytes: usize,
    pub max_request_body_bytes: usize,
    pub upload_rate_limit: u32,
    pub upload_rate_window_secs: u64,
    pub upload_timeout_secs: u64,
    pub trusted_proxy_count: usize,
    pub admin_username: String,
    pub admin_api_token: String,
    pub transcoder: TranscoderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            upload_dir: PathBuf::from("./uploads"),
            upload_public_path: "/api/uploads".to_string(),
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            max_request_body_bytes: MAX_REQUEST_BODY_MB * 1024 * 1024,
            upload_rate_limit: UPLOAD_RATE_LIMIT,
            upload_rate_window_secs: UPLOAD_RATE_WINDOW_SECS,
            upload_timeout_secs: UPLOAD_TIMEOUT_SECS,
            trusted_proxy_count: TRUSTED_PROXY_COUNT,
            admin_username: "admin".to_string(),
            admin_api_token: String::new(),
            transcoder: TranscoderConfig::default(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let admin_api_token = env::var("ADMIN_API_TOKEN")
            .map_err(|_| anyhow::anyhow!("ADMIN_API_TOKEN environment variable not set"))?;

        let transcoder = TranscoderConfig {
            max_input_pixels: env_or(
                "TRANSCODER_MAX_INPUT_PIXELS",
                TranscoderConfig::DEFAULT_MAX_INPUT_PIXELS,
            ),
            max_decode_bytes: env_or(
                "TRANSCODER_MAX_DECODE_MB",
                TranscoderConfig::DEFAULT_MAX_DECODE_MB,
            ) * 1024
                * 1024,
            max_concurrent_jobs: env_or("TRANSCODER_MAX_CONCURRENT_JOBS", 1usize).max(1),
            ..TranscoderConfig::default()
        };

        let config = Config {
            server_port: env_or("PORT", SERVER_PORT),
            environment,
            cors_origins,
            upload_dir: PathBuf::from(
                env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            ),
            upload_public_path: env::var("UPLOAD_PUBLIC_PATH")
                .unwrap_or_else(|_| "/api/uploads".to_string()),
            max_file_size_bytes: env_or("MAX_FILE_SIZE_MB", MAX_FILE_SIZE_MB) * 1024 * 1024,
            max_request_body_bytes: env_or("MAX_REQUEST_BODY_MB", MAX_REQUEST_BODY_MB)
                * 1024
                * 1024,
            upload_rate_limit: env_or("UPLOAD_RATE_LIMIT", UPLOAD_RATE_LIMIT),
            upload_rate_window_secs: env_or("UPLOAD_RATE_WINDOW_SECS", UPLOAD_RATE_WINDOW_SECS),
            upload_timeout_secs: env_or("UPLOAD_TIMEOUT_SECS", UPLOAD_TIMEOUT_SECS),
            trusted_proxy_count: env_or("TRUSTED_PROXY_COUNT", TRUSTED_PROXY_COUNT),
            admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            admin_api_token,
            transcoder,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.admin_api_token.is_empty() {
            return Err(anyhow::anyhow!("ADMIN_API_TOKEN must not be empty"));
        }

        if self.is_production() && self.admin_api_token.len() < MIN_TOKEN_LENGTH {
            return Err(anyhow::anyhow!(
                "ADMIN_API_TOKEN must be at least {} characters long in production",
                MIN_TOKEN_LENGTH
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.max_request_body_bytes < self.max_file_size_bytes {
            return Err(anyhow::anyhow!(
                "MAX_REQUEST_BODY_MB must be at least MAX_FILE_SIZE_MB"
            ));
        }

        if self.upload_rate_limit == 0 || self.upload_rate_window_secs == 0 {
            return Err(anyhow::anyhow!(
                "UPLOAD_RATE_LIMIT and UPLOAD_RATE_WINDOW_SECS must be greater than 0"
            ));
        }

        if !self.upload_public_path.starts_with('/') {
            return Err(anyhow::anyhow!("UPLOAD_PUBLIC_PATH must start with '/'"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn upload_rate_window(&self) -> Duration {
        Duration::from_secs(self.upload_rate_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            admin_api_token: "a".repeat(32),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_transcoder_config() {
        let config = TranscoderConfig::default();
        assert_eq!(config.max_dimension, 2500);
        assert_eq!(config.webp_quality, 85.0);
        assert_eq!(config.thumbnail_width, 800);
        assert_eq!(config.thumbnail_quality, 80.0);
        assert_eq!(config.max_concurrent_jobs, 1);
        assert_eq!(config.max_input_pixels, 268_402_689);
    }

    #[test]
    fn test_default_upload_limits() {
        let config = Config::default();
        assert_eq!(config.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.upload_rate_limit, 10);
        assert_eq!(config.upload_rate_window(), Duration::from_secs(60));
        assert_eq!(config.upload_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validate_accepts_defaults_with_token() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wildcard_cors_in_production() {
        let config = Config {
            environment: "production".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_body_limit_below_file_limit() {
        let config = Config {
            max_request_body_bytes: 1024,
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_production() {
        let mut config = valid_config();
        assert!(!config.is_production());
        config.environment = "PROD".to_string();
        assert!(config.is_production());
    }
}
