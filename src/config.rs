use std::env;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    pub reset_token_ttl_minutes: i64,
    pub verification_token_ttl_hours: i64,
}

/// External provider configuration (email, push, identity, data feed,
/// model service)
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub push_api_url: Option<String>,
    pub identity_userinfo_url: Option<String>,
    pub feed_api_url: Option<String>,
    pub model_api_url: String,
    pub request_timeout_secs: u64,
}

/// Per-client request limits
#[derive(Debug, Clone)]
pub struct LimitConfig {
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
    pub api_keys_max_per_user: i64,
}

/// Background task scheduling
#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub odds_sync_interval_secs: u64,
    pub notification_dispatch_interval_secs: u64,
    pub cleanup_interval_secs: u64,
    pub training_check_interval_secs: u64,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub providers: ProviderConfig,
    pub limits: LimitConfig,
    pub tasks: TaskConfig,
    pub log_level: String,
    pub http_port: u16,
    pub environment: String,
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(10);

        let acquire_timeout_secs = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let idle_timeout_secs = env::var("DATABASE_IDLE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(600); // 10 minutes

        let max_lifetime_secs = env::var("DATABASE_MAX_LIFETIME_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1800); // 30 minutes

        let test_before_acquire = env::var("DATABASE_TEST_BEFORE_ACQUIRE")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
            .unwrap_or(true);

        // Validate configuration
        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/turf".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl AuthConfig {
    /// Create auth config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET environment variable is required")?;

        if jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 bytes".to_string());
        }

        let access_token_ttl_minutes = env::var("ACCESS_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(15);

        let refresh_token_ttl_days = env::var("REFRESH_TOKEN_TTL_DAYS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(30);

        let reset_token_ttl_minutes = env::var("RESET_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(60);

        let verification_token_ttl_hours = env::var("VERIFICATION_TOKEN_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(48);

        if access_token_ttl_minutes <= 0 {
            return Err("ACCESS_TOKEN_TTL_MINUTES must be greater than 0".to_string());
        }

        Ok(Self {
            jwt_secret,
            access_token_ttl_minutes,
            refresh_token_ttl_days,
            reset_token_ttl_minutes,
            verification_token_ttl_hours,
        })
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "insecure-development-secret-0123456789ab".to_string(),
            access_token_ttl_minutes: 15,
            refresh_token_ttl_days: 30,
            reset_token_ttl_minutes: 60,
            verification_token_ttl_hours: 48,
        }
    }
}

impl ProviderConfig {
    /// Create provider config from environment variables
    ///
    /// Email, push and federated identity are optional: when the URL is
    /// absent the corresponding client degrades to a logged no-op.
    pub fn from_env() -> Result<Self, String> {
        let email_api_url = env::var("EMAIL_API_URL").ok();
        let email_api_key = env::var("EMAIL_API_KEY").ok();

        let email_from = env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "no-reply@turf.example".to_string());

        let push_api_url = env::var("PUSH_API_URL").ok();
        let identity_userinfo_url = env::var("IDENTITY_USERINFO_URL").ok();
        let feed_api_url = env::var("FEED_API_URL").ok();

        let model_api_url = env::var("MODEL_API_URL")
            .unwrap_or_else(|_| "http://localhost:8501".to_string());

        let request_timeout_secs = env::var("PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);

        if request_timeout_secs == 0 {
            return Err("PROVIDER_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            email_api_url,
            email_api_key,
            email_from,
            push_api_url,
            identity_userinfo_url,
            feed_api_url,
            model_api_url,
            request_timeout_secs,
        })
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            email_api_url: None,
            email_api_key: None,
            email_from: "no-reply@turf.example".to_string(),
            push_api_url: None,
            identity_userinfo_url: None,
            feed_api_url: None,
            model_api_url: "http://localhost:8501".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl LimitConfig {
    /// Create limit config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let rate_limit_max_requests = env::var("RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(120);

        let rate_limit_window_secs = env::var("RATE_LIMIT_WINDOW_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);

        let api_keys_max_per_user = env::var("API_KEYS_MAX_PER_USER")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(5);

        if rate_limit_max_requests == 0 {
            return Err("RATE_LIMIT_MAX_REQUESTS must be greater than 0".to_string());
        }

        if api_keys_max_per_user <= 0 {
            return Err("API_KEYS_MAX_PER_USER must be greater than 0".to_string());
        }

        Ok(Self {
            rate_limit_max_requests,
            rate_limit_window_secs,
            api_keys_max_per_user,
        })
    }

    /// Get rate limit window as Duration
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            rate_limit_max_requests: 120,
            rate_limit_window_secs: 60,
            api_keys_max_per_user: 5,
        }
    }
}

impl TaskConfig {
    /// Create task config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let odds_sync_interval_secs = env::var("ODDS_SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(300);

        let notification_dispatch_interval_secs = env::var("NOTIFICATION_DISPATCH_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);

        let cleanup_interval_secs = env::var("CLEANUP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(3600);

        let training_check_interval_secs = env::var("TRAINING_CHECK_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(21600); // 6 hours

        Ok(Self {
            odds_sync_interval_secs,
            notification_dispatch_interval_secs,
            cleanup_interval_secs,
            training_check_interval_secs,
        })
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            odds_sync_interval_secs: 300,
            notification_dispatch_interval_secs: 30,
            cleanup_interval_secs: 3600,
            training_check_interval_secs: 21600,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let auth = AuthConfig::from_env()?;
        let providers = ProviderConfig::from_env()?;
        let limits = LimitConfig::from_env()?;
        let tasks = TaskConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string());

        let http_port = env::var("HTTP_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);

        let environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            database,
            auth,
            providers,
            limits,
            tasks,
            log_level: log_level.to_lowercase(),
            http_port,
            environment: environment.to_lowercase(),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Get database URL (convenience method)
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            providers: ProviderConfig::default(),
            limits: LimitConfig::default(),
            tasks: TaskConfig::default(),
            log_level: "info".to_string(),
            http_port: 8080,
            environment: "development".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout_secs, 30);
    }

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert_eq!(config.access_token_ttl_minutes, 15);
        assert_eq!(config.refresh_token_ttl_days, 30);
        assert!(config.jwt_secret.len() >= 32);
    }

    #[test]
    fn test_limit_config_default() {
        let config = LimitConfig::default();
        assert_eq!(config.rate_limit_max_requests, 120);
        assert_eq!(config.api_keys_max_per_user, 5);
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.http_port, 8080);
        assert!(config.is_development());
        assert!(!config.is_production());
    }
}
