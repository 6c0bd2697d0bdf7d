use crate::models::StockStatus;
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

/// Price engine configuration
#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// A snapshot younger than this is served without recomputing
    pub staleness_threshold_secs: u64,
    pub history_retention_days: u32,
    /// 0 disables the retention sweeper
    pub prune_interval_secs: u64,
    /// 0 disables the batch refresher
    pub batch_refresh_interval_secs: u64,
    pub batch_refresh_size: u32,
    /// Upper bound on every outbound signal call
    pub signal_timeout_secs: u64,
    /// Statuses the staleness gate is allowed to recompute
    pub recompute_statuses: Vec<StockStatus>,
    pub cron_secret: Option<String>,
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub backfill_history_on_start: bool,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub market: MarketConfig,
    pub log_level: String,
    pub log_format: String,
    pub http_port: u16,
    pub environment: String,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let config = Self {
            url,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            acquire_timeout_secs: env_parse("DATABASE_ACQUIRE_TIMEOUT_SECS", 30),
            idle_timeout_secs: env_parse("DATABASE_IDLE_TIMEOUT_SECS", 600), // 10 minutes
            max_lifetime_secs: env_parse("DATABASE_MAX_LIFETIME_SECS", 1800), // 30 minutes
            test_before_acquire: env_parse("DATABASE_TEST_BEFORE_ACQUIRE", true),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if self.acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(())
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
            url: "postgresql://localhost/movie_market".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

/// Parse a comma separated status list such as `ACTIVE,UPCOMING`
pub fn parse_status_list(raw: &str) -> Result<Vec<StockStatus>, String> {
    let mut statuses = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let status = StockStatus::from_str(part)?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }

    if statuses.is_empty() {
        return Err("RECOMPUTE_STATUSES must name at least one status".to_string());
    }

    Ok(statuses)
}

impl MarketConfig {
    /// Create market config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let recompute_statuses = match env_non_empty("RECOMPUTE_STATUSES") {
            Some(raw) => parse_status_list(&raw)?,
            None => StockStatus::ALL.to_vec(),
        };

        let config = Self {
            staleness_threshold_secs: env_parse("STALENESS_THRESHOLD_SECS", 3600),
            history_retention_days: env_parse("HISTORY_RETENTION_DAYS", 7),
            prune_interval_secs: env_parse("PRUNE_INTERVAL_SECS", 86_400),
            batch_refresh_interval_secs: env_parse("BATCH_REFRESH_INTERVAL_SECS", 300),
            batch_refresh_size: env_parse("BATCH_REFRESH_SIZE", 5),
            signal_timeout_secs: env_parse("SIGNAL_TIMEOUT_SECS", 5),
            recompute_statuses,
            cron_secret: env_non_empty("CRON_SECRET"),
            tmdb_api_key: env_non_empty("TMDB_API_KEY"),
            tmdb_base_url: env_non_empty("TMDB_BASE_URL")
                .unwrap_or_else(|| "https://api.themoviedb.org/3".to_string()),
            backfill_history_on_start: env_parse("BACKFILL_HISTORY_ON_START", false),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.staleness_threshold_secs == 0 {
            return Err("STALENESS_THRESHOLD_SECS must be greater than 0".to_string());
        }

        if self.history_retention_days == 0 {
            return Err("HISTORY_RETENTION_DAYS must be greater than 0".to_string());
        }

        if !(1..=10).contains(&self.batch_refresh_size) {
            return Err(format!(
                "BATCH_REFRESH_SIZE must be between 1 and 10, got {}",
                self.batch_refresh_size
            ));
        }

        // Outbound calls must stay in single digit seconds
        if !(1..=9).contains(&self.signal_timeout_secs) {
            return Err(format!(
                "SIGNAL_TIMEOUT_SECS must be between 1 and 9, got {}",
                self.signal_timeout_secs
            ));
        }

        if self.recompute_statuses.is_empty() {
            return Err("RECOMPUTE_STATUSES must name at least one status".to_string());
        }

        Ok(())
    }

    pub fn staleness_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.staleness_threshold_secs as i64)
    }

    pub fn history_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.history_retention_days as i64)
    }

    pub fn signal_timeout(&self) -> Duration {
        Duration::from_secs(self.signal_timeout_secs)
    }

    pub fn prune_interval(&self) -> Option<Duration> {
        (self.prune_interval_secs > 0).then(|| Duration::from_secs(self.prune_interval_secs))
    }

    pub fn batch_refresh_interval(&self) -> Option<Duration> {
        (self.batch_refresh_interval_secs > 0)
            .then(|| Duration::from_secs(self.batch_refresh_interval_secs))
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_secs: 3600,
            history_retention_days: 7,
            prune_interval_secs: 86_400,
            batch_refresh_interval_secs: 300,
            batch_refresh_size: 5,
            signal_timeout_secs: 5,
            recompute_statuses: StockStatus::ALL.to_vec(),
            cron_secret: None,
            tmdb_api_key: None,
            tmdb_base_url: "https://api.themoviedb.org/3".to_string(),
            backfill_history_on_start: false,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let market = MarketConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
        let http_port = env_parse("HTTP_PORT", 8080u16);
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&log_format.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: {:?}",
                log_format, valid_log_formats
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
            market,
            log_level: log_level.to_lowercase(),
            log_format: log_format.to_lowercase(),
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

    pub fn json_logs(&self) -> bool {
        self.log_format == "json"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            market: MarketConfig::default(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
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
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.http_port, 8080);
        assert!(config.is_development());
        assert!(!config.is_production());
        assert!(!config.json_logs());
    }

    #[test]
    fn test_market_config_default() {
        let config = MarketConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.staleness_threshold(), chrono::Duration::hours(1));
        assert_eq!(config.history_retention(), chrono::Duration::days(7));
        assert_eq!(config.recompute_statuses.len(), 3);
        assert!(config.cron_secret.is_none());
    }

    #[test]
    fn test_signal_timeout_must_be_single_digit() {
        let mut config = MarketConfig::default();
        config.signal_timeout_secs = 10;
        assert!(config.validate().is_err());

        config.signal_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.signal_timeout_secs = 9;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_size_bounds() {
        let mut config = MarketConfig::default();
        config.batch_refresh_size = 0;
        assert!(config.validate().is_err());

        config.batch_refresh_size = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_intervals() {
        let mut config = MarketConfig::default();
        config.prune_interval_secs = 0;
        config.batch_refresh_interval_secs = 0;
        assert!(config.prune_interval().is_none());
        assert!(config.batch_refresh_interval().is_none());
    }

    #[test]
    fn test_parse_status_list() {
        let statuses = parse_status_list("active, UPCOMING,active").unwrap();
        assert_eq!(statuses, vec![StockStatus::Active, StockStatus::Upcoming]);

        assert!(parse_status_list("ACTIVE,LISTED").is_err());
        assert!(parse_status_list(" , ").is_err());
    }
}
