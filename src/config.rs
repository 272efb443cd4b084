use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_TIMEZONE: &str = "Asia/Tashkent";
pub const DEFAULT_TENANT_SLUG: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub attendance: AttendanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 每个租户一个独立数据库；未配置 database_url 时共用默认库。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub slug: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EmailConfig {
    /// Mail relay endpoint; empty disables delivery (notices are only logged).
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub from_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_days_ahead")]
    pub days_ahead: i64,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_cleanup_older_than_days")]
    pub cleanup_older_than_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            days_ahead: default_days_ahead(),
            interval_secs: default_interval_secs(),
            cleanup_older_than_days: default_cleanup_older_than_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceConfig {
    #[serde(default = "default_low_balance_threshold")]
    pub low_balance_threshold: i32,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            low_balance_threshold: default_low_balance_threshold(),
        }
    }
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_days_ahead() -> i64 {
    90
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_cleanup_older_than_days() -> i64 {
    30
}

fn default_low_balance_threshold() -> i32 {
    3
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and config.toml was not found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    default_timezone: get_env("DEFAULT_TIMEZONE").unwrap_or_else(default_timezone),
                    tenants: Vec::new(),
                    email: EmailConfig::default(),
                    scheduler: SchedulerConfig::default(),
                    attendance: AttendanceConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}"))?;
        Ok(config)
    }

    /// 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("DEFAULT_TIMEZONE") {
            self.default_timezone = v;
        }
        if let Ok(v) = env::var("EMAIL_API_URL") {
            self.email.api_url = v;
        }
        if let Ok(v) = env::var("EMAIL_API_KEY") {
            self.email.api_key = v;
        }
        if let Ok(v) = env::var("EMAIL_FROM_ADDRESS") {
            self.email.from_address = v;
        }
        if let Ok(v) = env::var("SCHEDULER_ENABLED")
            && let Ok(b) = v.parse()
        {
            self.scheduler.enabled = b;
        }
        if let Ok(v) = env::var("SCHEDULER_DAYS_AHEAD")
            && let Ok(n) = v.parse()
        {
            self.scheduler.days_ahead = n;
        }
        if let Ok(v) = env::var("SCHEDULER_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            self.scheduler.interval_secs = n;
        }
        if let Ok(v) = env::var("LOW_BALANCE_THRESHOLD")
            && let Ok(n) = v.parse()
        {
            self.attendance.low_balance_threshold = n;
        }
    }

    /// Configured tenants, or a single `default` tenant on the main database.
    pub fn effective_tenants(&self) -> Vec<TenantConfig> {
        if self.tenants.is_empty() {
            return vec![TenantConfig {
                slug: DEFAULT_TENANT_SLUG.to_string(),
                database_url: None,
                timezone: None,
            }];
        }
        self.tenants.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/academy"
            max_connections = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.default_timezone, DEFAULT_TIMEZONE);
        assert_eq!(config.scheduler.days_ahead, 90);
        assert!(config.scheduler.enabled);
        assert_eq!(config.attendance.low_balance_threshold, 3);
        assert!(config.email.api_url.is_empty());

        let tenants = config.effective_tenants();
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].slug, DEFAULT_TENANT_SLUG);
        assert!(tenants[0].database_url.is_none());
    }

    #[test]
    fn test_parse_tenants() {
        let config = Config::parse(
            r#"
            default_timezone = "Europe/Moscow"

            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            url = "postgres://localhost/main"
            max_connections = 10

            [[tenants]]
            slug = "north"
            database_url = "postgres://localhost/north"
            timezone = "Asia/Almaty"

            [[tenants]]
            slug = "south"
            "#,
        )
        .unwrap();

        let tenants = config.effective_tenants();
        assert_eq!(tenants.len(), 2);
        assert_eq!(tenants[0].timezone.as_deref(), Some("Asia/Almaty"));
        assert!(tenants[1].database_url.is_none());
        assert_eq!(config.default_timezone, "Europe/Moscow");
    }
}
