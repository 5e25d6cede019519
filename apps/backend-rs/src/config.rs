use std::env;

use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Local,
}

impl StorageBackend {
    fn from_env(value: Option<String>, database_url: Option<&str>) -> Self {
        match value
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" | "pg" | "remote" => Self::Postgres,
            "local" | "memory" => Self::Local,
            _ if database_url.is_some() => Self::Postgres,
            _ => Self::Local,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Local => "local",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub environment: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst_size: u32,
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub db_pool_max_connections: u32,
    pub db_pool_min_connections: u32,
    pub db_pool_acquire_timeout_seconds: u64,
    pub db_pool_idle_timeout_seconds: u64,
    pub local_store_path: Option<String>,
    pub seed_demo_data: bool,
    pub whatsapp_phone_e164: Option<String>,
    pub placeholder_image_url: String,
    pub timezone: Tz,
    pub date_picker_close_delay_ms: u64,
    pub public_listings_cache_ttl_seconds: u64,
    pub public_listings_cache_max_entries: u64,
    pub admin_api_key: Option<String>,
    pub dev_auth_overrides_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = env_opt("DATABASE_URL").or_else(|| env_opt("SUPABASE_DB_URL"));
        let timezone_name = env_or("TIMEZONE", "Asia/Kolkata");
        let timezone = timezone_name.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!(timezone = %timezone_name, "Unknown TIMEZONE, using Asia/Kolkata");
            chrono_tz::Asia::Kolkata
        });

        Self {
            app_name: env_or("APP_NAME", "Villa Rentals API"),
            environment: env_or("ENVIRONMENT", "development"),
            api_prefix: normalize_prefix(&env_or("API_PREFIX", "/v1")),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse_or("PORT", 8000),
            cors_origins: parse_csv(&env_or("CORS_ORIGINS", "http://localhost:3000")),
            rate_limit_per_second: env_parse_or("RATE_LIMIT_PER_SECOND", 10),
            rate_limit_burst_size: env_parse_or("RATE_LIMIT_BURST_SIZE", 100),
            storage_backend: StorageBackend::from_env(
                env_opt("STORAGE_BACKEND"),
                database_url.as_deref(),
            ),
            database_url,
            db_pool_max_connections: env_parse_or("DB_POOL_MAX_CONNECTIONS", 5),
            db_pool_min_connections: env_parse_or("DB_POOL_MIN_CONNECTIONS", 1),
            db_pool_acquire_timeout_seconds: env_parse_or("DB_POOL_ACQUIRE_TIMEOUT_SECONDS", 5),
            db_pool_idle_timeout_seconds: env_parse_or("DB_POOL_IDLE_TIMEOUT_SECONDS", 600),
            local_store_path: env_opt("LOCAL_STORE_PATH")
                .or_else(|| Some("data/villa-store.json".to_string())),
            seed_demo_data: env_parse_bool_or("SEED_DEMO_DATA", true),
            whatsapp_phone_e164: env_opt("WHATSAPP_PHONE_E164"),
            placeholder_image_url: env_or(
                "PLACEHOLDER_IMAGE_URL",
                "https://images.unsplash.com/photo-1613490493576-7fde63acd811?w=1200",
            ),
            timezone,
            date_picker_close_delay_ms: env_parse_or("DATE_PICKER_CLOSE_DELAY_MS", 300),
            public_listings_cache_ttl_seconds: env_parse_or(
                "PUBLIC_LISTINGS_CACHE_TTL_SECONDS",
                15,
            ),
            public_listings_cache_max_entries: env_parse_or(
                "PUBLIC_LISTINGS_CACHE_MAX_ENTRIES",
                500,
            ),
            admin_api_key: env_opt("ADMIN_API_KEY"),
            dev_auth_overrides_enabled: env_parse_bool_or("DEV_AUTH_OVERRIDES_ENABLED", false),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }

    pub fn auth_dev_overrides_enabled(&self) -> bool {
        if self.is_production() {
            return false;
        }
        self.dev_auth_overrides_enabled
    }

    /// Calendar day "now" in the business timezone.
    pub fn today(&self) -> chrono::NaiveDate {
        chrono::Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

#[cfg(test)]
impl AppConfig {
    /// Local in-memory setup with fixed values, independent of the process env.
    pub fn for_tests() -> Self {
        Self {
            app_name: "Villa Rentals API".to_string(),
            environment: "test".to_string(),
            api_prefix: "/v1".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            rate_limit_per_second: 10,
            rate_limit_burst_size: 100,
            storage_backend: StorageBackend::Local,
            database_url: None,
            db_pool_max_connections: 1,
            db_pool_min_connections: 0,
            db_pool_acquire_timeout_seconds: 1,
            db_pool_idle_timeout_seconds: 60,
            local_store_path: None,
            seed_demo_data: true,
            whatsapp_phone_e164: Some("+91 98200 00000".to_string()),
            placeholder_image_url: "https://cdn.test/placeholder.jpg".to_string(),
            timezone: chrono_tz::Asia::Kolkata,
            date_picker_close_delay_ms: 300,
            public_listings_cache_ttl_seconds: 15,
            public_listings_cache_max_entries: 100,
            admin_api_key: Some("test-admin-key".to_string()),
            dev_auth_overrides_enabled: false,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_parse_bool_or(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase) {
        Some(value) if value == "1" || value == "true" || value == "yes" || value == "on" => true,
        Some(value) if value == "0" || value == "false" || value == "no" || value == "off" => false,
        Some(_) => default,
        None => default,
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn normalize_prefix(raw: &str) -> String {
    let mut prefix = raw.trim().to_string();
    if prefix.is_empty() {
        return "/v1".to_string();
    }
    if !prefix.starts_with('/') {
        prefix.insert(0, '/');
    }
    while prefix.ends_with('/') && prefix.len() > 1 {
        prefix.pop();
    }
    prefix
}
