//! Dashboard Configuration Settings
//!
//! Configuration types for the dashboard, loaded from `SMD_*` environment
//! variables.

use std::time::Duration;

use crate::application::services::{IngestionConfig, RefreshConfig, SymbolSchedule};
use crate::domain::quote::Symbol;
use crate::infrastructure::finnhub::{DEFAULT_BASE_URL, FinnhubConfig};
use crate::infrastructure::persistence::{DEFAULT_DATABASE_URL, QuestDbConfig, StoreSchema};

/// URL that selects the in-memory store.
const IN_MEMORY_URL: &str = "memory://";

/// Longest accepted trailing chart window, in hours (ten years).
const MAX_WINDOW_HOURS: u32 = 24 * 366 * 10;

/// Finnhub API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(api_key: String) -> Self {
        Self { api_key }
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Quote ingestion settings.
#[derive(Debug, Clone)]
pub struct IngestionSettings {
    /// Symbols with optional per-symbol intervals.
    pub symbols: Vec<SymbolSchedule>,
    /// Shared fetch frequency.
    pub frequency: Duration,
    /// Upper bound on one provider call.
    pub fetch_timeout: Duration,
    /// Finnhub REST base URL.
    pub finnhub_url: String,
}

/// Time-series store settings.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Connection URL, or `memory://`.
    pub url: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// Whether the table carries the `tradets` column.
    pub trade_time: bool,
    /// Create the table at startup.
    pub create_table: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            pool_size: 3,
            trade_time: true,
            create_table: true,
        }
    }
}

impl StoreSettings {
    /// Whether the in-memory store was requested.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.url == IN_MEMORY_URL
    }
}

/// Chart refresh settings.
#[derive(Debug, Clone, Copy)]
pub struct DisplaySettings {
    /// Refresh interval.
    pub graph_interval: Duration,
    /// Trailing window length.
    pub window: chrono::Duration,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            graph_interval: Duration::from_secs(10),
            window: chrono::Duration::hours(5),
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone, Copy)]
pub struct ServerSettings {
    /// HTTP port for health, metrics, and the chart API.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8050 }
    }
}

/// Complete dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// API credentials.
    pub credentials: Credentials,
    /// Ingestion settings.
    pub ingestion: IngestionSettings,
    /// Store settings.
    pub store: StoreSettings,
    /// Refresh settings.
    pub display: DisplaySettings,
    /// Server settings.
    pub server: ServerSettings,
}

impl DashboardConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or any value is
    /// invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or any value is
    /// invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let api_key = env.required("SMD_API_KEY")?;
        let symbols = parse_symbols(&env.required("SMD_SYMBOLS")?)?;

        let frequency = env.secs("SMD_FREQUENCY", 5)?;
        let fetch_timeout = env.secs("SMD_FETCH_TIMEOUT_SECS", 10)?;
        let finnhub_url = env
            .optional("SMD_FINNHUB_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let store_defaults = StoreSettings::default();
        let store = StoreSettings {
            url: env
                .optional("SMD_DATABASE_URL")
                .unwrap_or(store_defaults.url),
            pool_size: env.number("SMD_DATABASE_POOL_SIZE", store_defaults.pool_size)?,
            trade_time: env.flag("SMD_STORE_TRADE_TIME", store_defaults.trade_time)?,
            create_table: env.flag("SMD_STORE_CREATE_TABLE", store_defaults.create_table)?,
        };
        if store.pool_size == 0 {
            return Err(ConfigError::invalid(
                "SMD_DATABASE_POOL_SIZE",
                "0",
                "must be greater than zero",
            ));
        }

        let window_hours: u32 = env.number("SMD_WINDOW_HOURS", 5)?;
        if window_hours == 0 {
            return Err(ConfigError::invalid(
                "SMD_WINDOW_HOURS",
                "0",
                "must be greater than zero",
            ));
        }
        if window_hours > MAX_WINDOW_HOURS {
            return Err(ConfigError::invalid(
                "SMD_WINDOW_HOURS",
                &window_hours.to_string(),
                format!("must be at most {MAX_WINDOW_HOURS}"),
            ));
        }
        let display = DisplaySettings {
            graph_interval: env.secs("SMD_GRAPH_INTERVAL", 10)?,
            window: chrono::Duration::hours(i64::from(window_hours)),
        };

        let server = ServerSettings {
            http_port: env.number("SMD_HTTP_PORT", ServerSettings::default().http_port)?,
        };

        Ok(Self {
            credentials: Credentials::new(api_key),
            ingestion: IngestionSettings {
                symbols,
                frequency,
                fetch_timeout,
                finnhub_url,
            },
            store,
            display,
            server,
        })
    }

    /// Scheduler configuration.
    #[must_use]
    pub fn ingestion_config(&self) -> IngestionConfig {
        IngestionConfig {
            frequency: self.ingestion.frequency,
            fetch_timeout: self.ingestion.fetch_timeout,
            symbols: self.ingestion.symbols.clone(),
            ..IngestionConfig::default()
        }
    }

    /// Refresh loop configuration.
    #[must_use]
    pub const fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            interval: self.display.graph_interval,
            window: self.display.window,
        }
    }

    /// Finnhub client configuration.
    #[must_use]
    pub fn finnhub_config(&self) -> FinnhubConfig {
        FinnhubConfig::new(self.credentials.api_key())
            .with_base_url(self.ingestion.finnhub_url.clone())
            .with_timeout(self.ingestion.fetch_timeout)
    }

    /// QuestDB store configuration.
    #[must_use]
    pub fn questdb_config(&self) -> QuestDbConfig {
        QuestDbConfig {
            url: self.store.url.clone(),
            pool_size: self.store.pool_size,
            schema: StoreSchema {
                trade_time: self.store.trade_time,
            },
            ..QuestDbConfig::default()
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
        /// What was wrong.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a comma-separated symbol list.
///
/// Each entry is `SYMBOL` or `SYMBOL@SECONDS`. Whitespace around entries
/// is ignored and empty entries are skipped. Symbols keep their case and
/// may contain `:` (e.g. `BINANCE:BTCUSDT`).
///
/// # Errors
///
/// Returns an error if no symbol is listed or an interval is not a
/// positive integer.
pub fn parse_symbols(raw: &str) -> Result<Vec<SymbolSchedule>, ConfigError> {
    let mut schedules = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let schedule = match entry.rsplit_once('@') {
            Some((name, secs)) => {
                let secs = secs
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| {
                        ConfigError::invalid(
                            "SMD_SYMBOLS",
                            entry,
                            "interval must be a positive number of seconds",
                        )
                    })?;
                SymbolSchedule::with_interval(symbol(name.trim(), entry)?, Duration::from_secs(secs))
            }
            None => SymbolSchedule::new(symbol(entry, entry)?),
        };
        schedules.push(schedule);
    }

    if schedules.is_empty() {
        return Err(ConfigError::EmptyValue("SMD_SYMBOLS".to_string()));
    }
    Ok(schedules)
}

fn symbol(name: &str, entry: &str) -> Result<Symbol, ConfigError> {
    Symbol::new(name).map_err(|e| ConfigError::invalid("SMD_SYMBOLS", entry, e.to_string()))
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        let value = (self.0)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::EmptyValue(key.to_string()));
        }
        Ok(value.to_string())
    }

    fn number<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        self.optional(key).map_or(Ok(default), |v| {
            v.parse()
                .map_err(|_| ConfigError::invalid(key, &v, "not a valid number"))
        })
    }

    fn secs(&self, key: &str, default: u64) -> Result<Duration, ConfigError> {
        let secs: u64 = self.number(key, default)?;
        if secs == 0 {
            return Err(ConfigError::invalid(key, "0", "must be greater than zero"));
        }
        Ok(Duration::from_secs(secs))
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        self.optional(key).map_or(Ok(default), |v| {
            match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::invalid(key, &v, "expected true or false")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn config(vars: &[(&str, &str)]) -> Result<DashboardConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        DashboardConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [("SMD_API_KEY", "key"), ("SMD_SYMBOLS", "AAPL,MSFT")];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut vars = REQUIRED.to_vec();
        vars.extend_from_slice(extra);
        vars
    }

    #[test]
    fn defaults_applied() {
        let config = config(&REQUIRED).unwrap();

        assert_eq!(config.credentials.api_key(), "key");
        assert_eq!(config.ingestion.symbols.len(), 2);
        assert_eq!(config.ingestion.frequency, Duration::from_secs(5));
        assert_eq!(config.ingestion.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.ingestion.finnhub_url, DEFAULT_BASE_URL);
        assert_eq!(config.store.url, DEFAULT_DATABASE_URL);
        assert_eq!(config.store.pool_size, 3);
        assert!(config.store.trade_time);
        assert!(config.store.create_table);
        assert!(!config.store.is_in_memory());
        assert_eq!(config.display.graph_interval, Duration::from_secs(10));
        assert_eq!(config.display.window, chrono::Duration::hours(5));
        assert_eq!(config.server.http_port, 8050);
    }

    #[test]
    fn overrides_applied() {
        let config = config(&with(&[
            ("SMD_FREQUENCY", "2"),
            ("SMD_DATABASE_URL", "memory://"),
            ("SMD_STORE_TRADE_TIME", "false"),
            ("SMD_GRAPH_INTERVAL", "3"),
            ("SMD_WINDOW_HOURS", "1"),
            ("SMD_HTTP_PORT", "9000"),
        ]))
        .unwrap();

        assert_eq!(config.ingestion_config().frequency, Duration::from_secs(2));
        assert!(config.store.is_in_memory());
        assert!(!config.questdb_config().schema.trade_time);
        assert_eq!(config.refresh_config().interval, Duration::from_secs(3));
        assert_eq!(config.refresh_config().window, chrono::Duration::hours(1));
        assert_eq!(config.server.http_port, 9000);
    }

    #[test]
    fn missing_api_key() {
        let result = config(&[("SMD_SYMBOLS", "AAPL")]);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(k)) if k == "SMD_API_KEY"));
    }

    #[test]
    fn empty_symbols() {
        let result = config(&[("SMD_API_KEY", "key"), ("SMD_SYMBOLS", " , ")]);
        assert!(matches!(result, Err(ConfigError::EmptyValue(k)) if k == "SMD_SYMBOLS"));
    }

    #[test_case("SMD_FREQUENCY", "0" ; "zero frequency")]
    #[test_case("SMD_FREQUENCY", "five" ; "non numeric frequency")]
    #[test_case("SMD_GRAPH_INTERVAL", "0" ; "zero refresh interval")]
    #[test_case("SMD_WINDOW_HOURS", "0" ; "zero window")]
    #[test_case("SMD_WINDOW_HOURS", "4000000000" ; "window beyond time range")]
    #[test_case("SMD_WINDOW_HOURS", "87841" ; "window over ten years")]
    #[test_case("SMD_DATABASE_POOL_SIZE", "0" ; "zero pool")]
    #[test_case("SMD_HTTP_PORT", "70000" ; "port out of range")]
    #[test_case("SMD_STORE_TRADE_TIME", "maybe" ; "bad flag")]
    fn invalid_values_rejected(key: &'static str, value: &'static str) {
        let result = config(&with(&[(key, value)]));
        assert!(
            matches!(&result, Err(ConfigError::InvalidValue { key: k, .. }) if k == key),
            "{result:?}"
        );
    }

    #[test]
    fn symbol_list_parsing() {
        let schedules = parse_symbols(" AAPL , MSFT@60,,BINANCE:BTCUSDT@2 ").unwrap();
        assert_eq!(
            schedules,
            vec![
                SymbolSchedule::new(Symbol::new("AAPL").unwrap()),
                SymbolSchedule::with_interval(
                    Symbol::new("MSFT").unwrap(),
                    Duration::from_secs(60)
                ),
                SymbolSchedule::with_interval(
                    Symbol::new("BINANCE:BTCUSDT").unwrap(),
                    Duration::from_secs(2)
                ),
            ]
        );
    }

    #[test]
    fn symbols_keep_case() {
        let schedules = parse_symbols("aapl").unwrap();
        assert_eq!(schedules[0].symbol.as_str(), "aapl");
    }

    #[test_case("AAPL@0" ; "zero interval")]
    #[test_case("AAPL@x" ; "non numeric interval")]
    #[test_case("@5" ; "missing symbol")]
    fn bad_symbol_entries(raw: &str) {
        assert!(matches!(
            parse_symbols(raw),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn credentials_debug_redacts_key() {
        let debug = format!("{:?}", Credentials::new("secret".to_string()));
        assert!(!debug.contains("secret"));
    }
}
