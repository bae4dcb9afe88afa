//! Runtime configuration read from the environment (and `.env` via dotenvy)

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Where list and form data comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataSource {
    /// The shop's REST backend at `API_BASE_URL`.
    #[default]
    Http,
    /// The seeded in-memory catalogue.
    Fixture,
}

impl FromStr for DataSource {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "fixture" => Ok(Self::Fixture),
            _ => Err(ConfigError::Invalid { key: "DATA_SOURCE", value: s.to_string() }),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub api_base_url: String,
    pub data_source: DataSource,
    pub default_page_size: usize,
    /// Minimum stock applied to new products that do not set their own.
    pub low_stock_threshold: u32,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8083,
            api_base_url: "http://localhost:5000/".to_string(),
            data_source: DataSource::Http,
            default_page_size: 5,
            low_stock_threshold: 5,
            request_timeout: Duration::from_secs(20),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset or blank keys keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let api_base_url = get("API_BASE_URL").unwrap_or(defaults.api_base_url);
        let default_page_size: usize = parse(&get, "DEFAULT_PAGE_SIZE")?.unwrap_or(defaults.default_page_size);
        if default_page_size == 0 {
            return Err(ConfigError::Invalid { key: "DEFAULT_PAGE_SIZE", value: "0".into() });
        }
        Ok(Self {
            port: parse(&get, "PORT")?.unwrap_or(defaults.port),
            api_base_url: if api_base_url.ends_with('/') { api_base_url } else { format!("{}/", api_base_url) },
            data_source: get("DATA_SOURCE").map(|v| v.parse()).transpose()?.unwrap_or_default(),
            default_page_size,
            low_stock_threshold: parse(&get, "LOW_STOCK_THRESHOLD")?.unwrap_or(defaults.low_stock_threshold),
            request_timeout: parse::<u64>(&get, "REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        })
    }
}

fn parse<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError> {
    get(key)
        .map(|v| v.trim().parse().map_err(|_| ConfigError::Invalid { key, value: v }))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]).unwrap(), Config::default());
    }

    #[test]
    fn test_overrides() {
        let c = config(&[("PORT", "9000"), ("API_BASE_URL", "https://api.example.com"), ("DATA_SOURCE", "Fixture"), ("DEFAULT_PAGE_SIZE", "10")]).unwrap();
        assert_eq!(c.port, 9000);
        assert_eq!(c.api_base_url, "https://api.example.com/");
        assert_eq!(c.data_source, DataSource::Fixture);
        assert_eq!(c.default_page_size, 10);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(config(&[("PORT", "eighty")]).unwrap_err(), ConfigError::Invalid { key: "PORT", value: "eighty".into() });
        assert!(config(&[("DATA_SOURCE", "postgres")]).is_err());
        assert!(config(&[("DEFAULT_PAGE_SIZE", "0")]).is_err());
    }
}
