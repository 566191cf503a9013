//! Application configuration loaded from environment variables.

use std::collections::HashMap;
use std::time::Duration;

use workflow::WorkflowOptions;
use workflow::definition::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `WORKFLOW_MAX_RETRIES`: retries per step after the first attempt (default: `3`)
/// - `WORKFLOW_RETRY_DELAY_MS`: delay between attempts (default: `1000`)
/// - `WORKFLOW_TIMEOUT_SECS`: deadline for a whole run, `0` for none (default: `300`)
/// - `WORKFLOW_COMPENSATE_ON_FAILURE`: roll back on failure (default: `true`)
/// - `TAX_RATE_BPS`: sales tax in basis points (default: `0`)
/// - `PROMO_CODES`: `CODE=bps` pairs, comma separated (default: none)
/// - `INVENTORY_STOCK`: `SKU=quantity` pairs seeding the in-memory stock (default: none)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    pub compensate_on_failure: bool,
    pub tax_rate_bps: u32,
    pub promo_codes: HashMap<String, u32>,
    pub stock: HashMap<String, u32>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from any key lookup. Unparseable values fall back
    /// to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            max_retries: parsed("WORKFLOW_MAX_RETRIES")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.max_retries),
            retry_delay: parsed("WORKFLOW_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            timeout: parsed("WORKFLOW_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            compensate_on_failure: lookup("WORKFLOW_COMPENSATE_ON_FAILURE")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.compensate_on_failure),
            tax_rate_bps: parsed("TAX_RATE_BPS")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.tax_rate_bps),
            promo_codes: lookup("PROMO_CODES")
                .map(|v| parse_pairs(&v))
                .unwrap_or_default(),
            stock: lookup("INVENTORY_STOCK")
                .map(|v| parse_pairs(&v))
                .unwrap_or_default(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Execution policy shared by every commerce workflow.
    pub fn workflow_options(&self) -> WorkflowOptions {
        WorkflowOptions {
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            timeout: self.timeout,
            compensate_on_failure: self.compensate_on_failure,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
            compensate_on_failure: true,
            tax_rate_bps: 0,
            promo_codes: HashMap::new(),
            stock: HashMap::new(),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parses `KEY=n,KEY=n`. Malformed entries are skipped.
fn parse_pairs(value: &str) -> HashMap<String, u32> {
    value
        .split(',')
        .filter_map(|entry| {
            let (key, n) = entry.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), n.trim().parse().ok()?))
        })
        .collect()
}
