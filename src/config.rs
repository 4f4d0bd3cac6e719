use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Business constants for price computation. Configuration, not code: the
/// free-shipping threshold and tax rate are business rules that change
/// without a deploy.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// Subtotals strictly above this ship free
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: Decimal,

    /// Flat shipping fee below the threshold
    #[serde(default = "default_flat_shipping_fee")]
    pub flat_shipping_fee: Decimal,

    /// Tax rate applied to the subtotal (0.05 = 5% GST)
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: default_free_shipping_threshold(),
            flat_shipping_fee: default_flat_shipping_fee(),
            tax_rate: default_tax_rate(),
        }
    }
}

/// Payment gateway credentials and endpoint.
///
/// The public `key_id` is handed to callers per-order by the initiation
/// response; the `key_secret` signs and verifies payment confirmations and
/// never leaves the server.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_key_id")]
    pub key_id: String,

    #[validate(length(min = 16))]
    #[serde(default = "default_gateway_key_secret")]
    pub key_secret: String,

    /// Base URL of the gateway REST API
    #[serde(default = "default_gateway_api_base")]
    pub api_base: String,

    /// Use the in-process mock gateway instead of HTTP (tests, local dev)
    #[serde(default)]
    pub mock: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            key_id: default_gateway_key_id(),
            key_secret: default_gateway_key_secret(),
            api_base: default_gateway_api_base(),
            mock: true,
        }
    }
}

/// Application configuration, loaded from `config/` files layered under
/// `APP_*` environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// JWT secret key for session credential validation
    #[validate(length(min = 64))]
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// ISO currency code used for every order
    #[serde(default = "default_currency")]
    pub currency: String,

    #[validate]
    #[serde(default)]
    pub pricing: PricingConfig,

    #[validate]
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            currency: default_currency(),
            pricing: PricingConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_jwt_secret() -> String {
    DEV_DEFAULT_JWT_SECRET.to_string()
}

fn default_free_shipping_threshold() -> Decimal {
    Decimal::from(999)
}

fn default_flat_shipping_fee() -> Decimal {
    Decimal::from(50)
}

fn default_tax_rate() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_gateway_key_id() -> String {
    "rzp_test_placeholder".to_string()
}

fn default_gateway_key_secret() -> String {
    "dev_gateway_secret_not_for_production".to_string()
}

fn default_gateway_api_base() -> String {
    "https://api.razorpay.com/v1".to_string()
}

/// Loads configuration: `config/default.toml`, then `config/{environment}.toml`
/// if present, then `APP_*` environment variables (e.g. `APP_PORT`,
/// `APP_GATEWAY__KEY_SECRET`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder();
    let default_path = Path::new(CONFIG_DIR).join("default");
    builder = builder.add_source(File::with_name(default_path.to_str().unwrap()).required(false));
    let env_path = Path::new(CONFIG_DIR).join(&environment);
    builder = builder.add_source(File::with_name(env_path.to_str().unwrap()).required(false));
    builder = builder.add_source(Environment::with_prefix("APP").separator("__"));

    let cfg: AppConfig = builder.build()?.try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

    if cfg.is_production() && cfg.jwt_secret == DEV_DEFAULT_JWT_SECRET {
        return Err(ConfigError::Message(
            "refusing to start in production with the development JWT secret".to_string(),
        ));
    }

    info!(
        "Configuration loaded for environment '{}' ({}:{})",
        cfg.environment, cfg.host, cfg.port
    );
    Ok(cfg)
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_match_business_rules() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.pricing.free_shipping_threshold, dec!(999));
        assert_eq!(cfg.pricing.flat_shipping_fee, dec!(50));
        assert_eq!(cfg.pricing.tax_rate, dec!(0.05));
        assert_eq!(cfg.currency, "INR");
    }

    #[test]
    fn default_config_passes_validation() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn short_jwt_secret_fails_validation() {
        let cfg = AppConfig {
            jwt_secret: "too_short".into(),
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = AppConfig {
            host: "127.0.0.1".into(),
            port: 9000,
            ..AppConfig::default()
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9000");
    }
}
