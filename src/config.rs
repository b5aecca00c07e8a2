use std::env;

use anyhow::Context;

use crate::pricing::parse_price;

const DEFAULT_GATEWAY_URL: &str = "https://api-sandbox.nowpayments.io/v1";
const DEFAULT_PAY_CURRENCIES: &str = "TRX,BEP,BTC,LTC,ETH";
const DEFAULT_PRICE_CURRENCIES: &str = "USD";
const DEFAULT_FEDEX_FLAT_RATE: &str = "$30";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub fedex_flat_rate: f64,
    pub jwt: JwtConfig,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Settings for the crypto payment gateway and its IPN callback.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_url: String,
    pub api_key: String,
    pub ipn_secret: String,
    pub timeout_secs: u64,
    pub ipn_callback_url: String,
    pub success_url: String,
    pub cancel_url: String,
    pub price_currencies: Vec<String>,
    pub pay_currencies: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let cors_origins = split_list(
            &env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173,http://127.0.0.1:5173".to_string()),
        );

        let flat_rate = env::var("FEDEX_FLAT_RATE")
            .unwrap_or_else(|_| DEFAULT_FEDEX_FLAT_RATE.to_string());
        let fedex_flat_rate = parse_price(&flat_rate)
            .filter(|p| *p > 0.0)
            .with_context(|| format!("FEDEX_FLAT_RATE is not a price: {flat_rate}"))?;

        let jwt = JwtConfig {
            secret: env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            ttl_minutes: env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        let gateway = GatewayConfig {
            api_url: env::var("NOWPAYMENTS_API_URL")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string()),
            api_key: env::var("NOWPAYMENTS_API_KEY").unwrap_or_default(),
            ipn_secret: env::var("NOWPAYMENTS_IPN_SECRET")
                .context("NOWPAYMENTS_IPN_SECRET is not set")?,
            timeout_secs: env::var("NOWPAYMENTS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(15),
            ipn_callback_url: env::var("IPN_CALLBACK_URL").unwrap_or_default(),
            success_url: env::var("SUCCESS_URL").unwrap_or_default(),
            cancel_url: env::var("CANCEL_URL").unwrap_or_default(),
            price_currencies: split_list(
                &env::var("PRICE_CURRENCIES")
                    .unwrap_or_else(|_| DEFAULT_PRICE_CURRENCIES.to_string()),
            ),
            pay_currencies: split_list(
                &env::var("PAY_CURRENCIES").unwrap_or_else(|_| DEFAULT_PAY_CURRENCIES.to_string()),
            ),
        };

        Ok(Self {
            port,
            database_url,
            host,
            frontend_url,
            cors_origins,
            fedex_flat_rate,
            jwt,
            gateway,
        })
    }
}

/// Comma separated list, trimmed and upper-cased for currency codes, kept as-is otherwise.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.chars().all(|c| c.is_ascii_alphanumeric()) {
                s.to_ascii_uppercase()
            } else {
                s.to_string()
            }
        })
        .collect()
}
