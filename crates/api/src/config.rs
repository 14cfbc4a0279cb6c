//! Environment configuration for the API binary.

use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, bail};
use tracing::{info, warn};

use retailpos_sales::PixMerchant;

const DEFAULT_ADMIN_EMAIL: &str = "admin@retailpos.local";
const DEFAULT_ADMIN_PASSWORD: &str = "admin12345";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
    pub admin_email: String,
    pub admin_password: String,
    pub seed_demo_data: bool,
    pub pix_key: String,
    pub pix_merchant_name: String,
    pub pix_merchant_city: String,
}

impl ApiConfig {
    pub fn load() -> anyhow::Result<Self> {
        let use_persistent_stores = try_load("USE_PERSISTENT_STORES", false)?;
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
        if use_persistent_stores && database_url.is_none() {
            bail!("DATABASE_URL is required when USE_PERSISTENT_STORES=true");
        }

        let session_ttl_hours: i64 = try_load("SESSION_TTL_HOURS", 12)?;
        if session_ttl_hours <= 0 {
            bail!("SESSION_TTL_HOURS must be positive");
        }

        let admin_email = try_load("ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL.to_string())?;
        let admin_password = try_load("ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD.to_string())?;
        if admin_password == DEFAULT_ADMIN_PASSWORD {
            warn!("ADMIN_PASSWORD is the built-in default; change it outside development");
        }

        let pix_key: String = try_load("PIX_KEY", "pix@retailpos.local".to_string())?;
        let pix_merchant_name = try_load("PIX_MERCHANT_NAME", "RETAILPOS".to_string())?;
        let pix_merchant_city = try_load("PIX_MERCHANT_CITY", "SAO PAULO".to_string())?;
        let config = Self {
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:8080".to_string())?,
            use_persistent_stores,
            database_url,
            session_ttl_hours,
            cookie_secure: try_load("COOKIE_SECURE", false)?,
            admin_email,
            admin_password,
            seed_demo_data: try_load("SEED_DEMO_DATA", false)?,
            pix_key,
            pix_merchant_name,
            pix_merchant_city,
        };
        config.pix_merchant().validate().context("invalid PIX_KEY")?;
        Ok(config)
    }

    pub fn pix_merchant(&self) -> PixMerchant {
        PixMerchant {
            key: self.pix_key.clone(),
            name: self.pix_merchant_name.clone(),
            city: self.pix_merchant_city.clone(),
        }
    }

    /// In-memory configuration with an ephemeral port, used by tests.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            use_persistent_stores: false,
            database_url: None,
            session_ttl_hours: 12,
            cookie_secure: false,
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            seed_demo_data: false,
            pix_key: "pix@retailpos.local".to_string(),
            pix_merchant_name: "RETAILPOS".to_string(),
            pix_merchant_city: "SAO PAULO".to_string(),
        }
    }
}

fn try_load<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {key}: {raw:?}"))?;
            info!(key, "loaded from environment");
            Ok(value)
        }
        Err(_) => {
            info!(key, %default, "not set, using default");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_falls_back_to_default() {
        let value: i64 = try_load("RETAILPOS_TEST_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn oversized_pix_key_is_refused() {
        let mut config = ApiConfig::for_tests();
        config.pix_merchant().validate().unwrap();
        config.pix_key = "k".repeat(retailpos_sales::PIX_KEY_MAX_LEN + 1);
        assert!(config.pix_merchant().validate().is_err());
    }

    #[test]
    fn test_config_is_in_memory() {
        let config = ApiConfig::for_tests();
        assert!(!config.use_persistent_stores);
        assert_eq!(config.bind_addr, "127.0.0.1:0");
    }
}
