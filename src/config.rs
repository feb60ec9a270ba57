//! Runtime configuration: backend endpoint, billing credentials, product
//! catalog and the free-tier limit table.
//!
//! SKU identifiers and limit values are business configuration. Defaults
//! ship here; the config file and environment may override them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::entitlement::{FreeLimits, PlanType};

pub const BACKEND_URL_ENV: &str = "STABLE_BACKEND_URL";
pub const BILLING_API_KEY_ENV: &str = "STABLE_BILLING_API_KEY";

const CONFIG_FILE: &str = "config.json";
const DEFAULT_BACKEND_URL: &str = "https://api.myhorsemanager.app";

/// Billing product identifiers for the two subscription plans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProductCatalog {
    pub monthly_product_id: String,
    pub annual_product_id: String,
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self {
            monthly_product_id: "mhm_monthly".to_string(),
            annual_product_id: "mhm_annual".to_string(),
        }
    }
}

impl ProductCatalog {
    /// Classify a product id. Exact equality only: promo variants like
    /// "mhm_monthly_promo" are not the monthly plan.
    pub fn plan_for(&self, product_id: Option<&str>) -> PlanType {
        match product_id {
            Some(id) if id == self.monthly_product_id => PlanType::Monthly,
            Some(id) if id == self.annual_product_id => PlanType::Annual,
            _ => PlanType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend_url: String,
    pub billing_api_key: Option<String>,
    /// App user id reported to the billing provider; a random anonymous
    /// id is generated per process when unset.
    pub billing_app_user_id: Option<String>,
    pub products: ProductCatalog,
    pub limits: FreeLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            billing_api_key: None,
            billing_app_user_id: None,
            products: ProductCatalog::default(),
            limits: FreeLimits::default(),
        }
    }
}

impl AppConfig {
    /// Load the config file (explicit path, or the default location) and
    /// apply environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env();
        config.backend_base()?;
        Ok(config)
    }

    fn from_file(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stable-core")
            .join(CONFIG_FILE)
    }

    fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(BACKEND_URL_ENV) {
            if !value.is_empty() {
                self.backend_url = value;
            }
        }
        if let Ok(value) = std::env::var(BILLING_API_KEY_ENV) {
            if !value.is_empty() {
                self.billing_api_key = Some(value);
            }
        }
    }

    pub fn backend_base(&self) -> Result<Url> {
        Url::parse(&self.backend_url)
            .with_context(|| format!("Invalid backend URL: {}", self.backend_url))
    }
}
