//! Resolved entitlement state shared by every screen.
//!
//! Recomputed on each refresh; nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which input decided the current premium status. Exactly one source is
/// authoritative per resolution, chosen by precedence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PremiumSource {
    Admin,
    Backend,
    Revenuecat,
    #[default]
    None,
}

impl PremiumSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PremiumSource::Admin => "admin",
            PremiumSource::Backend => "backend",
            PremiumSource::Revenuecat => "revenuecat",
            PremiumSource::None => "none",
        }
    }
}

/// Subscription plan derived from the active product identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum PlanType {
    Monthly,
    Annual,
    #[default]
    Unknown,
}

/// Final resolved premium status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EntitlementState {
    pub is_premium: bool,
    /// Independent flag; admin implies unlimited access regardless of
    /// billing state.
    pub is_admin: bool,
    pub premium_source: PremiumSource,
    pub plan_type: PlanType,
    pub active_product_id: Option<String>,
    pub renewal_date: Option<DateTime<Utc>>,
    pub will_renew: bool,
}

/// Entitlement state plus the loading marker screens consult before the
/// first resolution has landed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitlementSnapshot {
    pub loading: bool,
    #[serde(flatten)]
    pub state: EntitlementState,
}

impl Default for EntitlementSnapshot {
    fn default() -> Self {
        Self {
            loading: true,
            state: EntitlementState::default(),
        }
    }
}

impl EntitlementSnapshot {
    pub fn resolved(state: EntitlementState) -> Self {
        Self {
            loading: false,
            state,
        }
    }
}
