//! Billing provider adapter.
//!
//! Normalizes the purchase SDK's customer info into a strict tagged state
//! the plan resolver can pattern-match exhaustively. Failures while
//! querying customer info never cross this boundary as errors; they fold
//! into the `NotConfigured` / `Error` variants so resolution degrades to
//! the backend-only flags.

mod revenuecat;

pub use revenuecat::RevenueCatClient;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Billing is not configured")]
    NotConfigured,
    #[error("Billing API error: {0}")]
    Api(String),
    #[error("Network error: {0}")]
    Unreachable(String),
}

/// Normalized billing SDK state.
#[derive(Debug, Clone, PartialEq)]
pub enum SdkState {
    Configured {
        active_entitlements: BTreeSet<String>,
        active_product_id: Option<String>,
        renewal_date: Option<DateTime<Utc>>,
        will_renew: bool,
    },
    NotConfigured,
    Error {
        reason: String,
    },
}

impl SdkState {
    pub fn has_active_entitlement(&self) -> bool {
        matches!(
            self,
            SdkState::Configured {
                active_entitlements,
                ..
            } if !active_entitlements.is_empty()
        )
    }
}

/// An offered subscription package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Package {
    pub identifier: String,
    pub product_id: String,
}

/// Seam over the purchase/subscription provider.
///
/// Purchase initiation itself happens on the device SDK (receipt posting
/// is platform-bound); this engine queries, restores and lists offerings.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Current customer info. Failures are folded into the returned
    /// state, never raised across this boundary.
    async fn customer_info(&self) -> SdkState;

    /// Packages currently offered for purchase.
    async fn offerings(&self) -> Result<Vec<Package>, BillingError>;

    /// Re-query the provider; true if an active entitlement came back.
    async fn restore(&self) -> Result<bool, BillingError>;
}

/// Stand-in provider when no billing API key is configured.
pub struct DisabledBilling;

#[async_trait]
impl BillingProvider for DisabledBilling {
    async fn customer_info(&self) -> SdkState {
        SdkState::NotConfigured
    }

    async fn offerings(&self) -> Result<Vec<Package>, BillingError> {
        Err(BillingError::NotConfigured)
    }

    async fn restore(&self) -> Result<bool, BillingError> {
        Err(BillingError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_billing_reports_not_configured() {
        let billing = DisabledBilling;
        assert_eq!(billing.customer_info().await, SdkState::NotConfigured);
        assert!(matches!(
            billing.restore().await,
            Err(BillingError::NotConfigured)
        ));
    }

    #[test]
    fn test_active_entitlement_detection() {
        let mut entitlements = BTreeSet::new();
        entitlements.insert("premium".to_string());
        let state = SdkState::Configured {
            active_entitlements: entitlements,
            active_product_id: Some("mhm_monthly".to_string()),
            renewal_date: None,
            will_renew: true,
        };
        assert!(state.has_active_entitlement());

        let empty = SdkState::Configured {
            active_entitlements: BTreeSet::new(),
            active_product_id: None,
            renewal_date: None,
            will_renew: false,
        };
        assert!(!empty.has_active_entitlement());
        assert!(!SdkState::NotConfigured.has_active_entitlement());
    }
}
