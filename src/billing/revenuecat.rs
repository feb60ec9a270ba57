//! RevenueCat REST adapter.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{BillingError, BillingProvider, Package, SdkState};

const API_BASE: &str = "https://api.revenuecat.com/v1";

pub struct RevenueCatClient {
    api_key: String,
    app_user_id: String,
    api_base: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SubscriberResponse {
    subscriber: Subscriber,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Subscriber {
    #[serde(default)]
    entitlements: BTreeMap<String, EntitlementInfo>,
    #[serde(default)]
    subscriptions: BTreeMap<String, SubscriptionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct EntitlementInfo {
    product_identifier: String,
    expires_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SubscriptionInfo {
    #[serde(default)]
    unsubscribe_detected_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OfferingsResponse {
    #[serde(default)]
    offerings: Vec<Offering>,
    current_offering_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Offering {
    identifier: String,
    #[serde(default)]
    packages: Vec<ApiPackage>,
}

#[derive(Debug, Deserialize)]
struct ApiPackage {
    identifier: String,
    platform_product_identifier: String,
}

impl RevenueCatClient {
    pub fn new(api_key: String, app_user_id: String) -> Self {
        Self {
            api_key,
            app_user_id,
            api_base: API_BASE.to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn fetch_subscriber(&self) -> Result<Subscriber, BillingError> {
        let url = format!("{}/subscribers/{}", self.api_base, self.app_user_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| BillingError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BillingError::Api(format!("{} - {}", status, body)));
        }

        let data: SubscriberResponse = response
            .json()
            .await
            .map_err(|e| BillingError::Api(format!("malformed subscriber document: {}", e)))?;
        Ok(data.subscriber)
    }
}

/// Parse a provider timestamp; malformed values degrade to None.
fn parse_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Normalize a subscriber document.
///
/// An entitlement is active when its expiry is absent or in the future. A
/// malformed expiry degrades to an absent one: the entitlement stays
/// active, only the date is lost. The first active entitlement (by name)
/// supplies the product id and renewal date.
fn normalize(subscriber: &Subscriber, now: DateTime<Utc>) -> SdkState {
    let mut active_entitlements = BTreeSet::new();
    let mut active_product_id = None;
    let mut renewal_date = None;

    for (name, info) in &subscriber.entitlements {
        let expires = parse_date(info.expires_date.as_deref());
        if let Some(expiry) = expires {
            if expiry <= now {
                continue;
            }
        }
        if active_entitlements.is_empty() {
            active_product_id = Some(info.product_identifier.clone());
            renewal_date = expires;
        }
        active_entitlements.insert(name.clone());
    }

    let will_renew = active_product_id
        .as_deref()
        .and_then(|product_id| subscriber.subscriptions.get(product_id))
        .map(|subscription| subscription.unsubscribe_detected_at.is_none())
        .unwrap_or(false);

    SdkState::Configured {
        active_entitlements,
        active_product_id,
        renewal_date,
        will_renew,
    }
}

#[async_trait]
impl BillingProvider for RevenueCatClient {
    async fn customer_info(&self) -> SdkState {
        match self.fetch_subscriber().await {
            Ok(subscriber) => normalize(&subscriber, Utc::now()),
            Err(err) => {
                tracing::warn!("Billing customer info unavailable: {}", err);
                SdkState::Error {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn offerings(&self) -> Result<Vec<Package>, BillingError> {
        let url = format!(
            "{}/subscribers/{}/offerings",
            self.api_base, self.app_user_id
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| BillingError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BillingError::Api(format!("{} - {}", status, body)));
        }

        let data: OfferingsResponse = response
            .json()
            .await
            .map_err(|e| BillingError::Api(format!("malformed offerings document: {}", e)))?;

        let packages = data
            .offerings
            .iter()
            .filter(|offering| {
                data.current_offering_id
                    .as_deref()
                    .map_or(true, |current| offering.identifier == current)
            })
            .flat_map(|offering| offering.packages.iter())
            .map(|package| Package {
                identifier: package.identifier.clone(),
                product_id: package.platform_product_identifier.clone(),
            })
            .collect();
        Ok(packages)
    }

    async fn restore(&self) -> Result<bool, BillingError> {
        let subscriber = self.fetch_subscriber().await?;
        Ok(normalize(&subscriber, Utc::now()).has_active_entitlement())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn subscriber(json: &str) -> Subscriber {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_active_subscription_normalizes() {
        let sub = subscriber(
            r#"{
                "entitlements": {
                    "premium": {
                        "product_identifier": "mhm_monthly",
                        "expires_date": "2025-07-01T00:00:00Z"
                    }
                },
                "subscriptions": {
                    "mhm_monthly": {
                        "expires_date": "2025-07-01T00:00:00Z",
                        "unsubscribe_detected_at": null
                    }
                }
            }"#,
        );

        let state = normalize(&sub, now());
        match state {
            SdkState::Configured {
                active_entitlements,
                active_product_id,
                renewal_date,
                will_renew,
            } => {
                assert!(active_entitlements.contains("premium"));
                assert_eq!(active_product_id.as_deref(), Some("mhm_monthly"));
                assert!(renewal_date.is_some());
                assert!(will_renew);
            }
            other => panic!("Expected Configured, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_entitlement_is_inactive() {
        let sub = subscriber(
            r#"{
                "entitlements": {
                    "premium": {
                        "product_identifier": "mhm_monthly",
                        "expires_date": "2025-05-01T00:00:00Z"
                    }
                }
            }"#,
        );

        let state = normalize(&sub, now());
        assert!(!state.has_active_entitlement());
    }

    #[test]
    fn test_null_expiry_means_non_expiring() {
        let sub = subscriber(
            r#"{
                "entitlements": {
                    "premium": {
                        "product_identifier": "mhm_annual",
                        "expires_date": null
                    }
                }
            }"#,
        );

        let state = normalize(&sub, now());
        assert!(state.has_active_entitlement());
        match state {
            SdkState::Configured { renewal_date, .. } => assert!(renewal_date.is_none()),
            other => panic!("Expected Configured, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_expiry_degrades_date_only() {
        let sub = subscriber(
            r#"{
                "entitlements": {
                    "premium": {
                        "product_identifier": "mhm_annual",
                        "expires_date": "not-a-date"
                    }
                }
            }"#,
        );

        // The entitlement stays active; only the renewal date is lost
        let state = normalize(&sub, now());
        assert!(state.has_active_entitlement());
        match state {
            SdkState::Configured { renewal_date, .. } => assert!(renewal_date.is_none()),
            other => panic!("Expected Configured, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_document_normalizes_to_no_entitlements() {
        let state = normalize(&Subscriber::default(), now());
        assert_eq!(
            state,
            SdkState::Configured {
                active_entitlements: BTreeSet::new(),
                active_product_id: None,
                renewal_date: None,
                will_renew: false,
            }
        );
    }

    #[test]
    fn test_unsubscribe_clears_will_renew() {
        let sub = subscriber(
            r#"{
                "entitlements": {
                    "premium": {
                        "product_identifier": "mhm_monthly",
                        "expires_date": "2025-07-01T00:00:00Z"
                    }
                },
                "subscriptions": {
                    "mhm_monthly": {
                        "unsubscribe_detected_at": "2025-05-20T09:00:00Z"
                    }
                }
            }"#,
        );

        let state = normalize(&sub, now());
        match state {
            SdkState::Configured { will_renew, .. } => assert!(!will_renew),
            other => panic!("Expected Configured, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_subscription_entry_means_no_renewal() {
        let sub = subscriber(
            r#"{
                "entitlements": {
                    "premium": {
                        "product_identifier": "mhm_monthly",
                        "expires_date": "2025-07-01T00:00:00Z"
                    }
                }
            }"#,
        );

        let state = normalize(&sub, now());
        match state {
            SdkState::Configured { will_renew, .. } => assert!(!will_renew),
            other => panic!("Expected Configured, got {:?}", other),
        }
    }
}
