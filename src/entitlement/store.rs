//! Shared entitlement store.
//!
//! The store is injected into its consumers rather than living as a
//! global, and both sources sit behind traits so tests can supply fakes.
//! Each refresh is tagged with a monotonically increasing sequence number
//! and applied only if it is the newest seen, so the latest issued refresh
//! wins even when responses settle out of order. Every await is raced
//! against a cancellation token; a cancelled refresh never touches state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendError, ProfileSource};
use crate::billing::{BillingError, BillingProvider, Package};
use crate::config::ProductCatalog;

use super::resolver::resolve;
use super::state::EntitlementSnapshot;

/// How a refresh call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Resolved state applied; this was the newest refresh seen.
    Applied,
    /// A newer refresh already applied; this result was discarded.
    Stale,
    /// Cancelled before completion; no state was touched.
    Cancelled,
}

struct Applied {
    seq: u64,
    snapshot: EntitlementSnapshot,
}

pub struct EntitlementStore {
    billing: Arc<dyn BillingProvider>,
    profile: Arc<dyn ProfileSource>,
    products: ProductCatalog,
    next_seq: AtomicU64,
    applied: RwLock<Applied>,
}

/// Shared store handle passed to every consumer.
pub type SharedEntitlementStore = Arc<EntitlementStore>;

impl EntitlementStore {
    pub fn new(
        billing: Arc<dyn BillingProvider>,
        profile: Arc<dyn ProfileSource>,
        products: ProductCatalog,
    ) -> Self {
        Self {
            billing,
            profile,
            products,
            next_seq: AtomicU64::new(0),
            applied: RwLock::new(Applied {
                seq: 0,
                snapshot: EntitlementSnapshot::default(),
            }),
        }
    }

    pub fn shared(
        billing: Arc<dyn BillingProvider>,
        profile: Arc<dyn ProfileSource>,
        products: ProductCatalog,
    ) -> SharedEntitlementStore {
        Arc::new(Self::new(billing, profile, products))
    }

    /// Clone of the currently applied snapshot.
    pub async fn snapshot(&self) -> EntitlementSnapshot {
        self.applied.read().await.snapshot.clone()
    }

    /// Re-resolve from both sources and apply if still the newest refresh.
    ///
    /// Auth failures propagate so the caller can force re-login. An
    /// unreachable backend degrades to "no backend override"; the billing
    /// adapter never fails across this boundary.
    pub async fn refresh(
        &self,
        token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RefreshOutcome, BackendError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let profile = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(RefreshOutcome::Cancelled),
            result = self.profile.fetch_profile(token) => result,
        };

        let (admin_flag, backend_premium) = match profile {
            Ok(profile) => (profile.is_admin, profile.is_premium),
            Err(BackendError::Auth) => return Err(BackendError::Auth),
            Err(err) => {
                tracing::warn!(
                    "Profile fetch failed, treating as no backend override: {}",
                    err
                );
                (false, false)
            }
        };

        let sdk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(RefreshOutcome::Cancelled),
            state = self.billing.customer_info() => state,
        };

        let state = resolve(admin_flag, backend_premium, &sdk, &self.products);

        let mut applied = self.applied.write().await;
        if seq > applied.seq {
            applied.seq = seq;
            tracing::debug!(
                "Applied entitlement refresh #{} (source: {})",
                seq,
                state.premium_source.as_str()
            );
            applied.snapshot = EntitlementSnapshot::resolved(state);
            Ok(RefreshOutcome::Applied)
        } else {
            tracing::debug!(
                "Discarding stale refresh #{} (newest applied: #{})",
                seq,
                applied.seq
            );
            Ok(RefreshOutcome::Stale)
        }
    }

    /// Restore purchases: re-query the billing provider and report whether
    /// an active entitlement came back, folding the result into the
    /// snapshot via a normal refresh.
    pub async fn restore(
        &self,
        token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<bool, BillingError> {
        let restored = self.billing.restore().await?;
        if let Err(err) = self.refresh(token, cancel).await {
            tracing::warn!("Entitlement refresh after restore failed: {}", err);
        }
        Ok(restored)
    }

    /// Packages currently offered for purchase.
    pub async fn offerings(&self) -> Result<Vec<Package>, BillingError> {
        self.billing.offerings().await
    }
}
