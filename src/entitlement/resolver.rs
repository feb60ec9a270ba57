//! Plan resolution: merges the admin flag, the backend premium flag and
//! the billing SDK state into a single entitlement.

use crate::billing::SdkState;
use crate::config::ProductCatalog;

use super::state::{EntitlementState, PlanType, PremiumSource};

/// Merge the three entitlement sources.
///
/// Precedence, first match wins: admin flag, backend premium flag, active
/// SDK entitlement, none. Descriptive SDK fields (product id, renewal
/// date, auto-renew) are carried through whichever branch wins; an
/// unconfigured or errored SDK contributes none of them.
pub fn resolve(
    admin_flag: bool,
    backend_premium: bool,
    sdk: &SdkState,
    products: &ProductCatalog,
) -> EntitlementState {
    let (has_active, active_product_id, renewal_date, will_renew) = match sdk {
        SdkState::Configured {
            active_entitlements,
            active_product_id,
            renewal_date,
            will_renew,
        } => (
            !active_entitlements.is_empty(),
            active_product_id.clone(),
            *renewal_date,
            *will_renew,
        ),
        SdkState::NotConfigured | SdkState::Error { .. } => (false, None, None, false),
    };

    let plan_type = products.plan_for(active_product_id.as_deref());

    if admin_flag {
        // Admin bypasses billing semantics; no plan is reported.
        EntitlementState {
            is_premium: true,
            is_admin: true,
            premium_source: PremiumSource::Admin,
            plan_type: PlanType::Unknown,
            active_product_id,
            renewal_date,
            will_renew,
        }
    } else if backend_premium {
        EntitlementState {
            is_premium: true,
            is_admin: false,
            premium_source: PremiumSource::Backend,
            plan_type,
            active_product_id,
            renewal_date,
            will_renew,
        }
    } else if has_active {
        EntitlementState {
            is_premium: true,
            is_admin: false,
            premium_source: PremiumSource::Revenuecat,
            plan_type,
            active_product_id,
            renewal_date,
            will_renew,
        }
    } else {
        EntitlementState {
            is_premium: false,
            is_admin: false,
            premium_source: PremiumSource::None,
            plan_type: PlanType::Unknown,
            active_product_id,
            renewal_date,
            will_renew,
        }
    }
}
