//! Free-tier limits and creation gating.
//!
//! The limit values are product configuration; defaults ship here and the
//! config file may override the whole table.

use serde::{Deserialize, Serialize};

use super::state::{EntitlementSnapshot, EntitlementState};

/// Countable resource kinds gated on the free tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Horses,
    Riders,
    Suppliers,
    Competitions,
    Palmares,
    Expenses,
    Reminders,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Horses,
        ResourceKind::Riders,
        ResourceKind::Suppliers,
        ResourceKind::Competitions,
        ResourceKind::Palmares,
        ResourceKind::Expenses,
        ResourceKind::Reminders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Horses => "horses",
            ResourceKind::Riders => "riders",
            ResourceKind::Suppliers => "suppliers",
            ResourceKind::Competitions => "competitions",
            ResourceKind::Palmares => "palmares",
            ResourceKind::Expenses => "expenses",
            ResourceKind::Reminders => "reminders",
        }
    }
}

/// Maximum counts a non-premium user may create, per resource kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FreeLimits {
    pub horses: u32,
    pub riders: u32,
    pub suppliers: u32,
    pub competitions: u32,
    pub palmares: u32,
    pub expenses: u32,
    pub reminders: u32,
}

impl Default for FreeLimits {
    fn default() -> Self {
        Self {
            horses: 3,
            riders: 3,
            suppliers: 5,
            competitions: 5,
            palmares: 10,
            expenses: 20,
            reminders: 10,
        }
    }
}

impl FreeLimits {
    pub fn limit_for(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Horses => self.horses,
            ResourceKind::Riders => self.riders,
            ResourceKind::Suppliers => self.suppliers,
            ResourceKind::Competitions => self.competitions,
            ResourceKind::Palmares => self.palmares,
            ResourceKind::Expenses => self.expenses,
            ResourceKind::Reminders => self.reminders,
        }
    }
}

/// True iff the user may create another resource of `kind`.
pub fn can_add_more(
    state: &EntitlementState,
    limits: &FreeLimits,
    kind: ResourceKind,
    current_count: u32,
) -> bool {
    state.is_premium || state.is_admin || current_count < limits.limit_for(kind)
}

/// Whether the upgrade prompt should be shown for an attempted add.
///
/// Always false while the snapshot is still loading: the prompt must not
/// flash before the real plan is known. This is a UX contract, not an
/// optimization.
pub fn should_show_limit_popup(
    snapshot: &EntitlementSnapshot,
    limits: &FreeLimits,
    kind: ResourceKind,
    current_count: u32,
) -> bool {
    if snapshot.loading {
        return false;
    }
    !can_add_more(&snapshot.state, limits, kind, current_count)
}

/// Outcome of a limit check, shaped for the RPC surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitDecision {
    pub kind: ResourceKind,
    pub allowed: bool,
    pub show_popup: bool,
    pub current_count: u32,
    pub limit: u32,
    pub remaining: u32,
}

/// Evaluate one add attempt against the current snapshot.
pub fn evaluate(
    snapshot: &EntitlementSnapshot,
    limits: &FreeLimits,
    kind: ResourceKind,
    current_count: u32,
) -> LimitDecision {
    let limit = limits.limit_for(kind);
    LimitDecision {
        kind,
        allowed: can_add_more(&snapshot.state, limits, kind, current_count),
        show_popup: should_show_limit_popup(snapshot, limits, kind, current_count),
        current_count,
        limit,
        remaining: limit.saturating_sub(current_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::state::PremiumSource;

    fn free_state() -> EntitlementState {
        EntitlementState::default()
    }

    fn premium_state() -> EntitlementState {
        EntitlementState {
            is_premium: true,
            premium_source: PremiumSource::Backend,
            ..EntitlementState::default()
        }
    }

    fn admin_state() -> EntitlementState {
        EntitlementState {
            is_premium: true,
            is_admin: true,
            premium_source: PremiumSource::Admin,
            ..EntitlementState::default()
        }
    }

    #[test]
    fn test_free_user_blocked_at_limit() {
        let limits = FreeLimits::default();
        assert!(!can_add_more(
            &free_state(),
            &limits,
            ResourceKind::Horses,
            3
        ));

        let snapshot = EntitlementSnapshot::resolved(free_state());
        assert!(should_show_limit_popup(
            &snapshot,
            &limits,
            ResourceKind::Horses,
            3
        ));
    }

    #[test]
    fn test_free_user_allowed_below_limit() {
        let limits = FreeLimits::default();
        assert!(can_add_more(&free_state(), &limits, ResourceKind::Horses, 2));

        let snapshot = EntitlementSnapshot::resolved(free_state());
        assert!(!should_show_limit_popup(
            &snapshot,
            &limits,
            ResourceKind::Horses,
            2
        ));
    }

    #[test]
    fn test_premium_bypasses_limits() {
        let limits = FreeLimits::default();
        assert!(can_add_more(
            &premium_state(),
            &limits,
            ResourceKind::Horses,
            3
        ));
        assert!(can_add_more(
            &premium_state(),
            &limits,
            ResourceKind::Expenses,
            10_000
        ));
    }

    #[test]
    fn test_admin_bypasses_limits() {
        let limits = FreeLimits::default();
        // Admin access is unlimited even without a premium subscription
        let state = EntitlementState {
            is_premium: false,
            is_admin: true,
            ..EntitlementState::default()
        };
        assert!(can_add_more(&state, &limits, ResourceKind::Riders, 50));
    }

    #[test]
    fn test_popup_suppressed_while_loading() {
        let limits = FreeLimits::default();
        let snapshot = EntitlementSnapshot::default();
        assert!(snapshot.loading);
        assert!(!should_show_limit_popup(
            &snapshot,
            &limits,
            ResourceKind::Horses,
            99
        ));
    }

    #[test]
    fn test_can_add_is_monotonic_in_count() {
        let limits = FreeLimits::default();
        let mut denied = false;
        for count in 0..limits.expenses + 10 {
            let allowed = can_add_more(&free_state(), &limits, ResourceKind::Expenses, count);
            if denied {
                assert!(!allowed, "allowed again at count {}", count);
            }
            if !allowed {
                denied = true;
            }
        }
        assert!(denied);
    }

    #[test]
    fn test_popup_is_negation_of_can_add_once_loaded() {
        let limits = FreeLimits::default();
        let snapshot = EntitlementSnapshot::resolved(free_state());
        for kind in ResourceKind::ALL {
            for count in 0..limits.limit_for(kind) + 2 {
                let allowed = can_add_more(&snapshot.state, &limits, kind, count);
                let popup = should_show_limit_popup(&snapshot, &limits, kind, count);
                assert_eq!(popup, !allowed);
            }
        }
    }

    #[test]
    fn test_default_limit_table() {
        let limits = FreeLimits::default();
        assert_eq!(limits.limit_for(ResourceKind::Horses), 3);
        assert_eq!(limits.limit_for(ResourceKind::Riders), 3);
        assert_eq!(limits.limit_for(ResourceKind::Expenses), 20);
    }

    #[test]
    fn test_evaluate_reports_remaining() {
        let limits = FreeLimits::default();
        let snapshot = EntitlementSnapshot::resolved(free_state());
        let decision = evaluate(&snapshot, &limits, ResourceKind::Horses, 1);
        assert!(decision.allowed);
        assert!(!decision.show_popup);
        assert_eq!(decision.limit, 3);
        assert_eq!(decision.remaining, 2);

        let decision = evaluate(&snapshot, &limits, ResourceKind::Horses, 5);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn test_admin_still_sees_popup_suppressed() {
        let limits = FreeLimits::default();
        let snapshot = EntitlementSnapshot::resolved(admin_state());
        assert!(!should_show_limit_popup(
            &snapshot,
            &limits,
            ResourceKind::Palmares,
            500
        ));
    }
}
