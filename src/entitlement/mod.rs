pub mod limits;
pub mod middleware;
pub mod resolver;
pub mod state;
pub mod store;

pub use limits::{can_add_more, evaluate, should_show_limit_popup, FreeLimits, ResourceKind};
pub use middleware::{check_resource_limit, extract_session_token};
pub use resolver::resolve;
pub use state::{EntitlementSnapshot, EntitlementState, PlanType, PremiumSource};
pub use store::{EntitlementStore, RefreshOutcome, SharedEntitlementStore};
