use serde::{Deserialize, Serialize};

use crate::backend::ResourceCount;
use crate::billing::Package;
use crate::entitlement::{EntitlementSnapshot, FreeLimits, RefreshOutcome, ResourceKind};

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub outcome: RefreshOutcome,
    pub entitlement: EntitlementSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreResponse {
    pub restored: bool,
    pub entitlement: EntitlementSnapshot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitCheckRequest {
    pub kind: ResourceKind,
    pub current_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferingsResponse {
    pub packages: Vec<Package>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LimitsResponse {
    pub limits: FreeLimits,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountsResponse {
    pub counts: Vec<ResourceCount>,
}
