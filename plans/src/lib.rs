//! Plan tiers, the static plan catalog and the pure quota policy.
//!
//! Nothing in this crate touches storage; gates elsewhere load the
//! subscription record and hand the tier and usage counts in here.

pub mod catalog;
pub mod messages;
pub mod prices;
pub mod quota;
pub mod tier;

pub use catalog::{FeatureFlags, Plan, PlanLimits, get_plan, get_plan_limits, plan, plans};
pub use prices::PriceMap;
pub use tier::PlanTier;
