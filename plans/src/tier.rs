use std::{fmt, str::FromStr};

use common::error::AppError;
use serde::{Deserialize, Serialize};

/// Subscription level a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanTier {
    Free,
    ProMonthly,
    ProAnnual,
    FamilyMonthly,
}

impl PlanTier {
    /// All tiers in pricing-page order.
    pub const ALL: [PlanTier; 4] = [
        PlanTier::Free,
        PlanTier::ProMonthly,
        PlanTier::ProAnnual,
        PlanTier::FamilyMonthly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "FREE",
            PlanTier::ProMonthly => "PRO_MONTHLY",
            PlanTier::ProAnnual => "PRO_ANNUAL",
            PlanTier::FamilyMonthly => "FAMILY_MONTHLY",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, PlanTier::Free)
    }

    /// Parses a tier read back from storage or another untrusted source.
    /// Unrecognised values fall back to `Free` so that a corrupt row can
    /// never unlock paid features.
    pub fn from_stored(value: &str) -> PlanTier {
        value.parse().unwrap_or_else(|_| {
            log::warn!("Unrecognised plan '{}', treating it as FREE", value);
            PlanTier::Free
        })
    }
}

impl FromStr for PlanTier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "FREE" => Ok(PlanTier::Free),
            "PRO_MONTHLY" => Ok(PlanTier::ProMonthly),
            "PRO_ANNUAL" => Ok(PlanTier::ProAnnual),
            "FAMILY_MONTHLY" => Ok(PlanTier::FamilyMonthly),
            other => Err(AppError::UnknownPlan(other.to_string())),
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_identifier() {
        for tier in PlanTier::ALL {
            assert_eq!(tier.as_str().parse::<PlanTier>().unwrap(), tier);
        }
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let err = "ENTERPRISE".parse::<PlanTier>().unwrap_err();
        assert!(matches!(err, AppError::UnknownPlan(ref id) if id == "ENTERPRISE"));
    }

    #[test]
    fn stored_garbage_fails_closed() {
        assert_eq!(PlanTier::from_stored("pro_monthly"), PlanTier::Free);
        assert_eq!(PlanTier::from_stored(""), PlanTier::Free);
        assert_eq!(PlanTier::from_stored("FAMILY_MONTHLY"), PlanTier::FamilyMonthly);
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&PlanTier::FamilyMonthly).unwrap();
        assert_eq!(json, "\"FAMILY_MONTHLY\"");
        let tier: PlanTier = serde_json::from_str("\"PRO_ANNUAL\"").unwrap();
        assert_eq!(tier, PlanTier::ProAnnual);
    }
}
