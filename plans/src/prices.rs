use common::{
    env_config::StripePrices,
    error::{AppError, Res},
};

use crate::tier::PlanTier;

/// Two-way mapping between paid tiers and Stripe price identifiers.
#[derive(Debug, Clone, Default)]
pub struct PriceMap {
    entries: Vec<(PlanTier, String)>,
}

impl PriceMap {
    pub fn new(entries: impl IntoIterator<Item = (PlanTier, String)>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|(tier, price)| tier.is_paid() && !price.trim().is_empty())
            .collect();
        Self { entries }
    }

    pub fn from_config(prices: &StripePrices) -> Self {
        Self::new([
            (PlanTier::ProMonthly, prices.pro_monthly.clone()),
            (PlanTier::ProAnnual, prices.pro_annual.clone()),
            (PlanTier::FamilyMonthly, prices.family_monthly.clone()),
        ])
    }

    /// Stripe price sold for `tier`. FREE and unconfigured tiers are rejected.
    pub fn price_for(&self, tier: PlanTier) -> Res<&str> {
        self.entries
            .iter()
            .find(|(t, _)| *t == tier)
            .map(|(_, price)| price.as_str())
            .ok_or_else(|| AppError::BadRequest(format!("Plan {} cannot be purchased", tier)))
    }

    /// Internal tier of a Stripe price. Unknown prices are a validation error.
    pub fn tier_for(&self, price_id: &str) -> Res<PlanTier> {
        self.entries
            .iter()
            .find(|(_, price)| price == price_id)
            .map(|(tier, _)| *tier)
            .ok_or_else(|| AppError::UnknownPlan(format!("no plan uses price {}", price_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices() -> PriceMap {
        PriceMap::from_config(&StripePrices {
            pro_monthly: "price_pro_m".to_string(),
            pro_annual: "price_pro_y".to_string(),
            family_monthly: "price_family".to_string(),
        })
    }

    #[test]
    fn maps_both_ways() {
        let map = prices();
        for tier in [PlanTier::ProMonthly, PlanTier::ProAnnual, PlanTier::FamilyMonthly] {
            let price = map.price_for(tier).unwrap();
            assert_eq!(map.tier_for(price).unwrap(), tier);
        }
    }

    #[test]
    fn unknown_price_is_not_coerced() {
        assert!(matches!(
            prices().tier_for("price_other"),
            Err(AppError::UnknownPlan(_))
        ));
    }

    #[test]
    fn free_and_unconfigured_tiers_cannot_be_bought() {
        let map = PriceMap::new([
            (PlanTier::Free, "price_free".to_string()),
            (PlanTier::ProMonthly, "  ".to_string()),
        ]);
        assert!(map.price_for(PlanTier::Free).is_err());
        assert!(map.price_for(PlanTier::ProMonthly).is_err());
        assert!(map.tier_for("price_free").is_err());
    }
}
