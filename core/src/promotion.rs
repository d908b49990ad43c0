//! Business rules applied to incoming records before a Type 1 overwrite.

use crate::{
    record::{Attributes, TrackedAttr},
    types::CustomerId,
};

/// A transformation pass over incoming Type 1 rows.
pub trait PromotionRule {
    fn name(&self) -> &'static str;

    /// Source columns the rule reads. Missing ones fail the Type 1 stage.
    fn required_columns(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Rewrite `attrs` in place. Returns true when the row was changed.
    fn apply(&self, customer_id: CustomerId, attrs: &mut Attributes) -> bool;
}

/// Leaves every row as extracted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPromotion;

impl PromotionRule for NoPromotion {
    fn name(&self) -> &'static str {
        "none"
    }

    fn apply(&self, _customer_id: CustomerId, _attrs: &mut Attributes) -> bool {
        false
    }
}

/// Moves one designated customer from `from_tier` (case-insensitive)
/// to `to_tier`. Every other key passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedTierPromotion {
    pub customer_id: CustomerId,
    pub from_tier:   String,
    pub to_tier:     String,
}

impl Default for KeyedTierPromotion {
    fn default() -> Self {
        Self {
            customer_id: 1,
            from_tier:   "gold".into(),
            to_tier:     "Diamond".into(),
        }
    }
}

impl PromotionRule for KeyedTierPromotion {
    fn name(&self) -> &'static str {
        "keyed_tier_promotion"
    }

    fn required_columns(&self) -> Vec<&'static str> {
        vec![TrackedAttr::LoyaltyStatus.column()]
    }

    fn apply(&self, customer_id: CustomerId, attrs: &mut Attributes) -> bool {
        if customer_id != self.customer_id {
            return false;
        }
        let eligible = attrs
            .loyalty_status
            .as_deref()
            .is_some_and(|s| s.to_lowercase() == self.from_tier.to_lowercase());
        if eligible {
            attrs.loyalty_status = Some(self.to_tier.clone());
        }
        eligible
    }
}
