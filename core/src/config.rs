use crate::{
    policy::Type1Options,
    promotion::{KeyedTierPromotion, NoPromotion, PromotionRule},
    record::TrackedAttr,
    types::CustomerId,
};
use serde::{Deserialize, Serialize};

// ── Collaborator connections ───────────────────────────────────────

/// Where the current customer snapshot is extracted from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub database: String,
    #[serde(default = "default_source_table")]
    pub table: String,
}

fn default_source_table() -> String {
    "customers".into()
}

/// Where dimension, history and analytics tables are loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub database: String,
}

// ── Reconciliation settings ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromotionConfig {
    pub customer_id: CustomerId,
    pub from_tier:   String,
    pub to_tier:     String,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        let rule = KeyedTierPromotion::default();
        Self {
            customer_id: rule.customer_id,
            from_tier:   rule.from_tier,
            to_tier:     rule.to_tier,
        }
    }
}

fn default_tracked() -> Vec<TrackedAttr> {
    TrackedAttr::ALL.to_vec()
}

fn default_promotion() -> Option<PromotionConfig> {
    Some(PromotionConfig::default())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    pub source: SourceConfig,
    pub target: TargetConfig,
    #[serde(default = "default_tracked")]
    pub tracked_attributes: Vec<TrackedAttr>,
    /// `null` disables the Type 1 promotion rule.
    #[serde(default = "default_promotion")]
    pub promotion: Option<PromotionConfig>,
    #[serde(default)]
    pub type1: Type1Options,
}

impl EtlConfig {
    /// Load from a JSON config file.
    /// In tests, use EtlConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EtlConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tracked_attributes.is_empty() {
            anyhow::bail!("tracked_attributes must name at least one attribute");
        }
        if self.source.table.trim().is_empty() {
            anyhow::bail!("source.table must not be empty");
        }
        if self.source.database.trim().is_empty() || self.target.database.trim().is_empty() {
            anyhow::bail!("source.database and target.database must not be empty");
        }
        if let Some(p) = &self.promotion {
            if p.from_tier.trim().is_empty() || p.to_tier.trim().is_empty() {
                anyhow::bail!("promotion tiers must not be empty");
            }
        }
        Ok(())
    }

    /// Tracked attributes, deduplicated, in canonical column order.
    pub fn tracked(&self) -> Vec<TrackedAttr> {
        let mut tracked = self.tracked_attributes.clone();
        tracked.sort();
        tracked.dedup();
        tracked
    }

    pub fn promotion_rule(&self) -> Box<dyn PromotionRule> {
        match &self.promotion {
            Some(p) => Box::new(KeyedTierPromotion {
                customer_id: p.customer_id,
                from_tier:   p.from_tier.clone(),
                to_tier:     p.to_tier.clone(),
            }),
            None => Box::new(NoPromotion),
        }
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            source: SourceConfig {
                database: ":memory:".into(),
                table:    default_source_table(),
            },
            target: TargetConfig {
                database: ":memory:".into(),
            },
            tracked_attributes: default_tracked(),
            promotion: default_promotion(),
            type1: Type1Options::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_gets_defaults() {
        let json = r#"{
            "source": { "database": "source.db" },
            "target": { "database": "warehouse.db" }
        }"#;
        let config: EtlConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.source.table, "customers");
        assert_eq!(config.tracked(), TrackedAttr::ALL.to_vec());
        assert_eq!(config.promotion, Some(PromotionConfig::default()));
        assert!(!config.type1.retain_absent_keys);
        assert_eq!(config.promotion_rule().name(), "keyed_tier_promotion");
    }

    #[test]
    fn explicit_null_promotion_disables_the_rule() {
        let json = r#"{
            "source": { "database": "s.db", "table": "customers_cleaned" },
            "target": { "database": "t.db" },
            "tracked_attributes": ["loyalty_status", "email", "email"],
            "promotion": null,
            "type1": { "retain_absent_keys": true }
        }"#;
        let config: EtlConfig = serde_json::from_str(json).unwrap();

        assert_eq!(
            config.tracked(),
            vec![TrackedAttr::Email, TrackedAttr::LoyaltyStatus]
        );
        assert_eq!(config.promotion_rule().name(), "none");
        assert!(config.type1.retain_absent_keys);
    }

    #[test]
    fn empty_tracked_set_is_rejected() {
        let mut config = EtlConfig::default_test();
        config.tracked_attributes.clear();
        assert!(config.validate().is_err());
    }
}
