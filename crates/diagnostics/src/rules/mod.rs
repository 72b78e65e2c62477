//! The built-in rule catalog, one module per symptom family.

pub mod access;
pub mod content;
pub mod hygiene;
pub mod origin_health;

pub use access::{
    AccessControlMissingRule, AccessControlUnattachedRule, GeoRestrictionRule, WafAssociationRule,
};
pub use content::{DefaultRootObjectRule, OriginPathPrefixRule, UncoveredPathRule};
pub use hygiene::{
    CompressionRule, ForwardingRule, PlaintextViewerRule, PublicExposureRule, TlsPolicyRule,
};
pub use origin_health::{
    NotDeployedRule, OriginUnreachableRule, ProtocolMismatchRule, ReadTimeoutRule,
};

use crate::runner::RuleRegistry;

/// Registry with every built-in rule.
pub fn default_catalog() -> RuleRegistry {
    let mut registry = RuleRegistry::new();

    registry.register(AccessControlMissingRule);
    registry.register(AccessControlUnattachedRule);
    registry.register(GeoRestrictionRule);
    registry.register(WafAssociationRule);

    registry.register(DefaultRootObjectRule);
    registry.register(UncoveredPathRule);
    registry.register(OriginPathPrefixRule);

    registry.register(ReadTimeoutRule);
    registry.register(ProtocolMismatchRule);
    registry.register(OriginUnreachableRule);
    registry.register(NotDeployedRule);

    registry.register(PublicExposureRule);
    registry.register(PlaintextViewerRule);
    registry.register(TlsPolicyRule);
    registry.register(CompressionRule);
    registry.register(ForwardingRule);

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_registers_every_builtin_rule() {
        let registry = default_catalog();
        assert_eq!(registry.list_ids().len(), 16);
    }

    #[test]
    fn rule_ids_are_unique() {
        let registry = default_catalog();
        let mut ids = registry.list_ids();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 16);
    }
}
