//! Feature-to-module catalog.
//!
//! Price plans describe what a subscriber pays for as a flat list of feature
//! names. Tenant databases are provisioned in terms of modules. The catalog
//! owns the mapping between the two: every tenant receives the core modules,
//! plus whatever modules its plan's features map to. Feature names with no
//! module mapping (pure entitlement flags) and names the catalog has never
//! heard of contribute nothing; an unknown feature must never block
//! provisioning.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{AppConfig, TrialModulePolicy};

/// Maps plan feature names to the tenant modules they require.
#[derive(Debug, Clone)]
pub struct FeatureCatalog {
    feature_modules: BTreeMap<String, Option<String>>,
    core_modules: BTreeSet<String>,
    trial_policy: TrialModulePolicy,
}

impl FeatureCatalog {
    pub fn new(
        feature_modules: BTreeMap<String, Option<String>>,
        core_modules: impl IntoIterator<Item = String>,
        trial_policy: TrialModulePolicy,
    ) -> Self {
        Self {
            feature_modules,
            core_modules: core_modules.into_iter().collect(),
            trial_policy,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.feature_module_map.clone(),
            config.core_modules.iter().cloned(),
            config.trial_module_policy,
        )
    }

    /// Resolve the module set for a list of plan feature names.
    ///
    /// The result always contains the core modules, is deduplicated, and is
    /// independent of feature order. Matching is case-insensitive on the
    /// feature side; module identifiers come back exactly as configured.
    pub fn modules_for_features<I, S>(&self, features: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut modules = self.core_modules.clone();

        for feature in features {
            let key = feature.as_ref().trim().to_ascii_lowercase();
            match self.feature_modules.get(&key) {
                Some(Some(module)) => {
                    modules.insert(module.clone());
                }
                Some(None) => {
                    // Entitlement-only feature, no module behind it.
                }
                None => {
                    tracing::debug!(feature = %key, "feature has no module mapping, ignoring");
                }
            }
        }

        modules
    }

    /// Module set for a tenant with no completed payment (trial tenant).
    pub fn trial_modules(&self) -> BTreeSet<String> {
        match self.trial_policy {
            TrialModulePolicy::Core => self.core_modules.clone(),
            TrialModulePolicy::All => {
                let mut modules = self.core_modules.clone();
                modules.extend(
                    self.feature_modules
                        .values()
                        .filter_map(|m| m.as_ref().cloned()),
                );
                modules
            }
        }
    }

    /// Every module the catalog can ever hand out.
    pub fn known_modules(&self) -> BTreeSet<String> {
        let mut modules = self.core_modules.clone();
        modules.extend(
            self.feature_modules
                .values()
                .filter_map(|m| m.as_ref().cloned()),
        );
        modules
    }

    pub fn core_modules(&self) -> &BTreeSet<String> {
        &self.core_modules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(policy: TrialModulePolicy) -> FeatureCatalog {
        let mut map = BTreeMap::new();
        map.insert("blog".to_string(), Some("Blog".to_string()));
        map.insert("event".to_string(), Some("Event".to_string()));
        map.insert("gallery".to_string(), None);
        FeatureCatalog::new(map, vec!["Core".to_string()], policy)
    }

    #[test]
    fn test_core_modules_always_present() {
        let catalog = catalog(TrialModulePolicy::Core);
        let modules = catalog.modules_for_features(Vec::<&str>::new());
        assert_eq!(modules, BTreeSet::from(["Core".to_string()]));
    }

    #[test]
    fn test_features_map_to_modules() {
        let catalog = catalog(TrialModulePolicy::Core);
        let modules = catalog.modules_for_features(["blog", "event"]);
        assert_eq!(
            modules,
            BTreeSet::from(["Blog".to_string(), "Core".to_string(), "Event".to_string()])
        );
    }

    #[test]
    fn test_unknown_and_unmapped_features_are_ignored() {
        let catalog = catalog(TrialModulePolicy::Core);
        let modules = catalog.modules_for_features(["blog", "gallery", "crm", "sso"]);
        assert_eq!(
            modules,
            BTreeSet::from(["Blog".to_string(), "Core".to_string()])
        );
    }

    #[test]
    fn test_matching_is_case_insensitive_and_order_independent() {
        let catalog = catalog(TrialModulePolicy::Core);
        let a = catalog.modules_for_features(["Event", "BLOG"]);
        let b = catalog.modules_for_features(["blog", "event", "blog"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_trial_policy_core() {
        let catalog = catalog(TrialModulePolicy::Core);
        assert_eq!(catalog.trial_modules(), BTreeSet::from(["Core".to_string()]));
    }

    #[test]
    fn test_trial_policy_all() {
        let catalog = catalog(TrialModulePolicy::All);
        assert_eq!(
            catalog.trial_modules(),
            BTreeSet::from(["Blog".to_string(), "Core".to_string(), "Event".to_string()])
        );
    }

    #[test]
    fn test_known_modules() {
        let catalog = catalog(TrialModulePolicy::Core);
        assert_eq!(
            catalog.known_modules(),
            BTreeSet::from(["Blog".to_string(), "Core".to_string(), "Event".to_string()])
        );
    }
}
