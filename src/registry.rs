//! Name-based construction of binarization strategies.

use std::collections::BTreeMap;

use crate::config::OptionMap;
use crate::error::{BinarizeError, Result};
use crate::params::ParamStore;
use crate::schemes::{SignBinarizer, StochasticBinarizer, ThresholdBinarizer};
use crate::strategy::{BaseBinarizer, BinarizationStrategy};

/// Constructor for a boxed strategy.
pub type StrategyConstructor =
    fn(OptionMap, ParamStore) -> Result<Box<dyn BinarizationStrategy>>;

/// Registry of strategy constructors keyed by name.
///
/// # Example
///
/// ```ignore
/// use binarize_rs::{OptionMap, ParamStore, StrategyRegistry};
///
/// let registry = StrategyRegistry::with_builtin();
/// let mut strategy = registry.create("sign", OptionMap::new(), ParamStore::new())?;
/// let report = strategy.binarize()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    constructors: BTreeMap<String, StrategyConstructor>,
}

impl StrategyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every strategy shipped by this crate.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(BaseBinarizer::NAME, |options, params| {
            Ok(Box::new(BaseBinarizer::new(options)?.with_params(params)))
        });
        registry.register(SignBinarizer::NAME, |options, params| {
            Ok(Box::new(SignBinarizer::new(options)?.with_params(params)))
        });
        registry.register(ThresholdBinarizer::NAME, |options, params| {
            Ok(Box::new(ThresholdBinarizer::new(options)?.with_params(params)))
        });
        registry.register(StochasticBinarizer::NAME, |options, params| {
            Ok(Box::new(StochasticBinarizer::new(options)?.with_params(params)))
        });
        registry
    }

    /// Register a constructor, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, constructor: StrategyConstructor) {
        let name = name.into();
        if self.constructors.insert(name.clone(), constructor).is_some() {
            tracing::debug!(strategy = %name, "replaced registered strategy");
        }
    }

    /// Whether a strategy is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Construct the strategy registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BinarizeError::UnknownStrategy`] for unregistered names, or
    /// the constructor's error for invalid options.
    pub fn create(
        &self,
        name: &str,
        options: OptionMap,
        params: ParamStore,
    ) -> Result<Box<dyn BinarizationStrategy>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| BinarizeError::UnknownStrategy(name.to_string()))?;
        constructor(options, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Algorithm;
    use serde_json::json;

    #[test]
    fn test_builtin_names() {
        let registry = StrategyRegistry::with_builtin();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["base", "sign", "stochastic", "threshold"]);
    }

    #[test]
    fn test_create_known_and_unknown() {
        let registry = StrategyRegistry::with_builtin();

        let strategy = registry
            .create("sign", OptionMap::new(), ParamStore::new())
            .unwrap();
        assert_eq!(strategy.name(), "sign");

        assert!(matches!(
            registry.create("ternary", OptionMap::new(), ParamStore::new()),
            Err(BinarizeError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_create_propagates_config_errors() {
        let registry = StrategyRegistry::with_builtin();
        let mut options = OptionMap::new();
        options.insert("bits".to_string(), json!(4));

        assert!(matches!(
            registry.create("base", options, ParamStore::new()),
            Err(BinarizeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_registry() {
        let registry = StrategyRegistry::new();
        assert!(!registry.contains("sign"));
        assert_eq!(registry.names().count(), 0);
    }
}
