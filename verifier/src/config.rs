// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Verification run configuration.

use crate::builder::InstanceSupplier;
use crate::decimal::Decimal;
use crate::error::VerifyError;
use crate::example::ExampleValues;
use crate::factory::Prefab;
use crate::report::{Invariant, VerificationReport};
use crate::strategy::{ComparisonStrategy, StrategyRegistry, StrategyScope};
use crate::target::{AnyEq, Verifiable};
use crate::value::FieldValues;
use crate::verifier::Verifier;
use std::any::Any;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::rc::Rc;

/// Produces a subtype instance carrying the same state as a base instance.
pub type SubtypeFactory<T> = Rc<dyn Fn(&T) -> Box<dyn AnyEq>>;

/// What the subclass checks expect from subtype instances with identical state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SubclassPolicy {
    /// Base and subtype instances with the same state are equal, in both directions.
    #[default]
    Equal,
    /// Base and subtype instances may be unequal, but both directions must agree.
    Strict,
}

/// Everything a verification run can be told.
///
/// All methods chain; problems with the configuration (unknown field names, mismatched
/// orderings, equal prefab values) surface as errors of the run.
pub struct Config<T> {
    pub(crate) fail_fast: bool,
    pub(crate) strategies: StrategyRegistry,
    pub(crate) ignored: Vec<String>,
    pub(crate) suppressed: HashSet<Invariant>,
    pub(crate) supplier: Option<InstanceSupplier<T>>,
    pub(crate) prefabs: Vec<Prefab>,
    pub(crate) subtype: Option<SubtypeFactory<T>>,
    pub(crate) subclass_policy: SubclassPolicy,
    pub(crate) require_all_fields_used: bool,
}

impl<T> Default for Config<T> {
    fn default() -> Self {
        Config {
            fail_fast: true,
            strategies: StrategyRegistry::new(),
            ignored: Vec::new(),
            suppressed: HashSet::new(),
            supplier: None,
            prefabs: Vec::new(),
            subtype: None,
            subclass_policy: SubclassPolicy::default(),
            require_all_fields_used: false,
        }
    }
}

impl<T> Clone for Config<T> {
    fn clone(&self) -> Self {
        Config {
            fail_fast: self.fail_fast,
            strategies: self.strategies.clone(),
            ignored: self.ignored.clone(),
            suppressed: self.suppressed.clone(),
            supplier: self.supplier.clone(),
            prefabs: self.prefabs.clone(),
            subtype: self.subtype.clone(),
            subclass_policy: self.subclass_policy,
            require_all_fields_used: self.require_all_fields_used,
        }
    }
}

impl<T> Debug for Config<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("fail_fast", &self.fail_fast)
            .field("strategies", &self.strategies)
            .field("ignored", &self.ignored)
            .field("suppressed", &self.suppressed)
            .field("supplier", &self.supplier.is_some())
            .field("prefabs", &self.prefabs)
            .field("subtype", &self.subtype.is_some())
            .field("subclass_policy", &self.subclass_policy)
            .field("require_all_fields_used", &self.require_all_fields_used)
            .finish()
    }
}

impl<T> Config<T> {
    /// The default configuration: fail fast, natural equality everywhere.
    #[must_use]
    pub fn new() -> Config<T> {
        Config::default()
    }

    /// Stop at the first violation (the default) or collect all of them.
    #[must_use]
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Override the comparison strategy for a field or a field type.
    #[must_use]
    pub fn strategy_override(mut self, scope: StrategyScope, strategy: ComparisonStrategy) -> Self {
        self.strategies.register(scope, strategy);
        self
    }

    /// Expect every field of type `F` to be compared with `cmp` rather than `==`.
    #[must_use]
    pub fn using_ordering_for<F: Any>(
        self,
        label: &'static str,
        cmp: fn(&F, &F) -> Ordering,
    ) -> Self {
        self.strategy_override(
            StrategyScope::of_type::<F>(),
            ComparisonStrategy::ordering(label, cmp),
        )
    }

    /// Expect every [`Decimal`] field to be compared numerically ([`Decimal::cmp_value`]) rather
    /// than structurally.
    #[must_use]
    pub fn using_decimal_cmp(self) -> Self {
        self.using_ordering_for::<Decimal>("Decimal::cmp_value", Decimal::cmp_value)
    }

    /// Fields (`name` or `Level.name`) which equality is expected to ignore.
    #[must_use]
    pub fn ignored_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.ignored.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Build instances with `supplier` when neither a constructor nor field injection works.
    ///
    /// The supplier must install exactly the given values; its instances are read back.
    #[must_use]
    pub fn manual_instance_supplier(
        mut self,
        supplier: impl Fn(&FieldValues) -> Result<T, String> + 'static,
    ) -> Self {
        self.supplier = Some(Rc::new(supplier));
        self
    }

    /// Do not run the given checks.
    #[must_use]
    pub fn suppress(mut self, invariants: impl IntoIterator<Item = Invariant>) -> Self {
        self.suppressed.extend(invariants);
        self
    }

    /// Use `red` and `blue` as the example values of `F`.
    #[must_use]
    pub fn with_prefab_values<F: Any + Debug + Clone + PartialEq>(self, red: F, blue: F) -> Self {
        self.with_prefab(ExampleValues::pair(red, blue))
    }

    /// Use `red` and `blue` as the example values of `F`, with `equivalent` an alternative
    /// representation of `red`.
    #[must_use]
    pub fn with_prefab_equivalent<F: Any + Debug + Clone + PartialEq>(
        self,
        red: F,
        blue: F,
        equivalent: F,
    ) -> Self {
        self.with_prefab(ExampleValues::pair(red, blue).with_equivalent(equivalent))
    }

    fn with_prefab<F: Any + Debug + Clone + PartialEq>(mut self, values: ExampleValues<F>) -> Self {
        self.prefabs.push(Prefab::new(values));
        self
    }

    /// Produce subtype instances for the subclass checks.
    #[must_use]
    pub fn with_subtype(mut self, subtype: impl Fn(&T) -> Box<dyn AnyEq> + 'static) -> Self {
        self.subtype = Some(Rc::new(subtype));
        self
    }

    /// Allow base and subtype instances to be unequal as long as both directions agree.
    #[must_use]
    pub fn strict_subtypes(mut self) -> Self {
        self.subclass_policy = SubclassPolicy::Strict;
        self
    }

    /// Report every non-ignored field which equality does not use.
    #[must_use]
    pub fn require_all_fields_used(mut self) -> Self {
        self.require_all_fields_used = true;
        self
    }

    /// Returns true if `invariant` will run.
    #[must_use]
    pub fn is_enabled(&self, invariant: Invariant) -> bool {
        !self.suppressed.contains(&invariant)
    }
}

impl<T: Verifiable> Config<T> {
    /// Verify `T` with this configuration.
    ///
    /// # Errors
    ///
    /// See [`Verifier::verify`].
    pub fn verify(self) -> Result<VerificationReport, VerifyError> {
        Verifier::new(self).verify()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    #[derive(Debug, PartialEq, Eq, Hash)]
    struct Nothing;

    #[test]
    fn defaults() {
        let config = Config::<Nothing>::new();
        assert!(config.fail_fast);
        assert!(config.strategies.is_empty());
        assert_eq!(config.subclass_policy, SubclassPolicy::Equal);
        assert!(!config.require_all_fields_used);
        assert!(Invariant::iter().all(|invariant| config.is_enabled(invariant)));
    }

    #[test]
    fn options_chain() {
        let config = Config::<Nothing>::new()
            .fail_fast(false)
            .ignored_fields(["cache", "Base.id"])
            .suppress([Invariant::Transitivity])
            .using_decimal_cmp()
            .with_prefab_values(1_u8, 2_u8)
            .strict_subtypes()
            .require_all_fields_used();
        let copy = config.clone();
        assert!(!copy.fail_fast);
        assert_eq!(copy.ignored, vec!["cache".to_string(), "Base.id".to_string()]);
        assert!(!copy.is_enabled(Invariant::Transitivity));
        assert!(!copy.strategies.is_empty());
        assert_eq!(copy.prefabs.len(), 1);
        assert_eq!(copy.subclass_policy, SubclassPolicy::Strict);
        assert!(format!("{copy:?}").contains("require_all_fields_used: true"));
    }
}
