// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The verification pipeline.

use crate::builder::InstanceBuilder;
use crate::checker::{Checker, FieldPlan};
use crate::config::Config;
use crate::error::VerifyError;
use crate::factory::ValueFactory;
use crate::field::{FieldAccessor, FieldKey};
use crate::report::{Reporter, VerificationReport};
use crate::target::Verifiable;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Verifies the equality and hash contract of `T`.
///
/// Every run starts from scratch: the type is introspected, example values are synthesized for
/// each field, and the checks build their own instances.  Runs share no state, so verifying the
/// same type twice yields the same report.
#[derive(Debug)]
pub struct Verifier<T> {
    config: Config<T>,
}

impl<T: Verifiable> Verifier<T> {
    /// A verifier with the given configuration.
    #[must_use]
    pub fn new(config: Config<T>) -> Verifier<T> {
        Verifier { config }
    }

    /// The configuration of this verifier.
    #[must_use]
    pub fn config(&self) -> &Config<T> {
        &self.config
    }

    /// Run the checks.
    ///
    /// # Errors
    ///
    /// Configuration problems ([`VerifyError::is_configuration_error`]) abort the run before any
    /// check executes.  Otherwise a failed run returns [`VerifyError::ContractViolation`] or
    /// [`VerifyError::StrategyMismatch`], by the kind of the first violation, carrying the full
    /// report.
    #[instrument(level = "debug", skip_all, fields(type_name = T::type_info().name()))]
    pub fn verify(&self) -> Result<VerificationReport, VerifyError> {
        let accessor = FieldAccessor::<T>::introspect()?;
        let strategies = self.config.strategies.resolve(&accessor)?;
        let ignored = self.ignored(&accessor)?;

        let mut factory = ValueFactory::new();
        for prefab in &self.config.prefabs {
            factory.register(prefab.clone())?;
        }
        let examples = factory.with_recursion_guard::<T, _>(|factory| {
            accessor
                .fields()
                .iter()
                .zip(&strategies)
                .map(|(field, strategy)| factory.field_examples(field, strategy))
                .collect::<Result<Vec<_>, _>>()
        })?;
        let plan: Vec<FieldPlan> = accessor
            .fields()
            .iter()
            .zip(strategies)
            .zip(examples)
            .map(|((field, strategy), examples)| {
                debug!("{}: {examples:?}", field.key());
                FieldPlan {
                    strategy,
                    ignored: ignored.contains(&field.key()),
                    examples,
                }
            })
            .collect();

        let builder = InstanceBuilder::new(&accessor, self.config.supplier.clone());
        let reporter = Reporter::new(accessor.type_info().name(), self.config.fail_fast);
        let reporter = Checker::new(&accessor, &builder, &plan, &self.config, reporter).run()?;
        reporter.report(builder.preferred())
    }

    fn ignored(&self, accessor: &FieldAccessor<T>) -> Result<HashSet<FieldKey>, VerifyError> {
        let mut ignored = HashSet::new();
        for selector in &self.config.ignored {
            ignored.extend(accessor.select(selector)?.iter().map(|field| field.key()));
        }
        Ok(ignored)
    }
}

/// Verify `T` with the default configuration.
///
/// # Errors
///
/// See [`Verifier::verify`].
pub fn verify<T: Verifiable>() -> Result<VerificationReport, VerifyError> {
    Config::<T>::new().verify()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod test {
    use super::*;
    use crate::builder::ConstructionStrategy;
    use crate::report::{Invariant, Relation, ViolationKind};
    use crate::{Example, Verifiable};
    use pretty_assertions::assert_eq;
    use std::hash::{Hash, Hasher};
    use tracing_test::traced_test;

    #[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable, Example)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Clone, Debug, Verifiable, Example)]
    struct Tagged {
        id: u32,
        label: String,
    }

    impl PartialEq for Tagged {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl Hash for Tagged {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
            self.label.hash(state);
        }
    }

    #[test]
    #[traced_test]
    fn well_behaved_type_passes() {
        let report = verify::<Point>().unwrap();
        assert!(report.passed());
        assert_eq!(report.type_name(), "Point");
        assert_eq!(report.construction(), Some(ConstructionStrategy::FieldInjection));
        assert_eq!(report.checks_run().len(), 8);
        assert!(!report.checks_run().contains(&Invariant::Subclass));
        assert!(logs_contain("building Point via field_injection"));
    }

    #[test]
    #[traced_test]
    fn hash_over_ignored_state_is_reported() {
        let err = Config::<Tagged>::new()
            .ignored_fields(["label"])
            .verify()
            .unwrap_err();
        let report = err.report().unwrap();
        let violation = report.first_violation().unwrap();
        assert_eq!(violation.invariant, Invariant::HashConsistency);
        assert_eq!(violation.kind, ViolationKind::Contract);
        assert_eq!(violation.field, Some(FieldKey::new("Tagged", "label")));
        assert_eq!(violation.actual, Relation::DifferentHash);
        assert!(logs_contain("hash_consistency violated"));
    }

    #[test]
    fn unknown_ignored_field_aborts() {
        let err = Config::<Point>::new()
            .ignored_fields(["z"])
            .verify()
            .unwrap_err();
        assert!(err.is_configuration_error());
        assert!(matches!(err, VerifyError::UnknownField { .. }));
    }

    #[test]
    fn runs_are_independent() {
        let verifier = Verifier::new(Config::<Tagged>::new().fail_fast(false));
        let first = verifier.verify().unwrap_err().to_string();
        let second = verifier.verify().unwrap_err().to_string();
        assert_eq!(first, second);
        assert!(!verifier.config().fail_fast);
    }
}
