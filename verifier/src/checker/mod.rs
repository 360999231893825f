// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The battery of equality contract checks.
//!
//! Every check builds its own instances from field values; instances never outlive a check.
//! What later checks need from earlier ones (which fields equality depends on, which equivalent
//! representations compare equal) is kept in [`Relations`] as plain observations.

mod checks;
mod relations;

use crate::builder::InstanceBuilder;
use crate::config::Config;
use crate::error::VerifyError;
use crate::example::ExampleValues;
use crate::field::{FieldAccessor, FieldKey};
use crate::probe::guarded;
use crate::report::{Invariant, Relation, Reporter, Violation, ViolationKind};
use crate::strategy::ComparisonStrategy;
use crate::target::{TypeKind, Verifiable};
use crate::value::{FieldValues, Value};
use relations::{Outcome, Relations, Significance};
use std::fmt::Debug;
use strum::IntoEnumIterator;
use tracing::{debug, trace};

/// How one field takes part in the run.
#[derive(Debug)]
pub(crate) struct FieldPlan {
    pub(crate) strategy: ComparisonStrategy,
    pub(crate) ignored: bool,
    pub(crate) examples: ExampleValues<Value>,
}

impl FieldPlan {
    /// True if equality is expected not to depend on the field.
    fn expects_ignored(&self) -> bool {
        self.ignored || self.strategy == ComparisonStrategy::Ignored
    }
}

/// Two freshly built instances and how they compared.
struct Probe<T> {
    left: T,
    right: T,
    outcome: Outcome,
}

fn equals<T: PartialEq>(left: &T, right: &T) -> Result<bool, String> {
    guarded(|| left == right)
}

pub(crate) struct Checker<'a, T> {
    accessor: &'a FieldAccessor<T>,
    builder: &'a InstanceBuilder<'a, T>,
    plan: &'a [FieldPlan],
    config: &'a Config<T>,
    base: FieldValues,
    relations: Relations,
    reporter: Reporter,
}

impl<'a, T: Verifiable> Checker<'a, T> {
    pub(crate) fn new(
        accessor: &'a FieldAccessor<T>,
        builder: &'a InstanceBuilder<'a, T>,
        plan: &'a [FieldPlan],
        config: &'a Config<T>,
        reporter: Reporter,
    ) -> Checker<'a, T> {
        let mut base = FieldValues::new();
        for (field, entry) in accessor.fields().iter().zip(plan) {
            base.insert(field.key(), entry.examples.red.clone());
        }
        Checker {
            accessor,
            builder,
            plan,
            config,
            base,
            relations: Relations::new(plan.len()),
            reporter,
        }
    }

    /// Run every enabled check in battery order.
    ///
    /// # Errors
    ///
    /// Fails before any check runs if the base instance cannot be built, and later only for
    /// errors which make further checking meaningless.
    pub(crate) fn run(mut self) -> Result<Reporter, VerifyError> {
        let base = self.build(&self.base)?;
        debug!("base instance: {base:?}");
        for invariant in Invariant::iter() {
            if self.reporter.should_stop() {
                debug!("stopping after the first violation");
                break;
            }
            if !self.config.is_enabled(invariant) {
                debug!("{invariant} suppressed");
                continue;
            }
            if invariant == Invariant::Subclass
                && self.accessor.type_info().kind() == TypeKind::Final
            {
                continue;
            }
            debug!("checking {invariant}");
            self.reporter.start(invariant);
            match invariant {
                Invariant::Reflexivity => self.reflexivity()?,
                Invariant::NullSafety => self.null_safety()?,
                Invariant::TypeSafety => self.type_safety()?,
                Invariant::SignificantFields => self.significant_fields()?,
                Invariant::StrategyEquivalence => self.strategy_equivalence()?,
                Invariant::InsignificantFields => self.insignificant_fields()?,
                Invariant::HashConsistency => self.hash_consistency()?,
                Invariant::Transitivity => self.transitivity()?,
                Invariant::Subclass => self.subclass()?,
            }
        }
        Ok(self.reporter)
    }

    fn build(&self, values: &FieldValues) -> Result<T, VerifyError> {
        self.builder.build(values)
    }

    fn key(&self, field: usize) -> FieldKey {
        self.accessor.fields()[field].key()
    }

    /// Build both sides fresh and compare them in both directions.
    fn probe(&self, left: &FieldValues, right: &FieldValues) -> Result<Probe<T>, VerifyError> {
        let left = self.build(left)?;
        let right = self.build(right)?;
        let outcome = Outcome::of(equals(&left, &right), equals(&right, &left));
        trace!("{left:?} vs {right:?}: {outcome:?}");
        Ok(Probe {
            left,
            right,
            outcome,
        })
    }

    /// Whether equality depends on `field`, probed with its blue value.
    fn significance(&mut self, field: usize) -> Result<Significance, VerifyError> {
        if let Some(significance) = self.relations.significance(field) {
            return Ok(significance.clone());
        }
        let significance = match &self.plan[field].examples.blue {
            None => Significance::Untestable,
            Some(blue) => {
                let variant = self.base.with(self.key(field), blue.clone());
                Significance::from(&self.probe(&self.base, &variant)?.outcome)
            }
        };
        self.relations.set_significance(field, significance.clone());
        Ok(significance)
    }

    /// How the base instance compares with its variant holding the equivalent representation of
    /// `field`; `None` if the field has none.
    fn equivalence(&mut self, field: usize) -> Result<Option<Outcome>, VerifyError> {
        if let Some(outcome) = self.relations.equivalence(field) {
            return Ok(outcome.clone());
        }
        let outcome = match &self.plan[field].examples.red_equivalent {
            None => None,
            Some(equivalent) => {
                let variant = self.base.with(self.key(field), equivalent.clone());
                Some(self.probe(&self.base, &variant)?.outcome)
            }
        };
        self.relations.set_equivalence(field, outcome.clone());
        Ok(outcome)
    }

    /// A contract violation without remediation; callers adjust it with struct update syntax.
    fn violation(
        &self,
        invariant: Invariant,
        field: Option<usize>,
        (expected, actual): (Relation, Relation),
        left: &dyn Debug,
        right: &dyn Debug,
        message: impl Into<String>,
    ) -> Violation {
        Violation {
            invariant,
            kind: ViolationKind::Contract,
            field: field.map(|field| self.key(field)),
            field_type: field.map(|field| self.accessor.fields()[field].type_name()),
            expected,
            actual,
            left: format!("{left:?}"),
            right: format!("{right:?}"),
            message: message.into(),
            remediation: None,
        }
    }

    fn record(&mut self, violation: Violation) {
        self.reporter.violation(violation);
    }
}
