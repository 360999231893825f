// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The nine checks, in battery order.

use super::{Checker, Outcome, Significance, equals};
use crate::config::SubclassPolicy;
use crate::error::VerifyError;
use crate::probe::{guarded, hash_of};
use crate::report::{Invariant, Relation, Violation, ViolationKind};
use crate::target::{AnyEq, Verifiable};
use crate::value::FieldValues;
use tracing::{debug, trace};

/// A value no verified type can be equal to.
#[derive(Debug)]
struct Unrelated;

/// `Some(actual)` unless `left` and `right` hash alike.
fn hash_disagreement<T: std::hash::Hash>(left: &T, right: &T) -> Option<Relation> {
    match (hash_of(left), hash_of(right)) {
        (Ok(left), Ok(right)) if left == right => None,
        (Ok(_), Ok(_)) => Some(Relation::DifferentHash),
        (Err(panic), _) | (_, Err(panic)) => Some(Relation::Panicked(panic)),
    }
}

fn hash_expectation(actual: &Relation) -> Relation {
    match actual {
        Relation::Panicked(_) => Relation::NoPanic,
        _ => Relation::SameHash,
    }
}

fn outcome_expectation(outcome: &Outcome, expected: Relation) -> Relation {
    match outcome {
        Outcome::Panicked(_) => Relation::NoPanic,
        Outcome::Asymmetric => Relation::Symmetric,
        _ => expected,
    }
}

impl<T: Verifiable> Checker<'_, T> {
    pub(super) fn reflexivity(&mut self) -> Result<(), VerifyError> {
        let x = self.build(&self.base)?;
        match equals(&x, &x) {
            Err(panic) => {
                let violation = self.violation(
                    Invariant::Reflexivity,
                    None,
                    (Relation::NoPanic, Relation::Panicked(panic)),
                    &x,
                    &x,
                    "comparing an instance with itself panicked",
                );
                self.record(violation);
                return Ok(());
            }
            Ok(false) => {
                let violation = Violation {
                    remediation: Some(
                        "`eq` must return true when both arguments are the same instance"
                            .to_string(),
                    ),
                    ..self.violation(
                        Invariant::Reflexivity,
                        None,
                        (Relation::Equal, Relation::Unequal),
                        &x,
                        &x,
                        "an instance is not equal to itself",
                    )
                };
                self.record(violation);
                return Ok(());
            }
            Ok(true) => {}
        }
        let probe = self.probe(&self.base, &self.base)?;
        if probe.outcome != Outcome::Equal {
            let violation = Violation {
                remediation: Some(
                    "equality must depend only on state, not on identity or on when an instance was built"
                        .to_string(),
                ),
                ..self.violation(
                    Invariant::Reflexivity,
                    None,
                    (
                        outcome_expectation(&probe.outcome, Relation::Equal),
                        probe.outcome.relation(),
                    ),
                    &probe.left,
                    &probe.right,
                    "two instances built from identical field values are not equal",
                )
            };
            self.record(violation);
        }
        Ok(())
    }

    pub(super) fn null_safety(&mut self) -> Result<(), VerifyError> {
        let x = self.build(&self.base)?;
        let none = Option::<T>::None;
        match guarded(|| Verifiable::eq_any(&x, &none)) {
            Ok(false) => {}
            Ok(true) => {
                let violation = self.violation(
                    Invariant::NullSafety,
                    None,
                    (Relation::Unequal, Relation::Equal),
                    &x,
                    &none,
                    "an instance is equal to `None`",
                );
                self.record(violation);
                return Ok(());
            }
            Err(panic) => {
                let violation = self.violation(
                    Invariant::NullSafety,
                    None,
                    (Relation::NoPanic, Relation::Panicked(panic)),
                    &x,
                    &none,
                    "comparing an instance with `None` panicked",
                );
                self.record(violation);
                return Ok(());
            }
        }

        let accessor = self.accessor;
        for (field, descriptor) in accessor.fields().iter().enumerate() {
            let Some(null) = descriptor.null_value() else {
                continue;
            };
            let key = descriptor.key();
            trace!("probing `{key}` with None");
            let nulled = self.build(&self.base.with(key, null.clone()))?;
            let remediation = format!("handle `{key}` being `None` in `eq` and `hash`");
            let found = match equals(&nulled, &nulled) {
                Err(panic) => Some(self.violation(
                    Invariant::NullSafety,
                    Some(field),
                    (Relation::NoPanic, Relation::Panicked(panic)),
                    &nulled,
                    &nulled,
                    format!("comparing an instance whose `{key}` is None panicked"),
                )),
                Ok(false) => Some(self.violation(
                    Invariant::NullSafety,
                    Some(field),
                    (Relation::Equal, Relation::Unequal),
                    &nulled,
                    &nulled,
                    format!("an instance whose `{key}` is None is not equal to itself"),
                )),
                Ok(true) => match hash_of(&nulled) {
                    Err(panic) => Some(self.violation(
                        Invariant::NullSafety,
                        Some(field),
                        (Relation::NoPanic, Relation::Panicked(panic)),
                        &nulled,
                        &nulled,
                        format!("hashing an instance whose `{key}` is None panicked"),
                    )),
                    Ok(_) => self.against_base(field, &nulled)?,
                },
            };
            if let Some(violation) = found {
                self.record(Violation {
                    remediation: Some(remediation),
                    ..violation
                });
                if self.reporter.should_stop() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Compare an instance whose `field` is `None` with the base instance.
    fn against_base(&self, field: usize, nulled: &T) -> Result<Option<Violation>, VerifyError> {
        let key = self.key(field);
        let base = self.build(&self.base)?;
        let outcome = Outcome::of(equals(&base, nulled), equals(nulled, &base));
        let found = match &outcome {
            Outcome::Unequal => None,
            Outcome::Equal => hash_disagreement(&base, nulled).map(|actual| {
                self.violation(
                    Invariant::NullSafety,
                    Some(field),
                    (hash_expectation(&actual), actual),
                    &base,
                    nulled,
                    format!("instances equal despite `{key}` being None hash differently"),
                )
            }),
            Outcome::Asymmetric | Outcome::Panicked(_) => Some(self.violation(
                Invariant::NullSafety,
                Some(field),
                (
                    outcome_expectation(&outcome, Relation::Symmetric),
                    outcome.relation(),
                ),
                &base,
                nulled,
                format!("comparing with an instance whose `{key}` is None is not symmetric"),
            )),
        };
        Ok(found)
    }

    pub(super) fn type_safety(&mut self) -> Result<(), VerifyError> {
        let x = self.build(&self.base)?;
        let remediation =
            "`eq_any` must downcast the other value and return false for any other type";
        match guarded(|| Verifiable::eq_any(&x, &Unrelated)) {
            Ok(false) => {}
            Ok(true) => {
                let violation = Violation {
                    remediation: Some(remediation.to_string()),
                    ..self.violation(
                        Invariant::TypeSafety,
                        None,
                        (Relation::Unequal, Relation::Equal),
                        &x,
                        &Unrelated,
                        "an instance is equal to a value of an unrelated type",
                    )
                };
                self.record(violation);
                return Ok(());
            }
            Err(panic) => {
                let violation = Violation {
                    remediation: Some(remediation.to_string()),
                    ..self.violation(
                        Invariant::TypeSafety,
                        None,
                        (Relation::NoPanic, Relation::Panicked(panic)),
                        &x,
                        &Unrelated,
                        "comparing with a value of an unrelated type panicked",
                    )
                };
                self.record(violation);
                return Ok(());
            }
        }
        let y = self.build(&self.base)?;
        let outcome = Outcome::of(
            guarded(|| Verifiable::eq_any(&x, &y)),
            equals(&x, &y),
        );
        if outcome != Outcome::Equal {
            let violation = Violation {
                remediation: Some("`eq_any` should downcast and delegate to `eq`".to_string()),
                ..self.violation(
                    Invariant::TypeSafety,
                    None,
                    (Relation::Equal, outcome.relation()),
                    &x,
                    &y,
                    "`eq_any` disagrees with `eq` for two equal instances",
                )
            };
            self.record(violation);
        }
        Ok(())
    }

    pub(super) fn significant_fields(&mut self) -> Result<(), VerifyError> {
        let plan = self.plan;
        for (field, entry) in plan.iter().enumerate() {
            let key = self.key(field);
            let Some(blue) = &entry.examples.blue else {
                self.relations
                    .set_significance(field, Significance::Untestable);
                let type_name = entry.examples.red.type_name();
                let reason = match entry.strategy.ordering_fn() {
                    Some(ordering) => format!(
                        "no second value of {type_name} that {} tells apart from {:?}",
                        ordering.label(),
                        entry.examples.red
                    ),
                    None => format!("no second value of {type_name} that equality could tell apart"),
                };
                self.reporter
                    .skip(Invariant::SignificantFields, Some(key), reason);
                continue;
            };
            let variant = self.base.with(key, blue.clone());
            let probe = self.probe(&self.base, &variant)?;
            self.relations
                .set_significance(field, Significance::from(&probe.outcome));
            let found = match &probe.outcome {
                Outcome::Panicked(_) | Outcome::Asymmetric => Some(Violation {
                    remediation: Some(format!("compare `{key}` the same way on both sides")),
                    ..self.violation(
                        Invariant::SignificantFields,
                        Some(field),
                        (
                            outcome_expectation(&probe.outcome, Relation::Symmetric),
                            probe.outcome.relation(),
                        ),
                        &probe.left,
                        &probe.right,
                        format!("comparing instances which differ only in `{key}` is not symmetric"),
                    )
                }),
                Outcome::Unequal if entry.expects_ignored() => {
                    let kind = if entry.ignored {
                        ViolationKind::Contract
                    } else {
                        ViolationKind::StrategyMismatch
                    };
                    Some(Violation {
                        kind,
                        remediation: Some(format!(
                            "leave `{key}` out of `eq`, or stop ignoring it"
                        )),
                        ..self.violation(
                            Invariant::SignificantFields,
                            Some(field),
                            (Relation::Equal, Relation::Unequal),
                            &probe.left,
                            &probe.right,
                            format!("`{key}` is expected to be ignored, but equality depends on it"),
                        )
                    })
                }
                Outcome::Equal
                    if self.config.require_all_fields_used && !entry.expects_ignored() =>
                {
                    Some(Violation {
                        remediation: Some(format!(
                            "compare `{key}` in `eq`, or list it in `ignored_fields`"
                        )),
                        ..self.violation(
                            Invariant::SignificantFields,
                            Some(field),
                            (Relation::Unequal, Relation::Equal),
                            &probe.left,
                            &probe.right,
                            format!("equality does not use `{key}`"),
                        )
                    })
                }
                outcome => {
                    trace!("`{key}`: {outcome:?}");
                    None
                }
            };
            if let Some(violation) = found {
                self.record(violation);
                if self.reporter.should_stop() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    pub(super) fn strategy_equivalence(&mut self) -> Result<(), VerifyError> {
        let plan = self.plan;
        for (field, entry) in plan.iter().enumerate() {
            let key = self.key(field);
            let Some(equivalent) = &entry.examples.red_equivalent else {
                self.relations.set_equivalence(field, None);
                if let Some(ordering) = entry.strategy.ordering_fn() {
                    self.reporter.skip(
                        Invariant::StrategyEquivalence,
                        Some(key),
                        format!(
                            "no structurally distinct representation of {:?} that {} deems equivalent",
                            entry.examples.red,
                            ordering.label()
                        ),
                    );
                }
                continue;
            };
            let variant = self.base.with(key, equivalent.clone());
            let probe = self.probe(&self.base, &variant)?;
            self.relations
                .set_equivalence(field, Some(probe.outcome.clone()));
            let found = match (&probe.outcome, entry.strategy.ordering_fn()) {
                (Outcome::Panicked(_) | Outcome::Asymmetric, _) => Some(self.violation(
                    Invariant::StrategyEquivalence,
                    Some(field),
                    (
                        outcome_expectation(&probe.outcome, Relation::Symmetric),
                        probe.outcome.relation(),
                    ),
                    &probe.left,
                    &probe.right,
                    format!(
                        "comparing equivalent representations {:?} and {equivalent:?} of `{key}` is not symmetric",
                        entry.examples.red
                    ),
                )),
                (Outcome::Unequal, Some(ordering)) => Some(Violation {
                    kind: ViolationKind::StrategyMismatch,
                    remediation: Some(format!(
                        "`eq` compares `{key}` structurally; compare it with {label} and hash a normalized form, \
                         or drop the ordering override (`using_ordering_for` or `using_decimal_cmp`)",
                        label = ordering.label()
                    )),
                    ..self.violation(
                        Invariant::StrategyEquivalence,
                        Some(field),
                        (Relation::Equal, Relation::Unequal),
                        &probe.left,
                        &probe.right,
                        format!(
                            "{:?} and {equivalent:?} are equivalent under {}, but equality tells them apart",
                            entry.examples.red,
                            ordering.label()
                        ),
                    )
                }),
                (outcome, _) => {
                    trace!("`{key}` equivalent: {outcome:?}");
                    None
                }
            };
            if let Some(violation) = found {
                self.record(violation);
                if self.reporter.should_stop() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    pub(super) fn insignificant_fields(&mut self) -> Result<(), VerifyError> {
        let plan = self.plan;
        let mut all_blue = self.base.clone();
        for (field, entry) in plan.iter().enumerate() {
            if let Some(blue) = &entry.examples.blue {
                all_blue.insert(self.key(field), blue.clone());
            }
        }
        for (field, entry) in plan.iter().enumerate() {
            if self.significance(field)? != Significance::Insignificant {
                continue;
            }
            let key = self.key(field);
            let red_variant = all_blue.with(key, entry.examples.red.clone());
            let probe = self.probe(&red_variant, &all_blue)?;
            if probe.outcome == Outcome::Equal {
                continue;
            }
            let violation = Violation {
                remediation: Some(format!(
                    "equality must not depend on `{key}` in one state and ignore it in another"
                )),
                ..self.violation(
                    Invariant::InsignificantFields,
                    Some(field),
                    (
                        outcome_expectation(&probe.outcome, Relation::Equal),
                        probe.outcome.relation(),
                    ),
                    &probe.left,
                    &probe.right,
                    format!("`{key}` does not affect equality of the base instance, but does once other fields change"),
                )
            };
            self.record(violation);
            if self.reporter.should_stop() {
                return Ok(());
            }
        }
        Ok(())
    }

    pub(super) fn hash_consistency(&mut self) -> Result<(), VerifyError> {
        let probe = self.probe(&self.base, &self.base)?;
        if probe.outcome == Outcome::Equal {
            if let Some(actual) = hash_disagreement(&probe.left, &probe.right) {
                let violation = Violation {
                    remediation: Some(
                        "`hash` must depend only on state which `eq` compares".to_string(),
                    ),
                    ..self.violation(
                        Invariant::HashConsistency,
                        None,
                        (hash_expectation(&actual), actual),
                        &probe.left,
                        &probe.right,
                        "equal instances built from identical field values hash differently",
                    )
                };
                self.record(violation);
                return Ok(());
            }
        }

        let plan = self.plan;
        for (field, entry) in plan.iter().enumerate() {
            let key = self.key(field);
            if self.equivalence(field)? == Some(Outcome::Equal) {
                if let Some(equivalent) = &entry.examples.red_equivalent {
                    let variant = self.base.with(key, equivalent.clone());
                    let probe = self.probe(&self.base, &variant)?;
                    if let Some(actual) = hash_disagreement(&probe.left, &probe.right) {
                        let normalize = format!(
                            "hash a normalized form of `{key}` (e.g. `Decimal::normalized`), matching how `eq` compares it"
                        );
                        let (kind, message, remediation) = match entry.strategy.ordering_fn() {
                            Some(ordering) => (
                                ViolationKind::StrategyMismatch,
                                format!(
                                    "equality compares `{key}` with {}, but hash uses its exact representation; \
                                     equality and hash disagree",
                                    ordering.label()
                                ),
                                format!(
                                    "{normalize}, or drop the ordering override (`using_ordering_for` or `using_decimal_cmp`)"
                                ),
                            ),
                            None => (
                                ViolationKind::Contract,
                                format!(
                                    "equality treats {:?} and {equivalent:?} in `{key}` as equal, but hash does not; \
                                     equality and hash disagree",
                                    entry.examples.red
                                ),
                                normalize,
                            ),
                        };
                        let violation = Violation {
                            kind,
                            remediation: Some(remediation),
                            ..self.violation(
                                Invariant::HashConsistency,
                                Some(field),
                                (hash_expectation(&actual), actual),
                                &probe.left,
                                &probe.right,
                                message,
                            )
                        };
                        self.record(violation);
                        if self.reporter.should_stop() {
                            return Ok(());
                        }
                    }
                }
            }

            if self.significance(field)? == Significance::Insignificant {
                if let Some(blue) = &entry.examples.blue {
                    let variant = self.base.with(key, blue.clone());
                    let probe = self.probe(&self.base, &variant)?;
                    if let Some(actual) = hash_disagreement(&probe.left, &probe.right) {
                        let violation = Violation {
                            remediation: Some(format!(
                                "leave `{key}` out of `hash`, or compare it in `eq`"
                            )),
                            ..self.violation(
                                Invariant::HashConsistency,
                                Some(field),
                                (hash_expectation(&actual), actual),
                                &probe.left,
                                &probe.right,
                                format!("hash uses `{key}`, which equality ignores; equality and hash disagree"),
                            )
                        };
                        self.record(violation);
                        if self.reporter.should_stop() {
                            return Ok(());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub(super) fn transitivity(&mut self) -> Result<(), VerifyError> {
        let plan = self.plan;

        let mut insignificant = self.base.clone();
        for (field, entry) in plan.iter().enumerate() {
            if self.significance(field)? == Significance::Insignificant {
                if let Some(blue) = &entry.examples.blue {
                    insignificant.insert(self.key(field), blue.clone());
                }
            }
        }
        let mut equivalent = insignificant.clone();
        for (field, entry) in plan.iter().enumerate() {
            if self.equivalence(field)? == Some(Outcome::Equal) {
                if let Some(value) = &entry.examples.red_equivalent {
                    equivalent.insert(self.key(field), value.clone());
                }
            }
        }
        if let Some(violation) = self.triple(None, &insignificant, &equivalent)? {
            self.record(violation);
            return Ok(());
        }

        let testable: Vec<usize> = (0..plan.len())
            .filter(|field| plan[*field].examples.blue.is_some())
            .collect();
        for pair in testable.windows(2) {
            let &[first, second] = pair else {
                continue;
            };
            let (Some(first_blue), Some(second_blue)) =
                (&plan[first].examples.blue, &plan[second].examples.blue)
            else {
                continue;
            };
            let y = self.base.with(self.key(first), first_blue.clone());
            let z = y.with(self.key(second), second_blue.clone());
            if let Some(violation) = self.triple(Some((first, second)), &y, &z)? {
                self.record(violation);
                if self.reporter.should_stop() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Build `x` (the base), `y` and `z`; `Some` if `x == y`, `y == z` but `x != z`.
    fn triple(
        &self,
        fields: Option<(usize, usize)>,
        y: &FieldValues,
        z: &FieldValues,
    ) -> Result<Option<Violation>, VerifyError> {
        if *y == self.base && *z == self.base {
            return Ok(None);
        }
        let x = self.build(&self.base)?;
        let y = self.build(y)?;
        let z = self.build(z)?;
        let related = |left: &T, right: &T| equals(left, right).unwrap_or(false);
        if !(related(&x, &y) && related(&y, &z)) || related(&x, &z) {
            return Ok(None);
        }
        let violation = match fields {
            Some((first, second)) => {
                let (first_key, second_key) = (self.key(first), self.key(second));
                Violation {
                    remediation: Some(
                        "every significant field must match; do not combine field comparisons with `||`"
                            .to_string(),
                    ),
                    ..self.violation(
                        Invariant::Transitivity,
                        Some(first),
                        (Relation::Transitive, Relation::Intransitive),
                        &x,
                        &z,
                        format!(
                            "x == y and y == z but x != z, where y changes `{first_key}` and z also changes `{second_key}`"
                        ),
                    )
                }
            }
            None => self.violation(
                Invariant::Transitivity,
                None,
                (Relation::Transitive, Relation::Intransitive),
                &x,
                &z,
                "x == y and y == z but x != z, where y changes insignificant fields and z also uses equivalent representations",
            ),
        };
        Ok(Some(violation))
    }

    pub(super) fn subclass(&mut self) -> Result<(), VerifyError> {
        let Some(subtype) = self.config.subtype.clone() else {
            self.reporter.skip(
                Invariant::Subclass,
                None,
                "extensible type without a subtype factory; configure one with `with_subtype`",
            );
            return Ok(());
        };
        let x = self.build(&self.base)?;
        let sub = match guarded(|| subtype(&x)) {
            Ok(sub) => sub,
            Err(panic) => {
                let violation = self.violation(
                    Invariant::Subclass,
                    None,
                    (Relation::NoPanic, Relation::Panicked(panic)),
                    &x,
                    &x,
                    "the subtype factory panicked",
                );
                self.record(violation);
                return Ok(());
            }
        };
        let forward = guarded(|| Verifiable::eq_any(&x, AnyEq::as_any(&*sub)));
        let backward = guarded(|| AnyEq::eq_any(&*sub, &x));
        let outcome = Outcome::of(forward, backward);
        let policy = self.config.subclass_policy;
        debug!("subtype comparison under {policy} policy: {outcome:?}");
        let found = match (&outcome, policy) {
            (Outcome::Panicked(_) | Outcome::Asymmetric, _) => Some(Violation {
                remediation: Some(match policy {
                    SubclassPolicy::Equal => {
                        "both sides must accept instances with the same state; compare by the base type's fields".to_string()
                    }
                    SubclassPolicy::Strict => {
                        "a strict type must reject subtype instances on both sides".to_string()
                    }
                }),
                ..self.violation(
                    Invariant::Subclass,
                    None,
                    (
                        outcome_expectation(&outcome, Relation::Symmetric),
                        outcome.relation(),
                    ),
                    &x,
                    &sub,
                    "base and subtype instances with the same state disagree about equality",
                )
            }),
            (Outcome::Unequal, SubclassPolicy::Equal) => Some(Violation {
                remediation: Some(
                    "`eq_any` compares exact types; use `strict_subtypes()` if subtypes are meant to be unequal"
                        .to_string(),
                ),
                ..self.violation(
                    Invariant::Subclass,
                    None,
                    (Relation::Equal, Relation::Unequal),
                    &x,
                    &sub,
                    "a subtype instance with the same state is not equal to the base instance",
                )
            }),
            _ => None,
        };
        if let Some(violation) = found {
            self.record(violation);
        }
        Ok(())
    }
}
