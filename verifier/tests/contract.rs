// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Types with broken equality or hash logic.

use eqv_verifier::{
    AnyEq, ComparisonStrategy, Config, Example, FieldDescriptor, FieldKey, Invariant, Relation,
    StrategyScope, TypeInfo, TypeKind, Verifiable, VerifyError, ViolationKind, verify,
};
use pretty_assertions::assert_eq;
use std::any::Any;
use std::hash::{Hash, Hasher};
use tracing_test::traced_test;

fn first_violation<T: Verifiable>(config: Config<T>) -> eqv_verifier::Violation {
    let err = config.verify().unwrap_err();
    assert!(!err.is_configuration_error(), "{err}");
    err.report().unwrap().first_violation().unwrap().clone()
}

#[derive(Clone, Debug, Hash, Verifiable)]
struct Stubborn {
    id: u32,
}

impl PartialEq for Stubborn {
    fn eq(&self, _: &Self) -> bool {
        false
    }
}

#[test]
#[traced_test]
fn irreflexive_equality() {
    let violation = first_violation(Config::<Stubborn>::new());
    assert_eq!(violation.invariant, Invariant::Reflexivity);
    assert_eq!(violation.kind, ViolationKind::Contract);
    assert_eq!(violation.actual, Relation::Unequal);
    assert_eq!(violation.left, "Stubborn { id: 1 }");
}

#[derive(Clone, Debug, Hash, Verifiable)]
struct Lopsided {
    a: u32,
    b: u32,
}

impl PartialEq for Lopsided {
    fn eq(&self, other: &Self) -> bool {
        self.a == other.a && self.b <= other.b
    }
}

#[test]
fn asymmetric_equality() {
    let violation = first_violation(Config::<Lopsided>::new());
    assert_eq!(violation.invariant, Invariant::SignificantFields);
    assert_eq!(violation.field, Some(FieldKey::new("Lopsided", "b")));
    assert_eq!(violation.expected, Relation::Symmetric);
    assert_eq!(violation.actual, Relation::Asymmetric);
}

#[derive(Clone, Debug, Hash, Verifiable)]
struct Cached {
    id: u32,
    cache: u64,
}

impl PartialEq for Cached {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[test]
#[traced_test]
fn hash_over_a_field_equality_ignores() {
    let violation = first_violation(Config::<Cached>::new());
    assert_eq!(violation.invariant, Invariant::HashConsistency);
    assert_eq!(violation.field, Some(FieldKey::new("Cached", "cache")));
    assert_eq!(violation.field_type, Some("u64"));
    assert_eq!(violation.expected, Relation::SameHash);
    assert_eq!(violation.actual, Relation::DifferentHash);
    assert!(violation.message.contains("`Cached.cache`"));
    assert!(violation.message.contains("equality and hash disagree"));
}

#[test]
fn unused_field_is_reported_on_request() {
    let violation = first_violation(Config::<Cached>::new().require_all_fields_used());
    assert_eq!(violation.invariant, Invariant::SignificantFields);
    assert_eq!(violation.field, Some(FieldKey::new("Cached", "cache")));
    assert!(violation.remediation.unwrap().contains("ignored_fields"));
}

#[test]
fn suppressed_checks_do_not_run() {
    let report = Config::<Cached>::new()
        .suppress([Invariant::HashConsistency])
        .verify()
        .unwrap();
    assert!(report.passed());
    assert!(!report.checks_run().contains(&Invariant::HashConsistency));
    assert!(report.checks_run().contains(&Invariant::Transitivity));
}

#[derive(Clone, Debug, Verifiable)]
struct Either {
    a: u32,
    b: u32,
}

impl PartialEq for Either {
    fn eq(&self, other: &Self) -> bool {
        self.a == other.a || self.b == other.b
    }
}

impl Hash for Either {
    fn hash<H: Hasher>(&self, state: &mut H) {
        0_u8.hash(state);
    }
}

#[test]
#[traced_test]
fn or_combined_equality_is_intransitive() {
    let violation = first_violation(Config::<Either>::new());
    assert_eq!(violation.invariant, Invariant::Transitivity);
    assert_eq!(violation.expected, Relation::Transitive);
    assert_eq!(violation.actual, Relation::Intransitive);
    assert_eq!(violation.left, "Either { a: 1, b: 1 }");
    assert_eq!(violation.right, "Either { a: 2, b: 2 }");
}

#[derive(Clone, Debug, Hash, Verifiable)]
struct Leaky {
    a: u32,
    b: u32,
}

impl PartialEq for Leaky {
    fn eq(&self, other: &Self) -> bool {
        self.a == other.a || self.b == other.b
    }
}

#[test]
fn fail_fast_can_be_disabled() {
    let err = Config::<Leaky>::new().verify().unwrap_err();
    let report = err.report().unwrap();
    assert_eq!(report.violations().len(), 1);
    assert_eq!(
        report.checks_run().last(),
        Some(&Invariant::HashConsistency)
    );

    let err = Config::<Leaky>::new().fail_fast(false).verify().unwrap_err();
    let report = err.report().unwrap();
    let found: Vec<_> = report
        .violations()
        .iter()
        .map(|violation| violation.invariant)
        .collect();
    assert_eq!(
        found,
        vec![
            Invariant::HashConsistency,
            Invariant::HashConsistency,
            Invariant::Transitivity
        ]
    );
    assert!(err.to_string().ends_with("(+2 more violation(s))"));
}

#[derive(Clone, Debug, Hash, Verifiable)]
struct Nickname {
    name: Option<String>,
}

impl PartialEq for Nickname {
    fn eq(&self, other: &Self) -> bool {
        self.name.as_ref().unwrap() == other.name.as_ref().unwrap()
    }
}

#[test]
#[traced_test]
fn equality_panicking_on_none() {
    let violation = first_violation(Config::<Nickname>::new());
    assert_eq!(violation.invariant, Invariant::NullSafety);
    assert_eq!(violation.field, Some(FieldKey::new("Nickname", "name")));
    assert_eq!(violation.expected, Relation::NoPanic);
    assert!(matches!(violation.actual, Relation::Panicked(_)));
    assert!(violation.remediation.unwrap().contains("None"));
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable)]
struct Careful {
    name: Option<String>,
    id: u32,
}

#[test]
fn none_fields_are_handled_by_derived_equality() {
    assert!(verify::<Careful>().unwrap().passed());
}

/// Accepts anything but its own type's absence.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Promiscuous {
    id: u32,
}

impl Verifiable for Promiscuous {
    fn type_info() -> TypeInfo {
        TypeInfo::new("Promiscuous", TypeKind::Final)
    }

    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![FieldDescriptor::new::<u32>(
            "Promiscuous",
            "id",
            |s: &Self| &s.id,
            |s: &mut Self| &mut s.id,
        )]
    }

    fn blank() -> Option<Self> {
        Some(Promiscuous { id: 0 })
    }

    fn eq_any(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<Self>()
            .is_none_or(|other| self == other)
    }
}

#[test]
fn equality_with_none_is_reported_first() {
    let violation = first_violation(Config::<Promiscuous>::new());
    assert_eq!(violation.invariant, Invariant::NullSafety);
    assert_eq!(violation.right, "None");
}

#[test]
fn equality_with_unrelated_types() {
    let violation =
        first_violation(Config::<Promiscuous>::new().suppress([Invariant::NullSafety]));
    assert_eq!(violation.invariant, Invariant::TypeSafety);
    assert_eq!(violation.expected, Relation::Unequal);
    assert_eq!(violation.actual, Relation::Equal);
    assert!(violation.remediation.unwrap().contains("eq_any"));
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable, Example)]
struct Point {
    x: i32,
    y: i32,
}

#[test]
fn ignored_field_used_by_equality() {
    let violation = first_violation(Config::<Point>::new().ignored_fields(["y"]));
    assert_eq!(violation.invariant, Invariant::SignificantFields);
    assert_eq!(violation.kind, ViolationKind::Contract);
    assert_eq!(violation.field, Some(FieldKey::new("Point", "y")));
    assert_eq!(violation.expected, Relation::Equal);
}

#[test]
fn ignored_strategy_used_by_equality() {
    let err = Config::<Point>::new()
        .strategy_override(StrategyScope::field("Point.x"), ComparisonStrategy::Ignored)
        .verify()
        .unwrap_err();
    let VerifyError::StrategyMismatch(report) = &err else {
        panic!("expected a strategy mismatch, got {err}");
    };
    assert_eq!(
        report.first_violation().unwrap().field,
        Some(FieldKey::new("Point", "x"))
    );
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable)]
#[verify(extensible)]
struct Shape {
    sides: u32,
}

/// Accepts shapes with the same number of sides, which shapes do not reciprocate.
#[derive(Debug)]
struct Colored {
    sides: u32,
}

impl AnyEq for Colored {
    fn eq_any(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<Shape>()
            .is_some_and(|shape| shape.sides == self.sides)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Rejects every shape.
#[derive(Debug)]
struct Aloof;

impl AnyEq for Aloof {
    fn eq_any(&self, _: &dyn Any) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn extensible_type_without_subtypes_is_skipped() {
    let report = verify::<Shape>().unwrap();
    assert_eq!(report.checks_run().last(), Some(&Invariant::Subclass));
    let skip = report.skips().last().unwrap();
    assert_eq!(skip.invariant, Invariant::Subclass);
    assert!(skip.reason.contains("with_subtype"));
}

#[test]
#[traced_test]
fn subtype_equality_is_asymmetric() {
    let violation = first_violation(Config::<Shape>::new().with_subtype(
        |shape: &Shape| -> Box<dyn AnyEq> {
            Box::new(Colored {
                sides: shape.sides,
            })
        },
    ));
    assert_eq!(violation.invariant, Invariant::Subclass);
    assert_eq!(violation.actual, Relation::Asymmetric);
    assert_eq!(violation.right, "Colored { sides: 1 }");
}

#[test]
fn unequal_subtypes_need_strict_policy() {
    let aloof = |_: &Shape| -> Box<dyn AnyEq> { Box::new(Aloof) };
    let violation = first_violation(Config::<Shape>::new().with_subtype(aloof));
    assert_eq!(violation.invariant, Invariant::Subclass);
    assert_eq!(violation.actual, Relation::Unequal);
    assert!(violation.remediation.unwrap().contains("strict_subtypes"));

    let report = Config::<Shape>::new()
        .with_subtype(aloof)
        .strict_subtypes()
        .verify()
        .unwrap();
    assert!(report.passed());
}
