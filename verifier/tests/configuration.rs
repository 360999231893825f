// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration errors, instance construction and field resolution.

use eqv_verifier::{
    Config, ConstructionStrategy, Example, FieldDescriptor, FieldKey, FieldValues, Invariant,
    TypeInfo, TypeKind, Verifiable, VerifyError, verify,
};
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

/// A handle with no example values of its own.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Handle(u64);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable)]
struct Session {
    #[verify(prefab)]
    handle: Handle,
    user: String,
}

#[test]
#[traced_test]
fn unresolvable_field_type() {
    let err = verify::<Session>().unwrap_err();
    assert!(err.is_configuration_error());
    let VerifyError::UnresolvableType { type_name, hint } = &err else {
        panic!("expected an unresolvable type, got {err}");
    };
    assert!(type_name.ends_with("Handle"));
    assert!(hint.contains("with_prefab_values"));
}

#[test]
fn prefab_values_resolve_the_field_type() {
    let report = Config::<Session>::new()
        .with_prefab_values(Handle(1), Handle(2))
        .verify()
        .unwrap();
    assert!(report.passed());
}

#[test]
fn equal_prefab_values_are_rejected() {
    let err = Config::<Session>::new()
        .with_prefab_values(Handle(7), Handle(7))
        .verify()
        .unwrap_err();
    assert!(matches!(err, VerifyError::InvalidConfiguration(_)));
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable, Example)]
struct Node {
    value: u8,
    next: Option<Box<Node>>,
}

#[test]
#[traced_test]
fn recursive_type_without_prefab() {
    let err = verify::<Node>().unwrap_err();
    assert!(err.is_configuration_error());
    let VerifyError::RecursiveType { path } = &err else {
        panic!("expected a recursive type, got {err}");
    };
    assert!(path.first().unwrap().ends_with("Node"));
    assert!(path.last().unwrap().ends_with("Node"));
}

#[test]
fn recursive_type_with_prefab() {
    let leaf = |value| Node { value, next: None };
    let report = Config::<Node>::new()
        .with_prefab_values(leaf(1), leaf(2))
        .verify()
        .unwrap();
    assert!(report.passed());
}

/// Offers neither a constructor nor direct field installation.
#[derive(Debug, PartialEq, Eq, Hash)]
struct Sealed {
    id: u32,
}

impl Verifiable for Sealed {
    fn type_info() -> TypeInfo {
        TypeInfo::new("Sealed", TypeKind::Final)
    }

    fn fields() -> Vec<FieldDescriptor<Self>> {
        vec![FieldDescriptor::new::<u32>(
            "Sealed",
            "id",
            |s: &Self| &s.id,
            |s: &mut Self| &mut s.id,
        )]
    }
}

#[test]
fn unconstructible_type() {
    let err = verify::<Sealed>().unwrap_err();
    assert!(err.is_configuration_error());
    let VerifyError::UnconstructibleType { attempts, .. } = &err else {
        panic!("expected an unconstructible type, got {err}");
    };
    assert_eq!(
        attempts,
        &vec![
            "constructor: not available".to_string(),
            "field_injection: not available".to_string(),
            "supplier: no manual instance supplier configured".to_string(),
        ]
    );
    assert!(err.to_string().contains("manual_instance_supplier"));
}

#[test]
fn manual_instance_supplier() {
    let report = Config::<Sealed>::new()
        .manual_instance_supplier(|values: &FieldValues| {
            let id = values
                .cloned(&FieldKey::new("Sealed", "id"))
                .map_err(|err| err.to_string())?;
            Ok(Sealed { id })
        })
        .verify()
        .unwrap();
    assert!(report.passed());
    assert_eq!(report.construction(), Some(ConstructionStrategy::Supplier));
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable)]
#[verify(try_constructor = "Reading::try_new")]
struct Reading {
    celsius: i32,
}

impl Reading {
    fn try_new(celsius: i32) -> Result<Reading, String> {
        if celsius < 10 {
            return Err(format!("{celsius} is below the sensor range"));
        }
        Ok(Reading { celsius })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable)]
#[verify(constructor = "Label::new")]
struct Label {
    text: String,
}

impl Label {
    fn new(text: String) -> Label {
        Label { text }
    }
}

#[test]
fn rejecting_constructor_falls_back_to_field_injection() {
    let report = verify::<Reading>().unwrap();
    assert!(report.passed());
    assert_eq!(report.construction(), Some(ConstructionStrategy::FieldInjection));
}

#[test]
fn working_constructor_is_preferred() {
    let report = verify::<Label>().unwrap();
    assert_eq!(report.construction(), Some(ConstructionStrategy::Constructor));
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable)]
struct Marker {
    tag: (),
    id: u32,
}

#[test]
fn single_valued_fields_are_skipped() {
    let report = verify::<Marker>().unwrap();
    assert!(report.passed());
    let skip = &report.skips()[0];
    assert_eq!(skip.invariant, Invariant::SignificantFields);
    assert_eq!(skip.field, Some(FieldKey::new("Marker", "tag")));
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable, Example)]
struct Entity {
    id: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable)]
struct Customer {
    #[verify(flatten)]
    entity: Entity,
    id: u32,
}

#[test]
fn shadowed_fields_are_kept_apart() {
    let report = verify::<Customer>().unwrap();
    assert!(report.passed());

    let err = Config::<Customer>::new()
        .ignored_fields(["Customer.id"])
        .verify()
        .unwrap_err();
    let report = err.report().unwrap();
    assert_eq!(
        report.first_violation().unwrap().field,
        Some(FieldKey::new("Customer", "id"))
    );

    let err = Config::<Customer>::new()
        .ignored_fields(["id"])
        .fail_fast(false)
        .verify()
        .unwrap_err();
    let fields: Vec<_> = err
        .report()
        .unwrap()
        .violations()
        .iter()
        .filter(|violation| violation.invariant == Invariant::SignificantFields)
        .filter_map(|violation| violation.field)
        .collect();
    assert_eq!(
        fields,
        vec![FieldKey::new("Entity", "id"), FieldKey::new("Customer", "id")]
    );
}

#[test]
fn unknown_fields_are_configuration_errors() {
    let err = Config::<Customer>::new()
        .ignored_fields(["Order.id"])
        .verify()
        .unwrap_err();
    assert!(err.is_configuration_error());
    let VerifyError::UnknownField { field, .. } = &err else {
        panic!("expected an unknown field, got {err}");
    };
    assert_eq!(field, "Order.id");
}
