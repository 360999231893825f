// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Run-level properties: arbitrary example values, independence of runs, serialized reports.

use eqv_verifier::{Config, Decimal, Example, Verifiable, VerifyError, verify};
use pretty_assertions::assert_eq;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable, Example)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Clone, Debug, Verifiable)]
struct Price {
    amount: Decimal,
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.amount.cmp_value(&other.amount) == Ordering::Equal
    }
}

impl Hash for Price {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.amount.normalized().hash(state);
    }
}

#[derive(Clone, Debug, Verifiable)]
struct Quote {
    amount: Decimal,
}

impl PartialEq for Quote {
    fn eq(&self, other: &Self) -> bool {
        self.amount.cmp_value(&other.amount) == Ordering::Equal
    }
}

impl Hash for Quote {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.amount.hash(state);
    }
}

/// Red, blue and a rescaled representation of red.
fn decimals(unscaled: i32, shift: u8) -> (Decimal, Decimal, Decimal) {
    let unscaled = i128::from(unscaled);
    let scale = u32::from(shift % 6);
    (
        Decimal::new(unscaled, 0),
        Decimal::new(unscaled + 1, 0),
        Decimal::new(unscaled * 10_i128.pow(scale), scale),
    )
}

#[test]
fn correct_type_passes_for_any_distinct_values() {
    bolero::check!()
        .with_type::<(i32, i32)>()
        .cloned()
        .for_each(|(red, blue)| {
            let result = Config::<Point>::new().with_prefab_values(red, blue).verify();
            if red == blue {
                assert!(matches!(result, Err(VerifyError::InvalidConfiguration(_))));
            } else {
                assert!(result.unwrap().passed());
            }
        });
}

#[test]
fn numeric_equality_holds_for_any_rescaling() {
    bolero::check!()
        .with_type::<(i32, u8)>()
        .cloned()
        .for_each(|(unscaled, shift)| {
            let (red, blue, equivalent) = decimals(unscaled, shift);
            let report = Config::<Price>::new()
                .using_decimal_cmp()
                .with_prefab_equivalent(red, blue, equivalent)
                .verify()
                .unwrap();
            assert!(report.passed());
        });
}

#[test]
fn exact_hash_fails_for_any_actual_rescaling() {
    bolero::check!()
        .with_type::<(i32, u8)>()
        .cloned()
        .for_each(|(unscaled, shift)| {
            let (red, blue, equivalent) = decimals(unscaled, shift);
            let result = Config::<Quote>::new()
                .using_decimal_cmp()
                .with_prefab_equivalent(red, blue, equivalent)
                .verify();
            match result {
                Ok(report) => {
                    assert_eq!(equivalent, red);
                    assert!(report.passed());
                }
                Err(err) => {
                    assert!(matches!(err, VerifyError::StrategyMismatch(_)), "{err}");
                    assert!(equivalent != red);
                }
            }
        });
}

#[test]
fn repeated_runs_agree() {
    let first = verify::<Point>().unwrap();
    let second = verify::<Point>().unwrap();
    assert_eq!(first, second);

    let first = Config::<Quote>::new().using_decimal_cmp().verify().unwrap_err();
    let second = Config::<Quote>::new().using_decimal_cmp().verify().unwrap_err();
    assert_eq!(first.report(), second.report());
}

#[test]
fn concurrent_runs_are_independent() {
    let reports: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                scope.spawn(move || {
                    if worker % 2 == 0 {
                        verify::<Point>().map(|report| report.to_string())
                    } else {
                        Config::<Quote>::new()
                            .using_decimal_cmp()
                            .verify()
                            .map(|report| report.to_string())
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });
    for (worker, report) in reports.iter().enumerate() {
        assert_eq!(report.is_ok(), worker % 2 == 0);
    }
    assert_eq!(
        reports[0].as_ref().unwrap(),
        "Point: 8 check(s) passed, 0 skip(s)"
    );
    assert_eq!(
        reports[1].as_ref().unwrap_err().to_string(),
        reports[3].as_ref().unwrap_err().to_string()
    );
}

#[test]
fn reports_serialize_as_data() {
    let err = Config::<Quote>::new().using_decimal_cmp().verify().unwrap_err();
    let json = serde_json::to_value(err.report().unwrap()).unwrap();
    assert_eq!(json["type_name"], "Quote");
    assert_eq!(json["construction"], "field_injection");
    let violation = &json["violations"][0];
    assert_eq!(violation["invariant"], "hash_consistency");
    assert_eq!(violation["kind"], "strategy_mismatch");
    assert_eq!(violation["field"]["level"], "Quote");
    assert_eq!(violation["field"]["name"], "amount");
    assert_eq!(violation["expected"], "same_hash");
    assert_eq!(violation["actual"], "different_hash");
}
