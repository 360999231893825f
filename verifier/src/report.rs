// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Verification outcomes and their rendering.

use crate::builder::ConstructionStrategy;
use crate::error::VerifyError;
use crate::field::FieldKey;
use std::fmt::{self, Display};
use tracing::{info, warn};

/// The fixed battery of contract checks, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Invariant {
    /// `x == x`.
    Reflexivity,
    /// Comparing or hashing instances holding `None` neither panics nor breaks reflexivity.
    NullSafety,
    /// Equality against an unrelated type is false.
    TypeSafety,
    /// Changing a significant field breaks equality, in both directions.
    SignificantFields,
    /// Ordering-equivalent field values keep instances equal under an ordering strategy.
    StrategyEquivalence,
    /// Changing an insignificant field keeps instances equal.
    InsignificantFields,
    /// Equal instances hash equally.
    HashConsistency,
    /// `x == y` and `y == z` imply `x == z`.
    Transitivity,
    /// Subtype instances with the same state compare consistently with the base type.
    Subclass,
}

/// Whether a violation is a defect of the type or a disagreement with the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ViolationKind {
    /// The type's own equality or hash logic is broken.
    Contract,
    /// The configured comparison strategy contradicts the observed behavior.
    StrategyMismatch,
}

/// A relation between two instances (or one instance and itself).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Relation {
    /// Compared equal.
    Equal,
    /// Compared unequal.
    Unequal,
    /// Hashed equally.
    SameHash,
    /// Hashed differently.
    DifferentHash,
    /// Both directions agree.
    Symmetric,
    /// The two directions disagree.
    Asymmetric,
    /// Completed without panicking.
    NoPanic,
    /// Panicked with the given message.
    Panicked(String),
    /// `x == y`, `y == z` and `x == z`.
    Transitive,
    /// `x == y`, `y == z` but `x != z`.
    Intransitive,
}

impl Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Equal => write!(f, "equal"),
            Relation::Unequal => write!(f, "not equal"),
            Relation::SameHash => write!(f, "same hash"),
            Relation::DifferentHash => write!(f, "different hashes"),
            Relation::Symmetric => write!(f, "symmetric"),
            Relation::Asymmetric => write!(f, "asymmetric"),
            Relation::NoPanic => write!(f, "no panic"),
            Relation::Panicked(message) => write!(f, "panic: {message}"),
            Relation::Transitive => write!(f, "transitive"),
            Relation::Intransitive => write!(f, "intransitive"),
        }
    }
}

/// One broken invariant, with everything needed to reproduce and fix it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Violation {
    /// The invariant which failed.
    pub invariant: Invariant,
    /// Defect of the type or disagreement with the configuration.
    pub kind: ViolationKind,
    /// The field involved, if any.
    pub field: Option<FieldKey>,
    /// The declared type of that field.
    pub field_type: Option<&'static str>,
    /// The relation the contract requires.
    pub expected: Relation,
    /// The relation observed.
    pub actual: Relation,
    /// `Debug` snapshot of the first instance compared.
    pub left: String,
    /// `Debug` snapshot of the second instance compared.
    pub right: String,
    /// What went wrong.
    pub message: String,
    /// How to fix it, for recognised mistakes.
    pub remediation: Option<String>,
}

impl Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violated", self.invariant)?;
        if let Some(field) = &self.field {
            write!(f, " for field `{field}`")?;
            if let Some(field_type) = self.field_type {
                write!(f, " ({field_type})")?;
            }
        }
        writeln!(f, ": {}", self.message)?;
        writeln!(f, "  expected: {}, actual: {}", self.expected, self.actual)?;
        writeln!(f, "  left:  {}", self.left)?;
        write!(f, "  right: {}", self.right)?;
        if let Some(remediation) = &self.remediation {
            write!(f, "\n  hint: {remediation}")?;
        }
        Ok(())
    }
}

/// A check (or one field of a check) which could not be exercised.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Skip {
    /// The check that was skipped.
    pub invariant: Invariant,
    /// The field it was skipped for, if any.
    pub field: Option<FieldKey>,
    /// Why.
    pub reason: String,
}

impl Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{} skipped for `{field}`: {}", self.invariant, self.reason),
            None => write!(f, "{} skipped: {}", self.invariant, self.reason),
        }
    }
}

/// The outcome of one verification run.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VerificationReport {
    type_name: &'static str,
    construction: Option<ConstructionStrategy>,
    checks_run: Vec<Invariant>,
    violations: Vec<Violation>,
    skips: Vec<Skip>,
}

impl VerificationReport {
    /// Name of the verified type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// How the base instance was built.
    #[must_use]
    pub fn construction(&self) -> Option<ConstructionStrategy> {
        self.construction
    }

    /// The checks which ran, in order (suppressed checks are absent).
    #[must_use]
    pub fn checks_run(&self) -> &[Invariant] {
        &self.checks_run
    }

    /// Every violation found, in the order found.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// The first violation found.
    #[must_use]
    pub fn first_violation(&self) -> Option<&Violation> {
        self.violations.first()
    }

    /// Every recorded skip.
    #[must_use]
    pub fn skips(&self) -> &[Skip] {
        &self.skips
    }

    /// Returns true if no violation was found.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

impl Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.split_first() {
            None => write!(
                f,
                "{}: {} check(s) passed, {} skip(s)",
                self.type_name,
                self.checks_run.len(),
                self.skips.len()
            ),
            Some((first, rest)) => {
                write!(f, "{}: {first}", self.type_name)?;
                if !rest.is_empty() {
                    write!(f, "\n(+{} more violation(s))", rest.len())?;
                }
                Ok(())
            }
        }
    }
}

/// Collects the observations of one run and turns them into an outcome.
#[derive(Debug)]
pub struct Reporter {
    type_name: &'static str,
    fail_fast: bool,
    checks_run: Vec<Invariant>,
    violations: Vec<Violation>,
    skips: Vec<Skip>,
}

impl Reporter {
    /// A reporter for `type_name`.
    #[must_use]
    pub fn new(type_name: &'static str, fail_fast: bool) -> Reporter {
        Reporter {
            type_name,
            fail_fast,
            checks_run: Vec::new(),
            violations: Vec::new(),
            skips: Vec::new(),
        }
    }

    /// Note that `invariant` is being checked.
    pub fn start(&mut self, invariant: Invariant) {
        self.checks_run.push(invariant);
    }

    /// Record a violation.
    pub fn violation(&mut self, violation: Violation) {
        warn!("{}: {violation}", self.type_name);
        self.violations.push(violation);
    }

    /// Record a skip.
    pub fn skip(&mut self, invariant: Invariant, field: Option<FieldKey>, reason: impl Into<String>) {
        let skip = Skip {
            invariant,
            field,
            reason: reason.into(),
        };
        warn!("{}: {skip}", self.type_name);
        self.skips.push(skip);
    }

    /// Returns true if the run should stop now.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.fail_fast && !self.violations.is_empty()
    }

    /// Finish the run.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::StrategyMismatch`] or [`VerifyError::ContractViolation`], by the
    /// kind of the first violation, carrying the complete report.
    pub fn report(
        self,
        construction: Option<ConstructionStrategy>,
    ) -> Result<VerificationReport, VerifyError> {
        let report = VerificationReport {
            type_name: self.type_name,
            construction,
            checks_run: self.checks_run,
            violations: self.violations,
            skips: self.skips,
        };
        match report.first_violation().map(|violation| violation.kind) {
            None => {
                info!("{report}");
                Ok(report)
            }
            Some(ViolationKind::StrategyMismatch) => {
                Err(VerifyError::StrategyMismatch(Box::new(report)))
            }
            Some(ViolationKind::Contract) => Err(VerifyError::ContractViolation(Box::new(report))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    fn violation(kind: ViolationKind) -> Violation {
        Violation {
            invariant: Invariant::HashConsistency,
            kind,
            field: Some(FieldKey::new("Price", "amount")),
            field_type: Some("Decimal"),
            expected: Relation::SameHash,
            actual: Relation::DifferentHash,
            left: "Price { amount: 0 }".to_string(),
            right: "Price { amount: 0.00 }".to_string(),
            message: "equal instances hash differently".to_string(),
            remediation: Some("hash the normalized value".to_string()),
        }
    }

    #[test]
    fn invariants_are_in_battery_order() {
        let names: Vec<_> = Invariant::iter().map(|invariant| invariant.to_string()).collect();
        assert_eq!(names.len(), 9);
        assert_eq!(names[0], "reflexivity");
        assert_eq!(names[6], "hash_consistency");
        assert_eq!(names[8], "subclass");
    }

    #[test]
    fn first_violation_decides_the_error() {
        let mut reporter = Reporter::new("Price", false);
        reporter.start(Invariant::HashConsistency);
        reporter.violation(violation(ViolationKind::StrategyMismatch));
        reporter.violation(violation(ViolationKind::Contract));
        assert!(!reporter.should_stop());
        let err = reporter.report(Some(ConstructionStrategy::FieldInjection)).unwrap_err();
        assert!(matches!(err, VerifyError::StrategyMismatch(_)));
        let report = err.report().unwrap();
        assert_eq!(report.violations().len(), 2);
        let rendered = err.to_string();
        assert!(rendered.starts_with("Price: hash_consistency violated for field `Price.amount`"));
        assert!(rendered.contains("expected: same hash, actual: different hashes"));
        assert!(rendered.contains("hint: hash the normalized value"));
        assert!(rendered.ends_with("(+1 more violation(s))"));
    }

    #[test]
    fn passing_reports_list_skips() {
        let mut reporter = Reporter::new("Unit", true);
        reporter.start(Invariant::Reflexivity);
        reporter.skip(Invariant::SignificantFields, None, "no fields");
        let report = reporter.report(None).unwrap();
        assert!(report.passed());
        assert_eq!(report.to_string(), "Unit: 1 check(s) passed, 1 skip(s)");
        assert_eq!(
            report.skips()[0].to_string(),
            "significant_fields skipped: no fields"
        );
    }

    #[test]
    fn fail_fast_stops_after_the_first_violation() {
        let mut reporter = Reporter::new("Price", true);
        assert!(!reporter.should_stop());
        reporter.violation(violation(ViolationKind::Contract));
        assert!(reporter.should_stop());
    }
}
