// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors produced by a verification run.

use crate::report::VerificationReport;

/// Everything that can stop a verification run from reporting a pass.
///
/// The first six variants are configuration problems: the engine could not synthesize or
/// construct what it needs and the caller has to supply more information (prefab values, an
/// instance supplier, a corrected field name).  They are never skipped silently.
///
/// [`StrategyMismatch`] and [`ContractViolation`] are the intended product of the tool: the
/// type under test broke its equality contract.  The variant is chosen by the kind of the first
/// violation in the carried report.
///
/// [`StrategyMismatch`]: VerifyError::StrategyMismatch
/// [`ContractViolation`]: VerifyError::ContractViolation
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// No registered or derivable example values exist for a type.
    #[error("unable to produce example values for {type_name}: {hint}")]
    UnresolvableType {
        /// The type lacking example values.
        type_name: &'static str,
        /// Guidance on how to supply them.
        hint: String,
    },
    /// Deriving example values for a type required example values of that same type.
    #[error(
        "recursive data structure: {}; register prefab values for one of these types",
        .path.join(" -> ")
    )]
    RecursiveType {
        /// The resolution path, outermost type first, ending with the repeated type.
        path: Vec<&'static str>,
    },
    /// No instantiation path produced an instance holding the requested field values.
    #[error(
        "unable to construct {type_name} ({}); supply an instance with `manual_instance_supplier`",
        .attempts.join("; ")
    )]
    UnconstructibleType {
        /// The type which could not be built.
        type_name: &'static str,
        /// One entry per attempted construction strategy, with the reason it failed.
        attempts: Vec<String>,
    },
    /// The configuration names a field the type does not declare.
    #[error("{type_name} does not declare a field named `{field}`")]
    UnknownField {
        /// The type under test.
        type_name: &'static str,
        /// The unknown field selector.
        field: String,
    },
    /// The configuration is internally inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A value of the wrong type was installed into a field.
    #[error("field `{field}` expects a value of type {expected}, got {actual}")]
    FieldTypeMismatch {
        /// The field being written.
        field: String,
        /// The declared type of the field.
        expected: &'static str,
        /// The type of the value offered.
        actual: &'static str,
    },
    /// The configured comparison strategy contradicts the observed equality or hash behavior.
    #[error("{0}")]
    StrategyMismatch(Box<VerificationReport>),
    /// The type's own equality or hash logic violates one of the contract invariants.
    #[error("{0}")]
    ContractViolation(Box<VerificationReport>),
}

impl VerifyError {
    /// Returns true if this error stems from missing or inconsistent configuration rather than
    /// from a defect of the type under test.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            VerifyError::StrategyMismatch(_) | VerifyError::ContractViolation(_)
        )
    }

    /// The failed report carried by a strategy mismatch or a contract violation.
    #[must_use]
    pub fn report(&self) -> Option<&VerificationReport> {
        match self {
            VerifyError::StrategyMismatch(report) | VerifyError::ContractViolation(report) => {
                Some(report)
            }
            _ => None,
        }
    }
}
