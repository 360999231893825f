// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Automatic verification of equality and hash contracts.
//!
//! Given a type implementing [`Verifiable`] (usually through `#[derive(Verifiable, Example)]`),
//! the verifier synthesizes example values for every field, builds instances holding exactly
//! those values and checks that `eq`, `eq_any` and `hash` honor their contracts: reflexivity,
//! symmetry, transitivity, consistency between equality and hashing, and agreement with any
//! configured comparison strategy (e.g. numeric comparison of [`Decimal`] fields).
//!
//! ```ignore
//! #[derive(Clone, Debug, PartialEq, Eq, Hash, Verifiable, Example)]
//! struct Price {
//!     amount: Decimal,
//! }
//!
//! Config::<Price>::new().verify()?;
//! ```

#![deny(
    unsafe_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

// lets the derive macros name this crate as `::eqv_verifier` from inside it
extern crate self as eqv_verifier;

pub mod builder;
mod checker;
pub mod config;
pub mod decimal;
pub mod error;
pub mod example;
pub mod factory;
pub mod field;
mod probe;
pub mod report;
pub mod strategy;
pub mod target;
pub mod value;
pub mod verifier;

pub use builder::{ConstructionStrategy, InstanceSupplier};
pub use config::{Config, SubclassPolicy, SubtypeFactory};
pub use decimal::{Decimal, DecimalError};
pub use error::VerifyError;
pub use example::{Example, ExampleValues};
pub use factory::ValueFactory;
pub use field::{FieldAccessor, FieldDescriptor, FieldKey};
pub use report::{Invariant, Relation, Skip, VerificationReport, Violation, ViolationKind};
pub use strategy::{ComparisonStrategy, OrderingFn, StrategyScope};
pub use target::{AnyEq, TypeInfo, TypeKind, Verifiable, inject_nested};
pub use value::{FieldValues, Value};
pub use verifier::{Verifier, verify};

pub use derive::{Example, Verifiable};
