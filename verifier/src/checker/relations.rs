// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Observed equality relations, memoised across the checks of one run.

use crate::report::Relation;

/// The outcome of comparing two instances in both directions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Equal both ways.
    Equal,
    /// Unequal both ways.
    Unequal,
    /// The two directions disagree.
    Asymmetric,
    /// A comparison panicked.
    Panicked(String),
}

impl Outcome {
    pub(crate) fn of(forward: Result<bool, String>, backward: Result<bool, String>) -> Outcome {
        match (forward, backward) {
            (Err(panic), _) | (_, Err(panic)) => Outcome::Panicked(panic),
            (Ok(true), Ok(true)) => Outcome::Equal,
            (Ok(false), Ok(false)) => Outcome::Unequal,
            _ => Outcome::Asymmetric,
        }
    }

    pub(crate) fn relation(&self) -> Relation {
        match self {
            Outcome::Equal => Relation::Equal,
            Outcome::Unequal => Relation::Unequal,
            Outcome::Asymmetric => Relation::Asymmetric,
            Outcome::Panicked(panic) => Relation::Panicked(panic.clone()),
        }
    }
}

/// Whether equality observably depends on a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Significance {
    /// Changing the field breaks equality.
    Significant,
    /// Changing the field keeps instances equal.
    Insignificant,
    /// The field has no second value to probe with.
    Untestable,
    /// Probing the field gave an asymmetric or panicking comparison.
    Broken,
}

impl From<&Outcome> for Significance {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Equal => Significance::Insignificant,
            Outcome::Unequal => Significance::Significant,
            Outcome::Asymmetric | Outcome::Panicked(_) => Significance::Broken,
        }
    }
}

/// Per-field observations, filled on first use.
///
/// Instances are never memoised, only what was observed about them.
#[derive(Debug)]
pub(crate) struct Relations {
    significance: Vec<Option<Significance>>,
    equivalence: Vec<Option<Option<Outcome>>>,
}

impl Relations {
    pub(crate) fn new(fields: usize) -> Relations {
        Relations {
            significance: vec![None; fields],
            equivalence: vec![None; fields],
        }
    }

    pub(crate) fn significance(&self, field: usize) -> Option<&Significance> {
        self.significance.get(field).and_then(Option::as_ref)
    }

    pub(crate) fn set_significance(&mut self, field: usize, significance: Significance) {
        if let Some(slot) = self.significance.get_mut(field) {
            *slot = Some(significance);
        }
    }

    /// The outcome of comparing the base instance with its equivalent-valued variant; the inner
    /// `None` records that the field has no equivalent value.
    pub(crate) fn equivalence(&self, field: usize) -> Option<&Option<Outcome>> {
        self.equivalence.get(field).and_then(Option::as_ref)
    }

    pub(crate) fn set_equivalence(&mut self, field: usize, outcome: Option<Outcome>) {
        if let Some(slot) = self.equivalence.get_mut(field) {
            *slot = Some(outcome);
        }
    }
}
