// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Comparison strategies and their per-field / per-type registry.

use crate::error::VerifyError;
use crate::field::{FieldAccessor, FieldDescriptor};
use crate::value::Value;
use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt::{self, Debug};
use std::rc::Rc;
use tracing::debug;

type Compare = Rc<dyn Fn(&Value, &Value) -> Option<Ordering>>;

/// A type's own ordering operation, type-erased.
#[derive(Clone)]
pub struct OrderingFn {
    label: &'static str,
    operand: TypeId,
    operand_name: &'static str,
    cmp: Compare,
}

impl OrderingFn {
    /// Wrap `cmp`, to be reported as `label` (e.g. `"Decimal::cmp_value"`).
    #[must_use]
    pub fn new<F: Any>(label: &'static str, cmp: fn(&F, &F) -> Ordering) -> OrderingFn {
        OrderingFn {
            label,
            operand: TypeId::of::<F>(),
            operand_name: std::any::type_name::<F>(),
            cmp: Rc::new(move |lhs, rhs| Some(cmp(lhs.downcast_ref()?, rhs.downcast_ref()?))),
        }
    }

    /// The name of the ordering operation.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// The type the ordering compares.
    #[must_use]
    pub fn operand(&self) -> TypeId {
        self.operand
    }

    /// Name of the type the ordering compares.
    #[must_use]
    pub fn operand_name(&self) -> &'static str {
        self.operand_name
    }

    /// Compare two values; `None` if either is not of the operand type.
    #[must_use]
    pub fn compare(&self, lhs: &Value, rhs: &Value) -> Option<Ordering> {
        (self.cmp)(lhs, rhs)
    }

    /// Returns true if the ordering considers both values equivalent.
    #[must_use]
    pub fn equivalent(&self, lhs: &Value, rhs: &Value) -> bool {
        self.compare(lhs, rhs) == Some(Ordering::Equal)
    }
}

impl Debug for OrderingFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderingFn")
            .field("label", &self.label)
            .field("operand", &self.operand_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for OrderingFn {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.operand == other.operand
    }
}

/// How two values of a field are expected to be treated by the type's equality.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ComparisonStrategy {
    /// The field type's own `PartialEq`.
    #[default]
    Natural,
    /// Values are equivalent when the ordering says [`Ordering::Equal`], even if structurally
    /// different.
    OrderingBased(OrderingFn),
    /// The field does not participate in equality.
    Ignored,
}

impl ComparisonStrategy {
    /// Ordering-based equality using `cmp`.
    #[must_use]
    pub fn ordering<F: Any>(label: &'static str, cmp: fn(&F, &F) -> Ordering) -> Self {
        ComparisonStrategy::OrderingBased(OrderingFn::new(label, cmp))
    }

    /// The ordering, for ordering-based strategies.
    #[must_use]
    pub fn ordering_fn(&self) -> Option<&OrderingFn> {
        match self {
            ComparisonStrategy::OrderingBased(ordering) => Some(ordering),
            _ => None,
        }
    }

    /// The context example values are derived in under this strategy.
    #[must_use]
    pub fn context(&self) -> StrategyContext {
        match self {
            ComparisonStrategy::OrderingBased(ordering) => {
                StrategyContext::Ordering(ordering.label)
            }
            ComparisonStrategy::Natural | ComparisonStrategy::Ignored => StrategyContext::Natural,
        }
    }
}

/// Distinguishes cached example values derived under different strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyContext {
    /// Natural equality of the field type.
    Natural,
    /// Equivalence under the named ordering.
    Ordering(&'static str),
}

/// What a strategy override applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StrategyScope {
    /// Fields selected by `name` or `Level.name`.
    Field(String),
    /// Every field of the given type.
    Type {
        /// The field type.
        id: TypeId,
        /// Its name, for diagnostics.
        name: &'static str,
    },
}

impl StrategyScope {
    /// Scope an override to the field(s) matching `selector`.
    pub fn field(selector: impl Into<String>) -> StrategyScope {
        StrategyScope::Field(selector.into())
    }

    /// Scope an override to every field of type `F`.
    #[must_use]
    pub fn of_type<F: Any>() -> StrategyScope {
        StrategyScope::Type {
            id: TypeId::of::<F>(),
            name: std::any::type_name::<F>(),
        }
    }
}

/// Strategy overrides for one verification run.
///
/// Precedence: a field override beats a type override beats [`ComparisonStrategy::Natural`].  A
/// later registration for the same scope replaces the earlier one.
#[derive(Clone, Debug, Default)]
pub struct StrategyRegistry {
    overrides: Vec<(StrategyScope, ComparisonStrategy)>,
}

impl StrategyRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> StrategyRegistry {
        StrategyRegistry::default()
    }

    /// Register an override.
    pub fn register(&mut self, scope: StrategyScope, strategy: ComparisonStrategy) {
        self.overrides.retain(|(existing, _)| *existing != scope);
        self.overrides.push((scope, strategy));
    }

    /// Returns true if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// The strategy in force for `field`.
    #[must_use]
    pub fn strategy_for<T>(&self, field: &FieldDescriptor<T>) -> ComparisonStrategy {
        let by_field = self.overrides.iter().find_map(|(scope, strategy)| match scope {
            StrategyScope::Field(selector) if field.key().matches(selector) => Some(strategy),
            _ => None,
        });
        let by_type = || {
            self.overrides.iter().find_map(|(scope, strategy)| match scope {
                StrategyScope::Type { id, .. } if *id == field.type_id() => Some(strategy),
                _ => None,
            })
        };
        by_field.or_else(by_type).cloned().unwrap_or_default()
    }

    /// Check every override against the introspected type and resolve the strategy of each field,
    /// in field order.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::UnknownField`] for a field override matching nothing and
    /// [`VerifyError::InvalidConfiguration`] for an ordering whose operand type differs from the
    /// type it is applied to.
    pub fn resolve<T>(
        &self,
        accessor: &FieldAccessor<T>,
    ) -> Result<Vec<ComparisonStrategy>, VerifyError> {
        for (scope, strategy) in &self.overrides {
            match scope {
                StrategyScope::Field(selector) => {
                    for field in accessor.select(selector)? {
                        check_operand(strategy, field.type_id(), field.type_name(), selector)?;
                    }
                }
                StrategyScope::Type { id, name } => check_operand(strategy, *id, name, name)?,
            }
        }
        let strategies: Vec<_> = accessor
            .fields()
            .iter()
            .map(|field| self.strategy_for(field))
            .collect();
        for (field, strategy) in accessor.fields().iter().zip(&strategies) {
            if *strategy != ComparisonStrategy::Natural {
                debug!("field {} uses strategy {strategy:?}", field.key());
            }
        }
        Ok(strategies)
    }
}

fn check_operand(
    strategy: &ComparisonStrategy,
    target: TypeId,
    target_name: &str,
    scope: &str,
) -> Result<(), VerifyError> {
    match strategy.ordering_fn() {
        Some(ordering) if ordering.operand() != target => {
            Err(VerifyError::InvalidConfiguration(format!(
                "ordering {} compares {} but `{scope}` is of type {target_name}",
                ordering.label(),
                ordering.operand_name()
            )))
        }
        _ => Ok(()),
    }
}
