// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Synthesis of example values, scoped to one verification run.

use crate::builder::InstanceBuilder;
use crate::error::VerifyError;
use crate::example::{Example, ExampleValues};
use crate::field::{FieldAccessor, FieldDescriptor};
use crate::strategy::{ComparisonStrategy, StrategyContext};
use crate::target::Verifiable;
use crate::value::{FieldValues, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use tracing::{trace, warn};

/// Caller-registered example values for one type.
#[derive(Clone, Debug)]
pub(crate) struct Prefab {
    type_id: TypeId,
    type_name: &'static str,
    values: ExampleValues<Value>,
}

impl Prefab {
    pub(crate) fn new<F: Any + Debug + Clone + PartialEq>(values: ExampleValues<F>) -> Prefab {
        Prefab {
            type_id: TypeId::of::<F>(),
            type_name: std::any::type_name::<F>(),
            values: values.erase(),
        }
    }
}

/// Produces red/blue example values for any type, with caching and a recursion guard.
///
/// A factory belongs to exactly one verification run; nothing is shared between runs.
#[derive(Debug, Default)]
pub struct ValueFactory {
    prefabs: HashMap<TypeId, ExampleValues<Value>>,
    cache: HashMap<(TypeId, StrategyContext), ExampleValues<Value>>,
    resolving: Vec<(TypeId, &'static str)>,
}

fn typed<F: Any + Debug + Clone + PartialEq>(
    values: ExampleValues<Value>,
) -> Result<ExampleValues<F>, VerifyError> {
    let actual = values.red.type_name();
    values
        .downcast::<F>()
        .ok_or_else(|| VerifyError::FieldTypeMismatch {
            field: format!("examples of {}", std::any::type_name::<F>()),
            expected: std::any::type_name::<F>(),
            actual,
        })
}

impl ValueFactory {
    /// A factory with no prefab values.
    #[must_use]
    pub fn new() -> ValueFactory {
        ValueFactory::default()
    }

    /// Register example values for `F`, taking precedence over derivation.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidConfiguration`] if `red` and `blue` are equal.
    pub fn register_prefab<F: Any + Debug + Clone + PartialEq>(
        &mut self,
        values: ExampleValues<F>,
    ) -> Result<(), VerifyError> {
        self.register(Prefab::new(values))
    }

    pub(crate) fn register(&mut self, prefab: Prefab) -> Result<(), VerifyError> {
        if prefab.values.blue.as_ref() == Some(&prefab.values.red) {
            return Err(VerifyError::InvalidConfiguration(format!(
                "prefab values for {} must differ, got {:?} twice",
                prefab.type_name, prefab.values.red
            )));
        }
        self.cache.retain(|(type_id, _), _| *type_id != prefab.type_id);
        self.prefabs.insert(prefab.type_id, prefab.values);
        Ok(())
    }

    /// Run `resolve` with `F` marked as being resolved.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::RecursiveType`] if `F` is already being resolved, otherwise the
    /// result of `resolve`.
    pub fn with_recursion_guard<F: Any, R>(
        &mut self,
        resolve: impl FnOnce(&mut ValueFactory) -> Result<R, VerifyError>,
    ) -> Result<R, VerifyError> {
        let id = TypeId::of::<F>();
        let name = std::any::type_name::<F>();
        if self.resolving.iter().any(|(resolving, _)| *resolving == id) {
            let mut path: Vec<_> = self.resolving.iter().map(|(_, name)| *name).collect();
            path.push(name);
            return Err(VerifyError::RecursiveType { path });
        }
        self.resolving.push((id, name));
        let result = resolve(self);
        self.resolving.pop();
        result
    }

    /// Example values for `F`: registered prefab values if any, otherwise derived through `F`'s
    /// [`Example`] implementation and cached for the rest of the run.
    ///
    /// # Errors
    ///
    /// Fails if derivation fails or recurses into `F` itself.
    pub fn values_for<F: Example>(&mut self) -> Result<ExampleValues<F>, VerifyError> {
        let id = TypeId::of::<F>();
        if let Some(prefab) = self.prefabs.get(&id) {
            return typed(prefab.clone());
        }
        if let Some(cached) = self.cache.get(&(id, StrategyContext::Natural)) {
            return typed(cached.clone());
        }
        let mut values = self.with_recursion_guard::<F, _>(F::examples)?;
        if values.blue.as_ref() == Some(&values.red) {
            warn!(
                "{} produced equal red and blue examples; treating it as single-valued",
                std::any::type_name::<F>()
            );
            values.blue = None;
        }
        trace!("examples for {}: {values:?}", std::any::type_name::<F>());
        self.cache
            .insert((id, StrategyContext::Natural), values.clone().erase());
        Ok(values)
    }

    /// Registered prefab values for `F`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::UnresolvableType`] if none were registered.
    pub fn prefab_for<F: Any + Debug + Clone + PartialEq>(
        &mut self,
    ) -> Result<ExampleValues<F>, VerifyError> {
        let name = std::any::type_name::<F>();
        match self.prefabs.get(&TypeId::of::<F>()) {
            Some(prefab) => typed(prefab.clone()),
            None => Err(VerifyError::UnresolvableType {
                type_name: name,
                hint: format!(
                    "no example values can be derived; register some with \
                     `with_prefab_values::<{name}>(red, blue)`"
                ),
            }),
        }
    }

    /// Example values for a record type, built from the example values of its own fields.
    ///
    /// `blue` varies every field which has a second value, `red_equivalent` replaces every field
    /// which has an equivalent representation.  This is what `#[derive(Example)]` expands to.
    ///
    /// # Errors
    ///
    /// Fails if a field's values cannot be resolved or the record cannot be built.
    pub fn record_examples<R: Verifiable>(&mut self) -> Result<ExampleValues<R>, VerifyError> {
        let accessor = FieldAccessor::<R>::introspect()?;
        let mut red = FieldValues::new();
        let mut blue = FieldValues::new();
        let mut equivalent = FieldValues::new();
        let (mut varies, mut has_equivalent) = (false, false);
        for field in accessor.fields() {
            let examples = field.examples(self)?;
            varies |= examples.blue.is_some();
            has_equivalent |= examples.red_equivalent.is_some();
            let key = field.key();
            blue.insert(key, examples.blue.unwrap_or_else(|| examples.red.clone()));
            equivalent.insert(
                key,
                examples
                    .red_equivalent
                    .unwrap_or_else(|| examples.red.clone()),
            );
            red.insert(key, examples.red);
        }
        let builder = InstanceBuilder::new(&accessor, None);
        Ok(ExampleValues {
            red: builder.build(&red)?,
            blue: if varies { Some(builder.build(&blue)?) } else { None },
            red_equivalent: if has_equivalent {
                Some(builder.build(&equivalent)?)
            } else {
                None
            },
        })
    }

    /// Example values for `field` as seen through `strategy`.
    ///
    /// Under an ordering strategy `red_equivalent` is kept only when it is ordering-equivalent
    /// to `red` while structurally different. A `blue` the ordering deems equivalent to `red`
    /// is no second value; it becomes the equivalent representation when none is left.
    ///
    /// # Errors
    ///
    /// Fails if the field type's natural example values cannot be resolved.
    pub fn field_examples<T>(
        &mut self,
        field: &FieldDescriptor<T>,
        strategy: &ComparisonStrategy,
    ) -> Result<ExampleValues<Value>, VerifyError> {
        let natural = field.examples(self)?;
        let Some(ordering) = strategy.ordering_fn() else {
            return Ok(natural);
        };
        let key = (field.type_id(), strategy.context());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }
        let (blue, demoted) = match natural.blue {
            Some(blue) if ordering.equivalent(&natural.red, &blue) => (None, Some(blue)),
            blue => (blue, None),
        };
        let red_equivalent = natural
            .red_equivalent
            .into_iter()
            .chain(demoted)
            .find(|equivalent| {
                ordering.equivalent(&natural.red, equivalent) && *equivalent != natural.red
            });
        let adjusted = ExampleValues {
            red: natural.red,
            blue,
            red_equivalent,
        };
        trace!(
            "examples for {} under {}: {adjusted:?}",
            field.type_name(),
            ordering.label()
        );
        self.cache.insert(key, adjusted.clone());
        Ok(adjusted)
    }
}
