// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Building instances holding exactly a requested set of field values.

use crate::error::VerifyError;
use crate::field::FieldAccessor;
use crate::probe::guarded;
use crate::target::Verifiable;
use crate::value::FieldValues;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, trace};

/// A caller-supplied way to build instances from field values.
pub type InstanceSupplier<T> = Rc<dyn Fn(&FieldValues) -> Result<T, String>>;

/// The ways an instance can be built, in the order they are tried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConstructionStrategy {
    /// The type's regular constructor ([`Verifiable::construct`]).
    Constructor,
    /// Direct installation of every field ([`Verifiable::inject`]).
    FieldInjection,
    /// The manual instance supplier from the configuration.
    Supplier,
}

/// Builds instances of `T` for one verification run.
///
/// The first strategy that succeeds is remembered and tried first next time; when it fails for
/// some set of values the remaining strategies are tried again in order.  Every instance is read
/// back, field by field, and rejected unless it holds exactly the requested values.
pub struct InstanceBuilder<'a, T> {
    accessor: &'a FieldAccessor<T>,
    supplier: Option<InstanceSupplier<T>>,
    preferred: Cell<Option<ConstructionStrategy>>,
}

impl<'a, T: Verifiable> InstanceBuilder<'a, T> {
    /// A builder for the introspected type.
    #[must_use]
    pub fn new(
        accessor: &'a FieldAccessor<T>,
        supplier: Option<InstanceSupplier<T>>,
    ) -> InstanceBuilder<'a, T> {
        InstanceBuilder {
            accessor,
            supplier,
            preferred: Cell::new(None),
        }
    }

    /// The strategy which succeeded most recently.
    #[must_use]
    pub fn preferred(&self) -> Option<ConstructionStrategy> {
        self.preferred.get()
    }

    /// Build an instance holding exactly `values`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::UnconstructibleType`] listing every failed attempt.
    pub fn build(&self, values: &FieldValues) -> Result<T, VerifyError> {
        let order = [
            ConstructionStrategy::Constructor,
            ConstructionStrategy::FieldInjection,
            ConstructionStrategy::Supplier,
        ];
        let preferred = self.preferred.get();
        let candidates = preferred
            .into_iter()
            .chain(order.into_iter().filter(|strategy| Some(*strategy) != preferred));
        let mut attempts = Vec::new();
        for strategy in candidates {
            match self.attempt(strategy, values) {
                Ok(instance) => {
                    if preferred != Some(strategy) {
                        debug!(
                            "building {} via {strategy}",
                            self.accessor.type_info().name()
                        );
                    }
                    self.preferred.set(Some(strategy));
                    return Ok(instance);
                }
                Err(reason) => {
                    trace!("{strategy} failed: {reason}");
                    attempts.push(format!("{strategy}: {reason}"));
                }
            }
        }
        Err(VerifyError::UnconstructibleType {
            type_name: self.accessor.type_info().name(),
            attempts,
        })
    }

    fn attempt(&self, strategy: ConstructionStrategy, values: &FieldValues) -> Result<T, String> {
        let instance = match strategy {
            ConstructionStrategy::Constructor => guarded(|| T::construct(values))
                .map_err(|panic| format!("panicked: {panic}"))?
                .ok_or_else(|| "not available".to_string())??,
            ConstructionStrategy::FieldInjection => {
                guarded(|| T::inject(values, self.accessor.fields()))
                    .map_err(|panic| format!("panicked: {panic}"))?
                    .ok_or_else(|| "not available".to_string())?
                    .map_err(|err| err.to_string())?
            }
            ConstructionStrategy::Supplier => {
                let supplier = self
                    .supplier
                    .as_ref()
                    .ok_or_else(|| "no manual instance supplier configured".to_string())?;
                guarded(|| supplier(values)).map_err(|panic| format!("panicked: {panic}"))??
            }
        };
        self.confirm(&instance, values)?;
        Ok(instance)
    }

    /// Reject instances which do not hold the requested values (e.g. a normalising constructor).
    fn confirm(&self, instance: &T, values: &FieldValues) -> Result<(), String> {
        for field in self.accessor.fields() {
            let expected = values
                .get(&field.key())
                .ok_or_else(|| format!("no value supplied for field `{}`", field.key()))?;
            let actual = field.get(instance);
            if actual != *expected {
                return Err(format!(
                    "field `{}` holds {actual:?} instead of {expected:?}",
                    field.key()
                ));
            }
        }
        Ok(())
    }
}
