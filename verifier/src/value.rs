// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Type-erased field values.

use crate::error::VerifyError;
use crate::field::FieldKey;
use downcast_rs::{Downcast, impl_downcast};
use ordermap::OrderMap;
use std::any::Any;
use std::fmt::{self, Debug};

/// Object-safe view of a field value.
trait ErasedValue: Downcast + Debug {
    fn clone_erased(&self) -> Box<dyn ErasedValue>;
    fn eq_erased(&self, other: &dyn ErasedValue) -> bool;
    fn type_name(&self) -> &'static str;
}

impl_downcast!(ErasedValue);

impl<T: Any + Debug + Clone + PartialEq> ErasedValue for T {
    fn clone_erased(&self) -> Box<dyn ErasedValue> {
        Box::new(self.clone())
    }

    fn eq_erased(&self, other: &dyn ErasedValue) -> bool {
        other
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A field value of any `'static + Clone + Debug + PartialEq` type.
///
/// Equality between two [`Value`]s is the natural (structural) equality of the underlying
/// type; values of different types are never equal.
pub struct Value(Box<dyn ErasedValue>);

impl Value {
    /// Wrap a concrete value.
    #[must_use]
    pub fn new<T: Any + Debug + Clone + PartialEq>(value: T) -> Value {
        Value(Box::new(value))
    }

    /// Borrow the underlying value if it is a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).as_any().downcast_ref::<T>()
    }

    /// Recover the underlying value if it is a `T`, or hand the [`Value`] back.
    ///
    /// # Errors
    ///
    /// Returns the original value if it is not a `T`.
    pub fn downcast<T: Any + Debug + Clone + PartialEq>(self) -> Result<T, Value> {
        self.0.downcast::<T>().map(|value| *value).map_err(Value)
    }

    /// The name of the underlying value's type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        Value(self.0.clone_erased())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_erased(other.0.as_ref())
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// The complete set of field values an instance should be built with, in field order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldValues(OrderMap<FieldKey, Value>);

impl FieldValues {
    /// An empty set of values.
    #[must_use]
    pub fn new() -> FieldValues {
        FieldValues(OrderMap::new())
    }

    /// Set the value of a field, keeping its position if it was already present.
    pub fn insert(&mut self, key: FieldKey, value: Value) {
        self.0.insert(key, value);
    }

    /// A copy of these values with one field replaced.
    #[must_use]
    pub fn with(&self, key: FieldKey, value: Value) -> FieldValues {
        let mut copy = self.clone();
        copy.insert(key, value);
        copy
    }

    /// The value of a field.
    #[must_use]
    pub fn get(&self, key: &FieldKey) -> Option<&Value> {
        self.0.get(key)
    }

    /// A clone of a field's value as its concrete type.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidConfiguration`] if the field is absent and
    /// [`VerifyError::FieldTypeMismatch`] if the value is not a `T`.
    pub fn cloned<T: Any + Clone>(&self, key: &FieldKey) -> Result<T, VerifyError> {
        let value = self.get(key).ok_or_else(|| {
            VerifyError::InvalidConfiguration(format!("no value supplied for field `{key}`"))
        })?;
        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| VerifyError::FieldTypeMismatch {
                field: key.to_string(),
                expected: std::any::type_name::<T>(),
                actual: value.type_name(),
            })
    }

    /// Iterate over the values in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &Value)> {
        self.0.iter()
    }
}
