// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Field descriptors and per-type field access.
//!
//! A [`FieldDescriptor`] is the explicit replacement for reflective field access: it carries the
//! field's name, the level which declares it, its value type, a getter, a setter and a way to
//! obtain example values for it.  Descriptors are normally generated by
//! `#[derive(Verifiable)]`.

use crate::error::VerifyError;
use crate::example::{Example, ExampleValues};
use crate::factory::ValueFactory;
use crate::target::{TypeInfo, Verifiable};
use crate::value::{FieldValues, Value};
use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::fmt::{self, Debug, Display};
use std::rc::Rc;
use tracing::debug;

/// Identifies a field by the level (type) which declares it and its name.
///
/// Two levels of a flattened hierarchy may declare fields of the same name; the level keeps them
/// apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldKey {
    /// The declaring level.
    pub level: &'static str,
    /// The field name (the index for tuple structs).
    pub name: &'static str,
}

impl FieldKey {
    /// Create a new key.
    #[must_use]
    pub const fn new(level: &'static str, name: &'static str) -> FieldKey {
        FieldKey { level, name }
    }

    /// Returns true if `selector` names this field, either bare (`name`) or qualified
    /// (`Level.name`).
    #[must_use]
    pub fn matches(&self, selector: &str) -> bool {
        match selector.split_once('.') {
            Some((level, name)) => level == self.level && name == self.name,
            None => selector == self.name,
        }
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.level, self.name)
    }
}

type Getter<T> = Rc<dyn Fn(&T) -> Value>;
type Setter<T> = Rc<dyn Fn(&mut T, Value) -> Result<(), VerifyError>>;
type ExampleSource = Rc<dyn Fn(&mut ValueFactory) -> Result<ExampleValues<Value>, VerifyError>>;

/// Describes one field of a [`Verifiable`] type `T`.
pub struct FieldDescriptor<T> {
    key: FieldKey,
    type_name: &'static str,
    type_id: TypeId,
    get: Getter<T>,
    set: Setter<T>,
    examples: ExampleSource,
    null_value: Option<Value>,
    depth: usize,
}

impl<T: 'static> FieldDescriptor<T> {
    fn with_source<F: Any + Debug + Clone + PartialEq>(
        level: &'static str,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
        examples: ExampleSource,
    ) -> FieldDescriptor<T> {
        let key = FieldKey::new(level, name);
        FieldDescriptor {
            key,
            type_name: std::any::type_name::<F>(),
            type_id: TypeId::of::<F>(),
            get: Rc::new(move |instance| Value::new(get(instance).clone())),
            set: Rc::new(move |instance, value| {
                let value = value
                    .downcast::<F>()
                    .map_err(|value| VerifyError::FieldTypeMismatch {
                        field: key.to_string(),
                        expected: std::any::type_name::<F>(),
                        actual: value.type_name(),
                    })?;
                *get_mut(instance) = value;
                Ok(())
            }),
            examples,
            null_value: None,
            depth: 0,
        }
    }

    /// Describe a field whose example values are derived through its [`Example`] impl (or a
    /// registered prefab, which takes precedence).
    #[must_use]
    pub fn new<F: Example>(
        level: &'static str,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> FieldDescriptor<T> {
        Self::with_source(
            level,
            name,
            get,
            get_mut,
            Rc::new(|factory| factory.values_for::<F>().map(ExampleValues::erase)),
        )
    }

    /// Describe a field whose example values can only come from registered prefab values.
    #[must_use]
    pub fn prefab<F: Any + Debug + Clone + PartialEq>(
        level: &'static str,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> FieldDescriptor<T> {
        Self::with_source(
            level,
            name,
            get,
            get_mut,
            Rc::new(|factory| factory.prefab_for::<F>().map(ExampleValues::erase)),
        )
    }

    /// Mark the field as nullable, `null` being the given value (`None` for option fields).
    #[must_use]
    pub fn nullable(mut self, null: Value) -> FieldDescriptor<T> {
        self.null_value = Some(null);
        self
    }

    /// Re-target this descriptor at a type `O` which embeds a `T`.
    ///
    /// This is how flattened (inherited) fields are exposed: the key keeps naming the level that
    /// declares the field.
    #[must_use]
    pub fn lift<O: 'static>(
        self,
        outer: fn(&O) -> &T,
        outer_mut: fn(&mut O) -> &mut T,
    ) -> FieldDescriptor<O> {
        let get = self.get;
        let set = self.set;
        FieldDescriptor {
            key: self.key,
            type_name: self.type_name,
            type_id: self.type_id,
            get: Rc::new(move |instance| get(outer(instance))),
            set: Rc::new(move |instance, value| set(outer_mut(instance), value)),
            examples: self.examples,
            null_value: self.null_value,
            depth: self.depth + 1,
        }
    }
}

impl<T> FieldDescriptor<T> {
    /// The key of the field.
    #[must_use]
    pub fn key(&self) -> FieldKey {
        self.key
    }

    /// The name of the field's declared type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The [`TypeId`] of the field's declared type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// How many flattened levels separate the declaring type from the type under test.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The value standing for `null` in this field, if it is nullable.
    #[must_use]
    pub fn null_value(&self) -> Option<&Value> {
        self.null_value.as_ref()
    }

    /// Read the field.
    #[must_use]
    pub fn get(&self, instance: &T) -> Value {
        (self.get)(instance)
    }

    /// Overwrite the field.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::FieldTypeMismatch`] if `value` is not of the field's type.
    pub fn set(&self, instance: &mut T, value: Value) -> Result<(), VerifyError> {
        (self.set)(instance, value)
    }

    /// Natural example values for the field, resolved through `factory`.
    ///
    /// # Errors
    ///
    /// Fails if the factory cannot produce values for the field type.
    pub fn examples(&self, factory: &mut ValueFactory) -> Result<ExampleValues<Value>, VerifyError> {
        (self.examples)(factory)
    }
}

impl<T> Clone for FieldDescriptor<T> {
    fn clone(&self) -> Self {
        FieldDescriptor {
            key: self.key,
            type_name: self.type_name,
            type_id: self.type_id,
            get: self.get.clone(),
            set: self.set.clone(),
            examples: self.examples.clone(),
            null_value: self.null_value.clone(),
            depth: self.depth,
        }
    }
}

impl<T> Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("key", &self.key)
            .field("type_name", &self.type_name)
            .field("nullable", &self.null_value.is_some())
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

/// The introspected state of a type: its ordered field list plus get/set access by key.
///
/// Introspection happens once per verification run.
pub struct FieldAccessor<T> {
    info: TypeInfo,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: Verifiable> FieldAccessor<T> {
    /// Introspect `T`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidConfiguration`] if two descriptors share a key (e.g. the
    /// same level flattened twice).
    pub fn introspect() -> Result<FieldAccessor<T>, VerifyError> {
        let info = T::type_info();
        let fields = T::fields();
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.key()) {
                return Err(VerifyError::InvalidConfiguration(format!(
                    "{} declares field `{}` more than once",
                    info.name(),
                    field.key()
                )));
            }
        }
        debug!(
            "introspected {}: {} field(s) [{}]",
            info.name(),
            fields.len(),
            fields
                .iter()
                .map(|field| field.key().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(FieldAccessor { info, fields })
    }
}

impl<T> FieldAccessor<T> {
    /// Name and kind of the introspected type.
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        self.info
    }

    /// All fields, outermost flattened level first, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    /// The field with the given key.
    #[must_use]
    pub fn field(&self, key: &FieldKey) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|field| field.key() == *key)
    }

    /// Every field matched by a `name` or `Level.name` selector.
    ///
    /// A bare name selects the field at every level that declares it.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::UnknownField`] if nothing matches.
    pub fn select(&self, selector: &str) -> Result<Vec<&FieldDescriptor<T>>, VerifyError> {
        let selected: Vec<_> = self
            .fields
            .iter()
            .filter(|field| field.key().matches(selector))
            .collect();
        if selected.is_empty() {
            return Err(VerifyError::UnknownField {
                type_name: self.info.name(),
                field: selector.to_string(),
            });
        }
        Ok(selected)
    }

    fn require(&self, key: &FieldKey) -> Result<&FieldDescriptor<T>, VerifyError> {
        self.field(key).ok_or_else(|| VerifyError::UnknownField {
            type_name: self.info.name(),
            field: key.to_string(),
        })
    }

    /// Read a field of `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::UnknownField`] for an unknown key.
    pub fn get(&self, instance: &T, key: &FieldKey) -> Result<Value, VerifyError> {
        Ok(self.require(key)?.get(instance))
    }

    /// Overwrite a field of `instance`.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::UnknownField`] for an unknown key and
    /// [`VerifyError::FieldTypeMismatch`] for a value of the wrong type.
    pub fn set(&self, instance: &mut T, key: &FieldKey, value: Value) -> Result<(), VerifyError> {
        self.require(key)?.set(instance, value)
    }

    /// Snapshot every field of `instance`.
    #[must_use]
    pub fn read_all(&self, instance: &T) -> FieldValues {
        let mut values = FieldValues::new();
        for field in &self.fields {
            values.insert(field.key(), field.get(instance));
        }
        values
    }
}

impl<T> Debug for FieldAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("info", &self.info)
            .field("fields", &self.fields)
            .finish()
    }
}
