// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The interface a type exposes to be verified.

use crate::error::VerifyError;
use crate::field::FieldDescriptor;
use crate::value::FieldValues;
use std::any::Any;
use std::fmt::Debug;
use std::hash::Hash;

/// Whether a type admits subtypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[strum(serialize_all = "lowercase")]
pub enum TypeKind {
    /// No subtypes exist; the subclass checks do not apply.
    Final,
    /// Subtype instances may be compared with instances of this type.
    Extensible,
}

/// Name and kind of a verified type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    name: &'static str,
    kind: TypeKind,
}

impl TypeInfo {
    /// Create a new [`TypeInfo`].
    #[must_use]
    pub const fn new(name: &'static str, kind: TypeKind) -> TypeInfo {
        TypeInfo { name, kind }
    }

    /// The type's name as used in diagnostics and as the level of its own fields.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The type's kind.
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        self.kind
    }
}

/// A type whose `PartialEq` / `Hash` pair can be verified.
///
/// Usually derived with `#[derive(Verifiable)]`.  A manual implementation must provide
/// [`type_info`](Verifiable::type_info) and [`fields`](Verifiable::fields), and at least one way
/// to build instances: [`construct`](Verifiable::construct), [`blank`](Verifiable::blank) (which
/// enables the default [`inject`](Verifiable::inject)), or a manual instance supplier in the
/// verification config.
pub trait Verifiable: Debug + PartialEq + Hash + Any + Sized {
    /// Name and kind of the type.
    fn type_info() -> TypeInfo;

    /// The type's fields, flattened levels first, each in declaration order.
    fn fields() -> Vec<FieldDescriptor<Self>>;

    /// Build an instance through the type's regular constructor.
    ///
    /// `None` means no such constructor is available.  A constructor is free to validate or
    /// normalise its arguments; the engine checks what it actually stored.
    fn construct(_values: &FieldValues) -> Option<Result<Self, String>> {
        None
    }

    /// A minimally initialised instance, to be overwritten field by field.
    fn blank() -> Option<Self> {
        None
    }

    /// Build an instance by installing every field value directly.
    ///
    /// The default overwrites each field of [`blank`](Verifiable::blank).
    fn inject(
        values: &FieldValues,
        fields: &[FieldDescriptor<Self>],
    ) -> Option<Result<Self, VerifyError>> {
        let mut instance = Self::blank()?;
        let installed = fields.iter().try_for_each(|field| {
            let value = values.get(&field.key()).ok_or_else(|| {
                VerifyError::InvalidConfiguration(format!(
                    "no value supplied for field `{}`",
                    field.key()
                ))
            })?;
            field.set(&mut instance, value.clone())
        });
        Some(installed.map(|()| instance))
    }

    /// Equality against a value of unknown type.
    ///
    /// The default is `false` for any other type and `==` otherwise.  Override this to model a
    /// type whose equality accepts instances of other types.
    fn eq_any(&self, other: &dyn Any) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|other| self == other)
    }
}

/// A subtype instance of a verified type, as used by the subclass checks.
///
/// The subtype owns its side of the comparison: [`eq_any`](AnyEq::eq_any) is its equality
/// against an instance of the verified type.
pub trait AnyEq: Any + Debug {
    /// Equality against a value of unknown type.
    fn eq_any(&self, other: &dyn Any) -> bool;

    /// Upcast for the verified type's own [`Verifiable::eq_any`].
    fn as_any(&self) -> &dyn Any;
}

/// Build a `T` by direct field installation from values keyed at `T`'s own levels.
///
/// Used by the generated code of types which flatten a `T`.
///
/// # Errors
///
/// Fails if `T` offers no direct installation or a value is missing or mistyped.
pub fn inject_nested<T: Verifiable>(values: &FieldValues) -> Result<T, VerifyError> {
    let fields = T::fields();
    T::inject(values, &fields).unwrap_or_else(|| {
        Err(VerifyError::UnconstructibleType {
            type_name: T::type_info().name(),
            attempts: vec!["field injection: not available".to_string()],
        })
    })
}
