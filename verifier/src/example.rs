// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Example values ("red" and "blue") and their derivation for common types.

use crate::decimal::Decimal;
use crate::error::VerifyError;
use crate::factory::ValueFactory;
use crate::value::Value;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// Representative values of a type.
#[derive(Clone, Debug, PartialEq)]
pub struct ExampleValues<T> {
    /// The primary example.
    pub red: T,
    /// A second example, not equal to `red`.  `None` for single-valued types.
    pub blue: Option<T>,
    /// An alternative representation of `red`: structurally different but expected to be
    /// equivalent under an ordering comparison (e.g. `0.00` for `0`).
    pub red_equivalent: Option<T>,
}

impl<T> ExampleValues<T> {
    /// Two distinct examples.
    #[must_use]
    pub fn pair(red: T, blue: T) -> ExampleValues<T> {
        ExampleValues {
            red,
            blue: Some(blue),
            red_equivalent: None,
        }
    }

    /// The only value of a single-valued type.
    #[must_use]
    pub fn single(red: T) -> ExampleValues<T> {
        ExampleValues {
            red,
            blue: None,
            red_equivalent: None,
        }
    }

    /// Attach an alternative representation of `red`.
    #[must_use]
    pub fn with_equivalent(mut self, equivalent: T) -> ExampleValues<T> {
        self.red_equivalent = Some(equivalent);
        self
    }

    /// Returns true if no second example exists.
    #[must_use]
    pub fn is_single_valued(&self) -> bool {
        self.blue.is_none()
    }

    /// Transform every example.
    #[must_use]
    pub fn map<U>(self, f: impl Fn(T) -> U) -> ExampleValues<U> {
        ExampleValues {
            red: f(self.red),
            blue: self.blue.map(&f),
            red_equivalent: self.red_equivalent.map(&f),
        }
    }
}

impl<T: Any + Debug + Clone + PartialEq> ExampleValues<T> {
    /// Type-erase the examples.
    #[must_use]
    pub fn erase(self) -> ExampleValues<Value> {
        self.map(Value::new)
    }
}

impl ExampleValues<Value> {
    /// Recover typed examples, if every example is a `T`.
    #[must_use]
    pub fn downcast<T: Any + Debug + Clone + PartialEq>(self) -> Option<ExampleValues<T>> {
        Some(ExampleValues {
            red: self.red.downcast::<T>().ok()?,
            blue: match self.blue {
                Some(blue) => Some(blue.downcast::<T>().ok()?),
                None => None,
            },
            red_equivalent: match self.red_equivalent {
                Some(equivalent) => Some(equivalent.downcast::<T>().ok()?),
                None => None,
            },
        })
    }
}

/// Types for which the [`ValueFactory`] can derive example values.
///
/// Implementations for records are generated with `#[derive(Example)]`.  Nested types must be
/// resolved through the factory (`factory.values_for::<U>()`) so that prefab values, caching and
/// the recursion guard apply.
pub trait Example: Any + Debug + Clone + PartialEq {
    /// Derive example values for `Self`.
    ///
    /// # Errors
    ///
    /// Fails if a nested type cannot be resolved.
    fn examples(factory: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError>;
}

macro_rules! integer_examples {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Example for $ty {
                fn examples(_: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
                    Ok(ExampleValues::pair(1, 2))
                }
            }
        )*
    };
}

integer_examples!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize
);

macro_rules! float_examples {
    ($($ty:ty),*) => {
        $(
            impl Example for $ty {
                fn examples(_: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
                    Ok(ExampleValues::pair(0.0, 1.0).with_equivalent(-0.0))
                }
            }
        )*
    };
}

float_examples!(f32, f64);

impl Example for bool {
    fn examples(_: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        Ok(ExampleValues::pair(false, true))
    }
}

impl Example for char {
    fn examples(_: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        Ok(ExampleValues::pair('a', 'b'))
    }
}

impl Example for String {
    fn examples(_: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        Ok(ExampleValues::pair("one".to_string(), "two".to_string()))
    }
}

impl Example for &'static str {
    fn examples(_: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        Ok(ExampleValues::pair("one", "two"))
    }
}

impl Example for Duration {
    fn examples(_: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        Ok(ExampleValues::pair(
            Duration::from_secs(1),
            Duration::from_secs(2),
        ))
    }
}

impl Example for Decimal {
    fn examples(_: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        Ok(ExampleValues::pair(Decimal::from_int(0), Decimal::from_int(1))
            .with_equivalent(Decimal::new(0, 2)))
    }
}

impl Example for () {
    fn examples(_: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        Ok(ExampleValues::single(()))
    }
}

impl<T: ?Sized + 'static> Example for PhantomData<T> {
    fn examples(_: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        Ok(ExampleValues::single(PhantomData))
    }
}

impl<T: Example> Example for Option<T> {
    fn examples(factory: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        let inner = factory.values_for::<T>()?;
        Ok(ExampleValues {
            red: Some(inner.red),
            // a single-valued inner type still leaves `None` as a distinct value
            blue: Some(inner.blue),
            red_equivalent: inner.red_equivalent.map(Some),
        })
    }
}

/// Wrapper types which hold exactly one `T`.
macro_rules! wrapper_examples {
    ($($wrapper:ident),*) => {
        $(
            impl<T: Example> Example for $wrapper<T> {
                fn examples(factory: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
                    Ok(factory.values_for::<T>()?.map($wrapper::new))
                }
            }
        )*
    };
}

wrapper_examples!(Box, Rc, Arc);

/// Sequence and set types, populated with a single element.  A single-valued element type still
/// leaves the empty collection as a distinct value.
macro_rules! collection_examples {
    ($(($collection:ident $(, $bound:path)*)),* $(,)?) => {
        $(
            impl<T: Example $(+ $bound)*> Example for $collection<T> {
                fn examples(factory: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
                    let inner = factory.values_for::<T>()?;
                    Ok(ExampleValues {
                        red: std::iter::once(inner.red).collect(),
                        blue: Some(inner.blue.into_iter().collect()),
                        red_equivalent: inner
                            .red_equivalent
                            .map(|equivalent| std::iter::once(equivalent).collect()),
                    })
                }
            }
        )*
    };
}

collection_examples!(
    (Vec),
    (VecDeque),
    (BTreeSet, Ord),
    (HashSet, Eq, Hash),
);

impl<K: Example + Ord, V: Example> Example for BTreeMap<K, V> {
    fn examples(factory: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        let keys = factory.values_for::<K>()?;
        let values = factory.values_for::<V>()?;
        Ok(ExampleValues {
            red: BTreeMap::from([(keys.red, values.red.clone())]),
            blue: Some(keys.blue.map(|key| (key, values.red)).into_iter().collect()),
            red_equivalent: None,
        })
    }
}

impl<K: Example + Eq + Hash, V: Example> Example for HashMap<K, V> {
    fn examples(factory: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        let keys = factory.values_for::<K>()?;
        let values = factory.values_for::<V>()?;
        Ok(ExampleValues {
            red: HashMap::from([(keys.red, values.red.clone())]),
            blue: Some(keys.blue.map(|key| (key, values.red)).into_iter().collect()),
            red_equivalent: None,
        })
    }
}

impl<T: Example, const N: usize> Example for [T; N] {
    fn examples(factory: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
        let inner = factory.values_for::<T>()?;
        let filled = |value: T| -> [T; N] { std::array::from_fn(|_| value.clone()) };
        if N == 0 {
            return Ok(ExampleValues::single(filled(inner.red)));
        }
        Ok(inner.map(filled))
    }
}

/// Tuples vary every component at once; a component without a second (or equivalent) value keeps
/// its red value.
macro_rules! tuple_examples {
    ($(($($name:ident),+)),* $(,)?) => {
        $(
            #[allow(non_snake_case)]
            impl<$($name: Example),+> Example for ($($name,)+) {
                fn examples(factory: &mut ValueFactory) -> Result<ExampleValues<Self>, VerifyError> {
                    $(let $name = factory.values_for::<$name>()?;)+
                    let blue = if false $(|| $name.blue.is_some())+ {
                        Some(($($name.blue.clone().unwrap_or_else(|| $name.red.clone()),)+))
                    } else {
                        None
                    };
                    let red_equivalent = if false $(|| $name.red_equivalent.is_some())+ {
                        Some(($($name.red_equivalent.clone().unwrap_or_else(|| $name.red.clone()),)+))
                    } else {
                        None
                    };
                    Ok(ExampleValues {
                        red: ($($name.red,)+),
                        blue,
                        red_equivalent,
                    })
                }
            }
        )*
    };
}

tuple_examples!((A), (A, B), (A, B, C), (A, B, C, D));
