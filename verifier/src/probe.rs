// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Guarded calls into code of the type under test.

use std::any::Any;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// The message of a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run `f`, turning a panic into `Err` with the panic message.
///
/// Every closure passed here only reads its captures or builds fresh values, so observing state
/// after an unwind cannot happen.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

/// Hash `value` with a fresh [`DefaultHasher`], catching panics.
pub(crate) fn hash_of<T: Hash + ?Sized>(value: &T) -> Result<u64, String> {
    guarded(|| {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod test {
    use super::*;

    #[test]
    fn panics_become_messages() {
        assert_eq!(guarded(|| 3).unwrap(), 3);
        assert_eq!(guarded(|| -> u8 { panic!("static") }).unwrap_err(), "static");
        let code = 7;
        assert_eq!(
            guarded(|| -> u8 { panic!("formatted {code}") }).unwrap_err(),
            "formatted 7"
        );
    }

    #[test]
    fn hashing_is_deterministic() {
        assert_eq!(hash_of(&"abc").unwrap(), hash_of(&"abc").unwrap());
        assert_ne!(hash_of(&1_u8).unwrap(), hash_of(&2_u8).unwrap());
    }
}
