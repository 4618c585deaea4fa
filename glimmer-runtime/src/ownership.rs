// Ownership bridge: decides how a wrapper holds its native reference.

use glimmer_ffi::NativeHandle;

use crate::error::{GlimmerError, GlimmerResult};
use crate::ffi_dispatch;

/// What the caller wants the new wrapper to do with the native reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    /// The wrapper keeps the instance alive with a reference of its own.
    TakeOwnership,
    /// The wrapper observes the instance; someone else keeps it alive.
    Borrow,
}

/// Outcome of [`resolve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnershipDecision {
    /// The floating reference was claimed; the count did not change.
    AdoptFloating,
    /// A new reference was added.
    TakeNew,
    /// No reference was taken.
    Borrow,
}

impl OwnershipDecision {
    /// Value of the wrapper's immutable `owns_reference` flag.
    #[inline]
    pub fn owns_reference(self) -> bool {
        !matches!(self, OwnershipDecision::Borrow)
    }
}

/// Decide, and apply, the reference operation for wrapping `handle`.
///
/// A floating reference is always adopted, whatever the intent: leaving it
/// floating would leak it.
pub fn resolve(handle: NativeHandle, intent: Intent) -> GlimmerResult<OwnershipDecision> {
    if handle.is_null() || !ffi_dispatch::object_is_alive(handle) {
        return Err(GlimmerError::InvalidHandle);
    }
    if ffi_dispatch::object_is_floating(handle) {
        ffi_dispatch::object_ref_sink(handle);
        return Ok(OwnershipDecision::AdoptFloating);
    }
    match intent {
        Intent::TakeOwnership => {
            ffi_dispatch::object_ref(handle);
            Ok(OwnershipDecision::TakeNew)
        }
        Intent::Borrow => Ok(OwnershipDecision::Borrow),
    }
}

/// Release the reference described by `decision`, if any.
pub(crate) fn release(handle: NativeHandle, decision_owned: bool) {
    if decision_owned {
        ffi_dispatch::object_unref(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake;
    use glimmer_ffi::abi::type_names;

    #[test]
    fn null_handle_is_rejected() {
        fake::install();
        assert_eq!(
            resolve(NativeHandle::NULL, Intent::TakeOwnership),
            Err(GlimmerError::InvalidHandle)
        );
    }

    #[test]
    fn floating_reference_is_adopted_without_increment() {
        fake::install();
        let h = fake::new_instance(type_names::WIDGET);
        assert!(fake::is_floating(h));
        assert_eq!(fake::ref_count(h), 1);

        let decision = resolve(h, Intent::Borrow).unwrap();
        assert_eq!(decision, OwnershipDecision::AdoptFloating);
        assert!(decision.owns_reference());
        assert!(!fake::is_floating(h));
        assert_eq!(fake::ref_count(h), 1);

        release(h, true);
        assert!(!fake::is_alive(h));
    }

    #[test]
    fn take_ownership_increments() {
        fake::install();
        let h = fake::new_instance(type_names::OBJECT);
        assert!(!fake::is_floating(h));
        let decision = resolve(h, Intent::TakeOwnership).unwrap();
        assert_eq!(decision, OwnershipDecision::TakeNew);
        assert_eq!(fake::ref_count(h), 2);
        release(h, decision.owns_reference());
        fake::unref(h);
        assert!(!fake::is_alive(h));
    }

    #[test]
    fn borrow_leaves_count_untouched() {
        fake::install();
        let h = fake::new_instance(type_names::OBJECT);
        let decision = resolve(h, Intent::Borrow).unwrap();
        assert_eq!(decision, OwnershipDecision::Borrow);
        assert!(!decision.owns_reference());
        assert_eq!(fake::ref_count(h), 1);
        fake::unref(h);
    }

    #[test]
    fn finalized_handle_is_invalid() {
        fake::install();
        let h = fake::new_instance(type_names::OBJECT);
        fake::unref(h);
        assert_eq!(resolve(h, Intent::Borrow), Err(GlimmerError::InvalidHandle));
    }
}
