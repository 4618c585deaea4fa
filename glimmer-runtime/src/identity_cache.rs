// Identity cache: at most one live wrapper per native instance.
//
// Two side-tables keyed by handle address:
// 1. wrappers: address -> Weak<ObjectInner>. The native instance carries a
//    keyed attachment (WRAPPER_QUARK) whose finalize notifier removes the
//    entry and marks the wrapper finalized. Dropping a wrapper removes its
//    own entry and steals the attachment.
// 2. instance data: address -> subclass state. Attached under IMP_QUARK and
//    dropped when the native instance is finalized, so a wrapper rebuilt
//    after the previous one was dropped sees the same state.
//
// No map guard is held while wrappers are built or dropped; both can run
// user code or re-enter the cache.

use std::sync::{Arc, OnceLock, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use glimmer_ffi::NativeHandle;

use crate::error::{GlimmerError, GlimmerResult};
use crate::ffi_dispatch;
use crate::ffi_guard::ffi_boundary;
use crate::object::{InstanceData, Object, ObjectInner};
use crate::ownership::{self, Intent};
use crate::type_registry::{type_registry, WrapperType};

/// Attachment key for the wrapper association ("glmrWrap").
pub const WRAPPER_QUARK: u64 = 0x676c_6d72_5772_6170;
/// Attachment key for subclass instance data ("glmrImpl").
pub const IMP_QUARK: u64 = 0x676c_6d72_496d_706c;

pub struct IdentityCache {
    wrappers: DashMap<u64, Weak<ObjectInner>>,
    instance_data: DashMap<u64, Arc<InstanceData>>,
}

impl IdentityCache {
    fn new() -> Self {
        Self {
            wrappers: DashMap::new(),
            instance_data: DashMap::new(),
        }
    }

    /// Number of attached wrappers (live or not yet swept).
    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    /// Drop every association. Wrappers that are still held stay usable
    /// but are no longer found by `lookup`.
    pub fn clear(&self) {
        self.wrappers.clear();
        self.instance_data.clear();
    }
}

/// The process-wide cache.
pub fn identity_cache() -> &'static IdentityCache {
    static CACHE: OnceLock<IdentityCache> = OnceLock::new();
    CACHE.get_or_init(IdentityCache::new)
}

// ---------------------------------------------------------------------------
// Lookup / wrap
// ---------------------------------------------------------------------------

/// The wrapper attached to `handle`, without creating one.
pub fn lookup(handle: NativeHandle) -> Option<Object> {
    if handle.is_null() {
        return None;
    }
    identity_cache()
        .wrappers
        .get(&handle.to_addr())
        .and_then(|weak| weak.upgrade())
        .map(Object::from_inner)
}

/// Return the wrapper for `handle`, creating it on first use.
pub fn wrap(handle: NativeHandle, intent: Intent) -> GlimmerResult<Object> {
    if handle.is_null() {
        return Err(GlimmerError::InvalidHandle);
    }
    if let Some(existing) = lookup(handle) {
        return Ok(existing);
    }
    let obj = build(handle, intent)?;
    attach(obj, false)
}

/// Wrap a handle known to be freshly constructed. Fails with `DoubleWrap`
/// if a different live wrapper is already attached.
pub fn wrap_new(handle: NativeHandle, intent: Intent) -> GlimmerResult<Object> {
    if handle.is_null() {
        return Err(GlimmerError::InvalidHandle);
    }
    let obj = build(handle, intent)?;
    attach(obj, true)
}

fn build(handle: NativeHandle, intent: Intent) -> GlimmerResult<Object> {
    if !ffi_dispatch::object_is_alive(handle) {
        return Err(GlimmerError::InvalidHandle);
    }
    let tag = ffi_dispatch::object_type_of(handle);
    let wrapper_type = type_registry().most_derived(tag)?;
    let imp = instance_data_for(handle, &wrapper_type);
    let decision = ownership::resolve(handle, intent)?;
    Ok(Object::new(handle, decision.owns_reference(), wrapper_type, imp))
}

/// Attach `obj` to its handle. If another live wrapper won the race, return
/// that one (or `DoubleWrap` in strict mode) and drop ours, which releases
/// whatever reference it took.
fn attach(obj: Object, strict: bool) -> GlimmerResult<Object> {
    let handle = obj.handle();
    let key = handle.to_addr();
    let existing = match identity_cache().wrappers.entry(key) {
        Entry::Occupied(mut e) => match e.get().upgrade() {
            Some(inner) => Some(inner),
            None => {
                e.insert(Arc::downgrade(&obj.inner));
                None
            }
        },
        Entry::Vacant(v) => {
            v.insert(Arc::downgrade(&obj.inner));
            None
        }
    };

    if let Some(inner) = existing {
        // Guard released; dropping our wrapper may re-enter the cache.
        drop(obj);
        if strict {
            drop(inner);
            log::error!("[glimmer] handle {key:#x} already has a wrapper attached");
            return Err(GlimmerError::DoubleWrap { addr: key });
        }
        return Ok(Object::from_inner(inner));
    }

    ffi_dispatch::qdata_set(handle, WRAPPER_QUARK, key, Some(wrapper_finalize_notify));
    Ok(obj)
}

// ---------------------------------------------------------------------------
// Finalization / detach
// ---------------------------------------------------------------------------

/// Native finalize hook: remove the association and mark the wrapper
/// finalized. The wrapper itself is never destroyed here; its lifetime
/// belongs to the host.
pub fn on_finalize(handle: NativeHandle) {
    let removed = identity_cache().wrappers.remove(&handle.to_addr());
    if let Some((_, weak)) = removed {
        if let Some(inner) = weak.upgrade() {
            inner.mark_finalized();
            log::debug!(
                "[glimmer] instance {:#x} finalized while its wrapper is still held",
                handle.to_addr()
            );
        }
    }
}

/// Called from the wrapper's destructor. Removes the entry only if it still
/// points at `ptr`, and detaches the native attachment so finalization does
/// not call back for a wrapper that is gone.
pub(crate) fn detach(handle: NativeHandle, ptr: *const ObjectInner, alive: bool) {
    let removed = identity_cache()
        .wrappers
        .remove_if(&handle.to_addr(), |_, weak| std::ptr::eq(weak.as_ptr(), ptr));
    if removed.is_some() && alive {
        ffi_dispatch::qdata_steal(handle, WRAPPER_QUARK);
    }
}

unsafe extern "C" fn wrapper_finalize_notify(handle: NativeHandle, _data: u64) {
    ffi_boundary((), || on_finalize(handle));
}

// ---------------------------------------------------------------------------
// Instance data
// ---------------------------------------------------------------------------

fn instance_data_for(handle: NativeHandle, wrapper_type: &WrapperType) -> Option<Arc<InstanceData>> {
    if wrapper_type.imp_chain.is_empty() {
        return None;
    }
    let key = handle.to_addr();
    if let Some(existing) = identity_cache().instance_data.get(&key) {
        return Some(existing.clone());
    }
    // Subclass constructors are user code; run them outside any guard.
    let parts = wrapper_type.imp_chain.iter().map(|ctor| ctor()).collect();
    let fresh = Arc::new(InstanceData::new(parts));
    let data = identity_cache()
        .instance_data
        .entry(key)
        .or_insert_with(|| fresh.clone())
        .clone();
    if Arc::ptr_eq(&data, &fresh) {
        ffi_dispatch::qdata_set(handle, IMP_QUARK, key, Some(instance_data_finalize_notify));
    }
    Some(data)
}

unsafe extern "C" fn instance_data_finalize_notify(handle: NativeHandle, _data: u64) {
    ffi_boundary((), || {
        let removed = identity_cache().instance_data.remove(&handle.to_addr());
        drop(removed);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake;
    use glimmer_ffi::abi::type_names;

    fn setup() {
        fake::install();
        type_registry().register_by_name(type_names::OBJECT).unwrap();
        type_registry().register_by_name(type_names::WIDGET).unwrap();
    }

    #[test]
    fn wrap_twice_returns_identical_wrapper() {
        setup();
        let h = fake::new_instance(type_names::OBJECT);
        let a = wrap(h, Intent::TakeOwnership).unwrap();
        let b = wrap(h, Intent::TakeOwnership).unwrap();
        assert!(Object::ptr_eq(&a, &b));
        // Only the first wrap took a reference.
        assert_eq!(fake::ref_count(h), 2);
        drop(a);
        drop(b);
        assert_eq!(fake::ref_count(h), 1);
        fake::unref(h);
    }

    #[test]
    fn wrap_null_is_invalid_handle() {
        setup();
        assert_eq!(
            wrap(NativeHandle::NULL, Intent::Borrow).unwrap_err(),
            GlimmerError::InvalidHandle
        );
    }

    #[test]
    fn lookup_never_creates() {
        setup();
        let h = fake::new_instance(type_names::OBJECT);
        assert!(lookup(h).is_none());
        assert_eq!(fake::ref_count(h), 1);
        fake::unref(h);
    }

    #[test]
    fn floating_wrapper_releases_to_zero() {
        setup();
        let h = fake::new_instance(type_names::WIDGET);
        assert!(fake::is_floating(h));
        let w = wrap(h, Intent::TakeOwnership).unwrap();
        assert!(w.owns_reference());
        assert_eq!(fake::ref_count(h), 1);
        drop(w);
        assert_eq!(fake::ref_count(h), 0);
        assert!(!fake::is_alive(h));
    }

    #[test]
    fn finalize_detaches_but_keeps_wrapper() {
        setup();
        let h = fake::new_instance(type_names::OBJECT);
        let w = wrap(h, Intent::Borrow).unwrap();
        assert!(!w.owns_reference());
        fake::unref(h);
        assert!(!w.is_alive());
        assert_eq!(w.checked_handle(), Err(GlimmerError::ObjectFinalized));
        assert!(lookup(h).is_none());
        // Dropping the wrapper afterwards must not touch the dead handle.
        drop(w);
        assert_eq!(fake::dead_calls(h), 0);
    }

    #[test]
    fn wrap_new_rejects_double_wrap() {
        setup();
        let h = fake::new_instance(type_names::OBJECT);
        let _w = wrap(h, Intent::Borrow).unwrap();
        assert!(matches!(
            wrap_new(h, Intent::Borrow),
            Err(GlimmerError::DoubleWrap { .. })
        ));
        fake::unref(h);
    }

    #[test]
    fn dropped_wrapper_is_rebuilt_on_demand() {
        setup();
        let h = fake::new_instance(type_names::OBJECT);
        let first = wrap(h, Intent::Borrow).unwrap();
        drop(first);
        assert!(lookup(h).is_none());
        let second = wrap(h, Intent::Borrow).unwrap();
        assert!(second.is_alive());
        assert!(Object::ptr_eq(&second, &lookup(h).unwrap()));
        drop(second);
        fake::unref(h);
    }
}
