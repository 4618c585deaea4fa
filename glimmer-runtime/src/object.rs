// Object: the wrapper for one native instance.
//
// An `Object` is a cheap, clonable handle (`Arc`) to the wrapper state. The
// identity cache holds only weak references, so the host decides how long a
// wrapper lives. The native instance may be finalized first; the wrapper then
// reports `ObjectFinalized` and never touches the handle again.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use glimmer_ffi::{NativeHandle, NativeStatus, TypeTag, ValueKind};
use parking_lot::Mutex;

use crate::error::{check_native, GlimmerError, GlimmerResult};
use crate::ffi_dispatch;
use crate::identity_cache;
use crate::object_ref::ObjectRef;
use crate::ownership::{self, Intent};
use crate::signal::{self, SignalTable};
use crate::traits::{NativeInterface, StaticType};
use crate::type_registry::WrapperType;
use crate::value::Value;

/// Per-instance state of Rust subclasses, one entry per subclass level.
/// Lives as long as the native instance (dropped at finalize).
#[derive(Default)]
pub struct InstanceData {
    parts: Vec<Arc<dyn Any + Send + Sync>>,
}

impl InstanceData {
    pub(crate) fn new(parts: Vec<Arc<dyn Any + Send + Sync>>) -> Self {
        Self { parts }
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.parts.iter().find_map(|p| p.as_ref().downcast_ref::<T>())
    }
}

pub(crate) struct ObjectInner {
    handle: NativeHandle,
    owns_reference: bool,
    wrapper_type: Arc<WrapperType>,
    /// Cleared by the finalize notifier.
    alive: AtomicBool,
    imp: Option<Arc<InstanceData>>,
    pub(crate) signals: Mutex<SignalTable>,
}

impl ObjectInner {
    pub(crate) fn mark_finalized(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        let alive = self.alive.load(Ordering::Acquire);
        identity_cache::detach(self.handle, self as *const ObjectInner, alive);
        signal::release_table(self.signals.get_mut(), self.handle, alive);
        if alive {
            ownership::release(self.handle, self.owns_reference);
        }
    }
}

/// Wrapper around a native instance.
///
/// At most one live `Object` exists per native instance; clones share it.
#[derive(Clone)]
pub struct Object {
    pub(crate) inner: Arc<ObjectInner>,
}

impl Object {
    pub(crate) fn new(
        handle: NativeHandle,
        owns_reference: bool,
        wrapper_type: Arc<WrapperType>,
        imp: Option<Arc<InstanceData>>,
    ) -> Self {
        Object {
            inner: Arc::new(ObjectInner {
                handle,
                owns_reference,
                wrapper_type,
                alive: AtomicBool::new(true),
                imp,
                signals: Mutex::new(SignalTable::default()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ObjectInner>) -> Self {
        Object { inner }
    }

    /// Wrap a native handle, taking a reference of our own.
    pub fn wrap(handle: NativeHandle) -> GlimmerResult<Object> {
        identity_cache::wrap(handle, Intent::TakeOwnership)
    }

    /// Wrap a native handle without taking a reference.
    pub fn wrap_borrowed(handle: NativeHandle) -> GlimmerResult<Object> {
        identity_cache::wrap(handle, Intent::Borrow)
    }

    /// Construct a new native instance of `tag` and wrap it eagerly.
    ///
    /// The wrapper ends up holding the only reference: a floating reference
    /// is adopted, otherwise the construction reference is handed over.
    pub fn construct(tag: TypeTag) -> GlimmerResult<Object> {
        if !tag.is_valid() {
            return Err(GlimmerError::Native(NativeStatus::UnknownType));
        }
        let handle = ffi_dispatch::object_new_instance(tag);
        if handle.is_null() {
            return Err(GlimmerError::Native(NativeStatus::UnknownType));
        }
        let floating = ffi_dispatch::object_is_floating(handle);
        let obj = match identity_cache::wrap_new(handle, Intent::TakeOwnership) {
            Ok(obj) => obj,
            Err(err) => {
                if !floating {
                    ffi_dispatch::object_unref(handle);
                } else if ffi_dispatch::object_is_alive(handle) && ffi_dispatch::object_is_floating(handle) {
                    // Failed before the floating reference was claimed.
                    ffi_dispatch::object_ref_sink(handle);
                    ffi_dispatch::object_unref(handle);
                }
                return Err(err);
            }
        };
        if !floating {
            ffi_dispatch::object_unref(handle);
        }
        Ok(obj)
    }

    /// The raw native handle, without validity check.
    #[inline]
    pub fn handle(&self) -> NativeHandle {
        self.inner.handle
    }

    /// The handle if the native instance is still alive.
    #[inline]
    pub fn checked_handle(&self) -> GlimmerResult<NativeHandle> {
        if self.is_alive() {
            Ok(self.inner.handle)
        } else {
            Err(GlimmerError::ObjectFinalized)
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Fixed at construction.
    #[inline]
    pub fn owns_reference(&self) -> bool {
        self.inner.owns_reference
    }

    /// The registered wrapper type this wrapper was built for.
    pub fn wrapper_type(&self) -> &WrapperType {
        &self.inner.wrapper_type
    }

    pub fn type_name(&self) -> &str {
        &self.inner.wrapper_type.name
    }

    /// Dynamic type of the native instance (may be more derived than the
    /// wrapper type).
    pub fn native_type(&self) -> GlimmerResult<TypeTag> {
        let h = self.checked_handle()?;
        Ok(ffi_dispatch::object_type_of(h))
    }

    /// Reference-count probe. `0` once finalized.
    pub fn ref_count(&self) -> u32 {
        if self.is_alive() {
            ffi_dispatch::object_ref_count(self.inner.handle)
        } else {
            0
        }
    }

    /// Reference equality of two wrappers.
    #[inline]
    pub fn ptr_eq(a: &Object, b: &Object) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Whether the instance is a `T` (or a subclass of `T`). `false` once
    /// finalized.
    pub fn is_a<T: StaticType>(&self) -> bool {
        match self.native_type() {
            Ok(tag) => ffi_dispatch::type_is_a(tag, T::static_type()),
            Err(_) => false,
        }
    }

    /// Capability query.
    pub fn implements<I: NativeInterface>(&self) -> bool {
        match self.native_type() {
            Ok(tag) => ffi_dispatch::type_implements(tag, I::static_type()),
            Err(_) => false,
        }
    }

    /// Typed view, checked against the native type.
    pub fn downcast<T: StaticType>(&self) -> GlimmerResult<ObjectRef<T>> {
        if self.is_a::<T>() {
            Ok(unsafe { ObjectRef::from_object_unchecked(self.clone()) })
        } else {
            Err(GlimmerError::InvalidCast {
                expected: T::TYPE_NAME.to_string(),
                actual: self.type_name().to_string(),
            })
        }
    }

    /// View through one of the instance's capabilities.
    pub fn interface<I: NativeInterface>(&self) -> Option<ObjectRef<I>> {
        if self.implements::<I>() {
            Some(unsafe { ObjectRef::from_object_unchecked(self.clone()) })
        } else {
            None
        }
    }

    /// Subclass state for subclass level `T`, if the instance has one.
    pub fn imp<T: Any>(&self) -> Option<&T> {
        self.inner.imp.as_ref()?.get::<T>()
    }

    pub fn downgrade(&self) -> WeakObject {
        WeakObject {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Call behavior `slot` through the native vtable, exactly as native code
    /// would. Overrides installed by Rust subclasses are honored.
    pub fn invoke_vfunc(&self, slot: u32, args: &[Value]) -> GlimmerResult<Value> {
        let h = self.checked_handle()?;
        let native: Vec<_> = args.iter().map(Value::to_native).collect();
        let (status, ret) = ffi_dispatch::object_invoke_slot(h, slot, &native);
        check_native(status)?;
        Ok(Value::from_native_result(&ret, ValueKind::None))
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Object::ptr_eq(self, other)
    }
}

impl Eq for Object {}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("handle", &self.inner.handle)
            .field("type", &self.inner.wrapper_type.name)
            .field("owns_reference", &self.inner.owns_reference)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Weak reference to a wrapper. Does not keep the wrapper (or the native
/// instance) alive.
#[derive(Clone, Default)]
pub struct WeakObject {
    inner: Weak<ObjectInner>,
}

impl WeakObject {
    /// The wrapper, if some `Object` still holds it.
    pub fn upgrade(&self) -> Option<Object> {
        self.inner.upgrade().map(Object::from_inner)
    }
}

impl std::fmt::Debug for WeakObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakObject")
            .field("live", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake;

    #[test]
    fn failed_construct_releases_floating_reference() {
        fake::install();
        let err = Object::construct(fake::type_tag(fake::ORPHAN)).unwrap_err();
        assert!(matches!(err, GlimmerError::UnregisteredType { .. }));
        assert_eq!(fake::live_instance_count(fake::ORPHAN), 0);
    }
}
