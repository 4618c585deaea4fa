// ObjectRef<T>: statically typed view of an `Object`.
//
// Same size and layout as `Object`; the type parameter only selects which
// generated Ext traits apply. Inherited methods resolve through the
// `HasParent` Deref chain.

use std::marker::PhantomData;
use std::ops::Deref;

use glimmer_ffi::NativeHandle;

use crate::class_registry::ObjectSubclass;
use crate::error::{abort_on_defect, GlimmerResult};
use crate::identity_cache;
use crate::object::Object;
use crate::ownership::Intent;
use crate::traits::{AsObject, HasParent, NativeClass, StaticType};

/// A typed wrapper handle.
///
/// `#[repr(transparent)]` over `Object` makes the blanket Deref pointer
/// cast (`&ObjectRef<T>` → `&ObjectRef<T::Parent>`) sound.
#[repr(transparent)]
pub struct ObjectRef<T: StaticType> {
    obj: Object,
    _marker: PhantomData<fn() -> T>,
}

impl<T: StaticType> ObjectRef<T> {
    /// # Safety
    /// The caller must ensure the instance's native type is `T` or derives
    /// from (or implements) `T`.
    #[inline]
    pub unsafe fn from_object_unchecked(obj: Object) -> Self {
        ObjectRef {
            obj,
            _marker: PhantomData,
        }
    }

    /// Wrap a native handle and check it is a `T`. Binding defects panic.
    pub fn wrap(handle: NativeHandle) -> GlimmerResult<Self> {
        abort_on_defect(identity_cache::wrap(handle, Intent::TakeOwnership))?.downcast::<T>()
    }

    #[inline]
    pub fn as_object(&self) -> &Object {
        &self.obj
    }

    #[inline]
    pub fn into_object(self) -> Object {
        self.obj
    }

    #[inline]
    pub fn handle(&self) -> NativeHandle {
        self.obj.handle()
    }

    /// Reinterpret as another type the instance is known to be.
    pub fn cast<U: StaticType>(&self) -> GlimmerResult<ObjectRef<U>> {
        self.obj.downcast::<U>()
    }
}

impl<T: NativeClass> ObjectRef<T> {
    /// Construct a fresh native `T` and wrap it.
    pub fn construct() -> GlimmerResult<Self> {
        let obj = Object::construct(T::static_type())?;
        Ok(unsafe { ObjectRef::from_object_unchecked(obj) })
    }
}

impl<T: ObjectSubclass + StaticType> ObjectRef<T> {
    /// The subclass state of this instance.
    pub fn imp(&self) -> Option<&T> {
        self.obj.imp::<T>()
    }
}

impl<T: HasParent> ObjectRef<T> {
    /// Infallible upcast to the parent class.
    #[inline]
    pub fn upcast(self) -> ObjectRef<T::Parent> {
        unsafe { ObjectRef::from_object_unchecked(self.obj) }
    }
}

/// Blanket Deref: `ObjectRef<Child>` auto-derefs to `ObjectRef<Parent>`.
impl<T: HasParent> Deref for ObjectRef<T> {
    type Target = ObjectRef<T::Parent>;
    #[inline]
    fn deref(&self) -> &ObjectRef<T::Parent> {
        unsafe { &*(self as *const _ as *const ObjectRef<T::Parent>) }
    }
}

impl<T: StaticType> Clone for ObjectRef<T> {
    fn clone(&self) -> Self {
        ObjectRef {
            obj: self.obj.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: StaticType> PartialEq for ObjectRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Object::ptr_eq(&self.obj, &other.obj)
    }
}

impl<T: StaticType> Eq for ObjectRef<T> {}

impl<T: StaticType> AsObject for ObjectRef<T> {
    #[inline]
    fn as_object(&self) -> &Object {
        &self.obj
    }
}

impl<T: StaticType> AsRef<Object> for ObjectRef<T> {
    fn as_ref(&self) -> &Object {
        &self.obj
    }
}

impl<T: StaticType> From<ObjectRef<T>> for Object {
    fn from(r: ObjectRef<T>) -> Object {
        r.obj
    }
}

impl<T: StaticType> std::fmt::Debug for ObjectRef<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRef")
            .field("class", &T::TYPE_NAME)
            .field("object", &self.obj)
            .finish()
    }
}
