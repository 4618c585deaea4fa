// Marker traits for native types. Generated wrappers implement them for
// every exported class, interface and boxed struct.

use glimmer_ffi::TypeTag;

use crate::object::Object;

/// Anything with a native dynamic type.
///
/// The tag is typically cached in a `OnceLock` on first access (see
/// [`static_type_by_name`](crate::type_registry::static_type_by_name)).
pub trait StaticType: 'static {
    /// Native type name.
    const TYPE_NAME: &'static str;

    /// Native type tag (cached after first call). `TypeTag::INVALID` if the
    /// native runtime does not know the type.
    fn static_type() -> TypeTag;
}

/// Implemented for every instantiable native class.
pub trait NativeClass: StaticType {}

/// Implemented for every native interface (capability). Query with
/// [`Object::implements`](crate::Object::implements).
pub trait NativeInterface: StaticType {}

/// Declares the immediate native parent class.
///
/// Enables the blanket `Deref` impl on `ObjectRef<T>` so inherited methods
/// resolve through the Deref chain instead of being flattened into each
/// child's Ext trait. Root classes do NOT implement this trait.
pub trait HasParent: NativeClass {
    type Parent: NativeClass;
}

/// Implemented for every copyable, non-refcounted native value struct.
pub trait BoxedType: 'static {
    const TYPE_NAME: &'static str;

    /// `#[repr(C)]` layout shared with the native headers.
    type Native: Copy;

    fn static_type() -> TypeTag;
}

/// Anything that resolves to a wrapper. Generated Ext traits use it as their
/// supertrait so their default methods work on every typed view.
pub trait AsObject {
    fn as_object(&self) -> &Object;
}

impl AsObject for Object {
    #[inline]
    fn as_object(&self) -> &Object {
        self
    }
}
