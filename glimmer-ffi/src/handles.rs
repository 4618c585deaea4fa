use std::ffi::c_void;

/// Opaque handle to a native object instance. Rust never dereferences it;
/// the native runtime owns the memory behind it.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NativeHandle(pub *mut c_void);

impl NativeHandle {
    pub const NULL: NativeHandle = NativeHandle(std::ptr::null_mut());

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// Address of the handle, used as the key for Rust-side side-tables.
    #[inline]
    pub fn to_addr(self) -> u64 {
        self.0 as usize as u64
    }

    #[inline]
    pub fn from_addr(addr: u64) -> Self {
        NativeHandle(addr as usize as *mut c_void)
    }
}

/// Dynamic type tag assigned by the native type system. `0` is the invalid tag.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct TypeTag(pub u64);

impl TypeTag {
    pub const INVALID: TypeTag = TypeTag(0);

    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Pointer to a non-refcounted native value struct (rectangle, text iterator, ...).
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BoxedPtr(pub *mut c_void);

impl BoxedPtr {
    pub const NULL: BoxedPtr = BoxedPtr(std::ptr::null_mut());

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

/// Identifier of a callback registered with the native signal emitter.
/// `0` means "not connected".
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct NativeHandlerId(pub u64);

impl NativeHandlerId {
    pub const NONE: NativeHandlerId = NativeHandlerId(0);

    #[inline]
    pub fn is_connected(self) -> bool {
        self.0 != 0
    }
}

// Handles are raw identifiers. They can be sent across threads but must only
// be *used* on the dispatch thread (or inside the enter/leave bracket).
unsafe impl Send for NativeHandle {}
unsafe impl Sync for NativeHandle {}
unsafe impl Send for BoxedPtr {}
unsafe impl Sync for BoxedPtr {}
