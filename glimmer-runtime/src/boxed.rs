// Boxed values: non-refcounted native structs (rectangles, text iterators).
//
// A `Boxed<T>` either views memory someone else owns (VIEW) or holds a deep
// copy made by the native boxed copy function, freed on drop (OWNED).

use std::ffi::c_void;
use std::ptr::NonNull;

use glimmer_ffi::{BoxedPtr, NativeStatus};

use crate::error::{GlimmerError, GlimmerResult};
use crate::ffi_dispatch;
use crate::traits::BoxedType;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxedMode {
    /// Caller-owned memory; writes go to the original.
    View,
    /// Private copy, freed through the native free function.
    Owned,
}

pub struct Boxed<T: BoxedType> {
    ptr: NonNull<T::Native>,
    mode: BoxedMode,
}

impl<T: BoxedType> Boxed<T> {
    /// Wrap existing native memory without copying.
    ///
    /// # Safety
    /// `ptr` must point to a valid `T::Native` that outlives the view and is
    /// not accessed through other paths while the view is mutated.
    pub unsafe fn from_view(ptr: *mut T::Native) -> GlimmerResult<Self> {
        let ptr = NonNull::new(ptr).ok_or(GlimmerError::InvalidHandle)?;
        Ok(Boxed {
            ptr,
            mode: BoxedMode::View,
        })
    }

    /// Deep-copy native memory into a new OWNED value.
    ///
    /// # Safety
    /// `src` must point to a valid `T::Native` for the duration of the call.
    pub unsafe fn from_owned_copy(src: *const T::Native) -> GlimmerResult<Self> {
        if src.is_null() {
            return Err(GlimmerError::InvalidHandle);
        }
        let tag = T::static_type();
        if !tag.is_valid() {
            return Err(GlimmerError::Native(NativeStatus::UnknownType));
        }
        let copied = ffi_dispatch::boxed_copy(tag, BoxedPtr(src as *mut c_void));
        let ptr = NonNull::new(copied.0 as *mut T::Native)
            .ok_or(GlimmerError::Native(NativeStatus::InternalError))?;
        Ok(Boxed {
            ptr,
            mode: BoxedMode::Owned,
        })
    }

    /// OWNED value initialized from `value`.
    pub fn new(value: T::Native) -> GlimmerResult<Self> {
        // SAFETY: `value` lives on our stack for the duration of the copy.
        unsafe { Self::from_owned_copy(&value) }
    }

    /// View the memory a pointer-valued argument refers to.
    ///
    /// # Safety
    /// As [`from_view`](Self::from_view); the pointer must refer to a `T`.
    pub unsafe fn view_value(value: &Value) -> GlimmerResult<Self> {
        match value.as_pointer() {
            Some(p) => unsafe { Self::from_view(p as *mut T::Native) },
            None => Err(GlimmerError::TypeMismatch { expected: "pointer" }),
        }
    }

    /// Independent OWNED copy, whatever the mode of `self`.
    pub fn copy(&self) -> GlimmerResult<Self> {
        // SAFETY: `self.ptr` is valid for as long as `self` exists.
        unsafe { Self::from_owned_copy(self.ptr.as_ptr()) }
    }

    #[inline]
    pub fn mode(&self) -> BoxedMode {
        self.mode
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        self.mode == BoxedMode::Owned
    }

    /// Current contents.
    #[inline]
    pub fn get(&self) -> T::Native {
        unsafe { *self.ptr.as_ptr() }
    }

    /// Mutable access. For a VIEW this mutates the original memory.
    #[inline]
    pub fn get_mut(&mut self) -> &mut T::Native {
        unsafe { self.ptr.as_mut() }
    }

    #[inline]
    pub fn set(&mut self, value: T::Native) {
        unsafe { *self.ptr.as_ptr() = value };
    }

    #[inline]
    pub fn as_ptr(&self) -> BoxedPtr {
        BoxedPtr(self.ptr.as_ptr() as *mut c_void)
    }

    /// Pointer-valued argument for slot calls and signal emission. The
    /// boxed value must outlive the call.
    pub fn to_value(&self) -> Value {
        Value::Pointer(self.ptr.as_ptr() as usize)
    }
}

impl<T: BoxedType> AsRef<T::Native> for Boxed<T> {
    fn as_ref(&self) -> &T::Native {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: BoxedType> Drop for Boxed<T> {
    fn drop(&mut self) {
        if self.mode == BoxedMode::Owned {
            ffi_dispatch::boxed_free(T::static_type(), self.as_ptr());
        }
    }
}

impl<T: BoxedType> std::fmt::Debug for Boxed<T>
where
    T::Native: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Boxed")
            .field("type", &T::TYPE_NAME)
            .field("mode", &self.mode)
            .field("value", self.as_ref())
            .finish()
    }
}
