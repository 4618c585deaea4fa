use std::ffi::c_void;

use crate::handles::{BoxedPtr, NativeHandle};

/// Discriminant of a [`NativeValue`] cell.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    None = 0,
    Bool = 1,
    Int = 2,
    Double = 3,
    Object = 4,
    Pointer = 5,
    String = 6,
}

/// Tagged value cell used for vtable slot arguments, slot results and signal
/// arguments. Layout is shared with the native runtime's headers.
///
/// - `Object`: `bits` holds the handle address (may be null).
/// - `Pointer`: `bits` holds a raw pointer (boxed values, out-parameters).
/// - `String`: `bits` holds a pointer to UTF-8 bytes, `len` their length.
///   The bytes are borrowed for the duration of the call only.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NativeValue {
    pub kind: ValueKind,
    pub len: u32,
    pub bits: u64,
}

impl Default for NativeValue {
    fn default() -> Self {
        NativeValue::none()
    }
}

impl NativeValue {
    #[inline]
    pub const fn none() -> Self {
        NativeValue { kind: ValueKind::None, len: 0, bits: 0 }
    }

    #[inline]
    pub const fn bool(v: bool) -> Self {
        NativeValue { kind: ValueKind::Bool, len: 0, bits: v as u64 }
    }

    #[inline]
    pub const fn int(v: i64) -> Self {
        NativeValue { kind: ValueKind::Int, len: 0, bits: v as u64 }
    }

    #[inline]
    pub fn double(v: f64) -> Self {
        NativeValue { kind: ValueKind::Double, len: 0, bits: v.to_bits() }
    }

    #[inline]
    pub fn object(h: NativeHandle) -> Self {
        NativeValue { kind: ValueKind::Object, len: 0, bits: h.to_addr() }
    }

    #[inline]
    pub fn pointer(p: *mut c_void) -> Self {
        NativeValue { kind: ValueKind::Pointer, len: 0, bits: p as usize as u64 }
    }

    #[inline]
    pub fn boxed(p: BoxedPtr) -> Self {
        NativeValue::pointer(p.0)
    }

    /// Borrow a UTF-8 string. The caller keeps `s` alive for as long as the
    /// cell is in use.
    #[inline]
    pub fn string(s: &str) -> Self {
        NativeValue {
            kind: ValueKind::String,
            len: s.len() as u32,
            bits: s.as_ptr() as usize as u64,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        (self.kind == ValueKind::Bool).then_some(self.bits != 0)
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        (self.kind == ValueKind::Int).then_some(self.bits as i64)
    }

    #[inline]
    pub fn as_double(&self) -> Option<f64> {
        (self.kind == ValueKind::Double).then(|| f64::from_bits(self.bits))
    }

    #[inline]
    pub fn as_object(&self) -> Option<NativeHandle> {
        (self.kind == ValueKind::Object).then(|| NativeHandle::from_addr(self.bits))
    }

    #[inline]
    pub fn as_pointer(&self) -> Option<*mut c_void> {
        (self.kind == ValueKind::Pointer).then(|| self.bits as usize as *mut c_void)
    }

    /// Read the borrowed string bytes.
    ///
    /// # Safety
    /// The cell must have been built from memory that is still alive.
    #[inline]
    pub unsafe fn as_str_bytes<'a>(&self) -> Option<&'a [u8]> {
        if self.kind != ValueKind::String {
            return None;
        }
        if self.bits == 0 {
            return Some(&[]);
        }
        Some(unsafe { std::slice::from_raw_parts(self.bits as usize as *const u8, self.len as usize) })
    }
}
