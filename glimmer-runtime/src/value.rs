// Value: wrapped form of a native value cell.
//
// Conversion from native form happens once per dispatch. Objects are routed
// through the identity cache, so an argument that names an already-wrapped
// instance yields that same wrapper.

use std::ffi::c_void;

use glimmer_ffi::{NativeHandle, NativeValue, ValueKind};

use crate::ffi_dispatch;
use crate::identity_cache;
use crate::object::Object;
use crate::ownership::Intent;

/// A native value in wrapped form.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    /// `None` is the null object.
    Object(Option<Object>),
    /// Raw pointer to native memory (boxed values, out-parameters).
    Pointer(usize),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            Value::Str(_) => ValueKind::String,
            Value::Object(_) => ValueKind::Object,
            Value::Pointer(_) => ValueKind::Pointer,
        }
    }

    /// The documented substitute used when a native value is missing or has
    /// the wrong kind: `false`, `0`, `0.0`, `""`, the null object, the null
    /// pointer.
    pub fn default_for(kind: ValueKind) -> Value {
        match kind {
            ValueKind::None => Value::None,
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Int => Value::Int(0),
            ValueKind::Double => Value::Double(0.0),
            ValueKind::String => Value::Str(String::new()),
            ValueKind::Object => Value::Object(None),
            ValueKind::Pointer => Value::Pointer(0),
        }
    }

    /// Truthiness used by the `FirstTruthy` signal reduction.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Double(d) => *d != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Object(o) => o.is_some(),
            Value::Pointer(p) => *p != 0,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => o.as_ref(),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<*mut c_void> {
        match self {
            Value::Pointer(p) => Some(*p as *mut c_void),
            _ => None,
        }
    }

    /// Convert a native cell. Object handles are wrapped with a new reference;
    /// a handle that cannot be wrapped becomes the null object.
    pub fn from_native(cell: &NativeValue) -> Value {
        match cell.kind {
            ValueKind::None => Value::None,
            ValueKind::Bool => Value::Bool(cell.bits != 0),
            ValueKind::Int => Value::Int(cell.bits as i64),
            ValueKind::Double => Value::Double(f64::from_bits(cell.bits)),
            ValueKind::Pointer => Value::Pointer(cell.bits as usize),
            ValueKind::String => {
                // SAFETY: string cells borrow memory that outlives the call
                // currently being marshaled.
                let bytes = unsafe { cell.as_str_bytes() }.unwrap_or_default();
                Value::Str(String::from_utf8_lossy(bytes).into_owned())
            }
            ValueKind::Object => {
                let handle = cell.as_object().unwrap_or(NativeHandle::NULL);
                if handle.is_null() {
                    return Value::Object(None);
                }
                match identity_cache::wrap(handle, Intent::TakeOwnership) {
                    Ok(obj) => Value::Object(Some(obj)),
                    Err(err) => {
                        log::warn!("[glimmer] object argument {:#x} not wrapped: {err}", handle.to_addr());
                        Value::Object(None)
                    }
                }
            }
        }
    }

    /// Convert a native cell that is declared to be of `expected` kind,
    /// substituting [`Value::default_for`] on a mismatch.
    pub fn from_native_expecting(cell: &NativeValue, expected: ValueKind) -> Value {
        if expected == ValueKind::None || cell.kind == expected {
            return Value::from_native(cell);
        }
        log::warn!(
            "[glimmer] expected {:?} argument, got {:?}; substituting default",
            expected,
            cell.kind
        );
        Value::default_for(expected)
    }

    /// Native form for passing *into* a native call. String cells borrow
    /// `self`, so the value must outlive the call.
    pub fn to_native(&self) -> NativeValue {
        match self {
            Value::None => NativeValue::none(),
            Value::Bool(b) => NativeValue::bool(*b),
            Value::Int(i) => NativeValue::int(*i),
            Value::Double(d) => NativeValue::double(*d),
            Value::Str(s) => NativeValue::string(s),
            Value::Object(Some(o)) => NativeValue::object(o.handle()),
            Value::Object(None) => NativeValue::object(NativeHandle::NULL),
            Value::Pointer(p) => NativeValue::pointer(*p as *mut c_void),
        }
    }

    /// Native form for a value *returned* to the native runtime. Strings
    /// cannot outlive the Rust frame, so they become `None` (with a warning).
    ///
    /// Object results transfer one reference to the caller: the wrapper that
    /// produced the result may be dropped before the native frame reads it.
    /// [`Value::from_native_result`] is the receiving half of this rule.
    pub fn to_native_result(&self) -> NativeValue {
        match self {
            Value::Str(s) => {
                log::warn!("[glimmer] string result {s:?} cannot cross the native boundary; returning None");
                NativeValue::none()
            }
            Value::Object(Some(o)) if o.is_alive() => {
                ffi_dispatch::object_ref(o.handle());
                NativeValue::object(o.handle())
            }
            Value::Object(Some(_)) => {
                log::warn!("[glimmer] finalized object returned across the native boundary; returning null");
                NativeValue::object(NativeHandle::NULL)
            }
            _ => self.to_native(),
        }
    }

    /// Convert the result cell of a native call (slot invocation, signal
    /// emission). An object result carries one reference for the caller,
    /// which is released once the wrapper holds its own. A floating result
    /// carries no such reference; the wrapper adopts it instead.
    pub fn from_native_result(cell: &NativeValue, expected: ValueKind) -> Value {
        let transferred = match cell.kind {
            ValueKind::Object => cell
                .as_object()
                .filter(|h| !h.is_null() && ffi_dispatch::object_is_alive(*h) && !ffi_dispatch::object_is_floating(*h)),
            _ => None,
        };
        let value = Value::from_native_expecting(cell, expected);
        if let Some(handle) = transferred {
            ffi_dispatch::object_unref(handle);
        }
        value
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => match (a, b) {
                (Some(a), Some(b)) => Object::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            },
            (Value::Pointer(a), Value::Pointer(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Object> for Value {
    fn from(v: Object) -> Self {
        Value::Object(Some(v))
    }
}

impl From<Option<Object>> for Value {
    fn from(v: Option<Object>) -> Self {
        Value::Object(v)
    }
}
