// DynamicCall: invoke a vtable slot or emit a signal with dynamic arguments.
//
// This is the fallback for behavior no generated wrapper covers. Arguments
// are collected as `Value`s and marshaled in one go at `call()`.

use crate::error::{GlimmerError, GlimmerResult};
use crate::ffi_dispatch;
use crate::object::Object;
use crate::signal;
use crate::value::Value;

enum Target {
    Slot(u32),
    Signal(String),
}

/// Builder for a dynamically typed call.
///
/// ```ignore
/// let size = DynamicCall::vfunc(&widget, widget_slots::MEASURE)
///     .arg(120)
///     .call()?;
/// let handled = DynamicCall::signal(&widget, "key-pressed").arg(65).call()?;
/// ```
pub struct DynamicCall {
    obj: Object,
    target: Target,
    args: Vec<Value>,
}

impl DynamicCall {
    /// Prepare a call of behavior `slot` through the native vtable.
    pub fn vfunc(obj: &Object, slot: u32) -> Self {
        DynamicCall {
            obj: obj.clone(),
            target: Target::Slot(slot),
            args: Vec::new(),
        }
    }

    /// Prepare an emission of signal `name`.
    pub fn signal(obj: &Object, name: &str) -> Self {
        DynamicCall {
            obj: obj.clone(),
            target: Target::Signal(name.to_string()),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn args<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Perform the call. Consumes the builder.
    pub fn call(self) -> GlimmerResult<Value> {
        match &self.target {
            Target::Slot(slot) => {
                let handle = self.obj.checked_handle()?;
                let count = ffi_dispatch::type_slot_count(ffi_dispatch::object_type_of(handle));
                if *slot >= count {
                    return Err(GlimmerError::Native(glimmer_ffi::NativeStatus::InvalidSlot));
                }
                self.obj.invoke_vfunc(*slot, &self.args)
            }
            Target::Signal(name) => signal::emit(&self.obj, name, &self.args),
        }
    }
}
