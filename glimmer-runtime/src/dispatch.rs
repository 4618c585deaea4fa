// Virtual dispatch proxy.
//
// The native runtime calls `vfunc_trampoline::<T>` for every slot a Rust
// subclass overrides. The trampoline decides between the Rust override and
// the parent implementation captured at registration; exactly one of them
// runs per call.

use std::panic::AssertUnwindSafe;

use glimmer_ffi::{NativeHandle, NativeValue, SlotFn, ValueKind};

use crate::class_registry::{self, ObjectSubclass, SlotResolution};
use crate::error::{GlimmerError, GlimmerResult};
use crate::ffi_guard::ffi_boundary;
use crate::identity_cache;
use crate::object::Object;
use crate::value::Value;

/// Slot function installed for every override of `T`.
///
/// # Safety
/// Called by the native runtime only. `args` must point to `n_args` valid
/// cells (or be null with `n_args == 0`); `ret` is null or writable.
pub unsafe extern "C" fn vfunc_trampoline<T: ObjectSubclass>(
    instance: NativeHandle,
    slot: u32,
    args: *const NativeValue,
    n_args: u32,
    ret: *mut NativeValue,
) {
    let native_args: &[NativeValue] = if args.is_null() || n_args == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(args, n_args as usize) }
    };
    ffi_boundary(
        (),
        AssertUnwindSafe(|| dispatch_slot::<T>(instance, slot, native_args, ret)),
    );
}

fn dispatch_slot<T: ObjectSubclass>(
    instance: NativeHandle,
    slot: u32,
    args: &[NativeValue],
    ret: *mut NativeValue,
) {
    let Some(desc) = class_registry::dispatch_descriptor::<T>() else {
        log::error!("[glimmer] slot {slot} called on {} before registration", T::NAME);
        return;
    };
    match desc.resolution(slot) {
        SlotResolution::Override { handler, parent } => {
            if let Some(obj) = identity_cache::lookup(instance) {
                let wrapped: Vec<Value> = args.iter().map(Value::from_native).collect();
                if let Some(result) = handler(&obj, &wrapped) {
                    write_result(ret, &result);
                    return;
                }
                log::warn!(
                    "[glimmer] {} instance has no state for its override of slot {slot}; chaining up",
                    T::NAME
                );
            }
            call_parent(parent, instance, slot, args, ret);
        }
        SlotResolution::ChainUp(parent) => call_parent(Some(parent), instance, slot, args, ret),
        SlotResolution::Absent => {}
    }
}

fn call_parent(
    parent: Option<SlotFn>,
    instance: NativeHandle,
    slot: u32,
    args: &[NativeValue],
    ret: *mut NativeValue,
) {
    if let Some(f) = parent {
        // SAFETY: `f` was read from the parent's vtable and expects exactly
        // the arguments the native caller handed us.
        unsafe { f(instance, slot, args.as_ptr(), args.len() as u32, ret) };
    }
}

fn write_result(ret: *mut NativeValue, result: &Value) {
    if !ret.is_null() {
        // SAFETY: the native caller owns `ret` for the duration of the call.
        unsafe { *ret = result.to_native_result() };
    }
}

/// Invoke the parent implementation of `slot` for subclass `T`.
///
/// Overrides call this to extend rather than replace the inherited
/// behavior. Returns `Value::None` if the parent has no implementation.
pub fn chain_up<T: ObjectSubclass>(obj: &Object, slot: u32, args: &[Value]) -> GlimmerResult<Value> {
    let handle = obj.checked_handle()?;
    let desc = class_registry::dispatch_descriptor::<T>().ok_or_else(|| {
        GlimmerError::RegistrationFailed(format!("{} is not registered", T::NAME))
    })?;
    let Some(parent) = desc.parent_slot(slot) else {
        return Ok(Value::None);
    };
    let native: Vec<NativeValue> = args.iter().map(Value::to_native).collect();
    let mut ret = NativeValue::none();
    // SAFETY: `native` (and the strings it borrows from `args`) outlives the call.
    unsafe { parent(handle, slot, native.as_ptr(), native.len() as u32, &mut ret) };
    Ok(Value::from_native_result(&ret, ValueKind::None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_registry::{register_class, ClassBuilder};
    use crate::fake::{self, FakeWidget};
    use glimmer_ffi::abi::{type_names, widget_slots};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Counter {
        activations: AtomicU32,
    }

    impl ObjectSubclass for Counter {
        const NAME: &'static str = "DispatchTestCounter";
        type Parent = FakeWidget;

        fn class_init(klass: &mut ClassBuilder<Self>) {
            klass.override_vfunc(widget_slots::ACTIVATE, |imp, _obj, _args| {
                imp.activations.fetch_add(1, Ordering::SeqCst);
                Value::None
            });
            klass.override_vfunc(widget_slots::MEASURE, |_imp, obj, args| {
                let inherited = chain_up::<Counter>(obj, widget_slots::MEASURE, args)
                    .unwrap_or_default()
                    .as_int()
                    .unwrap_or(0);
                Value::Int(inherited * 10)
            });
            klass.override_vfunc(widget_slots::GRAB_FOCUS, |_imp, _obj, _args| {
                panic!("grab_focus override failed");
            });
        }
    }

    fn construct_counter() -> Object {
        fake::install();
        let tag = register_class::<Counter>().unwrap();
        Object::construct(tag).unwrap()
    }

    #[test]
    fn override_runs_once_without_parent() {
        let obj = construct_counter();
        fake::take_native_calls(obj.handle());
        obj.invoke_vfunc(widget_slots::ACTIVATE, &[]).unwrap();
        assert_eq!(obj.imp::<Counter>().unwrap().activations.load(Ordering::SeqCst), 1);
        assert!(fake::native_calls(obj.handle()).is_empty());
    }

    #[test]
    fn chain_up_reaches_native_default_with_same_args() {
        let obj = construct_counter();
        fake::take_native_calls(obj.handle());
        let v = obj.invoke_vfunc(widget_slots::MEASURE, &[Value::Int(4)]).unwrap();
        // Native default measure is `for_size + 1`.
        assert_eq!(v, Value::Int(50));
        let calls = fake::native_calls(obj.handle());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].slot, widget_slots::MEASURE);
        assert_eq!(calls[0].args, vec![NativeValue::int(4)]);
    }

    #[test]
    fn panicking_override_is_contained() {
        let obj = construct_counter();
        let v = obj.invoke_vfunc(widget_slots::GRAB_FOCUS, &[Value::Int(0)]).unwrap();
        assert_eq!(v, Value::None);
        assert!(fake::logs().iter().any(|l| l.contains("grab_focus override failed")));
    }

    #[test]
    fn unwrapped_instance_chains_up() {
        fake::install();
        let tag = register_class::<Counter>().unwrap();
        let h = fake::new_instance_of(tag);
        assert!(identity_cache::lookup(h).is_none());
        let mut ret = NativeValue::none();
        let args = [NativeValue::int(7)];
        unsafe { vfunc_trampoline::<Counter>(h, widget_slots::MEASURE, args.as_ptr(), 1, &mut ret) };
        assert_eq!(ret, NativeValue::int(8));
        assert!(identity_cache::lookup(h).is_none());
        fake::sink_and_unref(h);
    }

    #[test]
    fn plain_widget_uses_native_default() {
        fake::install();
        let plain = Object::construct(fake::type_tag(type_names::WIDGET)).unwrap();
        let v = plain.invoke_vfunc(widget_slots::MEASURE, &[Value::Int(4)]).unwrap();
        assert_eq!(v, Value::Int(5));
    }

    #[derive(Default)]
    struct Factory;

    impl ObjectSubclass for Factory {
        const NAME: &'static str = "DispatchTestFactory";
        type Parent = FakeWidget;

        fn class_init(klass: &mut ClassBuilder<Self>) {
            klass.override_vfunc(widget_slots::MEASURE, |_imp, _obj, _args| {
                match Object::construct(fake::type_tag(type_names::WIDGET)) {
                    Ok(made) => Value::Object(Some(made)),
                    Err(_) => Value::None,
                }
            });
        }
    }

    fn construct_factory() -> Object {
        fake::install();
        let tag = register_class::<Factory>().unwrap();
        Object::construct(tag).unwrap()
    }

    #[test]
    fn object_returned_by_override_reaches_native_caller_alive() {
        let factory = construct_factory();
        let (status, ret) = crate::ffi_dispatch::object_invoke_slot(
            factory.handle(),
            widget_slots::MEASURE,
            &[NativeValue::int(1)],
        );
        assert_eq!(status, glimmer_ffi::NativeStatus::Ok);
        let made = ret.as_object().unwrap();
        assert!(fake::is_alive(made));
        // The caller now holds the only reference.
        assert_eq!(fake::ref_count(made), 1);
        fake::unref(made);
        assert!(!fake::is_alive(made));
    }

    #[test]
    fn object_returned_by_override_is_owned_by_wrapper() {
        let factory = construct_factory();
        let v = factory.invoke_vfunc(widget_slots::MEASURE, &[Value::Int(1)]).unwrap();
        let made = v.as_object().unwrap().handle();
        assert!(fake::is_alive(made));
        assert_eq!(fake::ref_count(made), 1);
        drop(v);
        assert!(!fake::is_alive(made));
    }
}
