// Widget classes: `Widget`, `Button`, `Label` and the `Activatable`
// interface.

use std::sync::OnceLock;

use glimmer_ffi::abi::{signal_names, type_names, widget_slots, NativeRectangle};
use glimmer_runtime::signal::{self, ConnectionId, Reduction, SignalRegistration};
use glimmer_runtime::{
    native_type_by_name, static_type_by_name, AsObject, Boxed, GlimmerError, GlimmerResult, HasParent,
    NativeClass, NativeInterface, ObjectRef, StaticType, TypeTag, Value, ValueKind, WrapperRegistration,
};

use crate::boxed::Rectangle;
use crate::object::InitiallyUnowned;

// ---------------------------------------------------------------------------
// Widget
// ---------------------------------------------------------------------------

/// Native class `Widget`.
pub struct Widget;

impl StaticType for Widget {
    const TYPE_NAME: &'static str = type_names::WIDGET;

    fn static_type() -> TypeTag {
        static CACHE: OnceLock<TypeTag> = OnceLock::new();
        static_type_by_name(type_names::WIDGET, &CACHE)
    }
}

impl NativeClass for Widget {}

impl HasParent for Widget {
    type Parent = InitiallyUnowned;
}

inventory::submit! { WrapperRegistration { type_name: type_names::WIDGET } }

inventory::submit! {
    SignalRegistration {
        owner_type: type_names::WIDGET,
        name: signal_names::SHOW,
        param_kinds: &[],
        return_kind: ValueKind::None,
        reduction: Reduction::Ignore,
    }
}

inventory::submit! {
    SignalRegistration {
        owner_type: type_names::WIDGET,
        name: signal_names::KEY_PRESSED,
        param_kinds: &[ValueKind::Int],
        return_kind: ValueKind::Bool,
        reduction: Reduction::FirstTruthy,
    }
}

inventory::submit! {
    SignalRegistration {
        owner_type: type_names::WIDGET,
        name: signal_names::SIZE_ALLOCATE,
        param_kinds: &[ValueKind::Pointer],
        return_kind: ValueKind::None,
        reduction: Reduction::Ignore,
    }
}

fn expect_int(v: Value) -> GlimmerResult<i64> {
    v.as_int().ok_or(GlimmerError::TypeMismatch { expected: "Int" })
}

fn expect_bool(v: Value) -> GlimmerResult<bool> {
    v.as_bool().ok_or(GlimmerError::TypeMismatch { expected: "Bool" })
}

pub trait WidgetExt: AsObject {
    /// Trigger the widget's primary action.
    fn activate(&self) -> GlimmerResult<()> {
        self.as_object().invoke_vfunc(widget_slots::ACTIVATE, &[])?;
        Ok(())
    }

    /// Preferred size along one axis for the given size along the other.
    fn measure(&self, for_size: i32) -> GlimmerResult<i32> {
        let v = self
            .as_object()
            .invoke_vfunc(widget_slots::MEASURE, &[Value::from(for_size)])?;
        Ok(expect_int(v)? as i32)
    }

    fn grab_focus(&self, direction: i32) -> GlimmerResult<bool> {
        let v = self
            .as_object()
            .invoke_vfunc(widget_slots::GRAB_FOCUS, &[Value::from(direction)])?;
        expect_bool(v)
    }

    fn connect_show<F>(&self, f: F) -> GlimmerResult<ConnectionId>
    where
        F: Fn(&ObjectRef<Widget>) + Send + Sync + 'static,
    {
        signal::connect(self.as_object(), signal_names::SHOW, move |obj, _| {
            if let Ok(this) = obj.downcast::<Widget>() {
                f(&this);
            }
            Value::None
        })
    }

    fn emit_show(&self) -> GlimmerResult<()> {
        signal::emit(self.as_object(), signal_names::SHOW, &[])?;
        Ok(())
    }

    /// Observers return `true` to mark the key as handled. Every observer
    /// runs; the first `true` wins.
    fn connect_key_pressed<F>(&self, f: F) -> GlimmerResult<ConnectionId>
    where
        F: Fn(&ObjectRef<Widget>, i32) -> bool + Send + Sync + 'static,
    {
        signal::connect(self.as_object(), signal_names::KEY_PRESSED, move |obj, args| {
            let keyval = args.first().and_then(Value::as_int).unwrap_or(0) as i32;
            match obj.downcast::<Widget>() {
                Ok(this) => Value::Bool(f(&this, keyval)),
                Err(_) => Value::Bool(false),
            }
        })
    }

    fn emit_key_pressed(&self, keyval: i32) -> GlimmerResult<bool> {
        let v = signal::emit(self.as_object(), signal_names::KEY_PRESSED, &[Value::from(keyval)])?;
        expect_bool(v)
    }

    /// The allocation is copied out of the emitter's memory before `f` runs.
    fn connect_size_allocate<F>(&self, f: F) -> GlimmerResult<ConnectionId>
    where
        F: Fn(&ObjectRef<Widget>, NativeRectangle) + Send + Sync + 'static,
    {
        signal::connect(self.as_object(), signal_names::SIZE_ALLOCATE, move |obj, args| {
            let Some(arg) = args.first() else {
                return Value::None;
            };
            // SAFETY: the emitter keeps the allocation alive for the
            // duration of the emission.
            let allocation = match unsafe { Boxed::<Rectangle>::view_value(arg) } {
                Ok(view) => view.get(),
                Err(_) => return Value::None,
            };
            if let Ok(this) = obj.downcast::<Widget>() {
                f(&this, allocation);
            }
            Value::None
        })
    }

    fn emit_size_allocate(&self, allocation: &Boxed<Rectangle>) -> GlimmerResult<()> {
        signal::emit(self.as_object(), signal_names::SIZE_ALLOCATE, &[allocation.to_value()])?;
        Ok(())
    }
}

impl WidgetExt for ObjectRef<Widget> {}

// ---------------------------------------------------------------------------
// Button
// ---------------------------------------------------------------------------

/// Native class `Button`. Activating a button emits `clicked`.
pub struct Button;

impl StaticType for Button {
    const TYPE_NAME: &'static str = type_names::BUTTON;

    fn static_type() -> TypeTag {
        static CACHE: OnceLock<TypeTag> = OnceLock::new();
        static_type_by_name(type_names::BUTTON, &CACHE)
    }
}

impl NativeClass for Button {}

impl HasParent for Button {
    type Parent = Widget;
}

inventory::submit! { WrapperRegistration { type_name: type_names::BUTTON } }

inventory::submit! {
    SignalRegistration {
        owner_type: type_names::BUTTON,
        name: signal_names::CLICKED,
        param_kinds: &[],
        return_kind: ValueKind::None,
        reduction: Reduction::Ignore,
    }
}

pub trait ButtonExt: AsObject {
    fn connect_clicked<F>(&self, f: F) -> GlimmerResult<ConnectionId>
    where
        F: Fn(&ObjectRef<Button>) + Send + Sync + 'static,
    {
        signal::connect(self.as_object(), signal_names::CLICKED, move |obj, _| {
            if let Ok(this) = obj.downcast::<Button>() {
                f(&this);
            }
            Value::None
        })
    }

    fn emit_clicked(&self) -> GlimmerResult<()> {
        signal::emit(self.as_object(), signal_names::CLICKED, &[])?;
        Ok(())
    }
}

impl ButtonExt for ObjectRef<Button> {}

// ---------------------------------------------------------------------------
// Label
// ---------------------------------------------------------------------------

/// Native class `Label`.
pub struct Label;

impl StaticType for Label {
    const TYPE_NAME: &'static str = type_names::LABEL;

    fn static_type() -> TypeTag {
        static CACHE: OnceLock<TypeTag> = OnceLock::new();
        static_type_by_name(type_names::LABEL, &CACHE)
    }
}

impl NativeClass for Label {}

impl HasParent for Label {
    type Parent = Widget;
}

inventory::submit! { WrapperRegistration { type_name: type_names::LABEL } }

// ---------------------------------------------------------------------------
// Activatable
// ---------------------------------------------------------------------------

/// Native interface `Activatable`. Query with `Object::interface`.
pub struct Activatable;

impl StaticType for Activatable {
    const TYPE_NAME: &'static str = type_names::ACTIVATABLE;

    fn static_type() -> TypeTag {
        static CACHE: OnceLock<TypeTag> = OnceLock::new();
        native_type_by_name(type_names::ACTIVATABLE, &CACHE)
    }
}

impl NativeInterface for Activatable {}

pub trait ActivatableExt: AsObject {
    /// Activate through the implementing class's vtable.
    fn activate(&self) -> GlimmerResult<()> {
        self.as_object().invoke_vfunc(widget_slots::ACTIVATE, &[])?;
        Ok(())
    }
}

impl ActivatableExt for ObjectRef<Activatable> {}

#[cfg(test)]
mod tests {
    use super::*;
    use glimmer_runtime::{fake, Object};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    fn setup() {
        fake::install();
        signal::register_all_from_inventory();
    }

    #[test]
    fn button_derefs_to_widget_methods() {
        setup();
        let button = ObjectRef::<Button>::construct().unwrap();
        assert_eq!(button.measure(10).unwrap(), 11);
        assert!(button.grab_focus(0).unwrap());
        assert_eq!(button.as_object().type_name(), type_names::BUTTON);
    }

    #[test]
    fn activating_a_button_emits_clicked() {
        setup();
        let button = ObjectRef::<Button>::construct().unwrap();
        let clicks = Arc::new(AtomicU32::new(0));
        let c = clicks.clone();
        button
            .connect_clicked(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        button.activate().unwrap();
        button.emit_clicked().unwrap();
        assert_eq!(clicks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn key_pressed_reduces_first_truthy() {
        setup();
        let label = ObjectRef::<Label>::construct().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        for handles in [false, true, false] {
            let calls = calls.clone();
            label
                .connect_key_pressed(move |_, key| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    handles && key == 13
                })
                .unwrap();
        }
        assert!(label.emit_key_pressed(13).unwrap());
        assert!(!label.emit_key_pressed(27).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn size_allocate_delivers_rectangle() {
        setup();
        let widget = ObjectRef::<Widget>::construct().unwrap();
        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        widget
            .connect_size_allocate(move |_, rect| *s.lock().unwrap() = Some(rect))
            .unwrap();
        let alloc = Boxed::<Rectangle>::new(NativeRectangle { x: 1, y: 2, width: 3, height: 4 }).unwrap();
        widget.emit_size_allocate(&alloc).unwrap();
        assert_eq!(seen.lock().unwrap().take(), Some(NativeRectangle { x: 1, y: 2, width: 3, height: 4 }));
    }

    #[test]
    fn interface_view_only_for_implementors() {
        setup();
        let button: Object = ObjectRef::<Button>::construct().unwrap().into();
        let label: Object = ObjectRef::<Label>::construct().unwrap().into();
        assert!(button.implements::<Activatable>());
        assert!(label.interface::<Activatable>().is_none());
        let activatable = button.interface::<Activatable>().unwrap();
        activatable.activate().unwrap();
        let calls = fake::native_calls(button.handle());
        assert_eq!(calls.last().map(|c| c.slot), Some(widget_slots::ACTIVATE));
    }

    #[test]
    fn label_downcast_to_button_fails() {
        setup();
        let label = ObjectRef::<Label>::construct().unwrap();
        assert!(matches!(
            label.cast::<Button>(),
            Err(GlimmerError::InvalidCast { .. })
        ));
        let widget: ObjectRef<Widget> = label.clone().upcast();
        assert_eq!(widget.as_object(), label.as_object());
    }
}
