mod common;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use glimmer::ffi::NativeValue;
use glimmer::prelude::*;
use glimmer::runtime::fake;

#[derive(Default)]
struct Toggle {
    active: AtomicBool,
    activations: AtomicU32,
}

impl ObjectSubclass for Toggle {
    const NAME: &'static str = "Toggle";
    type Parent = Button;

    fn class_init(klass: &mut ClassBuilder<Self>) {
        klass.override_vfunc(widget_slots::ACTIVATE, |imp, _obj, _args| {
            imp.active.fetch_xor(true, Ordering::SeqCst);
            imp.activations.fetch_add(1, Ordering::SeqCst);
            Value::None
        });
    }
}

glimmer::impl_subclass_type!(Toggle);

fn click_counter(button: &ObjectRef<Button>) -> Arc<AtomicU32> {
    let clicks = Arc::new(AtomicU32::new(0));
    let c = clicks.clone();
    button
        .connect_clicked(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    clicks
}

#[test]
fn init_registers_submitted_subclass() {
    let report = common::setup();
    assert!(report.classes >= 1);
    assert!(report.wrapper_types >= 5);
    assert!(fake::type_tag("Toggle").is_valid());
}

#[test]
fn toggle_activate_runs_override_once_without_chain_up() {
    common::setup();
    let toggle = ObjectRef::<Toggle>::construct().unwrap();
    let clicks = click_counter(&toggle);
    fake::take_native_calls(toggle.handle());

    toggle.activate().unwrap();

    let imp = toggle.imp().unwrap();
    assert_eq!(imp.activations.load(Ordering::SeqCst), 1);
    assert!(imp.active.load(Ordering::SeqCst));
    assert!(fake::native_calls(toggle.handle()).is_empty());
    assert_eq!(clicks.load(Ordering::SeqCst), 0);
}

#[test]
fn plain_button_activate_takes_native_path() {
    common::setup();
    let button = ObjectRef::<Button>::construct().unwrap();
    let clicks = click_counter(&button);
    fake::take_native_calls(button.handle());

    button.activate().unwrap();

    let calls = fake::native_calls(button.handle());
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].slot, widget_slots::ACTIVATE);
    assert!(calls[0].args.is_empty());
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
}

#[test]
fn slots_without_override_match_the_plain_class() {
    common::setup();
    let toggle = ObjectRef::<Toggle>::construct().unwrap();
    let button = ObjectRef::<Button>::construct().unwrap();
    fake::take_native_calls(toggle.handle());

    assert_eq!(toggle.measure(4).unwrap(), button.measure(4).unwrap());
    assert_eq!(toggle.grab_focus(1).unwrap(), button.grab_focus(1).unwrap());

    let calls = fake::native_calls(toggle.handle());
    assert_eq!(calls[0].slot, widget_slots::MEASURE);
    assert_eq!(calls[0].args, vec![NativeValue::int(4)]);
}

#[test]
fn state_survives_wrapper_rebuild() {
    common::setup();
    let toggle = ObjectRef::<Toggle>::construct().unwrap();
    let handle = toggle.handle();
    // Keep the instance alive while the only wrapper goes away.
    fake::ref_object(handle);
    toggle.activate().unwrap();
    drop(toggle);

    let again = ObjectRef::<Toggle>::wrap(handle).unwrap();
    assert!(again.imp().unwrap().active.load(Ordering::SeqCst));
    assert_eq!(again.as_object().type_name(), "Toggle");
    assert!(again.as_object().is_a::<Button>());
    drop(again);
    fake::unref(handle);
    assert!(!fake::is_alive(handle));
}
