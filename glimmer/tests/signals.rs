mod common;

use std::sync::{Arc, Mutex};

use glimmer::ffi::abi::signal_names;
use glimmer::prelude::*;
use glimmer::runtime::{fake, signal};

fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn observe(button: &ObjectRef<Button>, log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> ConnectionId {
    let log = log.clone();
    button
        .connect_clicked(move |_| log.lock().unwrap().push(tag))
        .unwrap()
}

#[test]
fn observer_set_follows_connect_disconnect_sequence() {
    common::setup();
    let button = ObjectRef::<Button>::construct().unwrap();
    let log = recorder();

    let _a = observe(&button, &log, "a");
    let b = observe(&button, &log, "b");
    let _c = observe(&button, &log, "c");
    signal::disconnect(b).unwrap();
    let _d = observe(&button, &log, "d");

    button.emit_clicked().unwrap();
    assert_eq!(*log.lock().unwrap(), ["a", "c", "d"]);
    assert_eq!(signal::observer_ids(button.as_object(), signal_names::CLICKED).len(), 3);
    // One native closure per wrapper and signal.
    assert_eq!(fake::handler_count(button.handle(), signal_names::CLICKED), 1);
}

#[test]
fn disconnecting_twice_reports_unknown_connection() {
    common::setup();
    let button = ObjectRef::<Button>::construct().unwrap();
    let log = recorder();
    let id = observe(&button, &log, "x");
    signal::disconnect(id).unwrap();
    assert_eq!(
        signal::disconnect(id),
        Err(GlimmerError::UnknownConnection(id.as_u64()))
    );
    assert_eq!(fake::handler_count(button.handle(), signal_names::CLICKED), 0);
}

#[test]
fn blocked_observer_is_skipped() {
    common::setup();
    let button = ObjectRef::<Button>::construct().unwrap();
    let log = recorder();
    let a = observe(&button, &log, "a");
    let _b = observe(&button, &log, "b");

    signal::block(a).unwrap();
    button.emit_clicked().unwrap();
    signal::unblock(a).unwrap();
    button.emit_clicked().unwrap();

    assert_eq!(*log.lock().unwrap(), ["b", "a", "b"]);
}

#[test]
fn scoped_binding_disconnects_on_drop() {
    common::setup();
    let widget = ObjectRef::<Widget>::construct().unwrap();
    let log = recorder();
    {
        let log = log.clone();
        let _binding = signal::connect_scoped(widget.as_object(), signal_names::SHOW, move |_, _| {
            log.lock().unwrap().push("show");
            Value::None
        })
        .unwrap();
        widget.emit_show().unwrap();
    }
    widget.emit_show().unwrap();
    assert_eq!(*log.lock().unwrap(), ["show"]);
    assert_eq!(fake::handler_count(widget.handle(), signal_names::SHOW), 0);
}

#[test]
fn dynamic_emit_reaches_typed_observers() {
    common::setup();
    let label = ObjectRef::<Label>::construct().unwrap();
    label.connect_key_pressed(|_, key| key == 32).unwrap();
    let handled = DynamicCall::signal(label.as_object(), signal_names::KEY_PRESSED)
        .arg(32i32)
        .call()
        .unwrap();
    assert_eq!(handled, Value::Bool(true));
}

#[test]
fn connecting_to_unknown_signal_fails() {
    common::setup();
    let label = ObjectRef::<Label>::construct().unwrap();
    assert!(matches!(
        signal::connect(label.as_object(), "no-such-signal", |_, _| Value::None),
        Err(GlimmerError::UnknownSignal { .. })
    ));
}
