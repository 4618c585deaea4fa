mod common;

use glimmer::ffi::abi::type_names;
use glimmer::prelude::*;
use glimmer::runtime::{fake, GlimmerError};

#[test]
fn wrapping_twice_yields_the_same_wrapper() {
    common::setup();
    let h = fake::new_instance(type_names::LABEL);
    let a = Object::wrap(h).unwrap();
    let b = Object::wrap(h).unwrap();
    assert!(Object::ptr_eq(&a, &b));
    let label = ObjectRef::<Label>::wrap(h).unwrap();
    assert!(Object::ptr_eq(label.as_object(), &a));
    // One adopted floating reference shared by every view.
    assert_eq!(fake::ref_count(h), 1);
}

#[test]
fn dropping_wrapper_of_floating_object_releases_it() {
    common::setup();
    let h = fake::new_instance(type_names::WIDGET);
    assert!(fake::is_floating(h));
    let obj = Object::wrap(h).unwrap();
    assert!(!fake::is_floating(h));
    assert_eq!(fake::ref_count(h), 1);
    drop(obj);
    assert_eq!(fake::ref_count(h), 0);
    assert!(!fake::is_alive(h));
}

#[test]
fn borrowed_wrapper_leaves_count_alone() {
    common::setup();
    let h = fake::new_instance(type_names::OBJECT);
    let obj = Object::wrap_borrowed(h).unwrap();
    assert!(!obj.owns_reference());
    assert_eq!(fake::ref_count(h), 1);
    drop(obj);
    assert!(fake::is_alive(h));
    fake::unref(h);
}

#[test]
fn weak_reference_does_not_keep_wrapper() {
    common::setup();
    let obj = ObjectRef::<Widget>::construct().unwrap().into_object();
    let h = obj.handle();
    let weak = obj.downgrade();
    assert!(weak.upgrade().is_some());
    drop(obj);
    assert!(weak.upgrade().is_none());
    assert!(!fake::is_alive(h));
}

#[test]
fn native_finalize_marks_wrapper_dead() {
    common::setup();
    let h = fake::new_instance(type_names::OBJECT);
    let obj = Object::wrap_borrowed(h).unwrap();
    fake::unref(h);
    assert!(!obj.is_alive());
    assert!(matches!(obj.checked_handle(), Err(GlimmerError::ObjectFinalized)));
    assert!(matches!(
        obj.invoke_vfunc(widget_slots::ACTIVATE, &[]),
        Err(GlimmerError::ObjectFinalized)
    ));
}

#[test]
fn typed_view_of_wrong_class_is_rejected() {
    common::setup();
    let h = fake::new_instance(type_names::LABEL);
    let obj = Object::wrap(h).unwrap();
    assert!(matches!(
        ObjectRef::<Button>::wrap(h),
        Err(GlimmerError::InvalidCast { .. })
    ));
    let label = ObjectRef::<Label>::wrap(h).unwrap();
    assert!(Object::ptr_eq(label.as_object(), &obj));
    assert_eq!(label.measure(2).unwrap(), 3);
}
