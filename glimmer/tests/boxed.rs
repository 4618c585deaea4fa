mod common;

use glimmer::ffi::abi::NativeRectangle;
use glimmer::prelude::*;
use glimmer::runtime::fake;

#[test]
fn owned_copy_is_independent_of_source() {
    common::setup();
    let mut source = Rectangle::from_origin_size(IVec2::new(1, 1), IVec2::new(8, 8)).unwrap();
    let copy = source.copy().unwrap();
    source.set_origin(IVec2::new(5, 5));
    source.get_mut().width = 1;

    assert_eq!(copy.origin(), IVec2::new(1, 1));
    assert_eq!(copy.size(), IVec2::new(8, 8));
    assert_ne!(source.as_ptr(), copy.as_ptr());
}

#[test]
fn copy_of_view_is_owned_and_outlives_original() {
    common::setup();
    let mut raw = NativeRectangle { x: 0, y: 0, width: 2, height: 2 };
    let owned = {
        let view = unsafe { Boxed::<Rectangle>::from_view(&mut raw) }.unwrap();
        assert_eq!(view.mode(), BoxedMode::View);
        view.copy().unwrap()
    };
    raw.width = 100;
    assert!(owned.is_owned());
    assert_eq!(owned.get().width, 2);
    let ptr = owned.as_ptr();
    drop(owned);
    assert!(!fake::is_boxed_live(ptr));
}

#[test]
fn allocation_signal_gets_a_snapshot() {
    common::setup();
    let widget = ObjectRef::<Widget>::construct().unwrap();
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let s = seen.clone();
    widget
        .connect_size_allocate(move |_, rect| s.lock().unwrap().push(rect.width))
        .unwrap();

    let mut alloc = Rectangle::from_origin_size(IVec2::ZERO, IVec2::new(30, 10)).unwrap();
    widget.emit_size_allocate(&alloc).unwrap();
    alloc.get_mut().width = 60;
    widget.emit_size_allocate(&alloc).unwrap();

    assert_eq!(*seen.lock().unwrap(), [30, 60]);
}
