// Names, vtable slot indices and value-struct layouts shared with the native
// runtime's headers. Generated wrappers and the fake runtime both read these.

pub mod type_names {
    pub const OBJECT: &str = "Object";
    pub const INITIALLY_UNOWNED: &str = "InitiallyUnowned";
    pub const WIDGET: &str = "Widget";
    pub const BUTTON: &str = "Button";
    pub const LABEL: &str = "Label";
    pub const ACTIVATABLE: &str = "Activatable";
    pub const RECTANGLE: &str = "Rectangle";
    pub const TEXT_ITER: &str = "TextIter";
}

/// Behavior-vtable slots of `Widget` and its descendants.
pub mod widget_slots {
    /// `activate() -> None`
    pub const ACTIVATE: u32 = 0;
    /// `measure(for_size: Int) -> Int`
    pub const MEASURE: u32 = 1;
    /// `grab_focus(direction: Int) -> Bool`
    pub const GRAB_FOCUS: u32 = 2;

    pub const COUNT: u32 = 3;
}

pub mod signal_names {
    pub const SHOW: &str = "show";
    pub const DESTROY: &str = "destroy";
    pub const KEY_PRESSED: &str = "key-pressed";
    pub const CLICKED: &str = "clicked";
    pub const SIZE_ALLOCATE: &str = "size-allocate";
}

/// Native layout of a `Rectangle` boxed value.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NativeRectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Native layout of a `TextIter` boxed value.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NativeTextIter {
    pub offset: i32,
    pub line: i32,
    pub line_offset: i32,
    pub stamp: u32,
}
