// Boxed value types: `Rectangle` and `TextIter`.

use std::sync::OnceLock;

use glimmer_ffi::abi::{type_names, NativeRectangle, NativeTextIter};
use glimmer_runtime::{native_type_by_name, BoxedType, TypeTag};

/// Native boxed `Rectangle`, an integer allocation in widget coordinates.
pub struct Rectangle;

impl BoxedType for Rectangle {
    const TYPE_NAME: &'static str = type_names::RECTANGLE;
    type Native = NativeRectangle;

    fn static_type() -> TypeTag {
        static CACHE: OnceLock<TypeTag> = OnceLock::new();
        native_type_by_name(type_names::RECTANGLE, &CACHE)
    }
}

/// Native boxed `TextIter`, a position inside a text buffer.
pub struct TextIter;

impl BoxedType for TextIter {
    const TYPE_NAME: &'static str = type_names::TEXT_ITER;
    type Native = NativeTextIter;

    fn static_type() -> TypeTag {
        static CACHE: OnceLock<TypeTag> = OnceLock::new();
        native_type_by_name(type_names::TEXT_ITER, &CACHE)
    }
}
