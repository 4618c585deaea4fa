// Prelude: one-import access to the most commonly used glimmer types.
//
// Usage: `use glimmer::prelude::*;`

// Core runtime types
pub use glimmer_runtime::{
    Object, ObjectRef, WeakObject, GlimmerResult, GlimmerError,
    StaticType, NativeClass, NativeInterface, HasParent, BoxedType, AsObject,
    ObjectSubclass, ClassBuilder, chain_up,
    Value, Boxed, BoxedMode,
    ConnectionId, SignalBinding, Reduction,
    DynamicCall, DispatchGuard,
};

// FFI handles (rarely needed directly, but useful for advanced cases)
pub use glimmer_runtime::{NativeHandle, TypeTag, ValueKind};

// Widget wrappers and their method traits
pub use glimmer_widgets::{
    BaseObject, BaseObjectExt, InitiallyUnowned,
    Widget, WidgetExt, Button, ButtonExt, Label,
    Activatable, ActivatableExt,
    Rectangle, RectangleExt, TextIter, TextIterExt,
};

// Vtable slot indices for `override_vfunc` and `chain_up`
pub use glimmer_ffi::abi::widget_slots;

// glam re-exports (common math types users will interact with)
pub use glam::IVec2;
