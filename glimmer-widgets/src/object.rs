// Root classes: `Object` and `InitiallyUnowned`.

use std::sync::OnceLock;

use glimmer_ffi::abi::{signal_names, type_names};
use glimmer_runtime::signal::{self, ConnectionId, Reduction, SignalRegistration};
use glimmer_runtime::{
    static_type_by_name, AsObject, GlimmerResult, HasParent, NativeClass, ObjectRef, StaticType, TypeTag, Value,
    WrapperRegistration,
};

/// Native class `Object`, the root of the hierarchy.
pub struct BaseObject;

impl StaticType for BaseObject {
    const TYPE_NAME: &'static str = type_names::OBJECT;

    fn static_type() -> TypeTag {
        static CACHE: OnceLock<TypeTag> = OnceLock::new();
        static_type_by_name(type_names::OBJECT, &CACHE)
    }
}

impl NativeClass for BaseObject {}

inventory::submit! { WrapperRegistration { type_name: type_names::OBJECT } }

inventory::submit! {
    SignalRegistration {
        owner_type: type_names::OBJECT,
        name: signal_names::DESTROY,
        param_kinds: &[],
        return_kind: glimmer_runtime::ValueKind::None,
        reduction: Reduction::Ignore,
    }
}

pub trait BaseObjectExt: AsObject {
    /// Runs when the instance is being torn down by the native runtime.
    fn connect_destroy<F>(&self, f: F) -> GlimmerResult<ConnectionId>
    where
        F: Fn(&ObjectRef<BaseObject>) + Send + Sync + 'static,
    {
        signal::connect(self.as_object(), signal_names::DESTROY, move |obj, _| {
            if let Ok(this) = obj.downcast::<BaseObject>() {
                f(&this);
            }
            Value::None
        })
    }
}

impl BaseObjectExt for ObjectRef<BaseObject> {}

/// Native class `InitiallyUnowned`: instances start with a floating
/// reference that the first owner claims.
pub struct InitiallyUnowned;

impl StaticType for InitiallyUnowned {
    const TYPE_NAME: &'static str = type_names::INITIALLY_UNOWNED;

    fn static_type() -> TypeTag {
        static CACHE: OnceLock<TypeTag> = OnceLock::new();
        static_type_by_name(type_names::INITIALLY_UNOWNED, &CACHE)
    }
}

impl NativeClass for InitiallyUnowned {}

impl HasParent for InitiallyUnowned {
    type Parent = BaseObject;
}

inventory::submit! { WrapperRegistration { type_name: type_names::INITIALLY_UNOWNED } }
