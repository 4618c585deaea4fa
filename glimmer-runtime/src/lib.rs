// glimmer-runtime: safe binding core over glimmer-ffi.
// All unsafe FFI calls are confined to this crate. Generated wrappers and
// user code interact only with the safe types exported here.

pub mod api;
pub mod error;
pub mod traits;
pub mod value;
pub mod ownership;
pub mod type_registry;
pub mod identity_cache;
pub mod object;
pub mod object_ref;
pub mod class_registry;
pub mod dispatch;
pub mod signal;
pub mod boxed;
pub mod threads;
pub mod dynamic_call;
pub mod logging;
pub mod ffi_guard;

pub(crate) mod ffi_dispatch;

#[cfg(any(test, feature = "fake-runtime"))]
pub mod fake;

#[doc(hidden)]
pub use inventory as __inventory;

// Re-export the primary public API surface.
pub use api::{api, init_api, is_api_initialized};
pub use error::{abort_on_defect, check_native, GlimmerError, GlimmerResult};
pub use traits::{AsObject, BoxedType, HasParent, NativeClass, NativeInterface, StaticType};
pub use value::Value;
pub use ownership::{Intent, OwnershipDecision};
pub use type_registry::{native_type_by_name, static_type_by_name, type_registry, WrapperRegistration, WrapperType};
pub use identity_cache::identity_cache;
pub use object::{InstanceData, Object, WeakObject};
pub use object_ref::ObjectRef;
pub use class_registry::{register_class, ClassBuilder, ClassRegistration, ObjectSubclass, SlotResolution};
pub use dispatch::chain_up;
pub use signal::{ConnectionId, Reduction, SignalBinding, SignalDescriptor, SignalRegistration};
pub use boxed::{Boxed, BoxedMode};
pub use threads::DispatchGuard;
pub use dynamic_call::DynamicCall;
pub use logging::{LOG_ERROR, LOG_INFO, LOG_WARNING};
pub use ffi_guard::ffi_boundary;

// Re-export FFI types needed by generated wrappers.
pub use glimmer_ffi::{BoxedPtr, NativeHandle, NativeStatus, TypeTag, ValueKind};
