use crate::error::NativeStatus;
use crate::handles::*;
use crate::value::NativeValue;

// ---------------------------------------------------------------------------
// Callback signatures (Rust functions the native runtime calls)
// ---------------------------------------------------------------------------

/// One behavior-vtable slot. Every slot shares this signature; the slot index
/// is passed through so a single trampoline can serve several slots.
pub type SlotFn = unsafe extern "C" fn(
    instance: NativeHandle,
    slot: u32,
    args: *const NativeValue,
    n_args: u32,
    ret: *mut NativeValue,
);

/// Native signal closure. `user_data` is the value passed at connect time.
pub type MarshalFn = unsafe extern "C" fn(
    instance: NativeHandle,
    args: *const NativeValue,
    n_args: u32,
    ret: *mut NativeValue,
    user_data: u64,
);

/// Called when an instance carrying keyed attachment data is finalized.
pub type DestroyNotify = unsafe extern "C" fn(instance: NativeHandle, data: u64);

// ---------------------------------------------------------------------------
// Main API table
// ---------------------------------------------------------------------------

/// The table the native runtime hands to Rust at init time.
#[repr(C)]
pub struct NativeApiTable {
    pub version: u32,

    pub object: *const ObjectApi,
    pub types: *const TypeApi,
    pub qdata: *const QdataApi,
    pub signal: *const SignalApi,
    pub boxed: *const BoxedApi,
    pub logging: *const LoggingApi,
    pub threads: *const ThreadsApi,
}

unsafe impl Send for NativeApiTable {}
unsafe impl Sync for NativeApiTable {}

pub const API_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// ObjectApi
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct ObjectApi {
    /// Dynamic type of a live instance. `TypeTag::INVALID` for dead handles.
    pub type_of: unsafe extern "C" fn(obj: NativeHandle) -> TypeTag,

    /// Whether the handle refers to a live (not yet finalized) instance.
    pub is_alive: unsafe extern "C" fn(obj: NativeHandle) -> bool,

    /// Increment the reference count.
    pub ref_object: unsafe extern "C" fn(obj: NativeHandle),

    /// Decrement the reference count; finalizes the instance at zero.
    pub unref_object: unsafe extern "C" fn(obj: NativeHandle),

    /// Claim a floating reference (no increment). Plain `ref` if not floating.
    pub ref_sink: unsafe extern "C" fn(obj: NativeHandle),

    pub is_floating: unsafe extern "C" fn(obj: NativeHandle) -> bool,

    /// Current reference count. `0` for finalized handles.
    pub ref_count: unsafe extern "C" fn(obj: NativeHandle) -> u32,

    /// Construct an instance of `tag`. Returns a null handle on failure.
    pub new_instance: unsafe extern "C" fn(tag: TypeTag) -> NativeHandle,

    /// Call behavior `slot` through the instance's class vtable.
    pub invoke_slot: unsafe extern "C" fn(
        obj: NativeHandle,
        slot: u32,
        args: *const NativeValue,
        n_args: u32,
        ret: *mut NativeValue,
    ) -> NativeStatus,
}

// ---------------------------------------------------------------------------
// TypeApi
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct TypeApi {
    /// Parent of `tag`, `TypeTag::INVALID` for roots.
    pub parent_of: unsafe extern "C" fn(tag: TypeTag) -> TypeTag,

    /// Write the type name into a caller-supplied buffer (UTF-8).
    pub type_name: unsafe extern "C" fn(
        tag: TypeTag,
        buf: *mut u8,
        buf_len: u32,
        out_len: *mut u32,
    ) -> NativeStatus,

    pub from_name: unsafe extern "C" fn(name: *const u8, name_len: u32) -> TypeTag,

    /// Register a new subtype of `parent`. The new class starts with a copy of
    /// the parent's vtable. Returns `TypeTag::INVALID` if the name is taken.
    pub register_subtype: unsafe extern "C" fn(
        parent: TypeTag,
        name: *const u8,
        name_len: u32,
    ) -> TypeTag,

    pub slot_count: unsafe extern "C" fn(tag: TypeTag) -> u32,

    pub get_slot: unsafe extern "C" fn(tag: TypeTag, slot: u32) -> Option<SlotFn>,

    pub set_slot: unsafe extern "C" fn(tag: TypeTag, slot: u32, f: Option<SlotFn>) -> NativeStatus,

    /// Interface (capability) query.
    pub implements: unsafe extern "C" fn(tag: TypeTag, iface: TypeTag) -> bool,

    /// Ancestry query: `tag` equals or derives from `ancestor`.
    pub is_a: unsafe extern "C" fn(tag: TypeTag, ancestor: TypeTag) -> bool,
}

// ---------------------------------------------------------------------------
// QdataApi: per-instance keyed attachments
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct QdataApi {
    /// Attach `data` under `key`, replacing (without notifying) any prior value.
    pub set_qdata: unsafe extern "C" fn(
        obj: NativeHandle,
        key: u64,
        data: u64,
        notify: Option<DestroyNotify>,
    ) -> NativeStatus,

    /// `0` if nothing is attached under `key`.
    pub get_qdata: unsafe extern "C" fn(obj: NativeHandle, key: u64) -> u64,

    /// Detach and return the value without calling its notifier.
    pub steal_qdata: unsafe extern "C" fn(obj: NativeHandle, key: u64) -> u64,
}

// ---------------------------------------------------------------------------
// SignalApi
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct SignalApi {
    pub has_signal: unsafe extern "C" fn(tag: TypeTag, name: *const u8, name_len: u32) -> bool,

    /// Register a native closure. Returns `NativeHandlerId::NONE` on failure.
    pub connect: unsafe extern "C" fn(
        obj: NativeHandle,
        name: *const u8,
        name_len: u32,
        marshal: MarshalFn,
        user_data: u64,
    ) -> NativeHandlerId,

    pub disconnect: unsafe extern "C" fn(obj: NativeHandle, id: NativeHandlerId) -> NativeStatus,

    /// Emit a signal; every connected closure runs in connection order.
    pub emit: unsafe extern "C" fn(
        obj: NativeHandle,
        name: *const u8,
        name_len: u32,
        args: *const NativeValue,
        n_args: u32,
        ret: *mut NativeValue,
    ) -> NativeStatus,
}

// ---------------------------------------------------------------------------
// BoxedApi
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct BoxedApi {
    /// Deep copy of a boxed value. Null on failure.
    pub copy: unsafe extern "C" fn(boxed_type: TypeTag, src: BoxedPtr) -> BoxedPtr,
    pub free: unsafe extern "C" fn(boxed_type: TypeTag, ptr: BoxedPtr),
}

// ---------------------------------------------------------------------------
// LoggingApi
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct LoggingApi {
    /// `level`: 0=Info, 1=Warning, 2=Error.
    /// `msg` is a UTF-8 byte slice (not null-terminated).
    pub log: unsafe extern "C" fn(level: u8, msg: *const u8, msg_len: u32),
}

// ---------------------------------------------------------------------------
// ThreadsApi
// ---------------------------------------------------------------------------

#[repr(C)]
pub struct ThreadsApi {
    /// Acquire the runtime lock from a worker thread.
    pub enter: unsafe extern "C" fn(),
    pub leave: unsafe extern "C" fn(),
    pub is_dispatch_thread: unsafe extern "C" fn() -> bool,
}
