// In-process stand-in for the native runtime.
//
// Implements every sub-table of `NativeApiTable` over a single mutex-guarded
// state: a small type system (Object > InitiallyUnowned > Widget > Button /
// Label, the Activatable interface, two boxed types), reference-counted
// instances with floating references and keyed attachments, a signal
// emitter, boxed allocations and a log sink. Handles are opaque integers and
// are never reused.
//
// The state lock is never held while a Rust callback (slot, marshal,
// finalize notifier) runs.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Once, OnceLock};

use glimmer_ffi::abi::{signal_names, type_names, widget_slots, NativeRectangle, NativeTextIter};
use glimmer_ffi::*;
use log::LevelFilter;
use parking_lot::{Mutex, MutexGuard};

use crate::traits::{BoxedType, NativeClass, NativeInterface, StaticType};
use crate::type_registry::{static_type_by_name, type_registry};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

struct FakeType {
    name: String,
    parent: TypeTag,
    slots: Vec<Option<SlotFn>>,
    interfaces: Vec<TypeTag>,
    floating: bool,
    signals: Vec<String>,
    instantiable: bool,
    boxed_size: usize,
}

struct Handler {
    id: NativeHandlerId,
    name: String,
    marshal: MarshalFn,
    user_data: u64,
}

/// One recorded call of a native default slot implementation.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeCall {
    pub slot: u32,
    pub args: Vec<NativeValue>,
}

struct Instance {
    tag: TypeTag,
    refs: u32,
    floating: bool,
    alive: bool,
    qdata: HashMap<u64, (u64, Option<DestroyNotify>)>,
    handlers: Vec<Handler>,
    calls: Vec<NativeCall>,
    dead_calls: u32,
}

struct State {
    types: Vec<FakeType>,
    instances: HashMap<u64, Instance>,
    next_handle: u64,
    next_handler: u64,
    /// address -> (type, words)
    boxed: HashMap<u64, (TypeTag, usize)>,
    logs: Vec<String>,
    subtype_registrations: HashMap<String, u32>,
}

impl State {
    fn ty(&self, tag: TypeTag) -> Option<&FakeType> {
        if !tag.is_valid() {
            return None;
        }
        self.types.get(tag.0 as usize - 1)
    }

    fn tag_of(&self, name: &str) -> TypeTag {
        self.types
            .iter()
            .position(|t| t.name == name)
            .map(|i| TypeTag(i as u64 + 1))
            .unwrap_or(TypeTag::INVALID)
    }

    fn add_type(&mut self, ty: FakeType) -> TypeTag {
        self.types.push(ty);
        TypeTag(self.types.len() as u64)
    }

    fn ancestry(&self, tag: TypeTag) -> Vec<TypeTag> {
        let mut chain = Vec::new();
        let mut cursor = tag;
        while let Some(ty) = self.ty(cursor) {
            chain.push(cursor);
            cursor = ty.parent;
        }
        chain
    }

    fn has_signal(&self, tag: TypeTag, name: &str) -> bool {
        self.ancestry(tag)
            .into_iter()
            .filter_map(|t| self.ty(t))
            .any(|ty| ty.signals.iter().any(|s| s == name))
    }

    /// Live instance, counting misuse of finalized ones.
    fn live(&mut self, h: NativeHandle) -> Option<&mut Instance> {
        let inst = self.instances.get_mut(&h.to_addr())?;
        if inst.alive {
            Some(inst)
        } else {
            inst.dead_calls += 1;
            None
        }
    }
}

/// Native type with no wrapper registration anywhere in its ancestry.
pub const ORPHAN: &str = "FakeOrphan";

fn base_state() -> State {
    let mut s = State {
        types: Vec::new(),
        instances: HashMap::new(),
        next_handle: 0x1_0000,
        next_handler: 1,
        boxed: HashMap::new(),
        logs: Vec::new(),
        subtype_registrations: HashMap::new(),
    };
    let class = |name: &str, parent: TypeTag| FakeType {
        name: name.to_string(),
        parent,
        slots: Vec::new(),
        interfaces: Vec::new(),
        floating: false,
        signals: Vec::new(),
        instantiable: true,
        boxed_size: 0,
    };

    let mut object = class(type_names::OBJECT, TypeTag::INVALID);
    object.signals.push(signal_names::DESTROY.to_string());
    let object = s.add_type(object);

    let mut unowned = class(type_names::INITIALLY_UNOWNED, object);
    unowned.floating = true;
    let unowned = s.add_type(unowned);

    let mut widget = class(type_names::WIDGET, unowned);
    widget.floating = true;
    widget.slots = vec![Some(widget_activate), Some(widget_measure), Some(widget_grab_focus)];
    widget.signals = vec![
        signal_names::SHOW.to_string(),
        signal_names::KEY_PRESSED.to_string(),
        signal_names::SIZE_ALLOCATE.to_string(),
    ];
    let widget_slots_vec = widget.slots.clone();
    let widget = s.add_type(widget);

    let mut activatable = class(type_names::ACTIVATABLE, TypeTag::INVALID);
    activatable.instantiable = false;
    let activatable = s.add_type(activatable);

    let mut button = class(type_names::BUTTON, widget);
    button.floating = true;
    button.slots = widget_slots_vec.clone();
    button.slots[widget_slots::ACTIVATE as usize] = Some(button_activate);
    button.signals.push(signal_names::CLICKED.to_string());
    button.interfaces.push(activatable);
    s.add_type(button);

    let mut label = class(type_names::LABEL, widget);
    label.floating = true;
    label.slots = widget_slots_vec;
    s.add_type(label);

    // Floating root no wrapper type is ever registered for.
    let mut orphan = class(ORPHAN, TypeTag::INVALID);
    orphan.floating = true;
    s.add_type(orphan);

    for (name, size) in [
        (type_names::RECTANGLE, std::mem::size_of::<NativeRectangle>()),
        (type_names::TEXT_ITER, std::mem::size_of::<NativeTextIter>()),
    ] {
        let mut boxed = class(name, TypeTag::INVALID);
        boxed.instantiable = false;
        boxed.boxed_size = size;
        s.add_type(boxed);
    }
    s
}

fn state() -> MutexGuard<'static, State> {
    static STATE: OnceLock<Mutex<State>> = OnceLock::new();
    STATE.get_or_init(|| Mutex::new(base_state())).lock()
}

thread_local! {
    static ENTER_DEPTH: Cell<u32> = const { Cell::new(0) };
    static DISPATCH_THREAD: Cell<bool> = const { Cell::new(false) };
}

// ---------------------------------------------------------------------------
// Native default slot implementations
// ---------------------------------------------------------------------------

unsafe fn args_slice<'a>(args: *const NativeValue, n: u32) -> &'a [NativeValue] {
    if args.is_null() || n == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(args, n as usize) }
    }
}

fn record_call(h: NativeHandle, slot: u32, args: &[NativeValue]) {
    if let Some(inst) = state().live(h) {
        inst.calls.push(NativeCall {
            slot,
            args: args.to_vec(),
        });
    }
}

unsafe extern "C" fn widget_activate(
    h: NativeHandle,
    slot: u32,
    args: *const NativeValue,
    n: u32,
    _ret: *mut NativeValue,
) {
    record_call(h, slot, unsafe { args_slice(args, n) });
}

/// `measure(for_size) = for_size + 1`
unsafe extern "C" fn widget_measure(
    h: NativeHandle,
    slot: u32,
    args: *const NativeValue,
    n: u32,
    ret: *mut NativeValue,
) {
    let args = unsafe { args_slice(args, n) };
    record_call(h, slot, args);
    let for_size = args.first().and_then(NativeValue::as_int).unwrap_or(0);
    if !ret.is_null() {
        unsafe { *ret = NativeValue::int(for_size + 1) };
    }
}

unsafe extern "C" fn widget_grab_focus(
    h: NativeHandle,
    slot: u32,
    args: *const NativeValue,
    n: u32,
    ret: *mut NativeValue,
) {
    record_call(h, slot, unsafe { args_slice(args, n) });
    if !ret.is_null() {
        unsafe { *ret = NativeValue::bool(true) };
    }
}

/// Button's activate emits `clicked`.
unsafe extern "C" fn button_activate(
    h: NativeHandle,
    slot: u32,
    args: *const NativeValue,
    n: u32,
    _ret: *mut NativeValue,
) {
    record_call(h, slot, unsafe { args_slice(args, n) });
    emit(h, signal_names::CLICKED, &[]);
}

// ---------------------------------------------------------------------------
// ObjectApi
// ---------------------------------------------------------------------------

unsafe extern "C" fn obj_type_of(h: NativeHandle) -> TypeTag {
    state().live(h).map(|i| i.tag).unwrap_or(TypeTag::INVALID)
}

unsafe extern "C" fn obj_is_alive(h: NativeHandle) -> bool {
    state().instances.get(&h.to_addr()).is_some_and(|i| i.alive)
}

unsafe extern "C" fn obj_ref(h: NativeHandle) {
    if let Some(inst) = state().live(h) {
        inst.refs += 1;
    }
}

unsafe extern "C" fn obj_unref(h: NativeHandle) {
    let notifiers = {
        let mut s = state();
        let Some(inst) = s.live(h) else { return };
        inst.refs = inst.refs.saturating_sub(1);
        if inst.refs > 0 {
            return;
        }
        inst.alive = false;
        inst.floating = false;
        inst.handlers.clear();
        inst.qdata.drain().map(|(_, v)| v).collect::<Vec<_>>()
    };
    for (data, notify) in notifiers {
        if let Some(notify) = notify {
            unsafe { notify(h, data) };
        }
    }
}

unsafe extern "C" fn obj_ref_sink(h: NativeHandle) {
    if let Some(inst) = state().live(h) {
        if inst.floating {
            inst.floating = false;
        } else {
            inst.refs += 1;
        }
    }
}

unsafe extern "C" fn obj_is_floating(h: NativeHandle) -> bool {
    state().live(h).is_some_and(|i| i.floating)
}

unsafe extern "C" fn obj_ref_count(h: NativeHandle) -> u32 {
    state()
        .instances
        .get(&h.to_addr())
        .filter(|i| i.alive)
        .map_or(0, |i| i.refs)
}

unsafe extern "C" fn obj_new_instance(tag: TypeTag) -> NativeHandle {
    let mut s = state();
    let Some(ty) = s.ty(tag) else {
        return NativeHandle::NULL;
    };
    if !ty.instantiable {
        return NativeHandle::NULL;
    }
    let floating = ty.floating;
    let addr = s.next_handle;
    s.next_handle += 0x10;
    s.instances.insert(
        addr,
        Instance {
            tag,
            refs: 1,
            floating,
            alive: true,
            qdata: HashMap::new(),
            handlers: Vec::new(),
            calls: Vec::new(),
            dead_calls: 0,
        },
    );
    NativeHandle::from_addr(addr)
}

unsafe extern "C" fn obj_invoke_slot(
    h: NativeHandle,
    slot: u32,
    args: *const NativeValue,
    n: u32,
    ret: *mut NativeValue,
) -> NativeStatus {
    let f = {
        let mut s = state();
        let Some(tag) = s.live(h).map(|i| i.tag) else {
            return NativeStatus::InvalidHandle;
        };
        let Some(ty) = s.ty(tag) else {
            return NativeStatus::UnknownType;
        };
        match ty.slots.get(slot as usize) {
            Some(f) => *f,
            None => return NativeStatus::InvalidSlot,
        }
    };
    if let Some(f) = f {
        unsafe { f(h, slot, args, n, ret) };
    }
    NativeStatus::Ok
}

static OBJECT_API: ObjectApi = ObjectApi {
    type_of: obj_type_of,
    is_alive: obj_is_alive,
    ref_object: obj_ref,
    unref_object: obj_unref,
    ref_sink: obj_ref_sink,
    is_floating: obj_is_floating,
    ref_count: obj_ref_count,
    new_instance: obj_new_instance,
    invoke_slot: obj_invoke_slot,
};

// ---------------------------------------------------------------------------
// TypeApi
// ---------------------------------------------------------------------------

unsafe fn str_arg<'a>(ptr: *const u8, len: u32) -> &'a str {
    if ptr.is_null() {
        return "";
    }
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len as usize) };
    std::str::from_utf8(bytes).unwrap_or("")
}

unsafe extern "C" fn ty_parent_of(tag: TypeTag) -> TypeTag {
    state().ty(tag).map_or(TypeTag::INVALID, |t| t.parent)
}

unsafe extern "C" fn ty_name(tag: TypeTag, buf: *mut u8, buf_len: u32, out_len: *mut u32) -> NativeStatus {
    let s = state();
    let Some(ty) = s.ty(tag) else {
        return NativeStatus::UnknownType;
    };
    let bytes = ty.name.as_bytes();
    if !out_len.is_null() {
        unsafe { *out_len = bytes.len() as u32 };
    }
    if bytes.len() > buf_len as usize {
        return NativeStatus::BufferTooSmall;
    }
    unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf, bytes.len()) };
    NativeStatus::Ok
}

unsafe extern "C" fn ty_from_name(name: *const u8, len: u32) -> TypeTag {
    let name = unsafe { str_arg(name, len) };
    state().tag_of(name)
}

unsafe extern "C" fn ty_register_subtype(parent: TypeTag, name: *const u8, len: u32) -> TypeTag {
    let name = unsafe { str_arg(name, len) };
    let mut s = state();
    if name.is_empty() || s.tag_of(name).is_valid() {
        return TypeTag::INVALID;
    }
    let Some(p) = s.ty(parent) else {
        return TypeTag::INVALID;
    };
    if !p.instantiable {
        return TypeTag::INVALID;
    }
    let ty = FakeType {
        name: name.to_string(),
        parent,
        slots: p.slots.clone(),
        interfaces: Vec::new(),
        floating: p.floating,
        signals: Vec::new(),
        instantiable: true,
        boxed_size: 0,
    };
    *s.subtype_registrations.entry(name.to_string()).or_insert(0) += 1;
    s.add_type(ty)
}

unsafe extern "C" fn ty_slot_count(tag: TypeTag) -> u32 {
    state().ty(tag).map_or(0, |t| t.slots.len() as u32)
}

unsafe extern "C" fn ty_get_slot(tag: TypeTag, slot: u32) -> Option<SlotFn> {
    state().ty(tag).and_then(|t| t.slots.get(slot as usize).copied().flatten())
}

unsafe extern "C" fn ty_set_slot(tag: TypeTag, slot: u32, f: Option<SlotFn>) -> NativeStatus {
    let mut s = state();
    if !tag.is_valid() || tag.0 as usize > s.types.len() {
        return NativeStatus::UnknownType;
    }
    let ty = &mut s.types[tag.0 as usize - 1];
    match ty.slots.get_mut(slot as usize) {
        Some(cell) => {
            *cell = f;
            NativeStatus::Ok
        }
        None => NativeStatus::InvalidSlot,
    }
}

unsafe extern "C" fn ty_implements(tag: TypeTag, iface: TypeTag) -> bool {
    let s = state();
    s.ancestry(tag)
        .into_iter()
        .filter_map(|t| s.ty(t))
        .any(|ty| ty.interfaces.contains(&iface))
}

unsafe extern "C" fn ty_is_a(tag: TypeTag, ancestor: TypeTag) -> bool {
    ancestor.is_valid() && state().ancestry(tag).contains(&ancestor)
}

static TYPE_API: TypeApi = TypeApi {
    parent_of: ty_parent_of,
    type_name: ty_name,
    from_name: ty_from_name,
    register_subtype: ty_register_subtype,
    slot_count: ty_slot_count,
    get_slot: ty_get_slot,
    set_slot: ty_set_slot,
    implements: ty_implements,
    is_a: ty_is_a,
};

// ---------------------------------------------------------------------------
// QdataApi
// ---------------------------------------------------------------------------

unsafe extern "C" fn qd_set(h: NativeHandle, key: u64, data: u64, notify: Option<DestroyNotify>) -> NativeStatus {
    match state().live(h) {
        Some(inst) => {
            inst.qdata.insert(key, (data, notify));
            NativeStatus::Ok
        }
        None => NativeStatus::InvalidHandle,
    }
}

unsafe extern "C" fn qd_get(h: NativeHandle, key: u64) -> u64 {
    state()
        .live(h)
        .and_then(|i| i.qdata.get(&key).map(|(d, _)| *d))
        .unwrap_or(0)
}

unsafe extern "C" fn qd_steal(h: NativeHandle, key: u64) -> u64 {
    state()
        .live(h)
        .and_then(|i| i.qdata.remove(&key).map(|(d, _)| d))
        .unwrap_or(0)
}

static QDATA_API: QdataApi = QdataApi {
    set_qdata: qd_set,
    get_qdata: qd_get,
    steal_qdata: qd_steal,
};

// ---------------------------------------------------------------------------
// SignalApi
// ---------------------------------------------------------------------------

unsafe extern "C" fn sig_has(tag: TypeTag, name: *const u8, len: u32) -> bool {
    let name = unsafe { str_arg(name, len) };
    state().has_signal(tag, name)
}

unsafe extern "C" fn sig_connect(
    h: NativeHandle,
    name: *const u8,
    len: u32,
    marshal: MarshalFn,
    user_data: u64,
) -> NativeHandlerId {
    let name = unsafe { str_arg(name, len) };
    let mut s = state();
    let Some(tag) = s.live(h).map(|i| i.tag) else {
        return NativeHandlerId::NONE;
    };
    if !s.has_signal(tag, name) {
        return NativeHandlerId::NONE;
    }
    let id = NativeHandlerId(s.next_handler);
    s.next_handler += 1;
    if let Some(inst) = s.live(h) {
        inst.handlers.push(Handler {
            id,
            name: name.to_string(),
            marshal,
            user_data,
        });
    }
    id
}

unsafe extern "C" fn sig_disconnect(h: NativeHandle, id: NativeHandlerId) -> NativeStatus {
    let mut s = state();
    let Some(inst) = s.live(h) else {
        return NativeStatus::InvalidHandle;
    };
    match inst.handlers.iter().position(|hd| hd.id == id) {
        Some(pos) => {
            inst.handlers.remove(pos);
            NativeStatus::Ok
        }
        None => NativeStatus::NotConnected,
    }
}

unsafe extern "C" fn sig_emit(
    h: NativeHandle,
    name: *const u8,
    len: u32,
    args: *const NativeValue,
    n: u32,
    ret: *mut NativeValue,
) -> NativeStatus {
    let name = unsafe { str_arg(name, len) };
    let snapshot: Vec<(NativeHandlerId, MarshalFn, u64)> = {
        let mut s = state();
        let Some(tag) = s.live(h).map(|i| i.tag) else {
            return NativeStatus::InvalidHandle;
        };
        if !s.has_signal(tag, name) {
            return NativeStatus::UnknownSignal;
        }
        match s.live(h) {
            Some(inst) => inst
                .handlers
                .iter()
                .filter(|hd| hd.name == name)
                .map(|hd| (hd.id, hd.marshal, hd.user_data))
                .collect(),
            None => Vec::new(),
        }
    };
    for (id, marshal, user_data) in snapshot {
        // Handlers removed by an earlier handler do not run.
        let still_connected = state()
            .instances
            .get(&h.to_addr())
            .is_some_and(|i| i.alive && i.handlers.iter().any(|hd| hd.id == id));
        if still_connected {
            unsafe { marshal(h, args, n, ret, user_data) };
        }
    }
    NativeStatus::Ok
}

static SIGNAL_API: SignalApi = SignalApi {
    has_signal: sig_has,
    connect: sig_connect,
    disconnect: sig_disconnect,
    emit: sig_emit,
};

// ---------------------------------------------------------------------------
// BoxedApi
// ---------------------------------------------------------------------------

unsafe extern "C" fn bx_copy(boxed_type: TypeTag, src: BoxedPtr) -> BoxedPtr {
    if src.is_null() {
        return BoxedPtr::NULL;
    }
    let mut s = state();
    let size = match s.ty(boxed_type) {
        Some(ty) if ty.boxed_size > 0 => ty.boxed_size,
        _ => return BoxedPtr::NULL,
    };
    let words = size.div_ceil(8);
    let dst = Box::into_raw(vec![0u64; words].into_boxed_slice()) as *mut u64;
    unsafe { std::ptr::copy_nonoverlapping(src.0 as *const u8, dst as *mut u8, size) };
    s.boxed.insert(dst as usize as u64, (boxed_type, words));
    BoxedPtr(dst as *mut std::ffi::c_void)
}

unsafe extern "C" fn bx_free(_boxed_type: TypeTag, ptr: BoxedPtr) {
    let entry = state().boxed.remove(&(ptr.0 as usize as u64));
    if let Some((_, words)) = entry {
        let slice = std::ptr::slice_from_raw_parts_mut(ptr.0 as *mut u64, words);
        drop(unsafe { Box::from_raw(slice) });
    }
}

static BOXED_API: BoxedApi = BoxedApi {
    copy: bx_copy,
    free: bx_free,
};

// ---------------------------------------------------------------------------
// LoggingApi / ThreadsApi
// ---------------------------------------------------------------------------

unsafe extern "C" fn log_line(level: u8, msg: *const u8, len: u32) {
    let msg = unsafe { str_arg(msg, len) };
    let tag = match level {
        crate::logging::LOG_ERROR => "E",
        crate::logging::LOG_WARNING => "W",
        _ => "I",
    };
    state().logs.push(format!("[{tag}] {msg}"));
}

static LOGGING_API: LoggingApi = LoggingApi { log: log_line };

unsafe extern "C" fn th_enter() {
    ENTER_DEPTH.with(|d| d.set(d.get() + 1));
}

unsafe extern "C" fn th_leave() {
    ENTER_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
}

unsafe extern "C" fn th_is_dispatch_thread() -> bool {
    DISPATCH_THREAD.with(Cell::get)
}

static THREADS_API: ThreadsApi = ThreadsApi {
    enter: th_enter,
    leave: th_leave,
    is_dispatch_thread: th_is_dispatch_thread,
};

static API_TABLE: NativeApiTable = NativeApiTable {
    version: API_VERSION,
    object: &OBJECT_API,
    types: &TYPE_API,
    qdata: &QDATA_API,
    signal: &SIGNAL_API,
    boxed: &BOXED_API,
    logging: &LOGGING_API,
    threads: &THREADS_API,
};

/// The fake's API table, for callers that install it themselves.
pub fn api_table() -> *const NativeApiTable {
    &API_TABLE
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Install the fake (once per process) and register the base wrapper types.
pub fn install() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        crate::api::try_init_api(&API_TABLE);
        crate::logging::init(LevelFilter::Debug);
    });
    for name in [
        type_names::OBJECT,
        type_names::INITIALLY_UNOWNED,
        type_names::WIDGET,
        type_names::BUTTON,
    ] {
        if let Err(err) = type_registry().register_by_name(name) {
            log::error!("[fake] {err}");
        }
    }
}

pub fn type_tag(name: &str) -> TypeTag {
    state().tag_of(name)
}

/// New instance of the named type, refcount 1 (floating for widgets).
pub fn new_instance(type_name: &str) -> NativeHandle {
    new_instance_of(type_tag(type_name))
}

pub fn new_instance_of(tag: TypeTag) -> NativeHandle {
    unsafe { obj_new_instance(tag) }
}

pub fn ref_count(h: NativeHandle) -> u32 {
    unsafe { obj_ref_count(h) }
}

pub fn is_floating(h: NativeHandle) -> bool {
    unsafe { obj_is_floating(h) }
}

pub fn is_alive(h: NativeHandle) -> bool {
    unsafe { obj_is_alive(h) }
}

pub fn ref_object(h: NativeHandle) {
    unsafe { obj_ref(h) }
}

/// Drop one reference the way native code would.
pub fn unref(h: NativeHandle) {
    unsafe { obj_unref(h) }
}

/// Claim a floating reference and drop it.
pub fn sink_and_unref(h: NativeHandle) {
    unsafe {
        obj_ref_sink(h);
        obj_unref(h);
    }
}

/// Calls of native default slot implementations on `h`.
pub fn native_calls(h: NativeHandle) -> Vec<NativeCall> {
    state()
        .instances
        .get(&h.to_addr())
        .map(|i| i.calls.clone())
        .unwrap_or_default()
}

pub fn take_native_calls(h: NativeHandle) -> Vec<NativeCall> {
    state()
        .instances
        .get_mut(&h.to_addr())
        .map(|i| std::mem::take(&mut i.calls))
        .unwrap_or_default()
}

/// How often `h` was used after it was finalized.
pub fn dead_calls(h: NativeHandle) -> u32 {
    state().instances.get(&h.to_addr()).map_or(0, |i| i.dead_calls)
}

/// Native closures connected to `name` on `h`.
pub fn handler_count(h: NativeHandle, name: &str) -> usize {
    state()
        .instances
        .get(&h.to_addr())
        .map_or(0, |i| i.handlers.iter().filter(|hd| hd.name == name).count())
}

pub fn qdata(h: NativeHandle, key: u64) -> Option<u64> {
    state()
        .instances
        .get(&h.to_addr())
        .and_then(|i| i.qdata.get(&key).map(|(d, _)| *d))
}

/// Emit a signal from the native side.
pub fn emit(h: NativeHandle, name: &str, args: &[NativeValue]) -> (NativeStatus, NativeValue) {
    let mut ret = NativeValue::none();
    let status = unsafe {
        sig_emit(
            h,
            name.as_ptr(),
            name.len() as u32,
            args.as_ptr(),
            args.len() as u32,
            &mut ret,
        )
    };
    (status, ret)
}

pub fn logs() -> Vec<String> {
    state().logs.clone()
}

/// Live instances whose exact type is `type_name`.
pub fn live_instance_count(type_name: &str) -> usize {
    let s = state();
    let tag = s.tag_of(type_name);
    s.instances.values().filter(|i| i.alive && i.tag == tag).count()
}

pub fn is_boxed_live(ptr: BoxedPtr) -> bool {
    state().boxed.contains_key(&(ptr.0 as usize as u64))
}

pub fn live_boxed_count() -> usize {
    state().boxed.len()
}

pub fn subtype_registrations(name: &str) -> u32 {
    state().subtype_registrations.get(name).copied().unwrap_or(0)
}

/// Depth of the enter/leave bracket on the current thread.
pub fn enter_depth() -> u32 {
    ENTER_DEPTH.with(Cell::get)
}

/// Treat the current thread as the native dispatch thread.
pub fn mark_dispatch_thread() {
    DISPATCH_THREAD.with(|d| d.set(true));
}

// ---------------------------------------------------------------------------
// Marker types for the fake's native classes
// ---------------------------------------------------------------------------

macro_rules! fake_class {
    ($ty:ident, $name:expr) => {
        pub struct $ty;

        impl StaticType for $ty {
            const TYPE_NAME: &'static str = $name;

            fn static_type() -> TypeTag {
                static CELL: OnceLock<TypeTag> = OnceLock::new();
                static_type_by_name($name, &CELL)
            }
        }
    };
}

fake_class!(FakeObject, type_names::OBJECT);
fake_class!(FakeWidget, type_names::WIDGET);
fake_class!(FakeButton, type_names::BUTTON);
fake_class!(FakeActivatable, type_names::ACTIVATABLE);

impl NativeClass for FakeObject {}
impl NativeClass for FakeWidget {}
impl NativeClass for FakeButton {}
impl NativeInterface for FakeActivatable {}

impl crate::traits::HasParent for FakeButton {
    type Parent = FakeWidget;
}

pub struct FakeRectangle;

impl BoxedType for FakeRectangle {
    const TYPE_NAME: &'static str = type_names::RECTANGLE;
    type Native = NativeRectangle;

    fn static_type() -> TypeTag {
        type_tag(type_names::RECTANGLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_copies_parent_vtable() {
        install();
        let widget = type_tag(type_names::WIDGET);
        let sub = unsafe { ty_register_subtype(widget, b"FakeTestSub".as_ptr(), 11) };
        assert!(sub.is_valid());
        assert_eq!(unsafe { ty_slot_count(sub) }, widget_slots::COUNT);
        assert!(unsafe { ty_is_a(sub, widget) });
        // Name is now taken.
        let again = unsafe { ty_register_subtype(widget, b"FakeTestSub".as_ptr(), 11) };
        assert!(!again.is_valid());
    }

    #[test]
    fn finalize_runs_notifiers_and_clears_handlers() {
        install();
        let h = new_instance(type_names::OBJECT);
        unsafe { qd_set(h, 7, 42, None) };
        assert_eq!(qdata(h, 7), Some(42));
        unref(h);
        assert!(!is_alive(h));
        assert_eq!(qdata(h, 7), None);
        unref(h);
        assert_eq!(dead_calls(h), 1);
    }

    #[test]
    fn button_implements_activatable() {
        install();
        let button = type_tag(type_names::BUTTON);
        assert!(unsafe { ty_implements(button, type_tag(type_names::ACTIVATABLE)) });
        assert!(!unsafe { ty_implements(type_tag(type_names::LABEL), type_tag(type_names::ACTIVATABLE)) });
    }
}
