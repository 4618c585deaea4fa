// Signal/slot connections.
//
// Each wrapper owns a `SignalTable`: per signal name, an ordered observer
// list plus the id of the single native closure that feeds it. The first
// observer for a (wrapper, signal) pair registers that closure; the last
// disconnect removes it. Connections live as long as the wrapper that holds
// them; dropping the wrapper disconnects everything it carried.
//
// Dispatch iterates a snapshot of the observer list, so observers may
// connect or disconnect (themselves or others) while a signal is running.
// Disconnected observers are skipped through their `live` flag.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;
use glimmer_ffi::{MarshalFn, NativeHandle, NativeHandlerId, NativeValue, TypeTag, ValueKind};
use parking_lot::RwLock;

use crate::error::{check_native, GlimmerError, GlimmerResult};
use crate::ffi_dispatch;
use crate::ffi_guard::{ffi_boundary, panic_message};
use crate::identity_cache;
use crate::object::{Object, ObjectInner};
use crate::value::Value;

/// Identifies one observer. Unique for the life of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// How the return values of several observers become the signal's result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reduction {
    /// No result; every observer runs.
    #[default]
    Ignore,
    /// The last observer's result.
    Last,
    /// The first truthy result. Every observer still runs.
    FirstTruthy,
}

/// Observer callback: the emitting instance and the converted arguments.
pub type SignalHandler = dyn Fn(&Object, &[Value]) -> Value + Send + Sync;

/// Static description of a signal.
#[derive(Clone)]
pub struct SignalDescriptor {
    pub owner: TypeTag,
    pub name: String,
    /// Declared argument kinds. Empty means "take the cells as they come".
    pub param_kinds: Vec<ValueKind>,
    pub return_kind: ValueKind,
    pub reduction: Reduction,
    pub marshal: MarshalFn,
}

impl SignalDescriptor {
    pub fn new(owner: TypeTag, name: &str) -> Self {
        SignalDescriptor {
            owner,
            name: name.to_string(),
            param_kinds: Vec::new(),
            return_kind: ValueKind::None,
            reduction: Reduction::Ignore,
            marshal: marshal_trampoline,
        }
    }

    pub fn params(mut self, kinds: &[ValueKind]) -> Self {
        self.param_kinds = kinds.to_vec();
        self
    }

    pub fn returns(mut self, kind: ValueKind, reduction: Reduction) -> Self {
        self.return_kind = kind;
        self.reduction = reduction;
        self
    }
}

impl std::fmt::Debug for SignalDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalDescriptor")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("param_kinds", &self.param_kinds)
            .field("return_kind", &self.return_kind)
            .field("reduction", &self.reduction)
            .finish()
    }
}

/// Submitted by generated wrapper modules.
pub struct SignalRegistration {
    pub owner_type: &'static str,
    pub name: &'static str,
    pub param_kinds: &'static [ValueKind],
    pub return_kind: ValueKind,
    pub reduction: Reduction,
}
inventory::collect!(SignalRegistration);

// ---------------------------------------------------------------------------
// Descriptor registry
// ---------------------------------------------------------------------------

type DescriptorMap = HashMap<(TypeTag, String), Arc<SignalDescriptor>>;

fn descriptors() -> &'static RwLock<DescriptorMap> {
    static DESCRIPTORS: OnceLock<RwLock<DescriptorMap>> = OnceLock::new();
    DESCRIPTORS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register (or replace) a signal descriptor.
pub fn register_signal(desc: SignalDescriptor) -> Arc<SignalDescriptor> {
    let desc = Arc::new(desc);
    descriptors()
        .write()
        .insert((desc.owner, desc.name.clone()), desc.clone());
    desc
}

/// Register every submitted `SignalRegistration`. Returns the number
/// registered.
pub fn register_all_from_inventory() -> usize {
    let mut count = 0usize;
    for reg in inventory::iter::<SignalRegistration> {
        let owner = ffi_dispatch::type_from_name(reg.owner_type);
        if !owner.is_valid() {
            log::warn!(
                "[glimmer] skipping signal {}::{}: unknown native type",
                reg.owner_type,
                reg.name
            );
            continue;
        }
        register_signal(
            SignalDescriptor::new(owner, reg.name)
                .params(reg.param_kinds)
                .returns(reg.return_kind, reg.reduction),
        );
        count += 1;
    }
    count
}

/// Descriptor for `name` on `tag` or its nearest ancestor. A signal known
/// only to the native runtime gets a default descriptor.
pub fn find_descriptor(tag: TypeTag, name: &str) -> GlimmerResult<Arc<SignalDescriptor>> {
    {
        let map = descriptors().read();
        let mut cursor = tag;
        while cursor.is_valid() {
            if let Some(desc) = map.get(&(cursor, name.to_string())) {
                return Ok(desc.clone());
            }
            cursor = ffi_dispatch::type_parent_of(cursor);
        }
    }
    if ffi_dispatch::signal_has(tag, name) {
        log::debug!("[glimmer] no descriptor for signal {name}; using defaults");
        return Ok(register_signal(
            SignalDescriptor::new(tag, name).returns(ValueKind::None, Reduction::Last),
        ));
    }
    Err(GlimmerError::UnknownSignal {
        type_name: ffi_dispatch::type_name(tag),
        signal: name.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Per-wrapper table
// ---------------------------------------------------------------------------

struct Observer {
    id: ConnectionId,
    callback: Arc<SignalHandler>,
    live: AtomicBool,
    blocked: AtomicBool,
}

struct SignalSlot {
    /// Passed to the native closure as user data.
    key: u64,
    native_id: NativeHandlerId,
    descriptor: Arc<SignalDescriptor>,
    observers: Vec<Arc<Observer>>,
}

/// Observer lists of one wrapper, keyed by signal name.
#[derive(Default)]
pub struct SignalTable {
    slots: HashMap<String, SignalSlot>,
}

impl SignalTable {
    fn by_key(&self, key: u64) -> Option<&SignalSlot> {
        self.slots.values().find(|s| s.key == key)
    }

    fn find_observer(&self, name: &str, id: ConnectionId) -> Option<&Arc<Observer>> {
        self.slots.get(name)?.observers.iter().find(|o| o.id == id)
    }
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SLOT_KEY: AtomicU64 = AtomicU64::new(1);

/// Connection id -> (owning wrapper, signal name).
fn connections() -> &'static DashMap<u64, (Weak<ObjectInner>, String)> {
    static CONNECTIONS: OnceLock<DashMap<u64, (Weak<ObjectInner>, String)>> = OnceLock::new();
    CONNECTIONS.get_or_init(DashMap::new)
}

/// Resolve a connection id to its wrapper and signal name. The map guard
/// is released before the wrapper is upgraded.
fn resolve(id: ConnectionId) -> GlimmerResult<Option<(Object, String)>> {
    let entry = connections().get(&id.0).map(|e| e.value().clone());
    let Some((weak, name)) = entry else {
        return Err(GlimmerError::UnknownConnection(id.0));
    };
    Ok(weak.upgrade().map(|inner| (Object::from_inner(inner), name)))
}

// ---------------------------------------------------------------------------
// Public operations
// ---------------------------------------------------------------------------

/// Append `handler` to the observers of `name` on `obj`.
pub fn connect<F>(obj: &Object, name: &str, handler: F) -> GlimmerResult<ConnectionId>
where
    F: Fn(&Object, &[Value]) -> Value + Send + Sync + 'static,
{
    let handle = obj.checked_handle()?;
    match identity_cache::lookup(handle) {
        Some(attached) if Object::ptr_eq(&attached, obj) => {}
        _ => {
            return Err(GlimmerError::DanglingSignalConnection {
                signal: name.to_string(),
            });
        }
    }
    let descriptor = find_descriptor(ffi_dispatch::object_type_of(handle), name)?;

    let id = ConnectionId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
    let observer = Arc::new(Observer {
        id,
        callback: Arc::new(handler),
        live: AtomicBool::new(true),
        blocked: AtomicBool::new(false),
    });

    {
        let mut table = obj.inner.signals.lock();
        match table.slots.get_mut(name) {
            Some(slot) => slot.observers.push(observer),
            None => {
                let key = NEXT_SLOT_KEY.fetch_add(1, Ordering::Relaxed);
                let native_id = ffi_dispatch::signal_connect(handle, name, descriptor.marshal, key);
                if !native_id.is_connected() {
                    return Err(GlimmerError::UnknownSignal {
                        type_name: obj.type_name().to_string(),
                        signal: name.to_string(),
                    });
                }
                log::trace!("[glimmer] native closure {native_id:?} for {name} on {:?}", handle);
                table.slots.insert(
                    name.to_string(),
                    SignalSlot {
                        key,
                        native_id,
                        descriptor,
                        observers: vec![observer],
                    },
                );
            }
        }
    }

    connections().insert(id.0, (Arc::downgrade(&obj.inner), name.to_string()));
    Ok(id)
}

/// Like [`connect`], but the connection ends when the returned binding is
/// dropped.
pub fn connect_scoped<F>(obj: &Object, name: &str, handler: F) -> GlimmerResult<SignalBinding>
where
    F: Fn(&Object, &[Value]) -> Value + Send + Sync + 'static,
{
    connect(obj, name, handler).map(|id| SignalBinding { id: Some(id) })
}

/// Remove one observer. The native closure goes away with the last one.
pub fn disconnect(id: ConnectionId) -> GlimmerResult<()> {
    let Some((_, (weak, name))) = connections().remove(&id.0) else {
        return Err(GlimmerError::UnknownConnection(id.0));
    };
    // A dropped wrapper has already released its connections.
    let Some(inner) = weak.upgrade() else {
        return Ok(());
    };
    let obj = Object::from_inner(inner);

    let emptied = {
        let mut table = obj.inner.signals.lock();
        let Some(slot) = table.slots.get_mut(&name) else {
            return Ok(());
        };
        if let Some(pos) = slot.observers.iter().position(|o| o.id == id) {
            let observer = slot.observers.remove(pos);
            observer.live.store(false, Ordering::Release);
        }
        if slot.observers.is_empty() {
            table.slots.remove(&name).map(|slot| slot.native_id)
        } else {
            None
        }
    };

    if let Some(native_id) = emptied {
        if obj.is_alive() {
            ffi_dispatch::signal_disconnect(obj.handle(), native_id);
        }
    }
    Ok(())
}

fn set_blocked(id: ConnectionId, blocked: bool) -> GlimmerResult<()> {
    let Some((obj, name)) = resolve(id)? else {
        return Err(GlimmerError::UnknownConnection(id.0));
    };
    let table = obj.inner.signals.lock();
    match table.find_observer(&name, id) {
        Some(observer) => {
            observer.blocked.store(blocked, Ordering::Release);
            Ok(())
        }
        None => Err(GlimmerError::UnknownConnection(id.0)),
    }
}

/// Skip this observer until [`unblock`] is called.
pub fn block(id: ConnectionId) -> GlimmerResult<()> {
    set_blocked(id, true)
}

pub fn unblock(id: ConnectionId) -> GlimmerResult<()> {
    set_blocked(id, false)
}

/// Ids of the observers of `name` on `obj`, in firing order.
pub fn observer_ids(obj: &Object, name: &str) -> Vec<ConnectionId> {
    obj.inner
        .signals
        .lock()
        .slots
        .get(name)
        .map(|slot| slot.observers.iter().map(|o| o.id).collect())
        .unwrap_or_default()
}

/// Emit `name` on `obj` through the native runtime. Native and Rust
/// observers both run.
pub fn emit(obj: &Object, name: &str, args: &[Value]) -> GlimmerResult<Value> {
    let handle = obj.checked_handle()?;
    let descriptor = find_descriptor(ffi_dispatch::object_type_of(handle), name)?;
    let native: Vec<NativeValue> = args.iter().map(Value::to_native).collect();
    let (status, ret) = ffi_dispatch::signal_emit(handle, name, &native);
    check_native(status)?;
    Ok(Value::from_native_result(&ret, descriptor.return_kind))
}

/// RAII connection: disconnects when dropped.
#[must_use = "the connection ends when the binding is dropped"]
#[derive(Debug)]
pub struct SignalBinding {
    id: Option<ConnectionId>,
}

impl SignalBinding {
    pub fn id(&self) -> Option<ConnectionId> {
        self.id
    }

    /// Keep the connection for the lifetime of the wrapper.
    pub fn detach(mut self) -> Option<ConnectionId> {
        self.id.take()
    }

    pub fn disconnect(mut self) -> GlimmerResult<()> {
        match self.id.take() {
            Some(id) => disconnect(id),
            None => Ok(()),
        }
    }
}

impl Drop for SignalBinding {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            if let Err(err) = disconnect(id) {
                log::debug!("[glimmer] binding drop: {err}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Native entry point
// ---------------------------------------------------------------------------

/// Default marshal installed for every connected (wrapper, signal) pair.
///
/// # Safety
/// Called by the native runtime only, with `n_args` valid cells at `args`.
pub unsafe extern "C" fn marshal_trampoline(
    instance: NativeHandle,
    args: *const NativeValue,
    n_args: u32,
    ret: *mut NativeValue,
    user_data: u64,
) {
    let native_args: &[NativeValue] = if args.is_null() || n_args == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(args, n_args as usize) }
    };
    ffi_boundary(
        (),
        AssertUnwindSafe(|| run_observers(instance, native_args, ret, user_data)),
    );
}

fn run_observers(instance: NativeHandle, args: &[NativeValue], ret: *mut NativeValue, key: u64) {
    let Some(obj) = identity_cache::lookup(instance) else {
        log::debug!("[glimmer] signal for unwrapped instance {:#x} ignored", instance.to_addr());
        return;
    };
    let (descriptor, observers) = {
        let table = obj.inner.signals.lock();
        match table.by_key(key) {
            Some(slot) => (slot.descriptor.clone(), slot.observers.clone()),
            None => return,
        }
    };

    let values = convert_args(&descriptor, args);
    let mut result: Option<Value> = None;
    for observer in &observers {
        if !observer.live.load(Ordering::Acquire) || observer.blocked.load(Ordering::Acquire) {
            continue;
        }
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| (observer.callback)(&obj, &values)));
        let value = match outcome {
            Ok(value) => value,
            Err(payload) => {
                log::error!(
                    "{} (observer {} of signal {})",
                    panic_message(&payload),
                    observer.id.0,
                    descriptor.name
                );
                continue;
            }
        };
        match descriptor.reduction {
            Reduction::Ignore => {}
            Reduction::Last => result = Some(value),
            Reduction::FirstTruthy => {
                if result.is_none() && value.is_truthy() {
                    result = Some(value);
                }
            }
        }
    }

    if descriptor.reduction == Reduction::Ignore || ret.is_null() {
        return;
    }
    let mut value = result.unwrap_or_else(|| Value::default_for(descriptor.return_kind));
    if descriptor.return_kind != ValueKind::None && value.kind() != descriptor.return_kind {
        log::warn!(
            "[glimmer] signal {} expects a {:?} result, observer returned {:?}",
            descriptor.name,
            descriptor.return_kind,
            value.kind()
        );
        value = Value::default_for(descriptor.return_kind);
    }
    // SAFETY: the native emitter owns `ret` for the duration of the call.
    unsafe { *ret = value.to_native_result() };
}

/// Convert once per dispatch. Declared kinds win; missing or mismatched
/// cells become the kind's default.
fn convert_args(descriptor: &SignalDescriptor, args: &[NativeValue]) -> Vec<Value> {
    if descriptor.param_kinds.is_empty() {
        return args.iter().map(Value::from_native).collect();
    }
    descriptor
        .param_kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| match args.get(i) {
            Some(cell) => Value::from_native_expecting(cell, *kind),
            None => {
                log::warn!(
                    "[glimmer] signal {} missing argument {i}; substituting default",
                    descriptor.name
                );
                Value::default_for(*kind)
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

/// Release everything a dropped wrapper was connected to.
pub(crate) fn release_table(table: &mut SignalTable, handle: NativeHandle, alive: bool) {
    for (_, slot) in table.slots.drain() {
        for observer in &slot.observers {
            observer.live.store(false, Ordering::Release);
            connections().remove(&observer.id.0);
        }
        if alive {
            ffi_dispatch::signal_disconnect(handle, slot.native_id);
        }
    }
}

/// Forget every descriptor and connection id. Wrappers still holding
/// observers keep them until they are dropped.
pub fn clear_all() {
    connections().clear();
    descriptors().write().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake;
    use crate::type_registry::type_registry;
    use glimmer_ffi::abi::{signal_names, type_names};
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU32;

    fn widget() -> Object {
        fake::install();
        Object::construct(fake::type_tag(type_names::WIDGET)).unwrap()
    }

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn observers_fire_in_connection_order() {
        let w = widget();
        let log = recorder();
        for tag in ["a", "b", "c"] {
            let log = log.clone();
            connect(&w, signal_names::SHOW, move |_, _| {
                log.lock().push(tag);
                Value::None
            })
            .unwrap();
        }
        emit(&w, signal_names::SHOW, &[]).unwrap();
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
        // One native closure serves all three observers.
        assert_eq!(fake::handler_count(w.handle(), signal_names::SHOW), 1);
    }

    #[test]
    fn last_disconnect_removes_native_closure() {
        let w = widget();
        let a = connect(&w, signal_names::SHOW, |_, _| Value::None).unwrap();
        let b = connect(&w, signal_names::SHOW, |_, _| Value::None).unwrap();
        disconnect(a).unwrap();
        assert_eq!(fake::handler_count(w.handle(), signal_names::SHOW), 1);
        assert_eq!(observer_ids(&w, signal_names::SHOW), vec![b]);
        disconnect(b).unwrap();
        assert_eq!(fake::handler_count(w.handle(), signal_names::SHOW), 0);
        assert_eq!(disconnect(b), Err(GlimmerError::UnknownConnection(b.as_u64())));
    }

    #[test]
    fn disconnect_during_dispatch_skips_victim() {
        let w = widget();
        let log = recorder();
        let victim: Arc<Mutex<Option<ConnectionId>>> = Arc::new(Mutex::new(None));

        let (l, v) = (log.clone(), victim.clone());
        connect(&w, signal_names::SHOW, move |_, _| {
            l.lock().push("first");
            if let Some(id) = *v.lock() {
                disconnect(id).unwrap();
            }
            Value::None
        })
        .unwrap();
        let l = log.clone();
        let id = connect(&w, signal_names::SHOW, move |_, _| {
            l.lock().push("second");
            Value::None
        })
        .unwrap();
        *victim.lock() = Some(id);

        emit(&w, signal_names::SHOW, &[]).unwrap();
        assert_eq!(*log.lock(), vec!["first"]);
    }

    #[test]
    fn sole_observer_disconnecting_itself_releases_native_closure() {
        let w = widget();
        let hits = Arc::new(AtomicU32::new(0));
        let own: Arc<Mutex<Option<ConnectionId>>> = Arc::new(Mutex::new(None));

        let (h, o) = (hits.clone(), own.clone());
        let id = connect(&w, signal_names::SHOW, move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = o.lock().take() {
                disconnect(id).unwrap();
            }
            Value::None
        })
        .unwrap();
        *own.lock() = Some(id);

        emit(&w, signal_names::SHOW, &[]).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(observer_ids(&w, signal_names::SHOW).is_empty());
        assert_eq!(fake::handler_count(w.handle(), signal_names::SHOW), 0);

        emit(&w, signal_names::SHOW, &[]).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn object_returned_by_last_observer_stays_alive() {
        fake::install();
        let button_tag = fake::type_tag(type_names::BUTTON);
        let button = Object::construct(button_tag).unwrap();
        register_signal(
            SignalDescriptor::new(button_tag, signal_names::SHOW).returns(ValueKind::Object, Reduction::Last),
        );
        connect(&button, signal_names::SHOW, |_, _| {
            match Object::construct(fake::type_tag(type_names::WIDGET)) {
                Ok(made) => Value::Object(Some(made)),
                Err(_) => Value::None,
            }
        })
        .unwrap();

        let r = emit(&button, signal_names::SHOW, &[]).unwrap();
        let made = r.as_object().unwrap().handle();
        assert!(fake::is_alive(made));
        assert_eq!(fake::ref_count(made), 1);
        drop(r);
        assert!(!fake::is_alive(made));
    }

    #[test]
    fn panicking_observer_does_not_stop_later_ones() {
        let w = widget();
        let log = recorder();
        connect(&w, signal_names::SHOW, |_, _| panic!("observer exploded")).unwrap();
        let l = log.clone();
        connect(&w, signal_names::SHOW, move |_, _| {
            l.lock().push("after");
            Value::None
        })
        .unwrap();
        emit(&w, signal_names::SHOW, &[]).unwrap();
        assert_eq!(*log.lock(), vec!["after"]);
        assert!(fake::logs().iter().any(|l| l.contains("observer exploded")));
    }

    #[test]
    fn first_truthy_runs_everyone_and_picks_first() {
        let w = widget();
        register_signal(
            SignalDescriptor::new(fake::type_tag(type_names::WIDGET), signal_names::KEY_PRESSED)
                .params(&[ValueKind::Int])
                .returns(ValueKind::Bool, Reduction::FirstTruthy),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        for (i, handled) in [(1, false), (2, true), (3, true)] {
            let seen = seen.clone();
            connect(&w, signal_names::KEY_PRESSED, move |_, args| {
                seen.lock().push((i, args[0].as_int().unwrap_or(-1)));
                Value::Bool(handled)
            })
            .unwrap();
        }
        let r = emit(&w, signal_names::KEY_PRESSED, &[Value::Int(65)]).unwrap();
        assert_eq!(r, Value::Bool(true));
        assert_eq!(*seen.lock(), vec![(1, 65), (2, 65), (3, 65)]);
    }

    #[test]
    fn mismatched_argument_becomes_default() {
        let w = widget();
        register_signal(
            SignalDescriptor::new(fake::type_tag(type_names::WIDGET), signal_names::SIZE_ALLOCATE)
                .params(&[ValueKind::Int, ValueKind::Int]),
        );
        let got = Arc::new(Mutex::new(Vec::new()));
        let g = got.clone();
        connect(&w, signal_names::SIZE_ALLOCATE, move |_, args| {
            g.lock().extend_from_slice(args);
            Value::None
        })
        .unwrap();
        emit(&w, signal_names::SIZE_ALLOCATE, &[Value::Str("wide".into())]).unwrap();
        assert_eq!(*got.lock(), vec![Value::Int(0), Value::Int(0)]);
    }

    #[test]
    fn blocked_observer_is_skipped() {
        let w = widget();
        let log = recorder();
        let l = log.clone();
        let id = connect(&w, signal_names::SHOW, move |_, _| {
            l.lock().push("x");
            Value::None
        })
        .unwrap();
        block(id).unwrap();
        emit(&w, signal_names::SHOW, &[]).unwrap();
        unblock(id).unwrap();
        emit(&w, signal_names::SHOW, &[]).unwrap();
        assert_eq!(*log.lock(), vec!["x"]);
    }

    #[test]
    fn unknown_signal_is_rejected() {
        let w = widget();
        assert!(matches!(
            connect(&w, "no-such-signal", |_, _| Value::None),
            Err(GlimmerError::UnknownSignal { .. })
        ));
    }

    #[test]
    fn unattached_wrapper_cannot_connect() {
        fake::install();
        let h = fake::new_instance(type_names::OBJECT);
        let wtype = type_registry().register_by_name(type_names::OBJECT).unwrap();
        let detached = Object::new(h, false, wtype, None);
        assert!(matches!(
            connect(&detached, signal_names::DESTROY, |_, _| Value::None),
            Err(GlimmerError::DanglingSignalConnection { .. })
        ));
        drop(detached);
        fake::unref(h);
    }

    #[test]
    fn scoped_binding_disconnects_on_drop() {
        let w = widget();
        let binding = connect_scoped(&w, signal_names::SHOW, |_, _| Value::None).unwrap();
        assert_eq!(observer_ids(&w, signal_names::SHOW).len(), 1);
        drop(binding);
        assert!(observer_ids(&w, signal_names::SHOW).is_empty());
        assert_eq!(fake::handler_count(w.handle(), signal_names::SHOW), 0);
    }

    #[test]
    fn dropping_wrapper_releases_native_closures() {
        fake::install();
        let h = fake::new_instance(type_names::OBJECT);
        let w = Object::wrap(h).unwrap();
        let id = connect(&w, signal_names::DESTROY, |_, _| Value::None).unwrap();
        assert_eq!(fake::handler_count(h, signal_names::DESTROY), 1);
        drop(w);
        assert_eq!(fake::handler_count(h, signal_names::DESTROY), 0);
        assert_eq!(disconnect(id), Err(GlimmerError::UnknownConnection(id.as_u64())));
        fake::unref(h);
    }
}
