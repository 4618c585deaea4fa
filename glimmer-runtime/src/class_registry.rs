// Class registration for Rust subclasses of native classes.
//
// `register_class::<T>()` creates the native subtype once per process,
// collects the slot overrides declared in `T::class_init`, captures the
// parent's slot functions and patches the overridden slots with
// `dispatch::vfunc_trampoline::<T>`. The per-slot decision is stored in a
// `ClassDescriptor` so dispatch never has to look at the vtable again.
//
// Two tables hold descriptors. The dispatch table is filled before any slot
// is patched and is never cleared, so a patched slot always finds its
// resolution, even after shutdown. The published table is filled last, once
// the slots and the wrapper type are in place; `register_class` and
// `descriptor` only see fully registered classes.
//
// Registration of a subclass whose parent is itself a Rust subclass recurses
// (through `T::Parent::static_type()`), hence the reentrant slow-path lock.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use glimmer_ffi::{NativeStatus, SlotFn, TypeTag};
use parking_lot::{ReentrantMutex, RwLock};

use crate::dispatch;
use crate::error::{GlimmerError, GlimmerResult};
use crate::ffi_dispatch;
use crate::object::Object;
use crate::traits::{NativeClass, StaticType};
use crate::type_registry::{type_registry, ImpConstructor, WrapperType};
use crate::value::Value;

/// A Rust subclass of a native class.
///
/// The implementing type is the per-instance state: one `Default` value is
/// created per native instance and dropped when that instance is finalized.
/// Access it with [`Object::imp`] or `ObjectRef::<T>::imp`.
pub trait ObjectSubclass: Default + Send + Sync + 'static {
    /// Native type name of the new subtype. Must be unique per process.
    const NAME: &'static str;

    type Parent: NativeClass;

    /// Declare slot overrides.
    fn class_init(_klass: &mut ClassBuilder<Self>) {}
}

/// Type-erased override. `None` means the override could not run (the
/// instance carries no state for this subclass) and dispatch chains up.
pub type OverrideFn = dyn Fn(&Object, &[Value]) -> Option<Value> + Send + Sync;

/// Per-slot outcome of class registration.
#[derive(Clone)]
pub enum SlotResolution {
    /// Rust handler, plus the parent's function for chain-up.
    Override {
        handler: Arc<OverrideFn>,
        parent: Option<SlotFn>,
    },
    /// Not overridden; the slot still holds the parent's function.
    ChainUp(SlotFn),
    /// Neither an override nor a parent implementation.
    Absent,
}

impl SlotResolution {
    pub fn parent(&self) -> Option<SlotFn> {
        match self {
            SlotResolution::Override { parent, .. } => *parent,
            SlotResolution::ChainUp(f) => Some(*f),
            SlotResolution::Absent => None,
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self, SlotResolution::Override { .. })
    }
}

impl std::fmt::Debug for SlotResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotResolution::Override { parent, .. } => f
                .debug_struct("Override")
                .field("has_parent", &parent.is_some())
                .finish(),
            SlotResolution::ChainUp(_) => f.write_str("ChainUp"),
            SlotResolution::Absent => f.write_str("Absent"),
        }
    }
}

/// Collects the overrides a subclass declares in `class_init`.
pub struct ClassBuilder<T: ObjectSubclass> {
    overrides: Vec<(u32, Arc<OverrideFn>)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ObjectSubclass> ClassBuilder<T> {
    fn new() -> Self {
        ClassBuilder {
            overrides: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Override behavior `slot`. The handler receives the instance state, the
    /// wrapper, and the converted arguments. A later override of the same
    /// slot replaces the earlier one.
    pub fn override_vfunc<F>(&mut self, slot: u32, handler: F) -> &mut Self
    where
        F: Fn(&T, &Object, &[Value]) -> Value + Send + Sync + 'static,
    {
        let erased: Arc<OverrideFn> =
            Arc::new(move |obj: &Object, args: &[Value]| obj.imp::<T>().map(|imp| handler(imp, obj, args)));
        self.overrides.retain(|(s, _)| *s != slot);
        self.overrides.push((slot, erased));
        self
    }
}

/// Registered class of a Rust subclass.
#[derive(Debug)]
pub struct ClassDescriptor {
    pub name: &'static str,
    pub tag: TypeTag,
    pub parent: TypeTag,
    slots: Vec<SlotResolution>,
}

impl ClassDescriptor {
    /// `Absent` for out-of-range slots.
    pub fn resolution(&self, slot: u32) -> SlotResolution {
        self.slots
            .get(slot as usize)
            .cloned()
            .unwrap_or(SlotResolution::Absent)
    }

    pub fn parent_slot(&self, slot: u32) -> Option<SlotFn> {
        self.slots.get(slot as usize).and_then(SlotResolution::parent)
    }

    pub fn overrides(&self, slot: u32) -> bool {
        self.slots
            .get(slot as usize)
            .is_some_and(SlotResolution::is_override)
    }

    pub fn slot_count(&self) -> u32 {
        self.slots.len() as u32
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

fn descriptors() -> &'static RwLock<HashMap<TypeId, Arc<ClassDescriptor>>> {
    static DESCRIPTORS: OnceLock<RwLock<HashMap<TypeId, Arc<ClassDescriptor>>>> = OnceLock::new();
    DESCRIPTORS.get_or_init(|| RwLock::new(HashMap::new()))
}

// Survives `clear()`: patched vtables outlive a shutdown.
fn dispatch_table() -> &'static RwLock<HashMap<TypeId, Arc<ClassDescriptor>>> {
    static DISPATCH: OnceLock<RwLock<HashMap<TypeId, Arc<ClassDescriptor>>>> = OnceLock::new();
    DISPATCH.get_or_init(|| RwLock::new(HashMap::new()))
}

fn registration_lock() -> &'static ReentrantMutex<()> {
    static LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| ReentrantMutex::new(()))
}

fn new_imp<T: ObjectSubclass>() -> Arc<dyn Any + Send + Sync> {
    Arc::new(T::default())
}

/// The descriptor of `T`, if it has been registered.
pub fn descriptor<T: ObjectSubclass>() -> Option<Arc<ClassDescriptor>> {
    descriptors().read().get(&TypeId::of::<T>()).cloned()
}

/// The slot resolutions the trampoline of `T` dispatches through. Present
/// from the moment the first slot is patched, and kept across `clear()`.
pub(crate) fn dispatch_descriptor<T: ObjectSubclass>() -> Option<Arc<ClassDescriptor>> {
    dispatch_table().read().get(&TypeId::of::<T>()).cloned()
}

/// Register `T` with the native runtime (once) and return its type tag.
pub fn register_class<T: ObjectSubclass>() -> GlimmerResult<TypeTag> {
    if let Some(desc) = descriptor::<T>() {
        return Ok(desc.tag);
    }
    let _guard = registration_lock().lock();
    // Re-check: another thread may have finished while we waited.
    if let Some(desc) = descriptor::<T>() {
        return Ok(desc.tag);
    }

    let parent = T::Parent::static_type();
    if !parent.is_valid() {
        return Err(GlimmerError::RegistrationFailed(format!(
            "{}: parent type {} is not known to the native runtime",
            T::NAME,
            <T::Parent as StaticType>::TYPE_NAME
        )));
    }

    let mut builder = ClassBuilder::<T>::new();
    T::class_init(&mut builder);

    let slot_count = ffi_dispatch::type_slot_count(parent);
    if let Some((slot, _)) = builder.overrides.iter().find(|(slot, _)| *slot >= slot_count) {
        return Err(GlimmerError::RegistrationFailed(format!(
            "{}: slot {slot} is out of range ({slot_count} slots)",
            T::NAME
        )));
    }

    let tag = native_subtype(T::NAME, parent)?;

    let mut slots = Vec::with_capacity(slot_count as usize);
    for slot in 0..slot_count {
        let parent_fn = ffi_dispatch::type_get_slot(parent, slot);
        let handler = builder
            .overrides
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, h)| h.clone());
        let resolution = match (handler, parent_fn) {
            (Some(handler), parent) => SlotResolution::Override { handler, parent },
            (None, Some(f)) => SlotResolution::ChainUp(f),
            (None, None) => SlotResolution::Absent,
        };
        slots.push(resolution);
    }

    let desc = Arc::new(ClassDescriptor {
        name: T::NAME,
        tag,
        parent,
        slots,
    });
    // Slot calls can start as soon as the first slot is patched.
    dispatch_table().write().insert(TypeId::of::<T>(), desc.clone());

    for (slot, _) in &builder.overrides {
        let status = ffi_dispatch::type_set_slot(tag, *slot, Some(dispatch::vfunc_trampoline::<T>));
        if status != NativeStatus::Ok {
            return Err(GlimmerError::RegistrationFailed(format!(
                "{}: native runtime rejected slot {slot}: {status:?}",
                T::NAME
            )));
        }
    }

    let mut imp_chain: Vec<ImpConstructor> = type_registry()
        .get(parent)
        .map(|p| p.imp_chain.clone())
        .unwrap_or_default();
    imp_chain.push(new_imp::<T>);
    type_registry().register(WrapperType {
        name: T::NAME.to_string(),
        tag,
        imp_chain,
    });

    descriptors().write().insert(TypeId::of::<T>(), desc.clone());

    log::info!(
        "[glimmer] registered class {} ({} override(s))",
        T::NAME,
        builder.overrides.len()
    );
    Ok(desc.tag)
}

/// Reuse a native type of the same name and parent (left over from an
/// earlier init), otherwise create it.
fn native_subtype(name: &str, parent: TypeTag) -> GlimmerResult<TypeTag> {
    let existing = ffi_dispatch::type_from_name(name);
    if existing.is_valid() {
        if ffi_dispatch::type_parent_of(existing) == parent {
            return Ok(existing);
        }
        return Err(GlimmerError::RegistrationFailed(format!(
            "{name}: native type name already taken by a type with another parent"
        )));
    }
    let tag = ffi_dispatch::type_register_subtype(parent, name);
    if tag.is_valid() {
        Ok(tag)
    } else {
        Err(GlimmerError::RegistrationFailed(format!(
            "{name}: native runtime refused the subtype"
        )))
    }
}

/// `StaticType::static_type` for subclasses. Registration errors are logged
/// and yield `TypeTag::INVALID`.
pub fn subclass_static_type<T: ObjectSubclass>() -> TypeTag {
    match register_class::<T>() {
        Ok(tag) => tag,
        Err(err) => {
            log::error!("[glimmer] {err}");
            TypeTag::INVALID
        }
    }
}

/// Forget every published descriptor. Native types, patched vtables and
/// the dispatch table stay in place; the next `register_class` reuses them.
pub fn clear() {
    descriptors().write().clear();
}

// ---------------------------------------------------------------------------
// inventory
// ---------------------------------------------------------------------------

/// Submitted by [`impl_subclass_type!`](crate::impl_subclass_type) so
/// `glimmer::init` can register every subclass up front.
pub struct ClassRegistration {
    pub name: &'static str,
    pub register: fn() -> GlimmerResult<TypeTag>,
}

impl ClassRegistration {
    pub const fn of<T: ObjectSubclass>() -> Self {
        ClassRegistration {
            name: T::NAME,
            register: register_class::<T>,
        }
    }
}

inventory::collect!(ClassRegistration);

/// Register every submitted subclass. Returns the number registered.
pub fn register_all_from_inventory() -> usize {
    let mut count = 0usize;
    for reg in inventory::iter::<ClassRegistration> {
        match (reg.register)() {
            Ok(_) => count += 1,
            Err(err) => log::error!("[glimmer] failed to register class {}: {err}", reg.name),
        }
    }
    count
}

/// Implement the type traits for an [`ObjectSubclass`] and submit it for
/// registration at `glimmer::init`.
///
/// ```ignore
/// #[derive(Default)]
/// struct Toggle { active: AtomicBool }
///
/// impl ObjectSubclass for Toggle {
///     const NAME: &'static str = "Toggle";
///     type Parent = Button;
/// }
/// glimmer_runtime::impl_subclass_type!(Toggle);
/// ```
#[macro_export]
macro_rules! impl_subclass_type {
    ($ty:ty) => {
        impl $crate::traits::StaticType for $ty {
            const TYPE_NAME: &'static str = <$ty as $crate::class_registry::ObjectSubclass>::NAME;

            fn static_type() -> $crate::TypeTag {
                $crate::class_registry::subclass_static_type::<$ty>()
            }
        }

        impl $crate::traits::NativeClass for $ty {}

        impl $crate::traits::HasParent for $ty {
            type Parent = <$ty as $crate::class_registry::ObjectSubclass>::Parent;
        }

        $crate::__inventory::submit! {
            $crate::class_registry::ClassRegistration::of::<$ty>()
        }
    };
}
