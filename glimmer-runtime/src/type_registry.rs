// Type registry: native type tag -> most-derived known wrapper type.
//
// Generated wrappers register their native type name (through `inventory`
// or lazily on first `static_type()`); subclasses register themselves from
// `register_class`. Lookups walk the native ancestry until a registered
// type is found and memoize the answer per tag. Every registration bumps a
// generation counter; an answer computed under an older generation is
// returned but not memoized.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use glimmer_ffi::TypeTag;
use parking_lot::RwLock;

use crate::error::{GlimmerError, GlimmerResult};
use crate::ffi_dispatch;

/// Constructor for subclass instance data.
pub type ImpConstructor = fn() -> Arc<dyn Any + Send + Sync>;

/// Wrapper-side description of a native type.
pub struct WrapperType {
    pub name: String,
    pub tag: TypeTag,
    /// Set for Rust subclasses: one constructor per subclass level, root
    /// first. Empty for plain wrappers.
    pub(crate) imp_chain: Vec<ImpConstructor>,
}

impl WrapperType {
    pub fn is_subclass(&self) -> bool {
        !self.imp_chain.is_empty()
    }
}

impl std::fmt::Debug for WrapperType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrapperType")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("subclass", &self.is_subclass())
            .finish()
    }
}

/// Submitted by generated wrapper modules so `glimmer::init` can register
/// every wrapper type up front.
pub struct WrapperRegistration {
    pub type_name: &'static str,
}
inventory::collect!(WrapperRegistration);

pub struct TypeRegistry {
    known: RwLock<HashMap<TypeTag, Arc<WrapperType>>>,
    resolved: RwLock<HashMap<TypeTag, Arc<WrapperType>>>,
    generation: AtomicU64,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            known: RwLock::new(HashMap::new()),
            resolved: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Register a wrapper type. Idempotent: an existing entry for the same
    /// tag is returned unchanged.
    pub fn register(&self, info: WrapperType) -> Arc<WrapperType> {
        let mut known = self.known.write();
        if let Some(existing) = known.get(&info.tag) {
            return existing.clone();
        }
        let tag = info.tag;
        let info = Arc::new(info);
        known.insert(tag, info.clone());
        self.generation.fetch_add(1, Ordering::AcqRel);
        drop(known);
        // A new registration can make some memoized answers less derived
        // than they should be.
        self.resolved.write().clear();
        log::debug!("[glimmer] registered wrapper type {} ({:?})", info.name, tag);
        info
    }

    /// Register a plain (non-subclass) wrapper for the named native type.
    pub fn register_by_name(&self, type_name: &str) -> GlimmerResult<Arc<WrapperType>> {
        let tag = ffi_dispatch::type_from_name(type_name);
        if !tag.is_valid() {
            return Err(GlimmerError::RegistrationFailed(format!(
                "native runtime does not know type {type_name}"
            )));
        }
        Ok(self.register(WrapperType {
            name: type_name.to_string(),
            tag,
            imp_chain: Vec::new(),
        }))
    }

    pub fn get(&self, tag: TypeTag) -> Option<Arc<WrapperType>> {
        self.known.read().get(&tag).cloned()
    }

    /// Most-derived registered wrapper type for `tag`, walking the native
    /// ancestry. `UnregisteredType` if no ancestor is known.
    pub fn most_derived(&self, tag: TypeTag) -> GlimmerResult<Arc<WrapperType>> {
        if let Some(hit) = self.resolved.read().get(&tag) {
            return Ok(hit.clone());
        }
        let (found, generation) = self.walk_ancestry(tag);
        match found {
            Some(info) => {
                self.memoize(tag, &info, generation);
                Ok(info)
            }
            None => Err(GlimmerError::UnregisteredType {
                type_name: ffi_dispatch::type_name(tag),
            }),
        }
    }

    /// First registered ancestor of `tag` (itself included), with the
    /// generation the answer was computed under.
    fn walk_ancestry(&self, tag: TypeTag) -> (Option<Arc<WrapperType>>, u64) {
        let known = self.known.read();
        let generation = self.generation.load(Ordering::Acquire);
        let mut cursor = tag;
        while cursor.is_valid() {
            if let Some(info) = known.get(&cursor) {
                return (Some(info.clone()), generation);
            }
            cursor = ffi_dispatch::type_parent_of(cursor);
        }
        (None, generation)
    }

    fn memoize(&self, tag: TypeTag, info: &Arc<WrapperType>, generation: u64) {
        let mut resolved = self.resolved.write();
        if self.generation.load(Ordering::Acquire) == generation {
            resolved.insert(tag, info.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.known.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every registration. Called from `glimmer::shutdown`.
    pub fn clear(&self) {
        let mut known = self.known.write();
        known.clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
        drop(known);
        self.resolved.write().clear();
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide registry.
pub fn type_registry() -> &'static TypeRegistry {
    static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(TypeRegistry::new)
}

/// Resolve (and register) the native type behind a generated wrapper.
/// Generated `static_type()` impls call this with their own cache cell.
pub fn static_type_by_name(type_name: &str, cell: &OnceLock<TypeTag>) -> TypeTag {
    *cell.get_or_init(|| match type_registry().register_by_name(type_name) {
        Ok(info) => info.tag,
        Err(err) => {
            log::error!("[glimmer] {err}");
            TypeTag::INVALID
        }
    })
}

/// Resolve a native type tag without registering a wrapper. Used by boxed
/// types and interfaces.
pub fn native_type_by_name(type_name: &str, cell: &OnceLock<TypeTag>) -> TypeTag {
    let tag = *cell.get_or_init(|| ffi_dispatch::type_from_name(type_name));
    if !tag.is_valid() {
        log::error!("[glimmer] native runtime does not know type {type_name}");
    }
    tag
}

/// Register every `WrapperRegistration` submitted through `inventory`.
/// Returns the number of types registered.
pub fn register_all_from_inventory() -> usize {
    let mut count = 0usize;
    for reg in inventory::iter::<WrapperRegistration> {
        match type_registry().register_by_name(reg.type_name) {
            Ok(_) => count += 1,
            Err(err) => log::warn!("[glimmer] skipping wrapper {}: {err}", reg.type_name),
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake;
    use glimmer_ffi::abi::type_names;

    #[test]
    fn most_derived_walks_ancestry() {
        fake::install();
        let registry = TypeRegistry::new();
        registry.register_by_name(type_names::WIDGET).unwrap();

        let button = fake::type_tag(type_names::BUTTON);
        let resolved = registry.most_derived(button).unwrap();
        assert_eq!(resolved.name, type_names::WIDGET);

        // Registering Button makes it the most-derived answer.
        registry.register_by_name(type_names::BUTTON).unwrap();
        assert_eq!(registry.most_derived(button).unwrap().name, type_names::BUTTON);
    }

    #[test]
    fn unknown_ancestry_is_unregistered_type() {
        fake::install();
        let registry = TypeRegistry::new();
        let label = fake::type_tag(type_names::LABEL);
        match registry.most_derived(label) {
            Err(GlimmerError::UnregisteredType { type_name }) => assert_eq!(type_name, type_names::LABEL),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn register_is_idempotent() {
        fake::install();
        let registry = TypeRegistry::new();
        let a = registry.register_by_name(type_names::OBJECT).unwrap();
        let b = registry.register_by_name(type_names::OBJECT).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_native_name_fails() {
        fake::install();
        let registry = TypeRegistry::new();
        assert!(matches!(
            registry.register_by_name("NoSuchType"),
            Err(GlimmerError::RegistrationFailed(_))
        ));
    }

    #[test]
    fn answer_from_before_a_registration_is_not_memoized() {
        fake::install();
        let registry = TypeRegistry::new();
        registry.register_by_name(type_names::WIDGET).unwrap();
        let button = fake::type_tag(type_names::BUTTON);

        // A lookup that finished its walk just before Button was registered.
        let (stale, generation) = registry.walk_ancestry(button);
        let stale = stale.unwrap();
        assert_eq!(stale.name, type_names::WIDGET);
        registry.register_by_name(type_names::BUTTON).unwrap();
        registry.memoize(button, &stale, generation);

        assert_eq!(registry.most_derived(button).unwrap().name, type_names::BUTTON);
    }

    #[test]
    fn lookups_racing_registration_settle_on_most_derived() {
        fake::install();
        let registry = TypeRegistry::new();
        registry.register_by_name(type_names::WIDGET).unwrap();
        let button = fake::type_tag(type_names::BUTTON);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        registry.most_derived(button).unwrap();
                    }
                });
            }
            s.spawn(|| registry.register_by_name(type_names::BUTTON).unwrap());
        });
        assert_eq!(registry.most_derived(button).unwrap().name, type_names::BUTTON);
    }
}
