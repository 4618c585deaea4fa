// Thin wrappers over the native API table. Every call into the native runtime
// goes through this module so the rest of the crate stays free of raw table
// access.
//
// The native runtime validates handles it receives (dead handles produce
// `InvalidHandle`/defaults), so these wrappers are safe to call with any
// handle value. Callers still check liveness first to avoid handle reuse.

use glimmer_ffi::{
    BoxedPtr, DestroyNotify, MarshalFn, NativeHandle, NativeHandlerId, NativeStatus, NativeValue,
    SlotFn, TypeTag,
};

use crate::api::api;

// ---------------------------------------------------------------------------
// Object
// ---------------------------------------------------------------------------

#[inline]
pub fn object_type_of(obj: NativeHandle) -> TypeTag {
    unsafe { ((*api().object).type_of)(obj) }
}

#[inline]
pub fn object_is_alive(obj: NativeHandle) -> bool {
    !obj.is_null() && unsafe { ((*api().object).is_alive)(obj) }
}

#[inline]
pub fn object_ref(obj: NativeHandle) {
    unsafe { ((*api().object).ref_object)(obj) }
}

#[inline]
pub fn object_unref(obj: NativeHandle) {
    unsafe { ((*api().object).unref_object)(obj) }
}

#[inline]
pub fn object_ref_sink(obj: NativeHandle) {
    unsafe { ((*api().object).ref_sink)(obj) }
}

#[inline]
pub fn object_is_floating(obj: NativeHandle) -> bool {
    unsafe { ((*api().object).is_floating)(obj) }
}

#[inline]
pub fn object_ref_count(obj: NativeHandle) -> u32 {
    unsafe { ((*api().object).ref_count)(obj) }
}

#[inline]
pub fn object_new_instance(tag: TypeTag) -> NativeHandle {
    unsafe { ((*api().object).new_instance)(tag) }
}

/// Call `slot` through the instance's vtable. Returns the status and the
/// slot's result cell.
pub fn object_invoke_slot(
    obj: NativeHandle,
    slot: u32,
    args: &[NativeValue],
) -> (NativeStatus, NativeValue) {
    let mut ret = NativeValue::none();
    let status = unsafe {
        ((*api().object).invoke_slot)(obj, slot, args.as_ptr(), args.len() as u32, &mut ret)
    };
    (status, ret)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[inline]
pub fn type_parent_of(tag: TypeTag) -> TypeTag {
    unsafe { ((*api().types).parent_of)(tag) }
}

/// Name of a native type, or `"<invalid>"` for unknown tags.
pub fn type_name(tag: TypeTag) -> String {
    let mut buf = vec![0u8; 128];
    let mut out_len: u32 = 0;
    let mut status = unsafe {
        ((*api().types).type_name)(tag, buf.as_mut_ptr(), buf.len() as u32, &mut out_len)
    };
    if status == NativeStatus::BufferTooSmall && out_len as usize > buf.len() {
        // The runtime reported the full length; retry once at that size.
        buf.resize(out_len as usize, 0);
        status = unsafe {
            ((*api().types).type_name)(tag, buf.as_mut_ptr(), buf.len() as u32, &mut out_len)
        };
    }
    if status != NativeStatus::Ok {
        return "<invalid>".to_string();
    }
    let len = (out_len as usize).min(buf.len());
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

#[inline]
pub fn type_from_name(name: &str) -> TypeTag {
    unsafe { ((*api().types).from_name)(name.as_ptr(), name.len() as u32) }
}

#[inline]
pub fn type_register_subtype(parent: TypeTag, name: &str) -> TypeTag {
    unsafe { ((*api().types).register_subtype)(parent, name.as_ptr(), name.len() as u32) }
}

#[inline]
pub fn type_slot_count(tag: TypeTag) -> u32 {
    unsafe { ((*api().types).slot_count)(tag) }
}

#[inline]
pub fn type_get_slot(tag: TypeTag, slot: u32) -> Option<SlotFn> {
    unsafe { ((*api().types).get_slot)(tag, slot) }
}

#[inline]
pub fn type_set_slot(tag: TypeTag, slot: u32, f: Option<SlotFn>) -> NativeStatus {
    unsafe { ((*api().types).set_slot)(tag, slot, f) }
}

#[inline]
pub fn type_implements(tag: TypeTag, iface: TypeTag) -> bool {
    unsafe { ((*api().types).implements)(tag, iface) }
}

#[inline]
pub fn type_is_a(tag: TypeTag, ancestor: TypeTag) -> bool {
    unsafe { ((*api().types).is_a)(tag, ancestor) }
}

// ---------------------------------------------------------------------------
// Qdata
// ---------------------------------------------------------------------------

#[inline]
pub fn qdata_set(obj: NativeHandle, key: u64, data: u64, notify: Option<DestroyNotify>) -> NativeStatus {
    unsafe { ((*api().qdata).set_qdata)(obj, key, data, notify) }
}

#[inline]
pub fn qdata_get(obj: NativeHandle, key: u64) -> u64 {
    unsafe { ((*api().qdata).get_qdata)(obj, key) }
}

#[inline]
pub fn qdata_steal(obj: NativeHandle, key: u64) -> u64 {
    unsafe { ((*api().qdata).steal_qdata)(obj, key) }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

#[inline]
pub fn signal_has(tag: TypeTag, name: &str) -> bool {
    unsafe { ((*api().signal).has_signal)(tag, name.as_ptr(), name.len() as u32) }
}

#[inline]
pub fn signal_connect(obj: NativeHandle, name: &str, marshal: MarshalFn, user_data: u64) -> NativeHandlerId {
    unsafe { ((*api().signal).connect)(obj, name.as_ptr(), name.len() as u32, marshal, user_data) }
}

#[inline]
pub fn signal_disconnect(obj: NativeHandle, id: NativeHandlerId) -> NativeStatus {
    unsafe { ((*api().signal).disconnect)(obj, id) }
}

pub fn signal_emit(obj: NativeHandle, name: &str, args: &[NativeValue]) -> (NativeStatus, NativeValue) {
    let mut ret = NativeValue::none();
    let status = unsafe {
        ((*api().signal).emit)(
            obj,
            name.as_ptr(),
            name.len() as u32,
            args.as_ptr(),
            args.len() as u32,
            &mut ret,
        )
    };
    (status, ret)
}

// ---------------------------------------------------------------------------
// Boxed
// ---------------------------------------------------------------------------

#[inline]
pub fn boxed_copy(boxed_type: TypeTag, src: BoxedPtr) -> BoxedPtr {
    unsafe { ((*api().boxed).copy)(boxed_type, src) }
}

#[inline]
pub fn boxed_free(boxed_type: TypeTag, ptr: BoxedPtr) {
    unsafe { ((*api().boxed).free)(boxed_type, ptr) }
}

// ---------------------------------------------------------------------------
// Logging / threads
// ---------------------------------------------------------------------------

#[inline]
pub fn logging_log(level: u8, msg: &str) {
    unsafe { ((*api().logging).log)(level, msg.as_ptr(), msg.len() as u32) }
}

#[inline]
pub fn threads_enter() {
    unsafe { ((*api().threads).enter)() }
}

#[inline]
pub fn threads_leave() {
    unsafe { ((*api().threads).leave)() }
}

#[inline]
pub fn threads_is_dispatch_thread() -> bool {
    unsafe { ((*api().threads).is_dispatch_thread)() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake;
    use glimmer_ffi::abi::type_names;

    #[test]
    fn long_type_names_are_read_in_full() {
        fake::install();
        let name = format!("LongNameWidget{}", "X".repeat(200));
        let tag = type_register_subtype(fake::type_tag(type_names::WIDGET), &name);
        assert!(tag.is_valid());
        assert_eq!(type_name(tag), name);
        assert_eq!(type_name(fake::type_tag(type_names::LABEL)), type_names::LABEL);
        assert_eq!(type_name(TypeTag::INVALID), "<invalid>");
    }
}
