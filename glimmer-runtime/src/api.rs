// Global API table storage. Initialized once at startup, then read-only.

use std::sync::OnceLock;

use glimmer_ffi::{NativeApiTable, API_VERSION};

/// Wrapper so a raw pointer can live inside OnceLock (which requires Send+Sync).
/// SAFETY: The API table is created by the native runtime before `init_api`
/// and lives for the whole process. Access is read-only after init.
struct ApiRef(*const NativeApiTable);
unsafe impl Send for ApiRef {}
unsafe impl Sync for ApiRef {}

static API: OnceLock<ApiRef> = OnceLock::new();

/// Store the API table pointer. Called once by `glimmer::init`.
/// Panics if called with a null table, a version mismatch, or more than once.
pub fn init_api(table: *const NativeApiTable) {
    assert!(!table.is_null(), "init_api called with null pointer");
    let version = unsafe { (*table).version };
    assert_eq!(version, API_VERSION, "native API version mismatch");
    if API.set(ApiRef(table)).is_err() {
        panic!("init_api called more than once");
    }
}

/// Like [`init_api`], but a no-op if a table is already installed.
/// Returns `true` if this call installed `table`.
pub fn try_init_api(table: *const NativeApiTable) -> bool {
    if table.is_null() || API.get().is_some() {
        return false;
    }
    API.set(ApiRef(table)).is_ok()
}

/// Access the global API table. Panics if called before `init_api`.
#[inline(always)]
pub fn api() -> &'static NativeApiTable {
    // SAFETY: The pointer was validated non-null in init_api, and the native
    // side guarantees the table outlives the process.
    unsafe { &*API.get().expect("glimmer API not initialized").0 }
}

/// Returns true if the API table has been initialized.
#[inline]
pub fn is_api_initialized() -> bool {
    API.get().is_some()
}
