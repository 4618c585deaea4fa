// glimmer: user-facing library crate. Users depend on this and use
// `glimmer::entry!()` to export the init/shutdown symbols the native runtime
// looks up when it loads their cdylib.

// Re-exports for macro path resolution and user access.
pub use glimmer_ffi as ffi;
pub use glimmer_runtime as runtime;
pub use glimmer_widgets as widgets;
pub use glimmer_runtime::impl_subclass_type;

// For `impl_subclass_type!` generated inventory::submit! invocations.
#[doc(hidden)]
pub extern crate inventory as __inventory;

pub mod prelude;

// Re-export glam for convenience.
pub use glam;

use log::LevelFilter;
use runtime::{class_registry, identity_cache, logging, signal, type_registry, GlimmerError, GlimmerResult};

// ---------------------------------------------------------------------------
// Init / Shutdown (called from entry!() generated code)
// ---------------------------------------------------------------------------

/// Start-up options for [`init_with`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Most verbose level forwarded to the native logger.
    pub max_log_level: LevelFilter,
    /// Install the native logger as the global `log` backend. Turn this off
    /// when the host application brings its own logger.
    pub install_logger: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_log_level: LevelFilter::Info,
            install_logger: true,
        }
    }
}

/// What [`init`] registered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InitReport {
    pub wrapper_types: usize,
    pub signals: usize,
    pub classes: usize,
}

/// Initialize glimmer with the default [`Config`].
pub fn init(api_table: *const ffi::NativeApiTable) -> GlimmerResult<InitReport> {
    init_with(api_table, Config::default())
}

/// Store the API table and register every wrapper type, signal and subclass
/// submitted through `inventory`.
///
/// Calling it again with the same table (after [`shutdown`], say) registers
/// everything afresh. A different table is rejected.
pub fn init_with(api_table: *const ffi::NativeApiTable, config: Config) -> GlimmerResult<InitReport> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        if api_table.is_null() {
            return Err(GlimmerError::InvalidHandle);
        }

        // SAFETY: non-null, and the native side keeps the table alive for
        // the whole process.
        let version = unsafe { (*api_table).version };
        if version != ffi::API_VERSION {
            return Err(GlimmerError::Internal(format!(
                "native API version {version}, expected {}",
                ffi::API_VERSION
            )));
        }

        if !runtime::api::try_init_api(api_table) && !std::ptr::eq(runtime::api(), api_table) {
            return Err(GlimmerError::Internal(
                "glimmer already initialized with another API table".into(),
            ));
        }

        if config.install_logger && !logging::init(config.max_log_level) {
            log::warn!("[glimmer] a logger is already installed, keeping it");
        }

        let report = register_all();
        log_greeting(&report);
        Ok(report)
    }))
    .unwrap_or_else(|_| Err(GlimmerError::Internal("panic during init".into())))
}

/// Register wrapper types first: signal owners and subclass parents are
/// resolved through them.
fn register_all() -> InitReport {
    InitReport {
        wrapper_types: type_registry::register_all_from_inventory(),
        signals: signal::register_all_from_inventory(),
        classes: class_registry::register_all_from_inventory(),
    }
}

fn log_greeting(report: &InitReport) {
    log::info!(
        "[glimmer] Rust side initialized ({} wrapper types, {} signals, {} subclasses)",
        report.wrapper_types,
        report.signals,
        report.classes
    );
}

/// Tear down every registry. Outstanding wrappers stay usable as plain
/// handles but lose their signal connections; call this only when the
/// native runtime is about to unload the library.
pub fn shutdown() {
    let _ = std::panic::catch_unwind(|| {
        signal::clear_all();
        identity_cache().clear();
        class_registry::clear();
        type_registry().clear();
        log::info!("[glimmer] Rust side shut down");
    });
}

/// Generates the cdylib exports for the glimmer entry points.
///
/// Place this at the top of your cdylib crate's `lib.rs`:
/// ```ignore
/// glimmer::entry!();
/// ```
///
/// Generates `glimmer_init` (returns `true` on success) and
/// `glimmer_shutdown`.
#[macro_export]
macro_rules! entry {
    () => {
        mod __glimmer_entry {
            #[unsafe(no_mangle)]
            pub extern "C" fn glimmer_init(api_table: *const $crate::ffi::NativeApiTable) -> bool {
                match $crate::init(api_table) {
                    Ok(_) => true,
                    Err(err) => {
                        $crate::__log_init_failure(&err);
                        false
                    }
                }
            }

            #[unsafe(no_mangle)]
            pub extern "C" fn glimmer_shutdown() {
                $crate::shutdown()
            }
        }
    };
}

#[doc(hidden)]
pub fn __log_init_failure(err: &GlimmerError) {
    if runtime::is_api_initialized() {
        log::error!("[glimmer] init failed: {err}");
    }
}
