// FFI boundary guard: wraps Rust callbacks to catch panics before they
// cross into the native runtime (which is undefined behavior).

/// Execute `f` and catch any panic, returning `default` on failure.
///
/// Every `extern "C"` function the native runtime calls (vtable trampolines,
/// signal marshals, finalize notifiers) wraps its body in this guard.
/// The panic message is logged at error level.
pub fn ffi_boundary<F, R>(default: R, f: F) -> R
where
    F: FnOnce() -> R + std::panic::UnwindSafe,
{
    match std::panic::catch_unwind(f) {
        Ok(value) => value,
        Err(payload) => {
            log::error!("{}", panic_message(&payload));
            default
        }
    }
}

/// Extract a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("[glimmer] Rust panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("[glimmer] Rust panic: {s}")
    } else {
        "[glimmer] Rust panic (unknown payload)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ffi_boundary_returns_value_on_success() {
        let result = ffi_boundary(0i32, || 42);
        assert_eq!(result, 42);
    }

    #[test]
    fn ffi_boundary_returns_default_on_panic() {
        let result = ffi_boundary(-1i32, || {
            panic!("test panic");
        });
        assert_eq!(result, -1);
    }

    #[test]
    fn ffi_boundary_returns_default_on_string_panic() {
        let result = ffi_boundary(false, || -> bool {
            panic!("{}", "formatted panic");
        });
        assert!(!result);
    }

    #[test]
    fn panic_message_reads_str_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&payload), "[glimmer] Rust panic: boom");
    }
}
