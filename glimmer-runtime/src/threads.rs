// Dispatch-thread bracket for worker threads.
//
// The native runtime is single-threaded. Worker threads take its lock with
// `DispatchGuard::enter()` before touching native objects; the binding
// layer never takes it on their behalf.

use std::marker::PhantomData;

use crate::ffi_dispatch;

/// Holds the native runtime lock until dropped.
#[must_use = "the runtime lock is released when the guard is dropped"]
pub struct DispatchGuard {
    // Leave must happen on the thread that entered.
    _not_send: PhantomData<*const ()>,
}

impl DispatchGuard {
    pub fn enter() -> Self {
        ffi_dispatch::threads_enter();
        DispatchGuard {
            _not_send: PhantomData,
        }
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        ffi_dispatch::threads_leave();
    }
}

/// Whether the current thread is the native dispatch thread.
pub fn is_dispatch_thread() -> bool {
    ffi_dispatch::threads_is_dispatch_thread()
}

/// Run `f` with the runtime lock held, unless already on the dispatch thread.
pub fn with_dispatch_lock<R>(f: impl FnOnce() -> R) -> R {
    if is_dispatch_thread() {
        return f();
    }
    let _guard = DispatchGuard::enter();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake;

    #[test]
    fn guard_brackets_enter_and_leave() {
        fake::install();
        std::thread::spawn(|| {
            assert!(!is_dispatch_thread());
            {
                let _g = DispatchGuard::enter();
                assert_eq!(fake::enter_depth(), 1);
            }
            assert_eq!(fake::enter_depth(), 0);
            let v = with_dispatch_lock(|| fake::enter_depth());
            assert_eq!(v, 1);
        })
        .join()
        .unwrap();
    }
}
