// Error types for the glimmer runtime.

use glimmer_ffi::NativeStatus;

/// Rich error type for binding-layer operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GlimmerError {
    /// Null or dangling native pointer.
    #[error("invalid native handle")]
    InvalidHandle,

    /// No ancestor of the handle's type tag has a registered wrapper type.
    #[error("no wrapper type registered for native type {type_name}")]
    UnregisteredType { type_name: String },

    /// The identity cache already holds a different wrapper for the handle.
    #[error("handle {addr:#x} already has a different wrapper attached")]
    DoubleWrap { addr: u64 },

    /// `connect` on a handle with no live wrapper.
    #[error("cannot connect to {signal}: no live wrapper for the instance")]
    DanglingSignalConnection { signal: String },

    #[error("native instance has been finalized")]
    ObjectFinalized,

    #[error("invalid cast: {actual} is not a {expected}")]
    InvalidCast { expected: String, actual: String },

    #[error("unknown signal {signal} on {type_name}")]
    UnknownSignal { type_name: String, signal: String },

    #[error("unknown signal connection {0}")]
    UnknownConnection(u64),

    #[error("type mismatch: expected {expected}")]
    TypeMismatch { expected: &'static str },

    #[error("class registration failed: {0}")]
    RegistrationFailed(String),

    #[error("native runtime returned {0:?}")]
    Native(NativeStatus),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GlimmerError {
    /// Errors that mean the generated bindings have drifted from the native
    /// runtime. These are never recoverable.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            GlimmerError::UnregisteredType { .. } | GlimmerError::DoubleWrap { .. }
        )
    }
}

/// Convenience alias used throughout the runtime and generated code.
pub type GlimmerResult<T> = Result<T, GlimmerError>;

/// Convert a native status code to a `GlimmerResult<()>`.
pub fn check_native(status: NativeStatus) -> GlimmerResult<()> {
    match status {
        NativeStatus::Ok => Ok(()),
        other => Err(GlimmerError::from(other)),
    }
}

/// Pass recoverable errors through; panic on binding defects.
///
/// Generated wrappers route every `wrap()` through this so a drifted binding
/// fails loudly instead of being caught and ignored.
pub fn abort_on_defect<T>(result: GlimmerResult<T>) -> GlimmerResult<T> {
    match result {
        Err(err) if err.is_defect() => {
            log::error!("[glimmer] binding defect: {err}");
            panic!("glimmer binding defect: {err}");
        }
        other => other,
    }
}

impl From<NativeStatus> for GlimmerError {
    #[allow(clippy::match_same_arms)]
    fn from(status: NativeStatus) -> Self {
        match status {
            NativeStatus::Ok => GlimmerError::Internal("unexpected Ok status".into()),
            NativeStatus::InvalidHandle => GlimmerError::InvalidHandle,
            other => GlimmerError::Native(other),
        }
    }
}
