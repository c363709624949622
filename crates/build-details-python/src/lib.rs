//! Build-details introspection of the embedded Python interpreter
//!
//! This crate provides:
//! 1. Interpreter bootstrap (optionally against a chosen Python home)
//! 2. A `RuntimeIntrospector` over `sys`, `sysconfig` and `importlib.machinery`
//! 3. Capture of Python warnings raised while those are queried

mod bridge;
pub mod errors;
mod runtime;
mod warnings;

pub use bridge::Bridge;
pub use errors::BridgeError;
pub use runtime::PythonRuntime;
pub use warnings::WarningCapture;

/// Tests that swap interpreter-wide state (warning filters) take this lock
#[cfg(test)]
pub(crate) fn interpreter_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
