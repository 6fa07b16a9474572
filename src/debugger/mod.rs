use serde_json::Value;

/// A trait for components that can be inspected at runtime.
///
/// Implementations serialize a typed debug-state struct; snapshots are
/// read-only and never feed back into emulation state.
pub trait Debuggable {
    /// Reads the component's state and returns it as a JSON value.
    fn read_state(&self) -> Value;
}
