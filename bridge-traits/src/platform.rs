//! Threading bounds shared by every bridge trait.
//!
//! Native targets require `Send + Sync` so bridge implementations can be
//! shared across async tasks. WebAssembly hosts run on a single thread and
//! hand out browser objects that cannot satisfy those bounds, so the marker
//! collapses to nothing there.

/// Marker trait that applies `Send + Sync` on native targets while becoming a
/// no-op on `wasm32`.
#[cfg(not(target_arch = "wasm32"))]
pub trait PlatformSendSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T> PlatformSendSync for T where T: Send + Sync {}

#[cfg(target_arch = "wasm32")]
pub trait PlatformSendSync {}

#[cfg(target_arch = "wasm32")]
impl<T> PlatformSendSync for T {}
