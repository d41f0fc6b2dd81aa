//! End-to-end tests driving a WAT guest through the native runtime.

#[cfg(all(test, not(target_arch = "wasm32")))]
mod native_e2e;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod frame_sanity;

/// Demo guest in WebAssembly text format.
pub const DEMO_GUEST: &str = include_str!("../guests/demo.wat");
