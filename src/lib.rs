//! Workspace facade crate.
//!
//! This crate exposes the feature flags that map onto the individual
//! workspace crates (`core-service`, `core-scan`, `core-library`). Host
//! applications can depend on `audioshelf-workspace` and enable
//! `desktop-shims` instead of wiring every crate themselves.

#[cfg(feature = "desktop-shims")]
pub use core_library as library;
#[cfg(feature = "desktop-shims")]
pub use core_scan as scan;
#[cfg(feature = "desktop-shims")]
pub use core_service as service;
