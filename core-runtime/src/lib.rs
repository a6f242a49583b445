//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the library scanner:
//! - Logging and tracing infrastructure
//! - Scanner configuration (roots, folder filter, capabilities)
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the scanning crates depend on.
//! It establishes the logging conventions, the fail-fast configuration
//! builder and the event broadcasting used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
