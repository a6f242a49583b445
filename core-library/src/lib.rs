//! # Library Model Module
//!
//! Domain types for discovered audiobooks and the repositories that persist
//! them.
//!
//! ## Overview
//!
//! This module manages:
//! - Discovered entries, groups and folder structure types
//! - Natural ordering of path segments
//! - Change-detection records (scan states and file checksums)
//! - Repositories over a namespaced key-value store

pub mod error;
pub mod models;
pub mod ordering;
pub mod repositories;

pub use error::{LibraryError, Result};
