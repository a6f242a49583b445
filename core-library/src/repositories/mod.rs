//! # Repository Pattern Implementation
//!
//! Repositories persist library records through a namespaced
//! [`KeyValueStore`](bridge_traits::persistence::KeyValueStore). Each record
//! is stored as JSON under its location.
//!
//! ## Available Repositories
//!
//! - `GroupRepository` - Audiobook groups produced by a scan pass
//! - `ScanStateRepository` - Per-root scan summaries
//! - `ChecksumRepository` - Per-file digests

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub mod checksum;
pub mod group;
pub mod scan_state;

pub use checksum::{ChecksumRepository, KeyValueChecksumRepository};
pub use group::{GroupRepository, KeyValueGroupRepository};
pub use scan_state::{KeyValueScanStateRepository, ScanStateRepository};

/// Namespace holding groups keyed by group location
pub const GROUPS_NAMESPACE: &str = "groups";
/// Namespace holding scan states keyed by root location
pub const SCAN_STATES_NAMESPACE: &str = "scan_states";
/// Namespace holding checksums keyed by file location
pub const CHECKSUMS_NAMESPACE: &str = "checksums";

pub(crate) fn encode<T: Serialize>(record: &T) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

pub(crate) fn decode<T: DeserializeOwned>(value: &str) -> Result<T> {
    Ok(serde_json::from_str(value)?)
}

/// Decode every record, dropping ones that no longer parse
pub(crate) fn decode_all<T: DeserializeOwned>(namespace: &str, rows: Vec<(String, String)>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|(key, value)| match decode(&value) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(namespace, key = %key, error = %error, "Dropping unreadable record");
                None
            }
        })
        .collect()
}
