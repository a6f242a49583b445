use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Root {root} is not accessible")]
    RootUnavailable { root: String },

    #[error("Failed to list {location}: {message}")]
    Listing { location: String, message: String },

    #[error("Checksum failed for {location}: {message}")]
    Checksum { location: String, message: String },
}

pub type Result<T> = std::result::Result<T, ScanError>;

impl ScanError {
    /// The pipeline stage this error belongs to
    pub fn failure_site(&self) -> FailureSite {
        match self {
            ScanError::RootUnavailable { .. } => FailureSite::RootAccess,
            ScanError::Listing { .. } => FailureSite::CrawlEntry,
            ScanError::Checksum { .. } => FailureSite::ChecksumCheck,
            ScanError::Bridge(_) | ScanError::Library(_) => FailureSite::ScanPass,
        }
    }

    /// What the scanner does about this error
    pub fn recovery(&self) -> Recovery {
        recovery_for(self.failure_site())
    }
}

/// Where in the scanning pipeline a failure surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureSite {
    /// Invalid filter configuration
    FolderFilter,
    /// An unreadable subdirectory or file during traversal
    CrawlEntry,
    /// The root itself is inaccessible or cannot be listed
    RootAccess,
    /// Stat or hash failed while checking a file for changes
    ChecksumCheck,
    /// Saving a checksum after a scan failed
    ChecksumRecompute,
    /// An error escaped a whole pass
    ScanPass,
}

/// What the scanner does about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recovery {
    /// Treat the filter as absent; nothing is excluded
    FailOpen,
    /// Log and continue without the item
    SkipItem,
    /// The root contributes no groups and no scan state this pass
    SkipRoot,
    /// Report the file as changed
    ReportChanged,
    /// Discard the pass and rescan every root unconditionally
    ForceFullRescan,
}

/// Failure policy of the scanner
pub fn recovery_for(site: FailureSite) -> Recovery {
    match site {
        FailureSite::FolderFilter => Recovery::FailOpen,
        FailureSite::CrawlEntry => Recovery::SkipItem,
        FailureSite::RootAccess => Recovery::SkipRoot,
        FailureSite::ChecksumCheck => Recovery::ReportChanged,
        FailureSite::ChecksumRecompute => Recovery::SkipItem,
        FailureSite::ScanPass => Recovery::ForceFullRescan,
    }
}
