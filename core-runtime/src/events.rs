//! # Event Bus System
//!
//! Scan passes and the service publish progress on a `tokio::sync::broadcast`
//! channel. Hosts subscribe to follow a pass (progress UI, diagnostics)
//! without polling the scanner.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PassMode, ScanEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Scan(ScanEvent::PassStarted { mode: PassMode::Incremental }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Scan(_)));
//! # }
//! ```
//!
//! ## Event Types
//!
//! ### Scan Events
//! - `PassStarted`: A scan pass began (incremental or forced-full)
//! - `RootSkipped`: A root was unchanged and its groups were carried forward
//! - `RootScanned`: A root was re-crawled
//! - `RootUnavailable`: A root could not be accessed this pass
//! - `CachesReset`: Cached scan state was discarded
//! - `PassCompleted`: A pass finished
//! - `PassRecovered`: A pass failed and was answered with a full rescan
//!
//! ### Library Events
//! - `GroupsPersisted`: The stored group snapshot changed
//! - `ScanStatesCleared`: Cached scan state was cleared on request
//!
//! ## Error Handling
//!
//! Emission is best-effort. `emit` fails only when nobody is subscribed,
//! which callers ignore. Slow subscribers receive `RecvError::Lagged(n)` and
//! can keep reading.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Scan pass progress
    Scan(ScanEvent),
    /// Changes to the persisted library
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Short label for logs and host UIs
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Scan(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Scan(ScanEvent::PassRecovered { .. }) => EventSeverity::Warning,
            CoreEvent::Scan(ScanEvent::RootUnavailable { .. }) => EventSeverity::Warning,
            CoreEvent::Scan(ScanEvent::CachesReset { .. }) => EventSeverity::Warning,
            CoreEvent::Scan(ScanEvent::PassCompleted { .. }) => EventSeverity::Info,
            CoreEvent::Library(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// How prominently a host should surface an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Scan Events
// ============================================================================

/// Pass-level scan mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassMode {
    /// Only roots whose scan state is stale are re-crawled
    Incremental,
    /// Every root is re-crawled
    ForcedFull,
}

impl PassMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassMode::Incremental => "incremental",
            PassMode::ForcedFull => "forced_full",
        }
    }
}

impl fmt::Display for PassMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted while a scan pass runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ScanEvent {
    /// A pass began.
    PassStarted {
        mode: PassMode,
    },
    /// A root was unchanged since its last scan.
    RootSkipped {
        root: String,
    },
    /// A root was re-crawled.
    RootScanned {
        root: String,
        /// Groups produced for this root
        groups: usize,
        /// Audio files discovered under this root
        files: usize,
    },
    /// A root could not be accessed and contributes nothing this pass.
    RootUnavailable {
        root: String,
    },
    /// Cached scan state and checksums were discarded.
    CachesReset {
        reason: String,
    },
    /// A pass finished.
    PassCompleted {
        groups: usize,
        rescanned: usize,
        skipped: usize,
    },
    /// A pass failed and a full rescan answered it.
    PassRecovered {
        error: String,
    },
}

impl ScanEvent {
    pub fn description(&self) -> &str {
        match self {
            ScanEvent::PassStarted { .. } => "Scan pass started",
            ScanEvent::RootSkipped { .. } => "Root unchanged, groups carried forward",
            ScanEvent::RootScanned { .. } => "Root re-crawled",
            ScanEvent::RootUnavailable { .. } => "Root unavailable",
            ScanEvent::CachesReset { .. } => "Scan caches reset",
            ScanEvent::PassCompleted { .. } => "Scan pass completed",
            ScanEvent::PassRecovered { .. } => "Scan pass recovered with full rescan",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events about the stored group snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// Groups were written to the store.
    GroupsPersisted {
        /// Groups written or overwritten
        stored: usize,
        /// Stale groups deleted
        removed: usize,
    },
    /// Scan states were cleared on request.
    ScanStatesCleared,
}

impl LibraryEvent {
    pub fn description(&self) -> &str {
        match self {
            LibraryEvent::GroupsPersisted { .. } => "Groups persisted",
            LibraryEvent::ScanStatesCleared => "Scan states cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` events are buffered per subscriber; a subscriber further
    /// behind than that gets `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Number of subscribers reached, or an error when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let scan_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Scan(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scanned(root: &str) -> CoreEvent {
        CoreEvent::Scan(ScanEvent::RootScanned {
            root: root.to_string(),
            groups: 2,
            files: 7,
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(scanned("/books")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.emit(scanned("/books")).unwrap(), 2);
        assert_eq!(first.recv().await.unwrap(), scanned("/books"));
        assert_eq!(second.recv().await.unwrap(), scanned("/books"));
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Library(_)));

        bus.emit(scanned("/books")).unwrap();
        bus.emit(CoreEvent::Library(LibraryEvent::ScanStatesCleared))
            .unwrap();

        let event = stream.recv().await.unwrap();
        assert_eq!(event, CoreEvent::Library(LibraryEvent::ScanStatesCleared));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());

        for i in 0..5 {
            bus.emit(scanned(&format!("/books/{i}"))).unwrap();
        }

        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(_)))));
    }

    #[test]
    fn test_event_severity() {
        let recovered = CoreEvent::Scan(ScanEvent::PassRecovered {
            error: "listing failed".to_string(),
        });
        assert_eq!(recovered.severity(), EventSeverity::Warning);
        assert_eq!(scanned("/books").severity(), EventSeverity::Debug);
        assert_eq!(
            CoreEvent::Scan(ScanEvent::PassCompleted {
                groups: 3,
                rescanned: 1,
                skipped: 2
            })
            .severity(),
            EventSeverity::Info
        );
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Scan(ScanEvent::PassStarted {
            mode: PassMode::ForcedFull,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"forced_full\""));

        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.description(), "Scan pass started");
    }
}
