use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A "part" of a location
pub type LocationComponent = f64;

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

/// Raw error code as reported by a location source
pub type ErrorCode = u16;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// A position fix as gotten from a Geolocation API
pub struct Position {
    /// Latitude
    pub lat: LocationComponent,
    /// Longitude
    pub long: LocationComponent,
    /// Radius of the fix in meters, not every source reports one
    pub accuracy: Option<LocationComponent>,
    /// The bearing (float normalized from 0 to 1) optional as GPS can't always determine
    pub heading: Option<LocationComponent>,
    /// When the fix was taken
    pub timestamp: UtcDT,
}

impl Position {
    /// A bare fix taken right now
    pub fn new(lat: LocationComponent, long: LocationComponent) -> Self {
        Self {
            lat,
            long,
            accuracy: None,
            heading: None,
            timestamp: Utc::now(),
        }
    }

    /// How old this fix is at `now`, negative ages (clock skew) count as fresh
    pub fn age(&self, now: UtcDT) -> Duration {
        (now - self.timestamp).to_std().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Options forwarded untouched to the location source
pub struct PositionOptions {
    /// Ask for a more precise (slower, more power hungry) fix
    pub enable_high_accuracy: bool,
    /// How old a cached fix may be and still be returned
    pub maximum_age_ms: u64,
    /// How long the source may take before reporting a timeout
    pub timeout_ms: u64,
}

impl PositionOptions {
    pub fn maximum_age(&self) -> Duration {
        Duration::from_millis(self.maximum_age_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Something a location source reports back after a query or during a watch
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// A new fix is available
    Position(Position),
    /// The source failed, contains the code it reported
    Error(ErrorCode),
}

/// Handle used by a source to deliver [ProviderEvent]s to the provider that asked for them.
/// Sends fail silently once that provider has been stopped.
#[derive(Debug, Clone)]
pub struct EventSink(mpsc::UnboundedSender<ProviderEvent>);

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<ProviderEvent>) -> Self {
        Self(tx)
    }

    /// Deliver a fix, returns whether anyone is still listening
    pub fn position(&self, position: Position) -> bool {
        self.0.send(ProviderEvent::Position(position)).is_ok()
    }

    /// Deliver a failure, returns whether anyone is still listening
    pub fn error(&self, code: ErrorCode) -> bool {
        self.0.send(ProviderEvent::Error(code)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// Identifies a running watch so it can be cleared later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u32);

/// A platform capability that can report the device position.
/// Results are never returned directly, they are pushed into the given [EventSink] whenever the
/// platform has them.
pub trait LocationSource {
    /// Request a single position, exactly one event is delivered to `sink`
    fn get_current_position(&mut self, options: PositionOptions, sink: EventSink);
    /// Start watching the position, events are delivered to `sink` until
    /// [LocationSource::clear_watch] is called with the returned ID
    fn watch_position(&mut self, options: PositionOptions, sink: EventSink) -> WatchId;
    /// Stop a watch started with [LocationSource::watch_position]
    fn clear_watch(&mut self, id: WatchId);
}
