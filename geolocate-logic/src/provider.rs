use log::{debug, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ProviderConfig,
    error::LocationError,
    location::{EventSink, LocationSource, ProviderEvent, WatchId},
    state::{ChangeListener, ObservationState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Active,
    Stopped,
}

/// Bridges a [LocationSource] to a stream of [ObservationState]s handed to a [ChangeListener].
///
/// The provider is started once with [LocationProvider::start] and torn down with
/// [LocationProvider::stop] (or by dropping it). Results from the source arrive through an
/// internal channel and are applied with [LocationProvider::handle_event], either directly or
/// through [LocationProvider::pump], [LocationProvider::next_event] or [LocationProvider::run].
pub struct LocationProvider<S: LocationSource, L: ChangeListener> {
    config: ProviderConfig,
    source: Option<S>,
    listener: L,
    state: ObservationState,
    notified: ObservationState,
    watch_id: Option<WatchId>,
    sink: EventSink,
    events: mpsc::UnboundedReceiver<ProviderEvent>,
    lifecycle: Lifecycle,
    cancel: CancellationToken,
}

impl<S: LocationSource, L: ChangeListener> LocationProvider<S, L> {
    /// Create a provider, pass [None] as `source` when the platform has no location capability
    pub fn new(config: ProviderConfig, source: Option<S>, listener: L) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        Self {
            config,
            source,
            listener,
            state: ObservationState::default(),
            notified: ObservationState::default(),
            watch_id: None,
            sink: EventSink::new(tx),
            events,
            lifecycle: Lifecycle::Idle,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> &ObservationState {
        &self.state
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active && !self.cancel.is_cancelled()
    }

    /// Token that stops this provider when cancelled, lets another task end [LocationProvider::run]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether nothing else will ever arrive: no watch is running and no query is out
    pub fn is_settled(&self) -> bool {
        self.lifecycle != Lifecycle::Active
            || (self.watch_id.is_none() && !self.state.is_loading())
    }

    /// Ask the source for a position, or start watching it depending on the config.
    /// Only the first call does anything.
    pub fn start(&mut self) {
        if self.lifecycle != Lifecycle::Idle {
            warn!("Location provider already started, ignoring");
            return;
        }
        if self.cancel.is_cancelled() {
            warn!("Location provider was cancelled before it started, ignoring");
            self.stop();
            return;
        }
        self.lifecycle = Lifecycle::Active;

        if self.source.is_none() {
            warn!("No location source available");
            self.fail(LocationError::NoProviderAvailable);
            return;
        }

        self.set_state(ObservationState::loading());

        let options = self.config.position_options();
        let sink = self.sink.clone();
        if let Some(source) = self.source.as_mut() {
            if self.config.watch {
                let id = source.watch_position(options, sink);
                debug!("Watching location as {id:?} with {options:?}");
                self.watch_id = Some(id);
            } else {
                debug!("Requesting location once with {options:?}");
                source.get_current_position(options, sink);
            }
        }
    }

    /// Apply one result from the source. Ignored unless the provider is running.
    pub fn handle_event(&mut self, event: ProviderEvent) {
        if !self.is_active() {
            debug!("Dropping location event, provider is not running: {event:?}");
            return;
        }

        match event {
            ProviderEvent::Position(position) => {
                self.set_state(ObservationState::located(position));
            }
            ProviderEvent::Error(code) => self.fail(LocationError::from_code(code)),
        }
    }

    /// Handle every event that has already arrived, returns how many were handled
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next event from the source, [None] once the provider is cancelled
    pub async fn next_event(&mut self) -> Option<ProviderEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    /// Start, handle events until cancelled or until nothing else can arrive, then stop
    pub async fn run(&mut self) {
        self.start();
        while !self.is_settled() {
            let Some(event) = self.next_event().await else {
                break;
            };
            self.handle_event(event);
        }
        self.stop();
    }

    /// Clear any running watch and drop everything still in flight, safe to call repeatedly
    pub fn stop(&mut self) {
        if self.lifecycle == Lifecycle::Stopped {
            return;
        }
        self.lifecycle = Lifecycle::Stopped;
        self.cancel.cancel();

        if let Some(id) = self.watch_id.take() {
            if let Some(source) = self.source.as_mut() {
                debug!("Clearing location watch {id:?}");
                source.clear_watch(id);
            }
        }

        self.events.close();
        let mut dropped = 0;
        while self.events.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!("Discarded {dropped} pending location events");
        }
    }

    fn fail(&mut self, error: LocationError) {
        if let LocationError::UnknownProviderCode(code) = error {
            warn!("Location source reported unknown error code {code}");
        }
        let message = self.config.error_messages.message_for(error);
        self.set_state(ObservationState::failed(message));
    }

    fn set_state(&mut self, state: ObservationState) {
        self.state = state;
        if self.state == self.notified {
            return;
        }
        self.notified = self.state.clone();
        debug!("Location state changed: {:?}", self.state);
        self.listener.on_change(&self.state);
    }
}

impl<S: LocationSource, L: ChangeListener> Drop for LocationProvider<S, L> {
    fn drop(&mut self) {
        self.stop();
    }
}
