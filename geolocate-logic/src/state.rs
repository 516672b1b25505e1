use log::debug;
use tokio::sync::mpsc;

use crate::location::Position;

/// What is currently known about the device location.
/// A position and an error are never present at the same time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationState {
    loading: bool,
    position: Option<Position>,
    error: Option<String>,
}

impl ObservationState {
    /// A request is out and nothing came back yet
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }

    pub fn located(position: Position) -> Self {
        Self {
            loading: false,
            position: Some(position),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            loading: false,
            position: None,
            error: Some(error.into()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Receives a snapshot every time the observed state changes
pub trait ChangeListener {
    fn on_change(&self, state: &ObservationState);
}

/// No one is listening
impl ChangeListener for () {
    fn on_change(&self, _state: &ObservationState) {}
}

impl<L: ChangeListener> ChangeListener for Option<L> {
    fn on_change(&self, state: &ObservationState) {
        if let Some(listener) = self {
            listener.on_change(state);
        }
    }
}

/// Hand snapshots to whoever owns the receiving end, they poll it at their own pace
impl ChangeListener for mpsc::UnboundedSender<ObservationState> {
    fn on_change(&self, state: &ObservationState) {
        if self.send(state.clone()).is_err() {
            debug!("Dropping state update, receiver is gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive() {
        let located = ObservationState::located(Position::new(52.5, 13.4));
        assert!(located.position().is_some());
        assert!(located.error().is_none());
        assert!(!located.is_loading());

        let failed = ObservationState::failed("nope");
        assert!(failed.position().is_none());
        assert_eq!(failed.error(), Some("nope"));
        assert!(!failed.is_loading());

        let loading = ObservationState::loading();
        assert!(loading.is_loading());
        assert!(loading.position().is_none() && loading.error().is_none());
    }

    #[test]
    fn test_channel_listener() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.on_change(&ObservationState::loading());
        assert_eq!(rx.try_recv().ok(), Some(ObservationState::loading()));
        drop(rx);
        // Must not panic with the receiver gone
        tx.on_change(&ObservationState::failed("gone"));
    }
}
