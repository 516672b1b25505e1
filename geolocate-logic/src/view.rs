use std::fmt;

use log::debug;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ProviderConfig,
    location::{LocationComponent, LocationSource, ProviderEvent},
    provider::LocationProvider,
    state::ObservationState,
};

/// Listener used by [LocationView] to get states out of its provider
pub type ViewUpdates = mpsc::UnboundedSender<ObservationState>;

/// What a [LocationView] shows, exactly one of these at a time
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Loading,
    Error(String),
    Position {
        lat: LocationComponent,
        long: LocationComponent,
    },
    /// Nothing has happened yet
    Empty,
}

impl View {
    /// Pick what to show, loading wins over errors, errors win over positions
    pub fn from_state(state: &ObservationState) -> Self {
        if state.is_loading() {
            Self::Loading
        } else if let Some(error) = state.error() {
            Self::Error(error.to_string())
        } else if let Some(pos) = state.position() {
            Self::Position {
                lat: pos.lat,
                long: pos.long,
            }
        } else {
            Self::Empty
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "Loading..."),
            Self::Error(msg) => write!(f, "{msg}"),
            Self::Position { lat, long } => write!(f, "Lat: {lat}\nLng: {long}"),
            Self::Empty => Ok(()),
        }
    }
}

/// Watches the location through a [LocationProvider] and renders the latest state
pub struct LocationView<S: LocationSource> {
    provider: LocationProvider<S, ViewUpdates>,
    updates: mpsc::UnboundedReceiver<ObservationState>,
    state: ObservationState,
}

impl<S: LocationSource> LocationView<S> {
    /// The view always watches, `watch` in `config` is overridden
    pub fn new(config: ProviderConfig, source: Option<S>) -> Self {
        let config = ProviderConfig {
            watch: true,
            ..config
        };
        let (tx, updates) = mpsc::unbounded_channel();
        Self {
            provider: LocationProvider::new(config, source, tx),
            updates,
            state: ObservationState::default(),
        }
    }

    pub fn state(&self) -> &ObservationState {
        &self.state
    }

    pub fn provider(&self) -> &LocationProvider<S, ViewUpdates> {
        &self.provider
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.provider.cancel_token()
    }

    pub fn mount(&mut self) {
        self.provider.start();
        self.sync();
    }

    pub fn unmount(&mut self) {
        self.provider.stop();
        self.sync();
    }

    pub fn handle_event(&mut self, event: ProviderEvent) {
        self.provider.handle_event(event);
        self.sync();
    }

    /// Handle whatever the source already delivered
    pub fn pump(&mut self) {
        self.provider.pump();
        self.sync();
    }

    /// Mirror the states the provider sent since the last call, returns whether anything changed
    pub fn sync(&mut self) -> bool {
        let mut changed = false;
        while let Ok(state) = self.updates.try_recv() {
            self.state = state;
            changed = true;
        }
        changed
    }

    pub fn render(&self) -> View {
        View::from_state(&self.state)
    }

    /// Mount, call `on_render` with the first view and then after every change, unmount once
    /// cancelled through [LocationView::cancel_token]
    pub async fn run<F: FnMut(&View)>(&mut self, mut on_render: F) {
        self.mount();
        on_render(&self.render());

        while !self.provider.is_settled() {
            let Some(event) = self.provider.next_event().await else {
                break;
            };
            self.provider.handle_event(event);
            if self.sync() {
                let view = self.render();
                debug!("Rendering {view:?}");
                on_render(&view);
            }
        }

        self.unmount();
    }
}
