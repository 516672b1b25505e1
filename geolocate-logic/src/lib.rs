mod config;
mod error;
mod location;
mod provider;
mod state;
mod view;

pub use config::ProviderConfig;
pub use error::{ErrorMessages, LocationError};
pub use location::{
    ErrorCode, EventSink, LocationComponent, LocationSource, Position, PositionOptions,
    ProviderEvent, UtcDT, WatchId,
};
pub use provider::LocationProvider;
pub use state::{ChangeListener, ObservationState};
pub use view::{LocationView, View, ViewUpdates};

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
