use std::path::PathBuf;

use clap::Parser;
use geolocate_logic::{
    ChangeListener, LocationProvider, LocationView, ObservationState, ProviderConfig, View,
};
use geolocate_sim::{Script, ScriptedLocationSource, prelude::*};
use log::info;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
/// Play a location script through the location view and print everything it renders
struct Cli {
    /// Path to the JSON script the simulated location source plays back
    script: Option<PathBuf>,

    /// JSON file with provider settings, the flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ask for the position once instead of watching it
    #[arg(long)]
    once: bool,

    /// Request high accuracy fixes
    #[arg(long)]
    high_accuracy: bool,

    /// How old (ms) a cached fix may be
    #[arg(long)]
    maximum_age_ms: Option<u64>,

    /// How long (ms) the source may take for a fix
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Act as if the platform had no location capability
    #[arg(long)]
    no_provider: bool,
}

impl Cli {
    fn provider_config(&self) -> Result<ProviderConfig> {
        let mut config = if let Some(path) = &self.config {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config at {}", path.display()))?;
            ProviderConfig::from_json(&raw)?
        } else {
            ProviderConfig::default()
        };
        self.apply_overrides(&mut config);

        Ok(config)
    }

    /// Flags win over the config file, anything not passed keeps the file's value
    fn apply_overrides(&self, config: &mut ProviderConfig) {
        if self.high_accuracy {
            config.enable_high_accuracy = true;
        }
        if let Some(maximum_age_ms) = self.maximum_age_ms {
            config.maximum_age_ms = maximum_age_ms;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if self.once {
            config.watch = false;
        }
    }

    fn source(&self) -> Result<Option<ScriptedLocationSource>> {
        if self.no_provider {
            return Ok(None);
        }
        let Some(path) = &self.script else {
            bail!("A script is required unless --no-provider is passed");
        };
        let script = Script::load(path)?;
        Ok(Some(ScriptedLocationSource::new(script)))
    }
}

/// Prints every state it is told about
struct PrintListener;

impl ChangeListener for PrintListener {
    fn on_change(&self, state: &ObservationState) {
        println!("{}\n", View::from_state(state));
    }
}

/// Unmount once the user hits Ctrl-C
fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, unmounting");
            cancel.cancel();
        }
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    colog::init();

    let cli = Cli::parse();
    let config = cli.provider_config()?;
    let source = cli.source()?;

    if config.watch {
        let mut view = LocationView::new(config, source);
        spawn_ctrl_c(view.cancel_token());
        view.run(|v| println!("{v}\n")).await;
    } else {
        let mut provider = LocationProvider::new(config, source, PrintListener);
        spawn_ctrl_c(provider.cancel_token());
        provider.run().await;
    }

    info!("Location view unmounted");
    Ok(())
}
