use std::{path::Path, time::Duration};

use geolocate_logic::{ErrorCode, LocationComponent, Position, UtcDT};
use serde::{Deserialize, Serialize};

use crate::prelude::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// A fix as written in a script, gets its timestamp when it is played
pub struct ScriptedFix {
    pub lat: LocationComponent,
    pub long: LocationComponent,
    pub accuracy: Option<LocationComponent>,
    pub heading: Option<LocationComponent>,
}

impl ScriptedFix {
    pub fn at(&self, timestamp: UtcDT) -> Position {
        Position {
            lat: self.lat,
            long: self.long,
            accuracy: self.accuracy,
            heading: self.heading,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Report a position
    Fix(ScriptedFix),
    /// Report a failure with the given code
    Error(ErrorCode),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScriptStep {
    /// Milliseconds to wait before this step is reported
    #[serde(default)]
    pub after_ms: u64,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

impl ScriptStep {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.after_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
/// Everything a [crate::ScriptedLocationSource] will report, in order
pub struct Script {
    /// Start over after the last step while watching
    #[serde(default)]
    pub repeat: bool,
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn from_json(raw: &str) -> Result<Self> {
        let script: Self =
            serde_json::from_str(raw).context("Failed to parse location script")?;
        if script.repeat && script.loops_instantly() {
            bail!("A repeating script needs at least one step with a non-zero after_ms");
        }
        Ok(script)
    }

    /// Whether every step fires right away, repeating such a script would never wait
    pub fn loops_instantly(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|step| step.after_ms == 0)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script at {}", path.display()))?;
        Self::from_json(&raw)
    }
}
