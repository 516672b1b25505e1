mod script;
mod source;

pub use script::{Script, ScriptStep, ScriptedFix, StepOutcome};
pub use source::ScriptedLocationSource;

pub mod prelude {
    pub use anyhow::{Context, anyhow, bail};
    pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
}
