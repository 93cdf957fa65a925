use clap::Args;
use reconfigure_core::{expand_home, Profile, RunSettings};
use tracing::debug;

use crate::commands::RunOptions;
use crate::config::AppConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "platform_cmd_tests.rs"]
mod tests;

/// Arguments for `reconfigure platform`.
#[derive(Args, Debug, Clone, Default)]
pub struct PlatformArgs {
    /// Canonical configuration file
    #[arg(short, long)]
    pub cfg: Option<String>,

    /// BI platform install directory
    #[arg(short, long)]
    pub base: Option<String>,

    #[command(flatten)]
    pub options: RunOptions,
}

/// Builds the run settings, falling back to the settings file defaults.
pub fn settings(args: &PlatformArgs, app_config: &AppConfig) -> Result<RunSettings, Error> {
    let cfg = args
        .cfg
        .as_deref()
        .or(app_config.defaults.cfg.as_deref())
        .ok_or_else(|| Error::InvalidArguments("--cfg is required".to_string()))?;
    let base = args
        .base
        .as_deref()
        .or(app_config.defaults.base.as_deref())
        .ok_or_else(|| {
            Error::InvalidArguments("--base is required for the platform profile".to_string())
        })?;
    debug!(cfg, base, "Platform run requested");

    let settings = RunSettings::new(Profile::Platform, expand_home(cfg))
        .with_install_root(expand_home(base));
    Ok(args.options.apply_to(settings))
}
