use clap::Args;
use reconfigure_core::{expand_home, Profile, RunSettings};
use tracing::debug;

use crate::commands::RunOptions;
use crate::config::AppConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "repository_cmd_tests.rs"]
mod tests;

/// Arguments for `reconfigure repository`.
#[derive(Args, Debug, Clone, Default)]
pub struct RepositoryArgs {
    /// Canonical configuration file
    #[arg(short, long)]
    pub cfg: Option<String>,

    #[command(flatten)]
    pub options: RunOptions,
}

pub fn settings(args: &RepositoryArgs, app_config: &AppConfig) -> Result<RunSettings, Error> {
    let cfg = args
        .cfg
        .as_deref()
        .or(app_config.defaults.cfg.as_deref())
        .ok_or_else(|| Error::InvalidArguments("--cfg is required".to_string()))?;
    debug!(cfg, "Repository run requested");

    Ok(args
        .options
        .apply_to(RunSettings::new(Profile::Repository, expand_home(cfg))))
}
