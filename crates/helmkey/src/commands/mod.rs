//! Command dispatch: bridges CLI args -> engine calls -> output formatting.

pub mod bindings;
pub mod detect;
pub mod displays;
pub mod dump;
pub mod run;

use std::path::PathBuf;

use helmkey_config::Config;
use helmkey_core::EngineConfig;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Loaded configuration plus the output options every handler needs.
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub output: OutputFormat,
    pub quiet: bool,
}

impl Context {
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let config_path = global.config.clone().unwrap_or_else(helmkey_config::config_path);
        let config = helmkey_config::load_config(Some(&config_path))
            .map_err(|e| CliError::config(e, &config_path))?;
        Ok(Self {
            config,
            config_path,
            output: global.output,
            quiet: global.quiet,
        })
    }

    /// Validated engine configuration.
    pub fn engine_config(&self) -> Result<EngineConfig, CliError> {
        self.config
            .to_engine_config()
            .map_err(|e| CliError::config(e, &self.config_path))
    }

    pub fn print(&self, rendered: &str) {
        crate::output::print_output(rendered, self.quiet);
    }
}

pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(args, ctx).await,
        Command::Detect(args) => detect::handle(args, ctx).await,
        Command::Dump(args) => dump::handle(args, ctx).await,
        Command::Displays => displays::handle(ctx).await,
        Command::Bindings(args) => bindings::handle(&args, ctx),
    }
}
