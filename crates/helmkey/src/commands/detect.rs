//! `helmkey detect`: one autodetection run.

use std::path::{Path, PathBuf};

use tracing::info;

use helmkey_core::input::{autodetect, device};
use helmkey_core::{AutodetectOptions, AutodetectResult, DeviceConfig, FsOpener};

use crate::cli::DetectArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

pub async fn handle(args: DetectArgs, ctx: &Context) -> Result<(), CliError> {
    let engine_config = ctx.engine_config()?;
    let device_config = &engine_config.device;

    let mut options = AutodetectOptions::from(device_config);
    if let Some(window) = args.window {
        options.window = window;
    }
    if let Some(min) = args.min_presses {
        options.min_key_presses = min;
    }
    // Explicit paths mean "sniff these", so skip the by-id shortcut.
    if !args.paths.is_empty() {
        options.by_id_dir = None;
    }

    let candidates = if args.paths.is_empty() {
        candidates(device_config).await
    } else {
        args.paths
    };

    if !ctx.quiet {
        eprintln!(
            "Press a key on the remote ({} candidate(s), {})...",
            candidates.len(),
            humantime::format_duration(options.window)
        );
    }

    let result = autodetect::autodetect(&FsOpener, &candidates, &options).await;
    match &result {
        AutodetectResult::Found { path, method } => {
            if args.save {
                save_device(ctx, path)?;
            }
            let rendered = output::render_single(ctx.output, &result, |_| {
                format!("{} ({method})", path.display())
            })?;
            ctx.print(&rendered);
            Ok(())
        }
        AutodetectResult::NotFound => Err(CliError::NoRemote {
            candidates: candidates.len(),
        }),
    }
}

/// Pin the detected node in the config file so later runs skip detection.
fn save_device(ctx: &Context, path: &Path) -> Result<(), CliError> {
    let mut config = ctx.config.clone();
    config.device.path = Some(path.to_path_buf());
    let written = helmkey_config::save_config(&config, Some(&ctx.config_path))
        .map_err(|e| CliError::config(e, &ctx.config_path))?;
    info!(path = %path.display(), config = %written.display(), "device saved");
    Ok(())
}

/// Configured candidates, else every event node under the input dir.
pub async fn candidates(device_config: &DeviceConfig) -> Vec<PathBuf> {
    if device_config.candidates.is_empty() {
        device::list_event_nodes(&device_config.input_dir).await
    } else {
        device_config.candidates.clone()
    }
}
