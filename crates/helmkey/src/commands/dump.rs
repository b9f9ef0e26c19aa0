//! `helmkey dump`: stream events from the remote to stdout.

use std::path::Path;

use futures_util::{StreamExt, pin_mut};
use tracing::info;

use helmkey_core::input::autodetect;
use helmkey_core::{
    AutodetectOptions, AutodetectResult, ClassifiedEvent, CoreError, DeviceOpener, FsOpener, RawEvent,
    classify, event_stream,
};

use crate::cli::{DumpArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::{Context, detect};

pub async fn handle(args: DumpArgs, ctx: &Context) -> Result<(), CliError> {
    let engine_config = ctx.engine_config()?;
    let device_config = &engine_config.device;

    let path = match args.device.or_else(|| device_config.path.clone()) {
        Some(path) => path,
        None => {
            let candidates = detect::candidates(device_config).await;
            if !ctx.quiet {
                eprintln!("No device configured; press a key on the remote to find it...");
            }
            let options = AutodetectOptions::from(device_config);
            match autodetect::autodetect(&FsOpener, &candidates, &options).await {
                AutodetectResult::Found { path, .. } => path,
                AutodetectResult::NotFound => {
                    return Err(CliError::NoRemote {
                        candidates: candidates.len(),
                    });
                }
            }
        }
    };

    let reader = FsOpener.open(&path).map_err(|e| unavailable(&path, &e))?;
    info!(path = %path.display(), layout = ?device_config.layout, "dumping events");

    let events = event_stream(reader, device_config.layout);
    pin_mut!(events);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut shutdown => return Ok(()),
            next = events.next() => next,
        };
        match next {
            Some(Ok(raw)) => {
                if let Some(line) = render(ctx.output, &raw, args.all)? {
                    ctx.print(&line);
                }
            }
            Some(Err(CoreError::StreamClosed { reason })) => {
                return Err(CliError::DeviceUnavailable {
                    path: path.display().to_string(),
                    reason,
                });
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(()),
        }
    }
}

fn unavailable(path: &Path, err: &std::io::Error) -> CliError {
    CliError::DeviceUnavailable {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// One output line for `raw`, or `None` when it is filtered out.
fn render(format: OutputFormat, raw: &RawEvent, all: bool) -> Result<Option<String>, CliError> {
    if all {
        return output::render_line(format, raw, raw_text).map(Some);
    }
    classify(raw)
        .map(|event| output::render_line(format, &event, key_text))
        .transpose()
}

fn raw_text(raw: &RawEvent) -> String {
    format!(
        "{}.{:06} type={} code={} value={}",
        raw.timestamp_secs, raw.timestamp_micros, raw.type_code, raw.code, raw.value
    )
}

fn key_text(event: &ClassifiedEvent) -> String {
    let name = event
        .code_name
        .map_or_else(|| format!("KEY_{}", event.code), |name| name.to_string());
    match event.remote_key() {
        Some(key) => format!("{name} {} ({key})", event.action),
        None => format!("{name} {}", event.action),
    }
}
