//! `helmkey displays`: one-shot Display Service query.

use futures_util::future::join_all;
use serde::Serialize;
use tabled::Tabled;
use tracing::warn;

use helmkey_api::{DashboardDescriptor, DisplayClient, DisplayDescriptor, TransportConfig};
use helmkey_core::CoreError;

use crate::error::CliError;
use crate::output;

use super::Context;

/// A display with its dashboards and the index the service reports.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DisplayInfo {
    id: String,
    name: Option<String>,
    dashboards: Vec<DashboardDescriptor>,
    active_index: Option<usize>,
}

#[derive(Tabled)]
struct DisplayRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Dashboards")]
    dashboards: usize,
    #[tabled(rename = "Active")]
    active: String,
}

impl From<&DisplayInfo> for DisplayRow {
    fn from(d: &DisplayInfo) -> Self {
        let active = d
            .active_index
            .map(|i| match d.dashboards.get(i) {
                Some(dash) => format!("{i}: {}", dash.name.as_deref().unwrap_or(&dash.id)),
                None => i.to_string(),
            })
            .unwrap_or_default();
        Self {
            id: d.id.clone(),
            name: d.name.clone().unwrap_or_default(),
            dashboards: d.dashboards.len(),
            active,
        }
    }
}

pub async fn handle(ctx: &Context) -> Result<(), CliError> {
    let engine_config = ctx.engine_config()?;
    let transport = TransportConfig {
        timeout: engine_config.service.timeout,
        accept_invalid_certs: engine_config.service.insecure,
    };
    let client = DisplayClient::new(engine_config.service.url.clone(), &transport).map_err(CoreError::from)?;

    let displays = client.list_displays().await.map_err(CoreError::from)?;
    let infos = join_all(displays.into_iter().map(|d| describe(&client, d))).await;

    let rendered = output::render_list(ctx.output, &infos, |d| DisplayRow::from(d), |d| d.id.clone())?;
    ctx.print(&rendered);
    Ok(())
}

/// Dashboards and index for one display. Per-display failures leave the
/// row empty rather than failing the listing.
async fn describe(client: &DisplayClient, descriptor: DisplayDescriptor) -> DisplayInfo {
    let (dashboards, index) = tokio::join!(
        client.list_dashboards(&descriptor.id),
        client.screen_index(&descriptor.id),
    );
    let dashboards = dashboards.unwrap_or_else(|e| {
        warn!(display = %descriptor.id, error = %e, "dashboard query failed");
        Vec::new()
    });
    let active_index = index.unwrap_or_else(|e| {
        warn!(display = %descriptor.id, error = %e, "screen index query failed");
        None
    });
    DisplayInfo {
        id: descriptor.id,
        name: descriptor.name,
        dashboards,
        active_index,
    }
}
