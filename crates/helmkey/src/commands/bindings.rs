//! `helmkey bindings`: list the persisted binding table.

use tabled::Tabled;

use helmkey_config::TomlBindingStore;
use helmkey_core::{Action, Binding, BindingStore};

use crate::cli::BindingsArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Tabled)]
struct BindingRow {
    #[tabled(rename = "Display")]
    display: String,
    #[tabled(rename = "Dashboard")]
    dashboard: String,
    #[tabled(rename = "Action")]
    action: String,
}

impl From<&Binding> for BindingRow {
    fn from(b: &Binding) -> Self {
        Self {
            display: b.display.clone(),
            dashboard: b.dashboard.clone(),
            action: describe(&b.action),
        }
    }
}

fn describe(action: &Action) -> String {
    match action {
        Action::None => "-".into(),
        Action::Rest { url, method, .. } => format!("{method} {url}"),
        Action::Signalk { path, value } => format!("{path} = {value}"),
    }
}

pub fn handle(args: &BindingsArgs, ctx: &Context) -> Result<(), CliError> {
    let store = TomlBindingStore::new(ctx.config.bindings_path());
    let mut table = store.load()?;
    if args.merged {
        table.merge(ctx.config.bindings.iter().cloned());
    }

    let bindings: Vec<Binding> = table.into();
    let rendered = output::render_list(ctx.output, &bindings, |b| BindingRow::from(b), |b| {
        format!("{}/{}", b.display, b.dashboard)
    })?;
    ctx.print(&rendered);
    Ok(())
}
