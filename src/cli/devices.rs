//! `devices` command

use std::fmt::Write;

use super::{to_json, Client};
use crate::infrastructure::services::DeviceCatalog;

pub async fn run(client: &Client, json: bool) -> anyhow::Result<String> {
    let catalog = DeviceCatalog::load(client).await?;

    if json {
        return to_json(&catalog.by_kind);
    }
    Ok(render(&catalog))
}

fn render(catalog: &DeviceCatalog) -> String {
    let mut out = String::new();
    for (facility, kinds) in &catalog.by_kind {
        let _ = writeln!(out, "Facility: {}", facility);
        for (kind, devices) in kinds {
            let _ = writeln!(out, "  {}:", kind);
            for device in devices {
                let _ = writeln!(out, "    {}", device.name);
                for prop in &device.properties {
                    let _ = writeln!(
                        out,
                        "      {} ({} {}): {}",
                        prop.value.name, prop.value.kind, prop.value.bias, prop.value.alias
                    );
                }
                for up in &device.upstream {
                    let _ = writeln!(out, "      Upstream: {}", catalog.describe_connection(up));
                }
                for down in &device.downstream {
                    let peer = catalog.describe_connection(down);
                    let _ = writeln!(out, "      Downstream: {}", peer);
                }
            }
        }
    }
    out
}
