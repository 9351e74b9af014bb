//! `facilities` command

use std::fmt::Write;

use super::{to_json, Client};
use crate::domain::Facility;

pub async fn run(client: &Client, json: bool) -> anyhow::Result<String> {
    let mut facilities = client.list_facilities().await?;
    facilities.sort_by(|a, b| a.display_name.cmp(&b.display_name));

    if json {
        return to_json(&facilities);
    }
    Ok(render(&facilities))
}

fn render(facilities: &[Facility]) -> String {
    let mut out = String::new();
    for f in facilities {
        let agents: Vec<&str> = f.agents.iter().map(|a| a.agent_id.as_str()).collect();
        let _ = writeln!(out, "{} ({})", f.display_name, f.short_name);
        let _ = writeln!(out, "  organization: {}", f.organization_id);
        let _ = writeln!(out, "  address:      {}", f.address);
        let _ = writeln!(out, "  timezone:     {}", f.timezone);
        let _ = writeln!(out, "  agents:       {}", agents.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Agent;

    #[test]
    fn test_render() {
        let facility = Facility {
            organization_id: "org-1".into(),
            facility_id: "fac-1".into(),
            display_name: "Plant A".into(),
            short_name: "planta".into(),
            address: "1 Cold St".into(),
            timezone: "UTC".into(),
            agents: vec![Agent {
                agent_id: "agent-1".into(),
            }],
        };

        let out = render(&[facility]);
        assert!(out.starts_with("Plant A (planta)\n"));
        assert!(out.contains("  agents:       agent-1\n"));
    }
}
