//! Device catalog - devices across facilities, by kind and by ID

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{Connection, Device, DomainError};
use crate::infrastructure::atlas::{AtlasClient, HttpClientTrait};

/// Devices grouped by facility display name then device kind
pub type DevicesByKind = BTreeMap<String, BTreeMap<String, Vec<Device>>>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceCatalog {
    pub by_kind: DevicesByKind,
    #[serde(skip)]
    pub by_id: HashMap<String, Device>,
}

impl DeviceCatalog {
    /// Load devices for every accessible facility.
    ///
    /// A facility whose devices cannot be listed is logged and skipped.
    pub async fn load<C: HttpClientTrait>(client: &AtlasClient<C>) -> Result<Self, DomainError> {
        let mut facilities = client
            .list_facilities()
            .await
            .map_err(|e| e.context("Error listing facilities"))?;
        facilities.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        let mut catalog = Self::default();
        for facility in &facilities {
            let Some(agent_id) = facility.primary_agent_id() else {
                warn!(facility = %facility.display_name, "facility has no agent, skipping");
                continue;
            };

            let mut devices = match client
                .list_devices(&facility.organization_id, agent_id)
                .await
            {
                Ok(devices) => devices,
                Err(e) => {
                    warn!(facility = %facility.display_name, error = %e, "error listing devices");
                    continue;
                }
            };
            devices.sort_by(|a, b| a.name.cmp(&b.name));

            let by_kind = catalog
                .by_kind
                .entry(facility.display_name.clone())
                .or_default();
            for device in devices {
                catalog.by_id.insert(device.id.clone(), device.clone());
                by_kind.entry(device.kind.clone()).or_default().push(device);
            }
        }

        info!(
            facilities = catalog.by_kind.len(),
            devices = catalog.by_id.len(),
            "device catalog loaded"
        );
        Ok(catalog)
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.by_id.get(id)
    }

    /// Name of the device at the other end of a connection, or its ID when
    /// the device is unknown
    pub fn peer_name<'a>(&'a self, connection: &'a Connection) -> &'a str {
        self.device(&connection.device_id)
            .map(|d| d.name.as_str())
            .unwrap_or(connection.device_id.as_str())
    }

    pub fn describe_connection(&self, connection: &Connection) -> String {
        format!("{} to {}", connection.kind, self.peer_name(connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::atlas::test_support::*;
    use serde_json::json;

    fn device(id: &str, name: &str, kind: &str, downstream: &[&str]) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "alias": name,
            "kind": kind,
            "downstream": downstream
                .iter()
                .map(|d| json!({ "device_id": d, "kind": "suction" }))
                .collect::<Vec<_>>()
        })
    }

    #[tokio::test]
    async fn test_load_catalog() {
        let mock = authorized_mock()
            .with_response(
                facilities_url(),
                json!([
                    facility_json("zulu", "org-2", &["agent-2"]),
                    facility_json("alpha", "org-1", &["agent-1"]),
                    facility_json("empty", "org-3", &[]),
                ]),
            )
            .with_response(
                deployment_url("org-1", "agent-1"),
                deployment_json("org-1", "agent-1", 1),
            )
            .with_response(
                devices_url("org-1", "agent-1"),
                json!({ "values": [
                    device("d-2", "Compressor B", "compressor", &[]),
                    device("d-1", "Compressor A", "compressor", &["d-3"]),
                    device("d-3", "Vessel", "vessel", &[]),
                ]}),
            )
            .with_error(deployment_url("org-2", "agent-2"), 500, "down");

        let catalog = DeviceCatalog::load(&client(mock)).await.unwrap();

        assert_eq!(catalog.by_kind.keys().collect::<Vec<_>>(), vec!["Facility ALPHA"]);
        let compressors = &catalog.by_kind["Facility ALPHA"]["compressor"];
        assert_eq!(compressors[0].name, "Compressor A");
        assert_eq!(compressors[1].name, "Compressor B");
        assert_eq!(catalog.by_id.len(), 3);

        let connection = &catalog.device("d-1").unwrap().downstream[0];
        assert_eq!(catalog.describe_connection(connection), "suction to Vessel");
    }

    #[test]
    fn test_unknown_peer_falls_back_to_id() {
        let catalog = DeviceCatalog::default();
        let connection = Connection {
            device_id: "d-404".into(),
            kind: "liquid".into(),
        };
        assert_eq!(catalog.describe_connection(&connection), "liquid to d-404");
    }

    #[tokio::test]
    async fn test_load_fails_when_facilities_fail() {
        let mock = authorized_mock().with_error(facilities_url(), 503, "maintenance");

        let err = DeviceCatalog::load(&client(mock)).await.unwrap_err();
        assert!(err.to_string().contains("Error listing facilities"));
    }
}
