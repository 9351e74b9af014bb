//! Device entities as returned by the devices endpoint

use serde::{Deserialize, Serialize};

/// Point description attached to a device property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub alias: String,
    pub name: String,
    pub kind: String,
    pub bias: String,
}

/// Named device property, `key` is the metric name (e.g. `SuctionPressure`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: PropertyValue,
}

/// Link to another device in the facility graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub device_id: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub alias: String,
    pub kind: String,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub upstream: Vec<Connection>,
    #[serde(default)]
    pub downstream: Vec<Connection>,
}

impl Device {
    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_defaults() {
        let device: Device = serde_json::from_value(json!({
            "id": "dev-1",
            "name": "Compressor 1",
            "alias": "C1",
            "kind": "compressor"
        }))
        .unwrap();

        assert!(device.properties.is_empty());
        assert!(device.upstream.is_empty());
        assert!(device.downstream.is_empty());
    }

    #[test]
    fn test_device_property_lookup() {
        let device: Device = serde_json::from_value(json!({
            "id": "dev-1",
            "name": "Compressor 1",
            "alias": "C1",
            "kind": "compressor",
            "properties": [{
                "key": "SuctionPressure",
                "value": { "alias": "C1_SP", "name": "Suction", "kind": "analog", "bias": "none" }
            }],
            "downstream": [{ "device_id": "dev-2", "kind": "refrigerant" }]
        }))
        .unwrap();

        assert_eq!(device.property("SuctionPressure").unwrap().value.alias, "C1_SP");
        assert!(device.property("DischargePressure").is_none());
        assert_eq!(device.downstream[0].device_id, "dev-2");
    }
}
