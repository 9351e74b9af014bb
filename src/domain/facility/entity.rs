//! Facility and deployment entities

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Agent running at a facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
}

/// Facility the logged in user has access to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub organization_id: String,
    pub facility_id: String,
    pub display_name: String,
    pub short_name: String,
    pub address: String,
    pub timezone: String,
    #[serde(default)]
    pub agents: Vec<Agent>,
}

impl Facility {
    /// The agent used for all facility queries
    pub fn primary_agent(&self) -> Option<&Agent> {
        self.agents.first()
    }

    pub fn primary_agent_id(&self) -> Option<&str> {
        self.primary_agent().map(|agent| agent.agent_id.as_str())
    }
}

/// Currently active deployment at a facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub agent_id: String,
    pub organization_id: String,
    pub blueprint_version: i64,
}

impl Deployment {
    /// Build from the site-narratives payload, which nests the version
    /// under `blueprint` and names the organization `org_id`.
    pub fn from_api(json: &serde_json::Value) -> Result<Self, DomainError> {
        let field = |name: &str| {
            json.get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    DomainError::parse(format!(
                        "Error parsing deployment: missing '{}', got {}",
                        name, json
                    ))
                })
        };

        let blueprint_version = json
            .get("blueprint")
            .and_then(|b| b.get("version"))
            .and_then(|v| v.as_i64())
            .ok_or_else(|| {
                DomainError::parse(format!(
                    "Error parsing deployment: missing 'blueprint.version', got {}",
                    json
                ))
            })?;

        Ok(Self {
            id: field("id")?,
            agent_id: field("agent_id")?,
            organization_id: field("org_id")?,
            blueprint_version,
        })
    }
}
