//! Faction model matching the factions namespace payloads.

use serde::{Deserialize, Serialize};

/// Faction category. Unknown categories from the server are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactionType {
    Open,
    Criminal,
    Closed,
    #[serde(untagged)]
    Other(String),
}

impl FactionType {
    pub fn as_str(&self) -> &str {
        match self {
            FactionType::Open => "open",
            FactionType::Criminal => "criminal",
            FactionType::Closed => "closed",
            FactionType::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "open" => FactionType::Open,
            "criminal" => FactionType::Criminal,
            "closed" => FactionType::Closed,
            other => FactionType::Other(other.to_string()),
        }
    }
}

/// A playable faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FactionType,
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub general_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Request body for `action=create`.
#[derive(Debug, Clone, Serialize)]
pub struct NewFaction {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FactionType,
    pub is_open: bool,
    pub description: String,
}

/// Factions partitioned by category, each partition in server order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactionGroups {
    pub open: Vec<Faction>,
    pub criminal: Vec<Faction>,
    pub closed: Vec<Faction>,
}

/// Partition factions by type. Factions of an unknown type are not shown.
pub fn group_factions(factions: &[Faction]) -> FactionGroups {
    let mut groups = FactionGroups::default();
    for faction in factions {
        match faction.kind {
            FactionType::Open => groups.open.push(faction.clone()),
            FactionType::Criminal => groups.criminal.push(faction.clone()),
            FactionType::Closed => groups.closed.push(faction.clone()),
            FactionType::Other(_) => {}
        }
    }
    groups
}
