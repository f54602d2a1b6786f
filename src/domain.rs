use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UploaderError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeGuid(String);

impl NodeGuid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeGuid {
    type Err = UploaderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = !normalized.is_empty()
            && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(UploaderError::InvalidNodeGuid(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub title: String,
    pub id: NodeGuid,
}

#[derive(Debug, Clone)]
pub struct SimulationRecord {
    pub molecule: String,
    pub micrograph: String,
    pub parameters: Vec<(String, Value)>,
    pub outputs: Vec<(String, Utf8PathBuf)>,
}

impl SimulationRecord {
    pub fn molecule_label(&self) -> &str {
        &self.molecule
    }

    // No separator: remote datasets created before this tool used the plain
    // concatenation, and labels must keep matching them.
    pub fn dataset_label(&self) -> String {
        format!("{}{}", self.molecule, self.micrograph)
    }

    pub fn tags(&self) -> Vec<String> {
        self.parameters
            .iter()
            .map(|(_, value)| tag_value(value))
            .collect()
    }

    pub fn artifact(&self, key: &str) -> Option<&Utf8Path> {
        self.outputs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, path)| path.as_path())
    }
}

fn tag_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
