use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::SimulationRecord;
use crate::error::UploaderError;

#[derive(Debug, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(default)]
    pub schema_version: Option<u32>,
    pub molecule: String,
    pub micrograph: String,
    // Ordered sequence of [name, value] pairs. A JSON object would lose the
    // order the simulator wrote, and tag order must stay deterministic.
    #[serde(default)]
    pub parameters: Vec<(String, Value)>,
    #[serde(default)]
    pub outputs: Vec<(String, String)>,
}

pub struct ManifestLoader;

impl ManifestLoader {
    pub fn resolve(path: Option<&str>) -> Result<SimulationRecord, UploaderError> {
        let manifest_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("cryosim.json"),
        };

        if path.is_none() && !manifest_path.exists() {
            return Err(UploaderError::MissingConfig);
        }

        let content = fs::read_to_string(&manifest_path)
            .map_err(|_| UploaderError::ConfigRead(manifest_path.clone()))?;
        let manifest: Manifest = serde_json::from_str(&content)
            .map_err(|err| UploaderError::ConfigParse(err.to_string()))?;

        Self::resolve_manifest(manifest)
    }

    pub fn resolve_manifest(manifest: Manifest) -> Result<SimulationRecord, UploaderError> {
        let molecule = manifest.molecule.trim().to_string();
        if molecule.is_empty() {
            return Err(UploaderError::InvalidManifest(
                "molecule keyword must not be empty".to_string(),
            ));
        }

        let micrograph = manifest.micrograph.trim().to_string();
        if micrograph.is_empty() {
            return Err(UploaderError::InvalidManifest(
                "micrograph keyword must not be empty".to_string(),
            ));
        }

        let outputs = manifest
            .outputs
            .into_iter()
            .map(|(key, path)| {
                if path.trim().is_empty() {
                    return Err(UploaderError::InvalidManifest(format!(
                        "output path for {key} must not be empty"
                    )));
                }
                Ok((key, Utf8PathBuf::from(path)))
            })
            .collect::<Result<Vec<_>, UploaderError>>()?;

        Ok(SimulationRecord {
            molecule,
            micrograph,
            parameters: manifest.parameters,
            outputs,
        })
    }
}
