use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use chrono::Utc;
use serde::Serialize;

use crate::domain::{NodeGuid, SimulationRecord};
use crate::error::UploaderError;
use crate::osf::OsfApi;
use crate::resolver;

// Storage reports exactly 201 for a stored file; any other code, 2xx
// included, counts as a failed upload.
pub const UPLOAD_CREATED: u16 = 201;

#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub path: String,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub molecule_node: String,
    pub dataset_node: String,
    pub uploaded_at: String,
    pub results: Vec<UploadResult>,
    pub all_succeeded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveResult {
    pub label: String,
    pub node: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub fn all_succeeded(results: &[UploadResult]) -> bool {
    results.iter().all(|result| result.succeeded)
}

#[derive(Clone)]
pub struct Uploader<A: OsfApi> {
    api: A,
    data_node: NodeGuid,
}

impl<A: OsfApi> Uploader<A> {
    pub fn new(api: A, data_node: NodeGuid) -> Self {
        Self { api, data_node }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn resolve_molecule(&self, label: &str) -> Result<NodeGuid, UploaderError> {
        resolver::resolve_or_create(&self.api, &self.data_node, label, None)
    }

    pub fn find_molecule(&self, label: &str) -> Result<Option<NodeGuid>, UploaderError> {
        resolver::find_existing(&self.api, &self.data_node, label)
    }

    pub fn build_dataset_node(
        &self,
        record: &SimulationRecord,
    ) -> Result<NodeGuid, UploaderError> {
        let molecule = self.resolve_molecule(record.molecule_label())?;
        self.create_dataset_node(&molecule, record)
    }

    // Dataset nodes are never reused: one fresh node per upload run.
    fn create_dataset_node(
        &self,
        molecule: &NodeGuid,
        record: &SimulationRecord,
    ) -> Result<NodeGuid, UploaderError> {
        let tags = record.tags();
        self.api
            .create_child_node(molecule, &record.dataset_label(), Some(&tags))
    }

    pub fn upload_all(
        &self,
        node: &NodeGuid,
        paths: &[Utf8PathBuf],
        sink: &dyn ProgressSink,
    ) -> Vec<UploadResult> {
        let mut results = Vec::with_capacity(paths.len());

        for path in paths {
            let started = Instant::now();
            let result = match self.api.upload_file(node, path) {
                Ok(status) if status == UPLOAD_CREATED => {
                    sink.event(ProgressEvent {
                        message: format!("uploaded {path}"),
                        elapsed: Some(started.elapsed()),
                    });
                    UploadResult {
                        path: path.to_string(),
                        status: Some(status),
                        error: None,
                        succeeded: true,
                    }
                }
                Ok(status) => {
                    sink.event(ProgressEvent {
                        message: format!("upload {path} failed with status {status}"),
                        elapsed: Some(started.elapsed()),
                    });
                    UploadResult {
                        path: path.to_string(),
                        status: Some(status),
                        error: None,
                        succeeded: false,
                    }
                }
                Err(err) => {
                    sink.event(ProgressEvent {
                        message: format!("upload {path} failed: {err}"),
                        elapsed: Some(started.elapsed()),
                    });
                    UploadResult {
                        path: path.to_string(),
                        status: None,
                        error: Some(err.to_string()),
                        succeeded: false,
                    }
                }
            };
            results.push(result);
        }

        results
    }

    pub fn upload_dataset(
        &self,
        record: &SimulationRecord,
        sink: &dyn ProgressSink,
    ) -> Result<UploadReport, UploaderError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; molecule {}", record.molecule_label()),
            elapsed: None,
        });
        let molecule = self.resolve_molecule(record.molecule_label())?;

        sink.event(ProgressEvent {
            message: format!("phase=Create; dataset {}", record.dataset_label()),
            elapsed: None,
        });
        let dataset = self.create_dataset_node(&molecule, record)?;

        let artifact = record
            .artifact("h5")
            .ok_or_else(|| UploaderError::MissingArtifact("h5".to_string()))?;
        let paths = vec![artifact.to_owned()];

        sink.event(ProgressEvent {
            message: format!("phase=Upload; {} file(s)", paths.len()),
            elapsed: None,
        });
        let results = self.upload_all(&dataset, &paths, sink);
        let succeeded = all_succeeded(&results);

        Ok(UploadReport {
            molecule_node: molecule.to_string(),
            dataset_node: dataset.to_string(),
            uploaded_at: Utc::now().to_rfc3339(),
            results,
            all_succeeded: succeeded,
        })
    }
}
