use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::json;

use cryosim_uploader::app::{UploadResult, Uploader, all_succeeded};
use cryosim_uploader::domain::{NodeGuid, NodeSummary, SimulationRecord};
use cryosim_uploader::error::UploaderError;
use cryosim_uploader::osf::OsfApi;
use cryosim_uploader::output::JsonOutput;

#[derive(Default)]
struct MockApi {
    children: HashMap<String, Vec<NodeSummary>>,
    created: Mutex<Vec<(String, String, Option<Vec<String>>)>>,
    create_ids: Mutex<VecDeque<String>>,
    uploads: Mutex<Vec<(String, String)>>,
    upload_outcomes: Mutex<VecDeque<Result<u16, UploaderError>>>,
}

impl MockApi {
    fn with_children(mut self, parent: &str, children: Vec<(&str, &str)>) -> Self {
        self.children.insert(
            parent.to_string(),
            children
                .into_iter()
                .map(|(title, id)| NodeSummary {
                    title: title.to_string(),
                    id: id.parse().unwrap(),
                })
                .collect(),
        );
        self
    }

    fn with_create_ids(self, ids: Vec<&str>) -> Self {
        *self.create_ids.lock().unwrap() = ids.into_iter().map(|id| id.to_string()).collect();
        self
    }

    fn with_upload_outcomes(self, outcomes: Vec<Result<u16, UploaderError>>) -> Self {
        *self.upload_outcomes.lock().unwrap() = outcomes.into();
        self
    }

    fn created(&self) -> Vec<(String, String, Option<Vec<String>>)> {
        self.created.lock().unwrap().clone()
    }

    fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

impl OsfApi for MockApi {
    fn list_children(&self, parent: &NodeGuid) -> Result<Vec<NodeSummary>, UploaderError> {
        Ok(self
            .children
            .get(parent.as_str())
            .cloned()
            .unwrap_or_default())
    }

    fn create_child_node(
        &self,
        parent: &NodeGuid,
        title: &str,
        tags: Option<&[String]>,
    ) -> Result<NodeGuid, UploaderError> {
        self.created.lock().unwrap().push((
            parent.to_string(),
            title.to_string(),
            tags.map(|tags| tags.to_vec()),
        ));
        let id = self
            .create_ids
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected create call");
        id.parse()
    }

    fn upload_file(&self, node: &NodeGuid, path: &Utf8Path) -> Result<u16, UploaderError> {
        self.uploads
            .lock()
            .unwrap()
            .push((node.to_string(), path.to_string()));
        self.upload_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected upload call")
    }
}

fn record() -> SimulationRecord {
    SimulationRecord {
        molecule: "4v6x".to_string(),
        micrograph: "_randomrot".to_string(),
        parameters: vec![
            ("voltage".to_string(), json!(300)),
            ("dose".to_string(), json!(50)),
        ],
        outputs: vec![("h5".to_string(), Utf8PathBuf::from("out/4v6x.h5"))],
    }
}

fn paths(values: &[&str]) -> Vec<Utf8PathBuf> {
    values.iter().map(Utf8PathBuf::from).collect()
}

#[test]
fn upload_all_succeeds_when_every_status_is_201() {
    let api = MockApi::default().with_upload_outcomes(vec![Ok(201), Ok(201)]);
    let uploader = Uploader::new(api, "root1".parse().unwrap());
    let node: NodeGuid = "data9".parse().unwrap();

    let results = uploader.upload_all(&node, &paths(&["a.h5", "b.h5"]), &JsonOutput);

    assert!(results.iter().all(|result| result.succeeded));
    assert!(all_succeeded(&results));
}

#[test]
fn upload_all_attempts_every_file_past_a_failure() {
    let api = MockApi::default().with_upload_outcomes(vec![Ok(201), Ok(404)]);
    let uploader = Uploader::new(api, "root1".parse().unwrap());
    let node: NodeGuid = "data9".parse().unwrap();

    let results = uploader.upload_all(&node, &paths(&["a.h5", "b.h5"]), &JsonOutput);

    assert!(!all_succeeded(&results));
    assert_eq!(results[0].status, Some(201));
    assert_eq!(results[1].status, Some(404));
    assert!(!results[1].succeeded);
    assert_eq!(uploader.api().uploads().len(), 2);
}

#[test]
fn upload_all_counts_other_2xx_as_failure() {
    let api = MockApi::default().with_upload_outcomes(vec![Ok(200)]);
    let uploader = Uploader::new(api, "root1".parse().unwrap());
    let node: NodeGuid = "data9".parse().unwrap();

    let results = uploader.upload_all(&node, &paths(&["a.h5"]), &JsonOutput);

    assert!(!results[0].succeeded);
    assert_eq!(results[0].status, Some(200));
}

#[test]
fn upload_all_folds_transport_errors_into_failures() {
    let api = MockApi::default().with_upload_outcomes(vec![
        Err(UploaderError::OsfHttp("connection reset".to_string())),
        Ok(201),
    ]);
    let uploader = Uploader::new(api, "root1".parse().unwrap());
    let node: NodeGuid = "data9".parse().unwrap();

    let results = uploader.upload_all(&node, &paths(&["a.h5", "b.h5"]), &JsonOutput);

    assert!(!results[0].succeeded);
    assert_eq!(results[0].status, None);
    assert!(results[0].error.as_deref().unwrap_or("").contains("connection reset"));
    assert!(results[1].succeeded);
}

#[test]
fn all_succeeded_is_an_and_fold() {
    let success = UploadResult {
        path: "a.h5".to_string(),
        status: Some(201),
        error: None,
        succeeded: true,
    };
    let failure = UploadResult {
        path: "b.h5".to_string(),
        status: Some(404),
        error: None,
        succeeded: false,
    };

    assert!(all_succeeded(&[]));
    assert!(all_succeeded(&[success.clone(), success.clone()]));
    assert!(!all_succeeded(&[success, failure]));
}

#[test]
fn upload_dataset_reuses_existing_molecule_node() {
    let api = MockApi::default()
        .with_children("root1", vec![("4v6x", "mol01")])
        .with_create_ids(vec!["data9"])
        .with_upload_outcomes(vec![Ok(201)]);
    let uploader = Uploader::new(api, "root1".parse().unwrap());

    let report = uploader.upload_dataset(&record(), &JsonOutput).unwrap();

    assert_eq!(report.molecule_node, "mol01");
    assert_eq!(report.dataset_node, "data9");
    assert!(report.all_succeeded);

    let created = uploader.api().created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, "mol01");
    assert_eq!(created[0].1, "4v6x_randomrot");
    assert_eq!(
        created[0].2,
        Some(vec!["300".to_string(), "50".to_string()])
    );

    assert_eq!(
        uploader.api().uploads(),
        vec![("data9".to_string(), "out/4v6x.h5".to_string())]
    );
}

#[test]
fn upload_dataset_creates_molecule_node_when_absent() {
    let api = MockApi::default()
        .with_create_ids(vec!["mol02", "data9"])
        .with_upload_outcomes(vec![Ok(201)]);
    let uploader = Uploader::new(api, "root1".parse().unwrap());

    let report = uploader.upload_dataset(&record(), &JsonOutput).unwrap();

    assert_eq!(report.molecule_node, "mol02");
    let created = uploader.api().created();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0], ("root1".to_string(), "4v6x".to_string(), None));
    assert_eq!(created[1].0, "mol02");
    assert_eq!(created[1].1, "4v6x_randomrot");
}

#[test]
fn upload_dataset_requires_the_h5_artifact() {
    let api = MockApi::default()
        .with_children("root1", vec![("4v6x", "mol01")])
        .with_create_ids(vec!["data9"]);
    let uploader = Uploader::new(api, "root1".parse().unwrap());

    let mut record = record();
    record.outputs.clear();

    let err = uploader.upload_dataset(&record, &JsonOutput).unwrap_err();
    assert_matches!(err, UploaderError::MissingArtifact(_));
}

#[test]
fn build_dataset_node_returns_the_fresh_dataset() {
    let api = MockApi::default()
        .with_children("root1", vec![("4v6x", "mol01")])
        .with_create_ids(vec!["data9"]);
    let uploader = Uploader::new(api, "root1".parse().unwrap());

    let dataset = uploader.build_dataset_node(&record()).unwrap();
    assert_eq!(dataset.as_str(), "data9");
}
