use std::fs::File;

use camino::Utf8Path;
use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};
use tracing::debug;

use crate::domain::{NodeGuid, NodeSummary};
use crate::error::UploaderError;

pub const DEFAULT_API_BASE: &str = "https://api.osf.io/v2/";
pub const DEFAULT_FILES_BASE: &str = "http://files.ca-1.osf.io/v1/resources/";
pub const STORAGE_PROVIDER: &str = "osfstorage";

pub trait OsfApi: Send + Sync {
    fn list_children(&self, parent: &NodeGuid) -> Result<Vec<NodeSummary>, UploaderError>;
    fn create_child_node(
        &self,
        parent: &NodeGuid,
        title: &str,
        tags: Option<&[String]>,
    ) -> Result<NodeGuid, UploaderError>;
    fn upload_file(&self, node: &NodeGuid, path: &Utf8Path) -> Result<u16, UploaderError>;
}

#[derive(Clone)]
pub struct OsfHttpClient {
    client: Client,
    api_base: String,
    files_base: String,
}

impl OsfHttpClient {
    pub fn connect(token: &str) -> Result<Self, UploaderError> {
        Self::connect_with_bases(token, DEFAULT_API_BASE, DEFAULT_FILES_BASE)
    }

    pub fn connect_with_bases(
        token: &str,
        api_base: &str,
        files_base: &str,
    ) -> Result<Self, UploaderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cryosim-up/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| UploaderError::AuthenticationHttp(err.to_string()))?,
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|err| UploaderError::AuthenticationHttp(err.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| UploaderError::AuthenticationHttp(err.to_string()))?;

        let session = Self {
            client,
            api_base: api_base.to_string(),
            files_base: files_base.to_string(),
        };

        // Credential gate: one failed probe aborts before any node operation.
        let response = session
            .client
            .get(&session.api_base)
            .send()
            .map_err(|err| UploaderError::AuthenticationHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "OSF liveness check failed".to_string());
            return Err(UploaderError::AuthenticationStatus { status, message });
        }

        Ok(session)
    }

    fn children_url(&self, parent: &NodeGuid) -> String {
        format!("{}nodes/{}/children/", self.api_base, parent)
    }

    fn storage_url(&self, node: &NodeGuid) -> String {
        format!("{}{}/providers/{}/", self.files_base, node, STORAGE_PROVIDER)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, UploaderError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "OSF request failed".to_string());
        Err(UploaderError::OsfStatus { status, message })
    }
}

impl OsfApi for OsfHttpClient {
    fn list_children(&self, parent: &NodeGuid) -> Result<Vec<NodeSummary>, UploaderError> {
        let url = self.children_url(parent);
        debug!(parent = %parent, "listing child nodes");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| UploaderError::OsfHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body: Value = response
            .json()
            .map_err(|err| UploaderError::OsfHttp(err.to_string()))?;

        let children = body
            .get("data")
            .and_then(|value| value.as_array())
            .ok_or_else(|| {
                UploaderError::OsfHttp("children response missing data array".to_string())
            })?;

        children
            .iter()
            .map(|child| {
                let title = child
                    .get("attributes")
                    .and_then(|value| value.get("title"))
                    .and_then(|value| value.as_str())
                    .ok_or_else(|| {
                        UploaderError::OsfHttp("child node missing attributes.title".to_string())
                    })?;
                let id = child
                    .get("id")
                    .and_then(|value| value.as_str())
                    .ok_or_else(|| {
                        UploaderError::OsfHttp("child node missing id".to_string())
                    })?;
                Ok(NodeSummary {
                    title: title.to_string(),
                    id: id.parse()?,
                })
            })
            .collect()
    }

    fn create_child_node(
        &self,
        parent: &NodeGuid,
        title: &str,
        tags: Option<&[String]>,
    ) -> Result<NodeGuid, UploaderError> {
        let url = self.children_url(parent);
        debug!(parent = %parent, title, "creating child node");

        let mut attributes = json!({
            "title": title,
            "category": "data",
            "public": true,
        });
        if let Some(tags) = tags {
            attributes["tags"] = json!(tags);
        }
        let body = json!({ "data": { "type": "nodes", "attributes": attributes } });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|err| UploaderError::OsfHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body: Value = response
            .json()
            .map_err(|err| UploaderError::OsfHttp(err.to_string()))?;

        body.get("data")
            .and_then(|value| value.get("id"))
            .and_then(|value| value.as_str())
            .ok_or_else(|| UploaderError::OsfHttp("create response missing data.id".to_string()))?
            .parse()
    }

    fn upload_file(&self, node: &NodeGuid, path: &Utf8Path) -> Result<u16, UploaderError> {
        let name = path
            .file_name()
            .ok_or_else(|| UploaderError::Filesystem(format!("{path} has no file name")))?;

        // Handle is owned by the multipart part, so it is released when the
        // request finishes either way.
        let file = File::open(path.as_std_path())
            .map_err(|err| UploaderError::Filesystem(format!("{path}: {err}")))?;
        let part = Part::reader(file).file_name(name.to_string());
        let form = Form::new().part(name.to_string(), part);

        debug!(node = %node, file = name, "uploading file");
        let response = self
            .client
            .put(self.storage_url(node))
            .query(&[("kind", "file"), ("name", name)])
            .multipart(form)
            .send()
            .map_err(|err| UploaderError::OsfHttp(err.to_string()))?;

        Ok(response.status().as_u16())
    }
}
