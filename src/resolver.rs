use std::collections::HashMap;

use crate::domain::NodeGuid;
use crate::error::UploaderError;
use crate::osf::OsfApi;

// Get-or-create by title. The list and the create are two separate remote
// calls with no lock between them: two processes resolving the same new
// label can both create it, leaving duplicate sibling titles behind.
pub fn resolve_or_create<A: OsfApi>(
    api: &A,
    parent: &NodeGuid,
    label: &str,
    tags: Option<&[String]>,
) -> Result<NodeGuid, UploaderError> {
    let existing = existing_titles(api, parent)?;
    if let Some(id) = existing.get(label) {
        return Ok(id.clone());
    }
    api.create_child_node(parent, label, tags)
}

pub fn find_existing<A: OsfApi>(
    api: &A,
    parent: &NodeGuid,
    label: &str,
) -> Result<Option<NodeGuid>, UploaderError> {
    let existing = existing_titles(api, parent)?;
    Ok(existing.get(label).cloned())
}

// On duplicate titles the last sibling listed wins.
fn existing_titles<A: OsfApi>(
    api: &A,
    parent: &NodeGuid,
) -> Result<HashMap<String, NodeGuid>, UploaderError> {
    let children = api.list_children(parent)?;
    Ok(children
        .into_iter()
        .map(|child| (child.title, child.id))
        .collect())
}
