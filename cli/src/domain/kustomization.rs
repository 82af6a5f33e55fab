//! Kustomization assembly
//!
//! Turns a set of patches into the files `kubectl kustomize` consumes:
//! `add` operations become one Strategic Merge Patch file each, while the
//! `replace`/`remove` operations of a patch collapse into a single inline
//! RFC 6902 JSON Patch.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::patch::{
    api_version_for_kind, patch_name_from_path, pointer_segments, Patch, PatchOperation, PatchTarget,
};
use super::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::error::PatchError;

pub const KUSTOMIZE_API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";
pub const RESOURCES_FILE: &str = "resources.yaml";
pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

/// Name given to the partial resource in patch files; kustomize matches on
/// `target`, not on this name.
const PLACEHOLDER_NAME: &str = "placeholder";

/// Node of a Strategic Merge Patch document. Maps keep insertion order so the
/// synthesized header stays at the top of the file.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchNode {
    Leaf(Value),
    Map(Vec<(String, PatchNode)>),
}

impl PatchNode {
    /// Convert a JSON value, turning objects into mergeable maps
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_value(v)))
                    .collect(),
            ),
            other => Self::Leaf(other),
        }
    }

    /// Nest `value` under single-key maps, one per segment
    pub fn from_segments(segments: &[String], value: Value) -> Self {
        segments
            .iter()
            .rev()
            .fold(Self::from_value(value), |node, segment| {
                Self::Map(vec![(segment.clone(), node)])
            })
    }

    /// Deep-merge `other` into `self`; on a map/leaf conflict `other` wins
    pub fn merge(&mut self, other: PatchNode) {
        match (self, other) {
            (Self::Map(entries), Self::Map(incoming)) => {
                for (key, node) in incoming {
                    match entries.iter_mut().find(|(k, _)| *k == key) {
                        Some((_, existing)) => existing.merge(node),
                        None => entries.push((key, node)),
                    }
                }
            }
            (this, other) => *this = other,
        }
    }

    /// Look up a nested node by keys
    #[cfg(test)]
    pub fn get(&self, keys: &[&str]) -> Option<&PatchNode> {
        let Some((first, rest)) = keys.split_first() else {
            return Some(self);
        };
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == *first)
                .and_then(|(_, node)| node.get(rest)),
            Self::Leaf(_) => None,
        }
    }
}

impl Serialize for PatchNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Leaf(value) => value.serialize(serializer),
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, node) in entries {
                    map.serialize_entry(key, node)?;
                }
                map.end()
            }
        }
    }
}

/// `kustomization.yaml`
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    pub api_version: String,
    pub kind: String,
    pub resources: Vec<String>,
    pub labels: Vec<LabelSet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<PatchRef>,
}

impl Kustomization {
    fn new() -> Self {
        let mut pairs = BTreeMap::new();
        pairs.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());

        Self {
            api_version: KUSTOMIZE_API_VERSION.to_string(),
            kind: "Kustomization".to_string(),
            resources: vec![RESOURCES_FILE.to_string()],
            labels: vec![LabelSet {
                pairs,
                include_selectors: false,
            }],
            patches: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSet {
    pub pairs: BTreeMap<String, String>,
    pub include_selectors: bool,
}

/// A patch reference: either a file (`path`) or an inline document (`patch`)
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PatchRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    pub target: PatchTarget,
}

/// A Strategic Merge Patch file to write next to `kustomization.yaml`
#[derive(Debug, Clone, PartialEq)]
pub struct PatchFile {
    pub filename: String,
    pub content: String,
}

/// Everything the work directory needs besides `resources.yaml`
#[derive(Debug, Clone, PartialEq)]
pub struct KustomizeBuild {
    pub kustomization: Kustomization,
    pub files: Vec<PatchFile>,
}

#[derive(serde::Serialize)]
struct JsonPatchOp<'a> {
    op: &'static str,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a Value>,
}

/// Build the Strategic Merge Patch document for one `add` operation
pub fn strategic_merge_patch(target: &PatchTarget, path: &str, value: &Value) -> Result<PatchNode, PatchError> {
    let segments = pointer_segments(path);
    let body = if segments.is_empty() {
        if !value.is_object() {
            return Err(PatchError::InvalidOperation {
                path: path.to_string(),
                reason: "adding at the document root requires an object value".to_string(),
            });
        }
        PatchNode::from_value(value.clone())
    } else {
        PatchNode::from_segments(&segments, value.clone())
    };

    let mut document = PatchNode::Map(vec![
        (
            "apiVersion".to_string(),
            PatchNode::Leaf(Value::from(api_version_for_kind(&target.kind))),
        ),
        ("kind".to_string(), PatchNode::Leaf(Value::from(target.kind.as_str()))),
        (
            "metadata".to_string(),
            PatchNode::Map(vec![("name".to_string(), PatchNode::Leaf(Value::from(PLACEHOLDER_NAME)))]),
        ),
    ]);
    document.merge(body);
    Ok(document)
}

/// Serialize the `replace`/`remove` operations of a patch as one JSON Patch
pub fn inline_json_patch(operations: &[&PatchOperation]) -> Result<String, PatchError> {
    let ops: Vec<JsonPatchOp> = operations
        .iter()
        .filter_map(|operation| match operation {
            PatchOperation::Replace { path, value } => Some(JsonPatchOp {
                op: "replace",
                path,
                value: Some(value),
            }),
            PatchOperation::Remove { path } => Some(JsonPatchOp {
                op: "remove",
                path,
                value: None,
            }),
            PatchOperation::Add { .. } => None,
        })
        .collect();

    serde_yaml::to_string(&ops).map_err(|e| PatchError::Serialize {
        what: "inline JSON patch".to_string(),
        message: e.to_string(),
    })
}

/// Partition every patch into file and inline entries.
///
/// Each `add` yields exactly one file; each patch with at least one
/// `replace`/`remove` yields exactly one inline entry. Files whose names
/// collide get a numeric suffix in processing order.
pub fn build_kustomization(patches: &[Patch]) -> Result<KustomizeBuild, PatchError> {
    let mut kustomization = Kustomization::new();
    let mut files = Vec::new();
    let mut seen_names: HashMap<String, usize> = HashMap::new();

    for patch in patches {
        let (adds, others): (Vec<&PatchOperation>, Vec<&PatchOperation>) =
            patch.operations.iter().partition(|op| op.is_add());

        for operation in adds {
            let PatchOperation::Add { path, value } = operation else {
                continue;
            };

            let document = strategic_merge_patch(&patch.target, path, value)?;
            let content = serde_yaml::to_string(&document).map_err(|e| PatchError::Serialize {
                what: format!("patch for {}", path),
                message: e.to_string(),
            })?;

            let base = patch_name_from_path(path);
            let count = seen_names.entry(base.clone()).or_insert(0);
            *count += 1;
            let filename = if *count == 1 {
                format!("patch-{}.yaml", base)
            } else {
                format!("patch-{}-{}.yaml", base, count)
            };

            kustomization.patches.push(PatchRef {
                path: Some(filename.clone()),
                patch: None,
                target: patch.target.clone(),
            });
            files.push(PatchFile { filename, content });
        }

        if !others.is_empty() {
            kustomization.patches.push(PatchRef {
                path: None,
                patch: Some(inline_json_patch(&others)?),
                target: patch.target.clone(),
            });
        }
    }

    Ok(KustomizeBuild { kustomization, files })
}
