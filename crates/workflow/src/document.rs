//! Workflow format detection and the tagged document representation.
//!
//! ComfyUI serializes graphs two ways: the editor saves a GUI format
//! (`{nodes: [...], links: [...]}` with positional `widgets_values`), and
//! the execution API consumes a map of node id to `{class_type, inputs}`.
//! Detection happens once, here; everything downstream works on the
//! statically exhaustive [`WorkflowDocument`] union instead of re-probing
//! the JSON shape.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::WorkflowError;

/// Result of shape-probing a raw workflow value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowFormat {
    Gui,
    Api,
    Unknown,
}

/// API-format node ids are decimal strings.
fn node_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+$").expect("valid node id regex"))
}

/// Classify a raw workflow document.
///
/// - GUI if `doc.nodes` is an array.
/// - API if at least one top-level key is a decimal string whose value
///   carries a `class_type` string.
/// - Unknown otherwise. Never fails; absence of a workflow is the
///   caller's concern.
pub fn detect_format(doc: &Value) -> WorkflowFormat {
    if doc.get("nodes").is_some_and(Value::is_array) {
        return WorkflowFormat::Gui;
    }

    if let Some(obj) = doc.as_object() {
        let is_api = obj.iter().any(|(key, value)| {
            node_id_regex().is_match(key)
                && value.get("class_type").is_some_and(Value::is_string)
        });
        if is_api {
            return WorkflowFormat::Api;
        }
    }

    WorkflowFormat::Unknown
}

/// `true` when an input value is a connection reference rather than data:
/// a 2-element array of (node id, output slot index).
///
/// A legitimate 2-element data value of the same shape is indistinguishable
/// by design -- this ambiguity is inherent to the API format and is
/// preserved, not worked around.
pub fn is_connection_ref(value: &Value) -> bool {
    match value.as_array() {
        Some(arr) if arr.len() == 2 => {
            (arr[0].is_string() || arr[0].is_u64()) && arr[1].is_u64()
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// GUI format
// ---------------------------------------------------------------------------

/// A node from the GUI serialization.
///
/// `extra` preserves every field this engine does not interpret (position,
/// size, flags, slot metadata) so a mutated document round-trips without
/// corrupting layout.
#[derive(Debug, Clone)]
pub struct GuiNode {
    pub id: i64,
    pub node_type: String,
    pub widgets_values: Vec<Value>,
    pub extra: Map<String, Value>,
}

/// A parsed link tuple:
/// `[link_id, source_node, source_slot, target_node, target_slot, type_tag]`.
#[derive(Debug, Clone)]
pub struct GuiLink {
    pub source_node: i64,
    pub source_slot: i64,
    pub target_node: i64,
    pub target_slot: i64,
    /// Data-type tag (`"MODEL"`, `"CLIP"`, `"STRING"`, ...), when present.
    pub type_tag: Option<String>,
}

impl GuiLink {
    /// Parse one raw link entry. Malformed tuples (wrong arity or
    /// non-numeric endpoints) yield `None`; callers warn and skip.
    pub fn from_value(value: &Value) -> Option<Self> {
        let arr = value.as_array()?;
        if arr.len() != 6 {
            return None;
        }
        Some(Self {
            source_node: arr[1].as_i64()?,
            source_slot: arr[2].as_i64()?,
            target_node: arr[3].as_i64()?,
            target_slot: arr[4].as_i64()?,
            type_tag: arr[5].as_str().map(str::to_string),
        })
    }
}

/// The GUI serialization: node array, raw link list, and every other
/// top-level field carried through untouched.
#[derive(Debug, Clone)]
pub struct GuiWorkflow {
    pub nodes: Vec<GuiNode>,
    pub links: Vec<Value>,
    pub extra: Map<String, Value>,
}

impl GuiWorkflow {
    /// Parse a GUI document, failing with node context on malformed nodes.
    pub fn from_value(doc: &Value) -> Result<Self, WorkflowError> {
        let obj = doc
            .as_object()
            .ok_or_else(|| WorkflowError::Structure("GUI workflow must be an object".into()))?;

        let nodes_value = obj
            .get("nodes")
            .and_then(Value::as_array)
            .ok_or_else(|| WorkflowError::Structure("GUI workflow missing 'nodes' array".into()))?;

        let mut nodes = Vec::with_capacity(nodes_value.len());
        for raw in nodes_value {
            nodes.push(parse_gui_node(raw)?);
        }

        let links = obj
            .get("links")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let extra = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "nodes" && k.as_str() != "links")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            nodes,
            links,
            extra,
        })
    }

    /// Parsed links, skipping malformed tuples with a warning.
    pub fn parsed_links(&self) -> Vec<GuiLink> {
        self.links
            .iter()
            .filter_map(|raw| {
                let link = GuiLink::from_value(raw);
                if link.is_none() {
                    tracing::warn!(raw = %raw, "Skipping malformed link tuple");
                }
                link
            })
            .collect()
    }

    /// Serialize back to JSON, layout metadata included.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "nodes".into(),
            Value::Array(self.nodes.iter().map(gui_node_to_value).collect()),
        );
        obj.insert("links".into(), Value::Array(self.links.clone()));
        for (k, v) in &self.extra {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

fn parse_gui_node(raw: &Value) -> Result<GuiNode, WorkflowError> {
    let obj = raw.as_object().ok_or_else(|| WorkflowError::Structure(
        "GUI node entry is not an object".into(),
    ))?;

    let id = obj.get("id").and_then(Value::as_i64).ok_or_else(|| {
        WorkflowError::Conversion {
            node_id: obj
                .get("id")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<missing>".into()),
            node_type: obj
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("<unknown>")
                .to_string(),
            reason: "node has no integer 'id'".into(),
        }
    })?;

    let node_type = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| WorkflowError::Conversion {
            node_id: id.to_string(),
            node_type: "<unknown>".into(),
            reason: "node has no 'type' string".into(),
        })?
        .to_string();

    let widgets_values = match obj.get("widgets_values") {
        None => Vec::new(),
        Some(Value::Array(arr)) => arr.clone(),
        Some(other) => {
            // Some custom nodes serialize widgets_values as an object;
            // positional resolution cannot apply, so treat as empty.
            tracing::warn!(
                node_id = id,
                node_type = %node_type,
                shape = %json_shape(other),
                "Non-array widgets_values, treating as empty",
            );
            Vec::new()
        }
    };

    let extra = obj
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "id" | "type" | "widgets_values"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Ok(GuiNode {
        id,
        node_type,
        widgets_values,
        extra,
    })
}

fn gui_node_to_value(node: &GuiNode) -> Value {
    let mut obj = Map::new();
    obj.insert("id".into(), Value::from(node.id));
    obj.insert("type".into(), Value::from(node.node_type.clone()));
    obj.insert(
        "widgets_values".into(),
        Value::Array(node.widgets_values.clone()),
    );
    for (k, v) in &node.extra {
        obj.insert(k.clone(), v.clone());
    }
    Value::Object(obj)
}

fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// API format
// ---------------------------------------------------------------------------

/// A node from the API serialization. `extra` preserves fields like
/// `_meta` (node titles) that the engine passes through untouched.
#[derive(Debug, Clone)]
pub struct ApiNode {
    pub class_type: String,
    pub inputs: Map<String, Value>,
    pub extra: Map<String, Value>,
}

/// The API serialization: node id -> node, plus any non-node top-level
/// keys some exporters attach.
#[derive(Debug, Clone, Default)]
pub struct ApiWorkflow {
    /// BTreeMap keeps the walk order deterministic.
    pub nodes: BTreeMap<String, ApiNode>,
    pub extra: Map<String, Value>,
}

impl ApiWorkflow {
    pub fn from_value(doc: &Value) -> Result<Self, WorkflowError> {
        let obj = doc
            .as_object()
            .ok_or_else(|| WorkflowError::Structure("API workflow must be an object".into()))?;

        let mut nodes = BTreeMap::new();
        let mut extra = Map::new();

        for (key, value) in obj {
            let class_type = if node_id_regex().is_match(key) {
                value.get("class_type").and_then(Value::as_str)
            } else {
                None
            };
            let (Some(class_type), Some(node_obj)) = (class_type, value.as_object()) else {
                extra.insert(key.clone(), value.clone());
                continue;
            };
            let class_type = class_type.to_string();
            let inputs = node_obj
                .get("inputs")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let node_extra = node_obj
                .iter()
                .filter(|(k, _)| !matches!(k.as_str(), "class_type" | "inputs"))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            nodes.insert(
                key.clone(),
                ApiNode {
                    class_type,
                    inputs,
                    extra: node_extra,
                },
            );
        }

        if nodes.is_empty() {
            return Err(WorkflowError::Structure(
                "API workflow contains no nodes".into(),
            ));
        }

        Ok(Self { nodes, extra })
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        for (id, node) in &self.nodes {
            let mut node_obj = Map::new();
            node_obj.insert("class_type".into(), Value::from(node.class_type.clone()));
            node_obj.insert("inputs".into(), Value::Object(node.inputs.clone()));
            for (k, v) in &node.extra {
                node_obj.insert(k.clone(), v.clone());
            }
            obj.insert(id.clone(), Value::Object(node_obj));
        }
        for (k, v) in &self.extra {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// A workflow document after one-time format detection.
#[derive(Debug, Clone)]
pub enum WorkflowDocument {
    Gui(GuiWorkflow),
    Api(ApiWorkflow),
}

impl WorkflowDocument {
    /// Detect the format and parse into the matching variant.
    ///
    /// An unrecognizable document is [`WorkflowError::UnknownFormat`];
    /// callers must refuse to proceed past this point.
    pub fn parse(doc: &Value) -> Result<Self, WorkflowError> {
        match detect_format(doc) {
            WorkflowFormat::Gui => Ok(Self::Gui(GuiWorkflow::from_value(doc)?)),
            WorkflowFormat::Api => Ok(Self::Api(ApiWorkflow::from_value(doc)?)),
            WorkflowFormat::Unknown => Err(WorkflowError::UnknownFormat),
        }
    }

    pub fn format(&self) -> WorkflowFormat {
        match self {
            Self::Gui(_) => WorkflowFormat::Gui,
            Self::Api(_) => WorkflowFormat::Api,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Gui(gui) => gui.to_value(),
            Self::Api(api) => api.to_value(),
        }
    }
}
