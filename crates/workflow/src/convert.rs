//! GUI-to-API workflow conversion.
//!
//! Rewrites an editor-saved graph into the execution format: positional
//! `widgets_values` become named inputs via the schema table, and link
//! tuples become `[source_id, slot]` connection references. Layout
//! metadata (position, size) is dropped -- the execution API has no
//! concept of it.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::document::{ApiNode, ApiWorkflow, GuiWorkflow};
use crate::error::WorkflowError;
use crate::schema::{connection_input_name, widget_input_name, ResolvedName};

/// Convert a parsed GUI workflow into an executable API workflow.
///
/// Widgets are assigned first, then connections; on a synthesized-name
/// collision the connection wins. Some nodes rely on a wired connection
/// overriding a defaulted widget value, so this order is part of the
/// contract. Unknown node types keep every widget value under a
/// synthesized `widget_{i}` name.
pub fn convert_gui_to_api(gui: &GuiWorkflow) -> Result<ApiWorkflow, WorkflowError> {
    let mut nodes: BTreeMap<String, ApiNode> = BTreeMap::new();

    for node in &gui.nodes {
        let node_id = node.id.to_string();
        if nodes.contains_key(&node_id) {
            return Err(WorkflowError::Conversion {
                node_id,
                node_type: node.node_type.clone(),
                reason: "duplicate node id".into(),
            });
        }

        let mut inputs = Map::new();
        for (index, value) in node.widgets_values.iter().enumerate() {
            match widget_input_name(&node.node_type, index) {
                ResolvedName::Mapped(name) => {
                    inputs.insert(name.to_string(), value.clone());
                }
                ResolvedName::Synthesized(name) => {
                    tracing::warn!(
                        node_id = node.id,
                        node_type = %node.node_type,
                        index,
                        "Unmapped widget slot, keeping synthesized name",
                    );
                    inputs.insert(name, value.clone());
                }
                ResolvedName::Skipped => {}
            }
        }

        nodes.insert(
            node_id,
            ApiNode {
                class_type: node.node_type.clone(),
                inputs,
                extra: Map::new(),
            },
        );
    }

    for link in gui.parsed_links() {
        let target_id = link.target_node.to_string();
        let Some(target) = nodes.get_mut(&target_id) else {
            tracing::warn!(
                target_node = link.target_node,
                "Link targets a node not present in the graph, skipping",
            );
            continue;
        };

        let resolved = connection_input_name(
            &target.class_type,
            link.target_slot as usize,
            link.type_tag.as_deref(),
        );
        let Some(name) = resolved.into_name() else {
            continue;
        };

        target.inputs.insert(
            name,
            Value::Array(vec![
                Value::from(link.source_node.to_string()),
                Value::from(link.source_slot),
            ]),
        );
    }

    Ok(ApiWorkflow {
        nodes,
        extra: Map::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_gui(doc: Value) -> GuiWorkflow {
        GuiWorkflow::from_value(&doc).unwrap()
    }

    #[test]
    fn ksampler_widgets_map_to_named_inputs() {
        let gui = parse_gui(json!({
            "nodes": [{
                "id": 5,
                "type": "KSampler",
                "widgets_values": [12345, "fixed", 20, 7.0, "euler", "normal", 1.0]
            }],
            "links": []
        }));

        let api = convert_gui_to_api(&gui).unwrap();
        let inputs = &api.nodes["5"].inputs;

        assert_eq!(inputs["seed"], json!(12345));
        assert_eq!(inputs["steps"], json!(20));
        assert_eq!(inputs["cfg"], json!(7.0));
        assert_eq!(inputs["sampler_name"], json!("euler"));
        assert_eq!(inputs["scheduler"], json!("normal"));
        assert_eq!(inputs["denoise"], json!(1.0));
        // The control_after_generate slot has no API counterpart.
        assert!(!inputs.contains_key("control_after_generate"));
        assert_eq!(inputs.len(), 6);
    }

    #[test]
    fn links_become_connection_references() {
        let gui = parse_gui(json!({
            "nodes": [
                { "id": 1, "type": "CheckpointLoaderSimple",
                  "widgets_values": ["model.safetensors"] },
                { "id": 3, "type": "KSampler",
                  "widgets_values": [1, "fixed", 20, 7.0, "euler", "normal", 1.0] }
            ],
            "links": [
                [9, 1, 0, 3, 0, "MODEL"]
            ]
        }));

        let api = convert_gui_to_api(&gui).unwrap();
        assert_eq!(api.nodes["3"].inputs["model"], json!(["1", 0]));
    }

    #[test]
    fn unknown_node_keeps_every_widget_value() {
        let gui = parse_gui(json!({
            "nodes": [{
                "id": 7,
                "type": "MyCustomNode",
                "widgets_values": [42, "hello"]
            }],
            "links": []
        }));

        let api = convert_gui_to_api(&gui).unwrap();
        let inputs = &api.nodes["7"].inputs;
        assert_eq!(inputs["widget_0"], json!(42));
        assert_eq!(inputs["widget_1"], json!("hello"));
        assert_eq!(inputs.len(), 2);
    }

    #[test]
    fn clip_text_encode_string_link_overrides_text_widget() {
        // A wired STRING input replaces the node's own text widget.
        let gui = parse_gui(json!({
            "nodes": [
                { "id": 2, "type": "ImpactWildcardEncode",
                  "widgets_values": ["__wild__", "resolved text", "populate", 7, "fixed"] },
                { "id": 6, "type": "CLIPTextEncode",
                  "widgets_values": ["typed text"] }
            ],
            "links": [
                [4, 2, 0, 6, 0, "STRING"]
            ]
        }));

        let api = convert_gui_to_api(&gui).unwrap();
        assert_eq!(api.nodes["6"].inputs["text"], json!(["2", 0]));
    }

    #[test]
    fn clip_link_lands_on_clip_input() {
        let gui = parse_gui(json!({
            "nodes": [
                { "id": 1, "type": "CheckpointLoaderSimple",
                  "widgets_values": ["model.safetensors"] },
                { "id": 6, "type": "CLIPTextEncode",
                  "widgets_values": ["a cat"] }
            ],
            "links": [
                [2, 1, 1, 6, 0, "CLIP"]
            ]
        }));

        let api = convert_gui_to_api(&gui).unwrap();
        let inputs = &api.nodes["6"].inputs;
        assert_eq!(inputs["clip"], json!(["1", 1]));
        assert_eq!(inputs["text"], json!("a cat"));
    }

    #[test]
    fn layout_metadata_is_dropped() {
        let gui = parse_gui(json!({
            "nodes": [{
                "id": 1,
                "type": "SaveImage",
                "pos": [10, 20],
                "size": [200, 100],
                "widgets_values": ["prefix"]
            }],
            "links": []
        }));

        let api = convert_gui_to_api(&gui).unwrap();
        let value = api.to_value();
        assert!(value["1"].get("pos").is_none());
        assert!(value["1"].get("size").is_none());
    }

    #[test]
    fn link_to_missing_node_is_skipped() {
        let gui = parse_gui(json!({
            "nodes": [{ "id": 1, "type": "SaveImage", "widgets_values": ["x"] }],
            "links": [
                [5, 99, 0, 42, 0, "IMAGE"]
            ]
        }));

        let api = convert_gui_to_api(&gui).unwrap();
        assert_eq!(api.nodes.len(), 1);
    }

    #[test]
    fn duplicate_node_ids_error_with_context() {
        let gui = parse_gui(json!({
            "nodes": [
                { "id": 1, "type": "SaveImage", "widgets_values": [] },
                { "id": 1, "type": "PreviewImage", "widgets_values": [] }
            ],
            "links": []
        }));

        match convert_gui_to_api(&gui).unwrap_err() {
            WorkflowError::Conversion { node_id, .. } => assert_eq!(node_id, "1"),
            other => panic!("Expected Conversion, got {other:?}"),
        }
    }

    #[test]
    fn connection_overrides_synthesized_widget_collision() {
        // Unknown node: widget_0/widget_1 keep synthesized names while a
        // link into an unmapped slot lands under input_0, so nothing is
        // lost on either side.
        let gui = parse_gui(json!({
            "nodes": [
                { "id": 1, "type": "SomeSource", "widgets_values": [] },
                { "id": 2, "type": "SomeSink", "widgets_values": ["a", "b"] }
            ],
            "links": [
                [1, 1, 0, 2, 0, "DATA"]
            ]
        }));

        let api = convert_gui_to_api(&gui).unwrap();
        let inputs = &api.nodes["2"].inputs;
        assert_eq!(inputs["widget_0"], json!("a"));
        assert_eq!(inputs["input_0"], json!(["1", 0]));
    }
}
