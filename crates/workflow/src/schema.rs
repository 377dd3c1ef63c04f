//! Node schema resolution: positional widget and connection slot naming.
//!
//! The GUI format stores node parameters positionally; the API format
//! needs them named. The mapping is per-node-type convention that ComfyUI
//! never publishes, so this module carries a table of known types and
//! falls back to synthesized `widget_{i}` / `input_{slot}` names for the
//! unenumerable universe of custom nodes -- lossy-but-recoverable naming
//! is preferred over dropping data.

/// One positional widget slot of a known node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetSlot {
    /// Maps to this named input in the API schema.
    Named(&'static str),
    /// The `control_after_generate` slot: a UI-only seed directive with
    /// no counterpart in the API schema.
    Control,
    /// Intentionally unmapped (e.g. upload buttons). Distinct from
    /// "unknown" -- unknown slots get synthesized names instead.
    Ignored,
}

/// Widget/connection layout for one node type.
#[derive(Debug)]
pub struct NodeSchema {
    pub node_type: &'static str,
    pub widgets: &'static [WidgetSlot],
    pub connections: &'static [&'static str],
}

/// Outcome of resolving a slot to an input name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedName {
    /// A known name from the schema table.
    Mapped(&'static str),
    /// The slot is deliberately absent from the API schema; drop it.
    Skipped,
    /// Unknown type or out-of-range index; keep the value under a
    /// synthesized name.
    Synthesized(String),
}

impl ResolvedName {
    /// The name to assign under, or `None` for skipped slots.
    pub fn into_name(self) -> Option<String> {
        match self {
            Self::Mapped(name) => Some(name.to_string()),
            Self::Synthesized(name) => Some(name),
            Self::Skipped => None,
        }
    }
}

/// The literal API-side key for the UI seed-control directive.
pub const CONTROL_AFTER_GENERATE: &str = "control_after_generate";

use WidgetSlot::{Control, Ignored, Named};

static KNOWN_NODE_SCHEMAS: &[NodeSchema] = &[
    NodeSchema {
        node_type: "KSampler",
        widgets: &[
            Named("seed"),
            Control,
            Named("steps"),
            Named("cfg"),
            Named("sampler_name"),
            Named("scheduler"),
            Named("denoise"),
        ],
        connections: &["model", "positive", "negative", "latent_image"],
    },
    NodeSchema {
        node_type: "KSamplerAdvanced",
        widgets: &[
            Named("add_noise"),
            Named("noise_seed"),
            Control,
            Named("steps"),
            Named("cfg"),
            Named("sampler_name"),
            Named("scheduler"),
            Named("start_at_step"),
            Named("end_at_step"),
            Named("return_with_leftover_noise"),
        ],
        connections: &["model", "positive", "negative", "latent_image"],
    },
    NodeSchema {
        node_type: "CLIPTextEncode",
        widgets: &[Named("text")],
        connections: &["clip"],
    },
    NodeSchema {
        node_type: "CheckpointLoaderSimple",
        widgets: &[Named("ckpt_name")],
        connections: &[],
    },
    NodeSchema {
        node_type: "EmptyLatentImage",
        widgets: &[Named("width"), Named("height"), Named("batch_size")],
        connections: &[],
    },
    NodeSchema {
        node_type: "SaveImage",
        widgets: &[Named("filename_prefix")],
        connections: &["images"],
    },
    NodeSchema {
        node_type: "PreviewImage",
        widgets: &[],
        connections: &["images"],
    },
    NodeSchema {
        node_type: "LoadImage",
        // Second slot is the upload button, which has no value in the
        // API schema.
        widgets: &[Named("image"), Ignored],
        connections: &[],
    },
    NodeSchema {
        node_type: "VAEDecode",
        widgets: &[],
        connections: &["samples", "vae"],
    },
    NodeSchema {
        node_type: "VAEEncode",
        widgets: &[],
        connections: &["pixels", "vae"],
    },
    NodeSchema {
        node_type: "VAELoader",
        widgets: &[Named("vae_name")],
        connections: &[],
    },
    NodeSchema {
        node_type: "LoraLoader",
        widgets: &[
            Named("lora_name"),
            Named("strength_model"),
            Named("strength_clip"),
        ],
        connections: &["model", "clip"],
    },
    NodeSchema {
        node_type: "LoraLoaderModelOnly",
        widgets: &[Named("lora_name"), Named("strength_model")],
        connections: &["model"],
    },
    NodeSchema {
        node_type: "ControlNetLoader",
        widgets: &[Named("control_net_name")],
        connections: &[],
    },
    NodeSchema {
        node_type: "ControlNetApply",
        widgets: &[Named("strength")],
        connections: &["conditioning", "control_net", "image"],
    },
    NodeSchema {
        node_type: "UNETLoader",
        widgets: &[Named("unet_name"), Named("weight_dtype")],
        connections: &[],
    },
    NodeSchema {
        node_type: "CLIPLoader",
        widgets: &[Named("clip_name"), Named("type")],
        connections: &[],
    },
    NodeSchema {
        node_type: "DualCLIPLoader",
        widgets: &[Named("clip_name1"), Named("clip_name2"), Named("type")],
        connections: &[],
    },
    NodeSchema {
        node_type: "UpscaleModelLoader",
        widgets: &[Named("model_name")],
        connections: &[],
    },
    NodeSchema {
        node_type: "ImageUpscaleWithModel",
        widgets: &[],
        connections: &["upscale_model", "image"],
    },
    NodeSchema {
        node_type: "LatentUpscale",
        widgets: &[
            Named("upscale_method"),
            Named("width"),
            Named("height"),
            Named("crop"),
        ],
        connections: &["samples"],
    },
    NodeSchema {
        node_type: "ImpactWildcardEncode",
        widgets: &[
            Named("wildcard_text"),
            Named("populated_text"),
            Named("mode"),
            Named("seed"),
            Control,
        ],
        connections: &["model", "clip"],
    },
];

/// Look up the schema for a node type, or `None` for custom/unknown types.
pub fn schema_for(node_type: &str) -> Option<&'static NodeSchema> {
    KNOWN_NODE_SCHEMAS
        .iter()
        .find(|schema| schema.node_type == node_type)
}

/// `true` if the node type is in the built-in table.
pub fn is_known_type(node_type: &str) -> bool {
    schema_for(node_type).is_some()
}

/// Resolve widget slot `index` of `node_type` to an API input name.
pub fn widget_input_name(node_type: &str, index: usize) -> ResolvedName {
    match schema_for(node_type).and_then(|s| s.widgets.get(index)) {
        Some(WidgetSlot::Named(name)) => ResolvedName::Mapped(name),
        Some(WidgetSlot::Control | WidgetSlot::Ignored) => ResolvedName::Skipped,
        None => ResolvedName::Synthesized(format!("widget_{index}")),
    }
}

/// Resolve connection slot `slot` of `node_type` to an API input name.
///
/// `link_type` is the link tuple's data-type tag. For `CLIPTextEncode`
/// the same slot index can be `text` (converted widget) or `clip`
/// depending on what is wired in, so the tag decides -- the one place
/// positional mapping is insufficient.
pub fn connection_input_name(
    node_type: &str,
    slot: usize,
    link_type: Option<&str>,
) -> ResolvedName {
    if node_type == "CLIPTextEncode" {
        match link_type {
            Some("STRING") => return ResolvedName::Mapped("text"),
            Some("CLIP") => return ResolvedName::Mapped("clip"),
            _ => {}
        }
    }

    match schema_for(node_type).and_then(|s| s.connections.get(slot)) {
        Some(name) => ResolvedName::Mapped(name),
        None => ResolvedName::Synthesized(format!("input_{slot}")),
    }
}

/// Display name for a GUI widget slot, for field listing (not conversion):
/// control slots keep their authoritative name, unknown slots synthesize.
/// Returns the name and whether it came from the schema table.
pub fn widget_display_name(node_type: &str, index: usize) -> (String, bool) {
    match schema_for(node_type).and_then(|s| s.widgets.get(index)) {
        Some(WidgetSlot::Named(name)) => ((*name).to_string(), true),
        Some(WidgetSlot::Control) => (CONTROL_AFTER_GENERATE.to_string(), true),
        Some(WidgetSlot::Ignored) | None => (format!("widget_{index}"), false),
    }
}
