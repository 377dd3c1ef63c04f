//! Submission orchestration: detect, convert, mutate, batch.
//!
//! Composes the engine into ready-to-submit execution graphs. The
//! network call itself is the ComfyUI client's job; this module only
//! prepares the payloads and guarantees each batch unit gets its own
//! deep copy, so the caller's document survives untouched.

use serde_json::Value;

use mediasift_core::hashing::sha256_hex;

use crate::convert::convert_gui_to_api;
use crate::document::WorkflowDocument;
use crate::error::WorkflowError;
use crate::seed::{mutate_seeds, set_seed_controls, ControlMode, SeedMode};

/// Largest batch a single submission may expand to.
pub const MAX_BATCH_QUANTITY: u32 = 50;

/// Options governing one submission.
#[derive(Debug, Clone)]
pub struct SubmissionOptions {
    pub seed_mode: SeedMode,
    /// When set, every `control_after_generate` slot is overwritten.
    pub control_mode: Option<ControlMode>,
    /// Number of graphs to prepare; each gets independently mutated seeds.
    pub quantity: u32,
    /// Base for `increment` continuation across the batch.
    pub base_seed: Option<i64>,
}

impl Default for SubmissionOptions {
    fn default() -> Self {
        Self {
            seed_mode: SeedMode::Original,
            control_mode: None,
            quantity: 1,
            base_seed: None,
        }
    }
}

/// One ready-to-submit unit of work.
#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    /// API-format graph, the `prompt` field of the submission request.
    pub prompt: Value,
    /// The original GUI document, passed through opaquely so a consumer
    /// that understands layout can re-attach it. `None` when the
    /// submission started from an API document.
    pub gui_source: Option<Value>,
    /// Content hash of `prompt`, for log correlation.
    pub content_hash: String,
    /// Seed fields rewritten in this unit.
    pub mutated_seeds: usize,
}

/// Prepare `opts.quantity` execution graphs from a raw workflow document.
///
/// GUI documents are converted once; each batch unit then works on its
/// own deep copy of the API graph. With `increment` and a base seed, seed
/// numbering continues across units, so a batch of N yields N sequential
/// variations.
pub fn prepare_for_submission(
    raw: &Value,
    opts: &SubmissionOptions,
) -> Result<Vec<ExecutionGraph>, WorkflowError> {
    if opts.quantity == 0 || opts.quantity > MAX_BATCH_QUANTITY {
        return Err(WorkflowError::InvalidOptions(format!(
            "quantity must be between 1 and {MAX_BATCH_QUANTITY}, got {}",
            opts.quantity
        )));
    }

    let document = WorkflowDocument::parse(raw)?;
    let (api, gui_source) = match &document {
        WorkflowDocument::Api(api) => (api.clone(), None),
        WorkflowDocument::Gui(gui) => (convert_gui_to_api(gui)?, Some(raw.clone())),
    };

    tracing::debug!(
        format = ?document.format(),
        nodes = api.nodes.len(),
        quantity = opts.quantity,
        "Preparing submission batch",
    );

    let mut graphs = Vec::with_capacity(opts.quantity as usize);
    let mut seed_offset: usize = 0;

    for _ in 0..opts.quantity {
        let mut unit = WorkflowDocument::Api(api.clone());

        let base = opts
            .base_seed
            .map(|base| base + seed_offset as i64);
        let mutated = mutate_seeds(&mut unit, opts.seed_mode, base);
        seed_offset += mutated;

        if let Some(control) = opts.control_mode {
            set_seed_controls(&mut unit, control);
        }

        let prompt = unit.to_value();
        let content_hash = sha256_hex(prompt.to_string().as_bytes());
        graphs.push(ExecutionGraph {
            prompt,
            gui_source: gui_source.clone(),
            content_hash,
            mutated_seeds: mutated,
        });
    }

    Ok(graphs)
}

/// Convenience for callers that only need the executable form of a
/// document (no seed work): GUI converts, API passes through.
pub fn to_execution_format(raw: &Value) -> Result<Value, WorkflowError> {
    match WorkflowDocument::parse(raw)? {
        WorkflowDocument::Api(api) => Ok(api.to_value()),
        WorkflowDocument::Gui(gui) => Ok(convert_gui_to_api(&gui)?.to_value()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api_workflow() -> Value {
        json!({
            "3": {
                "class_type": "KSampler",
                "inputs": {
                    "seed": 42,
                    "steps": 20,
                    "cfg": 7.0,
                    "model": ["1", 0]
                }
            },
            "1": {
                "class_type": "CheckpointLoaderSimple",
                "inputs": { "ckpt_name": "base.safetensors" }
            }
        })
    }

    fn gui_workflow() -> Value {
        json!({
            "nodes": [
                {
                    "id": 3,
                    "type": "KSampler",
                    "pos": [100, 100],
                    "widgets_values": [42, "fixed", 20, 7.0, "euler", "normal", 1.0]
                }
            ],
            "links": []
        })
    }

    #[test]
    fn single_unit_original_passes_through() {
        let graphs = prepare_for_submission(&api_workflow(), &SubmissionOptions::default())
            .unwrap();
        assert_eq!(graphs.len(), 1);
        assert_eq!(graphs[0].mutated_seeds, 0);
        assert_eq!(graphs[0].prompt["3"]["inputs"]["seed"], json!(42));
        assert!(graphs[0].gui_source.is_none());
    }

    #[test]
    fn caller_document_is_never_mutated() {
        let original = api_workflow();
        let opts = SubmissionOptions {
            seed_mode: SeedMode::Randomize,
            quantity: 3,
            ..Default::default()
        };
        let _ = prepare_for_submission(&original, &opts).unwrap();
        assert_eq!(original, api_workflow());
    }

    #[test]
    fn increment_with_base_is_sequential_across_batch() {
        let opts = SubmissionOptions {
            seed_mode: SeedMode::Increment,
            base_seed: Some(100),
            quantity: 3,
            ..Default::default()
        };
        let graphs = prepare_for_submission(&api_workflow(), &opts).unwrap();

        let seeds: Vec<_> = graphs
            .iter()
            .map(|g| g.prompt["3"]["inputs"]["seed"].as_i64().unwrap())
            .collect();
        assert_eq!(seeds, vec![101, 102, 103]);
    }

    #[test]
    fn randomize_varies_between_units() {
        let opts = SubmissionOptions {
            seed_mode: SeedMode::Randomize,
            quantity: 5,
            ..Default::default()
        };
        let graphs = prepare_for_submission(&api_workflow(), &opts).unwrap();

        for g in &graphs {
            let seed = g.prompt["3"]["inputs"]["seed"].as_i64().unwrap();
            assert!((1..=crate::seed::SEED_MAX).contains(&seed));
        }
        // Five independent draws from 2^31 values colliding into one is
        // not a realistic flake.
        let distinct: std::collections::HashSet<_> = graphs
            .iter()
            .map(|g| g.prompt["3"]["inputs"]["seed"].as_i64().unwrap())
            .collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn gui_input_is_converted_and_source_retained() {
        let graphs =
            prepare_for_submission(&gui_workflow(), &SubmissionOptions::default()).unwrap();

        assert_eq!(graphs[0].prompt["3"]["class_type"], json!("KSampler"));
        assert_eq!(graphs[0].prompt["3"]["inputs"]["seed"], json!(42));
        // Layout stays with the retained GUI source, not the prompt.
        assert!(graphs[0].prompt["3"].get("pos").is_none());
        let source = graphs[0].gui_source.as_ref().unwrap();
        assert_eq!(source["nodes"][0]["pos"], json!([100, 100]));
    }

    #[test]
    fn control_mode_applied_to_every_unit() {
        let raw = json!({
            "3": {
                "class_type": "KSampler",
                "inputs": { "seed": 1, "control_after_generate": "randomize" }
            }
        });
        let opts = SubmissionOptions {
            control_mode: Some(ControlMode::Fixed),
            quantity: 2,
            ..Default::default()
        };
        let graphs = prepare_for_submission(&raw, &opts).unwrap();
        for g in &graphs {
            assert_eq!(
                g.prompt["3"]["inputs"]["control_after_generate"],
                json!("fixed")
            );
        }
    }

    #[test]
    fn unknown_format_is_refused() {
        let err = prepare_for_submission(&json!({"nope": 1}), &SubmissionOptions::default())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownFormat));
    }

    #[test]
    fn zero_and_oversized_quantity_rejected() {
        let mut opts = SubmissionOptions {
            quantity: 0,
            ..Default::default()
        };
        assert!(prepare_for_submission(&api_workflow(), &opts).is_err());

        opts.quantity = MAX_BATCH_QUANTITY + 1;
        assert!(prepare_for_submission(&api_workflow(), &opts).is_err());
    }

    #[test]
    fn content_hash_is_stable_for_identical_prompts() {
        let opts = SubmissionOptions {
            quantity: 2,
            ..Default::default()
        };
        let graphs = prepare_for_submission(&api_workflow(), &opts).unwrap();
        // Original mode: both units are byte-identical, so hashes match.
        assert_eq!(graphs[0].content_hash, graphs[1].content_hash);
        assert_eq!(graphs[0].content_hash.len(), 64);
    }

    #[test]
    fn to_execution_format_converts_gui() {
        let value = to_execution_format(&gui_workflow()).unwrap();
        assert_eq!(value["3"]["class_type"], json!("KSampler"));

        let api = api_workflow();
        assert_eq!(to_execution_format(&api).unwrap(), api);
    }
}
