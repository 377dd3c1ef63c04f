//! Seed mutation for re-queued generations.
//!
//! Locates seed-like fields in either workflow format and rewrites them
//! in place. Detection is deliberately broader than the field
//! classifier's: custom nodes converted with synthesized `widget_{i}`
//! names still need their seeds caught, which is what the position-aware
//! [`SeedHeuristic`] is for. The heuristic can misfire on custom nodes --
//! an accepted false-positive risk, since a spuriously randomized integer
//! is recoverable and a stale seed is not.

use rand::Rng;
use serde_json::Value;

use crate::document::{is_connection_ref, WorkflowDocument};
use crate::schema::{schema_for, widget_input_name, ResolvedName, WidgetSlot, CONTROL_AFTER_GENERATE};

/// Upper bound (inclusive) for randomized seeds.
pub const SEED_MAX: i64 = i32::MAX as i64;

/// Values in this range are almost always step counts, not seeds.
const STEP_COUNT_RANGE: std::ops::RangeInclusive<i64> = 2..=10;

/// Minimum value for a synthesized slot outside the lenient indices to
/// count as a seed.
const NON_LENIENT_SEED_MIN: i64 = 100;

/// How seeds are rewritten before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedMode {
    /// Leave every seed untouched.
    #[default]
    Original,
    /// Uniform random integer in `[1, SEED_MAX]` per seed field.
    Randomize,
    /// `previous + 1`, or `base + occurrence + 1` when a base is given.
    Increment,
}

impl SeedMode {
    /// Parse a mode string; anything unrecognized degrades to `Original`.
    pub fn parse(s: &str) -> Self {
        match s {
            "randomize" => Self::Randomize,
            "increment" => Self::Increment,
            "original" => Self::Original,
            other => {
                tracing::warn!(mode = other, "Unrecognized seed mode, using original");
                Self::Original
            }
        }
    }
}

/// The `control_after_generate` directive values ComfyUI understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    Fixed,
    Increment,
    Decrement,
    Randomize,
}

impl ControlMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fixed" => Some(Self::Fixed),
            "increment" => Some(Self::Increment),
            "decrement" => Some(Self::Decrement),
            "randomize" => Some(Self::Randomize),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Increment => "increment",
            Self::Decrement => "decrement",
            Self::Randomize => "randomize",
        }
    }
}

/// Pluggable detector for seed-bearing synthesized widget slots.
pub trait SeedHeuristic {
    /// Decide whether slot `index` holding integer `value` is a seed.
    fn is_seed_slot(&self, index: usize, value: i64) -> bool;
}

/// Default position-aware heuristic, tuned against common custom nodes
/// (video samplers tend to put the seed at widget 0 or 3): those indices
/// are accepted leniently, any other index needs a value of at least 100,
/// and values in the step-count range 2-10 are never seeds.
#[derive(Debug, Default)]
pub struct PositionHeuristic;

impl SeedHeuristic for PositionHeuristic {
    fn is_seed_slot(&self, index: usize, value: i64) -> bool {
        if value < 0 || STEP_COUNT_RANGE.contains(&value) {
            return false;
        }
        matches!(index, 0 | 3) || value >= NON_LENIENT_SEED_MIN
    }
}

/// Rewrite every seed-like field with the default heuristic.
///
/// Mutates `doc` in place and returns the number of fields changed.
/// Callers needing the original must deep-copy first; the orchestrator
/// does exactly that per batch unit.
pub fn mutate_seeds(doc: &mut WorkflowDocument, mode: SeedMode, base_seed: Option<i64>) -> usize {
    mutate_seeds_with(doc, mode, base_seed, &PositionHeuristic)
}

/// Rewrite seed fields using a caller-supplied heuristic.
pub fn mutate_seeds_with(
    doc: &mut WorkflowDocument,
    mode: SeedMode,
    base_seed: Option<i64>,
    heuristic: &dyn SeedHeuristic,
) -> usize {
    if mode == SeedMode::Original {
        return 0;
    }

    let mut count = 0;
    match doc {
        WorkflowDocument::Api(api) => {
            for node in api.nodes.values_mut() {
                for (name, value) in node.inputs.iter_mut() {
                    if is_connection_ref(value) {
                        continue;
                    }
                    let Some(old) = int_value(value) else {
                        continue;
                    };
                    if !api_input_is_seed(name, old, heuristic) {
                        continue;
                    }
                    *value = Value::from(next_seed(mode, old, base_seed, count));
                    count += 1;
                }
            }
        }
        WorkflowDocument::Gui(gui) => {
            for node in &mut gui.nodes {
                for (index, value) in node.widgets_values.iter_mut().enumerate() {
                    let Some(old) = int_value(value) else {
                        continue;
                    };
                    let is_seed = match widget_input_name(&node.node_type, index) {
                        ResolvedName::Mapped(name) => name_is_seed(name),
                        ResolvedName::Skipped => false,
                        ResolvedName::Synthesized(_) => heuristic.is_seed_slot(index, old),
                    };
                    if !is_seed {
                        continue;
                    }
                    *value = Value::from(next_seed(mode, old, base_seed, count));
                    count += 1;
                }
            }
        }
    }

    count
}

/// Overwrite every `control_after_generate` slot with the given directive.
///
/// No heuristics here: the key name (API format) or schema slot (GUI
/// format) is authoritative. Returns the number of slots overwritten.
pub fn set_seed_controls(doc: &mut WorkflowDocument, mode: ControlMode) -> usize {
    let mut count = 0;
    match doc {
        WorkflowDocument::Api(api) => {
            for node in api.nodes.values_mut() {
                if let Some(value) = node.inputs.get_mut(CONTROL_AFTER_GENERATE) {
                    *value = Value::from(mode.as_str());
                    count += 1;
                }
            }
        }
        WorkflowDocument::Gui(gui) => {
            for node in &mut gui.nodes {
                let Some(schema) = schema_for(&node.node_type) else {
                    continue;
                };
                for (index, slot) in schema.widgets.iter().enumerate() {
                    if *slot == WidgetSlot::Control {
                        if let Some(value) = node.widgets_values.get_mut(index) {
                            *value = Value::from(mode.as_str());
                            count += 1;
                        }
                    }
                }
            }
        }
    }
    count
}

// ---------------------------------------------------------------------------
// Detection helpers
// ---------------------------------------------------------------------------

fn name_is_seed(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower == "seed" || lower == "noise_seed" || lower.contains("seed")
}

/// API-side detection: seed-named inputs, plus synthesized `widget_{i}`
/// names from converted custom nodes run through the heuristic.
fn api_input_is_seed(name: &str, value: i64, heuristic: &dyn SeedHeuristic) -> bool {
    if name_is_seed(name) {
        return true;
    }
    match name.strip_prefix("widget_").and_then(|n| n.parse::<usize>().ok()) {
        Some(index) => heuristic.is_seed_slot(index, value),
        None => false,
    }
}

fn int_value(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
}

fn next_seed(mode: SeedMode, old: i64, base_seed: Option<i64>, occurrence: usize) -> i64 {
    match mode {
        SeedMode::Original => old,
        SeedMode::Randomize => rand::rng().random_range(1..=SEED_MAX),
        SeedMode::Increment => match base_seed {
            Some(base) => base + occurrence as i64 + 1,
            None => old + 1,
        },
    }
}
