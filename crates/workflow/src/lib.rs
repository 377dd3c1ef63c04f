//! ComfyUI workflow analysis and transformation engine.
//!
//! Parses both ComfyUI workflow serializations (the GUI node-graph format
//! with positional widget arrays, and the API execution format with named
//! inputs), converts GUI graphs to executable API graphs, classifies every
//! node parameter into semantic categories for the field editor, and
//! rewrites seed values for re-queued generations.
//!
//! Everything here is synchronous and free of shared state: each call
//! operates on a caller-supplied document and mutates that document only.

pub mod cache;
pub mod classify;
pub mod convert;
pub mod document;
pub mod error;
pub mod schema;
pub mod seed;
pub mod submit;

pub use cache::TtlCache;
pub use classify::{classify_fields, FieldCategory, FieldDescriptor, FieldReport};
pub use convert::convert_gui_to_api;
pub use document::{detect_format, WorkflowDocument, WorkflowFormat};
pub use error::WorkflowError;
pub use seed::{mutate_seeds, set_seed_controls, ControlMode, SeedMode};
pub use submit::{prepare_for_submission, ExecutionGraph, SubmissionOptions};
