#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The document is neither a recognizable GUI nor API workflow.
    /// Callers must refuse to proceed rather than guess.
    #[error("Document is neither a GUI-format nor an API-format workflow")]
    UnknownFormat,

    /// GUI-to-API conversion hit a structurally invalid node.
    #[error("Conversion failed at node {node_id} ({node_type}): {reason}")]
    Conversion {
        node_id: String,
        node_type: String,
        reason: String,
    },

    /// The document's overall structure is invalid (e.g. `nodes` missing).
    #[error("Workflow structure invalid: {0}")]
    Structure(String),

    /// Submission options were rejected before any graph was prepared.
    #[error("Invalid submission options: {0}")]
    InvalidOptions(String),
}
