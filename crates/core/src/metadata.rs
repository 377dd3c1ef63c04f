//! Embedded ComfyUI workflow extraction from PNG metadata.
//!
//! ComfyUI writes two `tEXt` chunks into every saved PNG: `prompt` holds
//! the execution (API-format) graph and `workflow` holds the editor
//! (GUI-format) graph. This module walks the chunk stream directly; the
//! files involved are local and the chunks sit near the front, so no
//! image decoding is needed.

use crate::error::CoreError;

/// PNG file signature.
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Workflow JSON blobs recovered from a PNG, either of which may be absent.
#[derive(Debug, Default)]
pub struct EmbeddedWorkflows {
    /// API-format graph from the `prompt` chunk.
    pub prompt: Option<serde_json::Value>,
    /// GUI-format graph from the `workflow` chunk.
    pub workflow: Option<serde_json::Value>,
}

impl EmbeddedWorkflows {
    /// `true` when the file carried no workflow metadata at all.
    pub fn is_empty(&self) -> bool {
        self.prompt.is_none() && self.workflow.is_none()
    }

    /// The blob preferred for field extraction: the GUI graph when present
    /// (it carries widget ordering), otherwise the API graph.
    pub fn preferred(&self) -> Option<&serde_json::Value> {
        self.workflow.as_ref().or(self.prompt.as_ref())
    }
}

/// Extract embedded workflow JSON from PNG bytes.
///
/// Files that are not PNGs, or PNGs without ComfyUI chunks, yield an
/// empty result rather than an error -- absence of metadata is a normal
/// state for triaged media. Chunks whose payload is not valid JSON are
/// skipped with a warning.
pub fn extract_embedded_workflows(bytes: &[u8]) -> EmbeddedWorkflows {
    let mut found = EmbeddedWorkflows::default();

    if bytes.len() < PNG_SIGNATURE.len() || &bytes[..PNG_SIGNATURE.len()] != PNG_SIGNATURE {
        return found;
    }

    let mut pos = PNG_SIGNATURE.len();

    // Each chunk is: length (4) | type (4) | data (length) | crc (4).
    while pos + 12 <= bytes.len() {
        let length =
            u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
                as usize;
        if pos + 12 + length > bytes.len() {
            break;
        }

        let chunk_type = &bytes[pos + 4..pos + 8];
        if chunk_type == b"tEXt" {
            let data = &bytes[pos + 8..pos + 8 + length];
            if let Some((keyword, text)) = split_text_chunk(data) {
                match keyword {
                    "prompt" => found.prompt = parse_chunk_json(keyword, text),
                    "workflow" => found.workflow = parse_chunk_json(keyword, text),
                    _ => {}
                }
            }
        } else if chunk_type == b"IDAT" {
            // ComfyUI writes its tEXt chunks before the image data.
            break;
        }

        if found.prompt.is_some() && found.workflow.is_some() {
            break;
        }
        pos += 12 + length;
    }

    found
}

/// Read a file and extract its embedded workflows.
pub fn extract_from_file(path: &std::path::Path) -> Result<EmbeddedWorkflows, CoreError> {
    let bytes = std::fs::read(path)?;
    Ok(extract_embedded_workflows(&bytes))
}

/// Split a `tEXt` chunk payload into its NUL-separated keyword and text.
fn split_text_chunk(data: &[u8]) -> Option<(&str, &[u8])> {
    let null_pos = data.iter().position(|&b| b == 0)?;
    let keyword = std::str::from_utf8(&data[..null_pos]).ok()?;
    Some((keyword, &data[null_pos + 1..]))
}

fn parse_chunk_json(keyword: &str, text: &[u8]) -> Option<serde_json::Value> {
    match serde_json::from_slice(text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(keyword, error = %e, "Skipping unparseable metadata chunk");
            None
        }
    }
}
