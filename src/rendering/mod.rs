//! Rendering module: text layout and raster composition

pub mod compose;
pub mod font;
pub mod layout;

/// Immutable binary image produced by one composition.
///
/// Ownership transfers to the delivery path that consumes it; the blob is
/// dropped once delivery completes.
#[derive(Debug, Clone)]
pub struct CompositeBlob {
    bytes: Vec<u8>,
    mime_type: String,
}

impl CompositeBlob {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
