//! Finished recording artifact
//!
//! The chunk buffer of a stopped session is frozen into one immutable
//! [`Artifact`], named after the moment the recording stopped.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::recorder::chunks::ChunkBuffer;
use crate::recorder::encoder::MediaFormat;

/// Immutable recorded video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    id: Uuid,
    data: Bytes,
    mime_type: String,
    filename: String,
    recorded_at: DateTime<Utc>,
}

impl Artifact {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Shared view of the bytes; cloning does not copy the data
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// Build the artifact filename for a recording stopped at `stopped_at`,
/// e.g. `screen-recording-2024-05-01T09-30-00.webm`.
pub fn artifact_filename(prefix: &str, stopped_at: DateTime<Utc>, extension: &str) -> String {
    format!("{}-{}.{}", prefix, stopped_at.format("%Y-%m-%dT%H-%M-%S"), extension)
}

/// Concatenate the buffered chunks, in emission order, into an artifact.
pub fn assemble(chunks: ChunkBuffer, format: &MediaFormat, prefix: &str, stopped_at: DateTime<Utc>) -> Artifact {
    let chunk_count = chunks.len();
    let data = chunks.freeze();

    let artifact = Artifact {
        id: Uuid::new_v4(),
        data,
        mime_type: format.container.clone(),
        filename: artifact_filename(prefix, stopped_at, &format.extension),
        recorded_at: stopped_at,
    };

    tracing::debug!(
        "Assembled {} from {} chunks ({} bytes)",
        artifact.filename,
        chunk_count,
        artifact.len()
    );

    artifact
}
