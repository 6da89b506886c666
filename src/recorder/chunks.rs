//! Append-only chunk buffer

use bytes::{Bytes, BytesMut};

/// Ordered encoded chunks of one recording
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Bytes>,
    total_len: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks are dropped.
    pub fn push(&mut self, chunk: Bytes) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.total_len += chunk.len();
        self.chunks.push(chunk);
        true
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total bytes buffered
    pub fn byte_len(&self) -> usize {
        self.total_len
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_len = 0;
    }

    /// Concatenate the chunks in emission order.
    pub fn freeze(self) -> Bytes {
        if self.chunks.len() == 1 {
            return self.chunks.into_iter().next().unwrap_or_default();
        }

        let mut out = BytesMut::with_capacity(self.total_len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out.freeze()
    }
}
