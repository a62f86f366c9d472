#![allow(missing_docs)]

use crate::backend::RenderingApi;

/// Triangles waiting to be drawn with the current rendering state.
#[derive(Debug, Clone)]
pub struct VertexBatch {
    buf: Vec<f32>,
    num_tris: usize,
    max_tris: usize,
    num_flushes: usize,
}

impl VertexBatch {
    pub fn new(max_tris: usize) -> Self {
        Self {
            buf: Vec::new(),
            num_tris: 0,
            max_tris: max_tris.max(1),
            num_flushes: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_tris == 0
    }

    pub fn num_tris(&self) -> usize {
        self.num_tris
    }

    /// The number of draw calls issued so far.
    pub fn num_flushes(&self) -> usize {
        self.num_flushes
    }

    pub fn push(&mut self, value: f32) {
        self.buf.push(value);
    }

    pub fn extend(&mut self, values: &[f32]) {
        self.buf.extend_from_slice(values);
    }

    /// Completes a triangle. Returns true once the batch is full.
    pub fn end_triangle(&mut self) -> bool {
        self.num_tris += 1;
        self.num_tris >= self.max_tris
    }

    /// Draws the pending triangles, if any.
    pub fn flush(&mut self, rapi: &mut dyn RenderingApi) {
        if self.num_tris > 0 {
            tracing::trace!("flushing {} triangles", self.num_tris);
            rapi.draw_triangles(&self.buf, self.num_tris);
            self.num_flushes += 1;
        }
        self.buf.clear();
        self.num_tris = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::recorder::RecordingBackend;

    #[test]
    fn test_flush_at_ceiling() {
        let mut rapi = RecordingBackend::new();
        let mut batch = VertexBatch::new(2);
        batch.extend(&[0.0; 12]);
        assert!(!batch.end_triangle());
        batch.extend(&[0.0; 12]);
        assert!(batch.end_triangle());
        batch.flush(&mut rapi);
        batch.flush(&mut rapi);

        assert!(batch.is_empty());
        assert_eq!(batch.num_flushes(), 1);
        assert_eq!(rapi.draws().len(), 1);
        assert_eq!(rapi.draws()[0].num_tris, 2);
        assert_eq!(rapi.draws()[0].vertex_buffer.len(), 24);
    }
}
