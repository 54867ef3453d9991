//! Batcher
//!
//! Groups the record stream into bounded batches. The size limit is re-read
//! from the shared state at every boundary, because the memory watchdog may
//! have shrunk it mid-stream. An emitted batch's size is fixed the instant
//! it is emitted; later limit changes never touch it.

use crate::record::Record;
use crate::state::PipelineState;

/// Accumulates records into batches bounded by the current batch-size limit
pub struct Batcher<'a> {
    state: &'a PipelineState,
    buffer: Vec<Record>,
}

impl<'a> Batcher<'a> {
    pub fn new(state: &'a PipelineState) -> Self {
        let capacity = state.batch_size();
        Self {
            state,
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Add a record; returns a full batch when the current limit is reached.
    ///
    /// An emitted batch never exceeds the limit in effect at emission: when
    /// the limit shrank below the buffered count, the surplus stays buffered
    /// for the next group.
    pub fn push(&mut self, record: Record) -> Option<Vec<Record>> {
        self.buffer.push(record);
        let limit = self.state.batch_size().max(1);
        if self.buffer.len() < limit {
            return None;
        }
        let surplus = self.buffer.split_off(limit);
        Some(std::mem::replace(&mut self.buffer, surplus))
    }

    /// Emit the final partial batch at end of stream, if any
    pub fn finish(self) -> Option<Vec<Record>> {
        (!self.buffer.is_empty()).then_some(self.buffer)
    }
}
