//! Bounded row accumulator trait for parquet-bound streams.
//!
//! Accumulators buffer decoded rows as column vectors and convert them to
//! an Arrow `RecordBatch` on flush. Flushing happens on a threshold
//! crossing and unconditionally at end of stream; correctness never
//! depends on when a flush lands, only memory pressure does.

use arrow::array::RecordBatch;
use arrow::error::ArrowError;

/// Default batch size when flushing into a single open sink.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Accumulator trait for batch processing of parsed rows into Arrow
/// `RecordBatch`.
pub trait Accumulator {
    type Row;

    /// Push a row into the accumulator
    fn push(&mut self, row: Self::Row);

    /// Number of rows currently buffered
    fn len(&self) -> usize;

    /// Check if buffer is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take buffered rows as a RecordBatch, resetting internal state
    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError>;
}
