//! Lazy batch production over an owned item sequence
//!
//! Splits an ordered sequence into fixed-size batches, produced on demand by
//! the consumer's own iteration rather than by a background task, so
//! abandoning the iterator early leaves nothing running.

use crate::error::{Result, TaskError};

/// Component name used for chunking errors
const COMPONENT: &str = "chunk";

/// Split `items` into batches of at most `size` elements
///
/// Yields ⌈N/S⌉ batches for N items; every batch has length `size` except
/// possibly the last. An empty input yields zero batches. A `size` of zero is
/// rejected up front rather than looping forever.
///
/// The returned iterator is consumed at most once and is safe to abandon
/// mid-iteration.
pub fn chunked<T>(items: Vec<T>, size: usize) -> Result<Chunks<T>> {
    if size == 0 {
        return Err(TaskError::invalid_config(
            COMPONENT,
            "chunk size must be at least 1",
        ));
    }
    Ok(Chunks {
        items: items.into_iter(),
        size,
    })
}

/// Lazy iterator over fixed-size batches (see [`chunked`])
#[derive(Debug)]
pub struct Chunks<T> {
    items: std::vec::IntoIter<T>,
    size: usize,
}

impl<T> Iterator for Chunks<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        let batch: Vec<T> = self.items.by_ref().take(self.size).collect();
        if batch.is_empty() { None } else { Some(batch) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.items.len().div_ceil(self.size);
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Chunks<T> {}
