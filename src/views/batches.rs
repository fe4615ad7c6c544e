//! Cooperative batching for large list rendering
//!
//! [`RenderBatches`] is a lazy iterator over fixed-size windows of a shared
//! list. It can be restarted from the top and cancelled from another handle;
//! [`RenderBatches::drive`] hands batches to a callback and yields to the
//! runtime between them.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One window of the source list
#[derive(Debug, Clone)]
pub struct Batch<T> {
    items: Arc<Vec<T>>,
    range: Range<usize>,
    index: usize,
}

impl<T> Batch<T> {
    pub fn items(&self) -> &[T] {
        &self.items[self.range.clone()]
    }

    /// Position of this batch in the sequence
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Stops a running batch sequence
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct RenderBatches<T> {
    items: Arc<Vec<T>>,
    batch_size: usize,
    cursor: usize,
    cancel: CancelHandle,
}

impl<T> RenderBatches<T> {
    pub fn new(items: Arc<Vec<T>>, batch_size: usize) -> Self {
        Self {
            items,
            batch_size: batch_size.max(1),
            cursor: 0,
            cancel: CancelHandle::default(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn batch_count(&self) -> usize {
        self.items.len().div_ceil(self.batch_size)
    }

    /// Rewind to the first batch and clear any cancellation
    pub fn restart(&mut self) {
        self.cursor = 0;
        self.cancel = CancelHandle::default();
    }

    /// Deliver every remaining batch to `render`, yielding to the scheduler
    /// between batches. Returns the number of batches delivered.
    pub async fn drive<F>(&mut self, mut render: F) -> usize
    where
        F: FnMut(Batch<T>),
    {
        let mut delivered = 0;
        while let Some(batch) = self.next() {
            render(batch);
            delivered += 1;
            tokio::task::yield_now().await;
        }
        delivered
    }
}

impl<T> Iterator for RenderBatches<T> {
    type Item = Batch<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cancel.is_cancelled() || self.cursor >= self.items.len() {
            return None;
        }
        let start = self.cursor;
        let end = (start + self.batch_size).min(self.items.len());
        self.cursor = end;

        Some(Batch {
            items: Arc::clone(&self.items),
            range: start..end,
            index: start / self.batch_size,
        })
    }
}
