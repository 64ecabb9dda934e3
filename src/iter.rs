//! Safe slice adapter over [`JobManager::parallel_for`].
//!
//! `parallel_for` hands out raw subrange pointers and leaves the lifetime
//! discipline to the caller. This adapter scopes the borrow instead: the
//! slice is split, every leaf chunk runs as a job, and the call joins the
//! drain until the whole tree is done, so the borrow provably outlives
//! every leaf.

use crate::job_manager::JobManager;
use crate::splitter::Splitter;

pub trait ParallelSliceMut<T> {
    /// Borrows the slice for chunked parallel mutation on `jobs`.
    fn par_chunks_mut<'a>(&'a mut self, jobs: &'a JobManager) -> ParChunksMut<'a, T>;
}

impl<T: Send + 'static> ParallelSliceMut<T> for [T] {
    fn par_chunks_mut<'a>(&'a mut self, jobs: &'a JobManager) -> ParChunksMut<'a, T> {
        ParChunksMut { slice: self, jobs }
    }
}

pub struct ParChunksMut<'a, T> {
    slice: &'a mut [T],
    jobs: &'a JobManager,
}

impl<'a, T: Send + 'static> ParChunksMut<'a, T> {
    /// Splits the slice with `S` and runs `op` on every leaf chunk, then
    /// blocks until the last chunk is done. Chunks are disjoint, so `op`
    /// gets exclusive access without locking.
    pub fn for_each<S, F>(self, op: F)
    where
        S: Splitter + 'static,
        F: Fn(&mut [T]) + Send + Sync + 'static,
    {
        let data = self.slice.as_mut_ptr();
        let count = self.slice.len();
        let leaf = move |chunk: *mut T, len: usize| {
            // Safety: leaves are disjoint by construction, and the wait
            // below keeps the slice borrowed past the last of them.
            op(unsafe { std::slice::from_raw_parts_mut(chunk, len) });
        };
        unsafe {
            self.jobs.parallel_for::<S, T, _>(data, count, leaf);
        }
        self.jobs.wait();
    }
}
