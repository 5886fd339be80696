//! Chunked reductions over the sample.
//!
//! The data are split into fixed-size chunks and each chunk is mapped to a
//! partial result. With the `parallel` feature the chunks are mapped on the
//! rayon pool. Partials are always combined in chunk order, so the result
//! does not depend on the feature or the number of threads.
use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::consts::CHUNK_SIZE;

/// Associative combination of partial results
pub(crate) trait Merge: Sized {
    fn identity() -> Self;

    fn merge(self, other: Self) -> Self;
}

fn chunk_ranges(n: usize) -> Vec<Range<usize>> {
    (0..n)
        .step_by(CHUNK_SIZE)
        .map(|start| start..(start + CHUNK_SIZE).min(n))
        .collect()
}

/// Map every chunk of `0..n` to a partial, returned in chunk order
pub(crate) fn map_chunks<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(Range<usize>) -> T + Sync + Send,
{
    let ranges = chunk_ranges(n);

    #[cfg(feature = "parallel")]
    let partials = ranges.into_par_iter().map(f).collect();

    #[cfg(not(feature = "parallel"))]
    let partials = ranges.into_iter().map(f).collect();

    partials
}

/// Map every chunk of `0..n` to a partial and merge the partials in order
pub(crate) fn fold_chunks<T, F>(n: usize, f: F) -> T
where
    T: Merge + Send,
    F: Fn(Range<usize>) -> T + Sync + Send,
{
    map_chunks(n, f).into_iter().fold(T::identity(), T::merge)
}

impl Merge for f64 {
    fn identity() -> Self {
        0.0
    }

    fn merge(self, other: Self) -> Self {
        self + other
    }
}

impl<T: Merge> Merge for [T; 2] {
    fn identity() -> Self {
        [T::identity(), T::identity()]
    }

    fn merge(self, other: Self) -> Self {
        let [a0, a1] = self;
        let [b0, b1] = other;
        [a0.merge(b0), a1.merge(b1)]
    }
}
