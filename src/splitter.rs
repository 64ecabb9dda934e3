//! Split policies for `parallel_for`.
//!
//! A splitter decides whether a range of elements is still worth halving
//! before it gets scheduled as a leaf job. Policies are zero-sized and
//! resolved at compile time.

use std::marker::PhantomData;

/// Decides whether a range of `count` elements should be halved again.
pub trait Splitter {
    fn should_split(count: usize) -> bool;
}

/// Splits while the element count exceeds `MAX`.
pub struct CountSplitter<const MAX: usize>;

impl<const MAX: usize> Splitter for CountSplitter<MAX> {
    fn should_split(count: usize) -> bool {
        count > MAX
    }
}

/// Splits while the range's total size in bytes exceeds `MAX_BYTES`.
///
/// Keeps leaf ranges within a fixed memory footprint regardless of the
/// element type, which is the better knob when `T` is large or the work is
/// cache-bound.
pub struct DataSizeSplitter<T, const MAX_BYTES: usize> {
    _marker: PhantomData<T>,
}

impl<T, const MAX_BYTES: usize> Splitter for DataSizeSplitter<T, MAX_BYTES> {
    fn should_split(count: usize) -> bool {
        count.saturating_mul(std::mem::size_of::<T>()) > MAX_BYTES
    }
}
