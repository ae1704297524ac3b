//! Parallel iteration when the `parallel` feature is on, plain iteration
//! otherwise.
//!
//! Only `into_par_iter()` is shimmed; the rest of each chain (`map`,
//! `filter`, `count`, `collect`, ...) resolves to the matching method of
//! either rayon's `ParallelIterator` or std's `Iterator`.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
