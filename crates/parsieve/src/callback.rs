//! Receiving primes as they are found.
//!
//! A [`PrimeCallback`] is shared by every worker of a run, so it must be
//! [`Sync`]; the coordinator does not serialize calls. Implementations that
//! accumulate into shared state synchronize themselves (an atomic, a mutex).
//!
//! Two shapes are supported through one trait:
//!
//! - **value only**: implement [`PrimeCallback::on_prime`], or pass any
//!   `Fn(u64) + Sync` closure. Primes arrive in increasing order only when
//!   the run uses a single thread.
//! - **value + chunk index**: override [`PrimeCallback::on_prime_in_chunk`],
//!   or wrap an `Fn(u64, usize) + Sync` closure in [`Indexed`]. The index
//!   identifies the chunk that produced the prime, so callers can re-order
//!   or attribute results after a multi-threaded run.

/// Receiver of primes discovered during a sieve run.
///
/// # Example
/// ```
/// use parsieve::{PrimeCallback, SieveRange, ParallelSieve};
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// struct Sum(AtomicU64);
///
/// impl PrimeCallback for Sum {
///     fn on_prime(&self, prime: u64) {
///         self.0.fetch_add(prime, Ordering::Relaxed);
///     }
/// }
///
/// let sum = Sum(AtomicU64::new(0));
/// let sieve = ParallelSieve::new(Default::default());
/// sieve.run_with_callback(SieveRange::new(0, 10).unwrap(), &sum).unwrap();
/// assert_eq!(sum.0.load(Ordering::Relaxed), 2 + 3 + 5 + 7);
/// ```
pub trait PrimeCallback: Sync {
    /// Called once per prime.
    fn on_prime(&self, prime: u64) {
        let _ = prime;
    }

    /// Called once per prime with the index of the chunk that found it.
    ///
    /// The default forwards to [`on_prime`](Self::on_prime).
    fn on_prime_in_chunk(&self, prime: u64, chunk_index: usize) {
        let _ = chunk_index;
        self.on_prime(prime);
    }
}

impl<F> PrimeCallback for F
where
    F: Fn(u64) + Sync,
{
    fn on_prime(&self, prime: u64) {
        self(prime);
    }
}

/// Adapts an `Fn(prime, chunk_index)` closure into a [`PrimeCallback`].
///
/// # Example
/// ```
/// use parsieve::{Indexed, ParallelSieve, SieveRange};
/// use std::sync::Mutex;
///
/// let found = Mutex::new(Vec::new());
/// let callback = Indexed(|prime, chunk| found.lock().unwrap().push((chunk, prime)));
/// ParallelSieve::new(Default::default())
///     .run_with_callback(SieveRange::new(0, 30).unwrap(), &callback)
///     .unwrap();
///
/// let mut found = found.into_inner().unwrap();
/// found.sort();
/// assert_eq!(found.len(), 10);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Indexed<F>(pub F);

impl<F> PrimeCallback for Indexed<F>
where
    F: Fn(u64, usize) + Sync,
{
    fn on_prime_in_chunk(&self, prime: u64, chunk_index: usize) {
        (self.0)(prime, chunk_index);
    }
}

/// A callback bound to the chunk an engine instance is sieving.
///
/// Engines only see a `ChunkSink`; the coordinator creates one per chunk.
#[derive(Clone, Copy)]
pub struct ChunkSink<'a> {
    callback: &'a dyn PrimeCallback,
    chunk_index: usize,
}

impl<'a> ChunkSink<'a> {
    pub fn new(callback: &'a dyn PrimeCallback, chunk_index: usize) -> Self {
        Self {
            callback,
            chunk_index,
        }
    }

    pub const fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    #[inline]
    pub fn emit(&self, prime: u64) {
        self.callback.on_prime_in_chunk(prime, self.chunk_index);
    }
}

impl core::fmt::Debug for ChunkSink<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChunkSink")
            .field("chunk_index", &self.chunk_index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn closure_receives_value_only() {
        let seen = Mutex::new(Vec::new());
        let callback = |p: u64| seen.lock().unwrap().push(p);
        let sink = ChunkSink::new(&callback, 3);
        sink.emit(11);
        sink.emit(13);
        assert_eq!(*seen.lock().unwrap(), vec![11, 13]);
    }

    #[test]
    fn indexed_closure_receives_chunk_index() {
        let seen = Mutex::new(Vec::new());
        let callback = Indexed(|p: u64, i: usize| seen.lock().unwrap().push((i, p)));
        ChunkSink::new(&callback, 2).emit(31);
        ChunkSink::new(&callback, 0).emit(7);
        assert_eq!(*seen.lock().unwrap(), vec![(2, 31), (0, 7)]);
    }
}
