#[cfg(feature = "parking-lot")]
pub(crate) use parking_lot::{Mutex, MutexGuard};
#[cfg(not(feature = "parking-lot"))]
pub(crate) use std::sync::{Mutex, MutexGuard};

/// Locks `mutex`, mapping poisoning to [`crate::Error::LockPoisoned`].
///
/// With the `parking-lot` feature the lock cannot poison and this never
/// fails.
#[inline]
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> crate::Result<MutexGuard<'_, T>> {
    #[cfg(feature = "parking-lot")]
    {
        Ok(mutex.lock())
    }
    #[cfg(not(feature = "parking-lot"))]
    {
        Ok(mutex.lock()?)
    }
}
