//! Lock around each EPA's state machine.
//!
//! A behavior is only ever touched by the scheduler loop, and strictly
//! higher priorities are the only ones that may run nested inside it, so the
//! lock is never contended on a single core. It exists to hand out `&mut`
//! access from a shared `&Kernel`. Hosted builds use `std::sync::Mutex`,
//! bare-metal builds a `spin::Mutex` (feature `lock-free`).

#[cfg(not(any(feature = "std", feature = "lock-free")))]
compile_error!("eds-kernel needs either the `std` or the `lock-free` feature");

#[cfg(feature = "std")]
pub(crate) type LockGuard<'a, T> = std::sync::MutexGuard<'a, T>;
#[cfg(not(feature = "std"))]
pub(crate) type LockGuard<'a, T> = spin::MutexGuard<'a, T>;

pub(crate) struct Lock<T> {
    #[cfg(feature = "std")]
    inner: std::sync::Mutex<T>,
    #[cfg(not(feature = "std"))]
    inner: spin::Mutex<T>,
}

impl<T> Lock<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            #[cfg(feature = "std")]
            inner: std::sync::Mutex::new(value),
            #[cfg(not(feature = "std"))]
            inner: spin::Mutex::new(value),
        }
    }

    /// A handler that panicked leaves its machine in whatever state it
    /// reached; the lock is taken regardless.
    pub(crate) fn lock(&self) -> LockGuard<'_, T> {
        #[cfg(feature = "std")]
        {
            self.inner
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
        #[cfg(not(feature = "std"))]
        {
            self.inner.lock()
        }
    }
}
