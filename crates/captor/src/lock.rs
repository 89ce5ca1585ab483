//! Lock policies guarding a captor's queue and policy state.
//!
//! A lock policy is a zero-sized marker selecting how the captor's critical
//! section is implemented:
//!
//! - [`NoLock`]: `RefCell`, single-threaded, zero synchronization cost. The
//!   resulting captor is `Send` but not `Sync`.
//! - [`PollingLock`]: spins on `try_lock`, yielding the time slice between
//!   bursts. Never parks the calling thread.
//! - [`BlockingLock`]: parks until the lock is released.
//!
//! Guards release the critical section on drop, so every early return out of
//! a capture releases it as well.

use std::cell::{RefCell, RefMut};
use std::ops::DerefMut;

use parking_lot::{Mutex, MutexGuard};

/// Spin iterations between two `yield_now` calls of [`PollingLock`]
const SPINS_BEFORE_YIELD: u32 = 64;

/// Scoped exclusive access to a value of type `T`
pub trait LockPolicy: Send + Sync + 'static {
    /// Storage wrapping the guarded value
    type Lock<T>;

    /// Exclusive access, released on drop
    type Guard<'a, T: 'a>: DerefMut<Target = T>;

    /// Label used in logs
    const NAME: &'static str;

    fn wrap<T>(value: T) -> Self::Lock<T>;

    fn acquire<'a, T: 'a>(lock: &'a Self::Lock<T>) -> Self::Guard<'a, T>;

    fn into_inner<T>(lock: Self::Lock<T>) -> T;
}

/// Single-threaded access, no synchronization
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLock;

impl LockPolicy for NoLock {
    type Lock<T> = RefCell<T>;
    type Guard<'a, T: 'a> = RefMut<'a, T>;

    const NAME: &'static str = "none";

    #[inline]
    fn wrap<T>(value: T) -> RefCell<T> {
        RefCell::new(value)
    }

    #[inline]
    fn acquire<'a, T: 'a>(lock: &'a RefCell<T>) -> RefMut<'a, T> {
        lock.borrow_mut()
    }

    fn into_inner<T>(lock: RefCell<T>) -> T {
        lock.into_inner()
    }
}

/// Busy-polling mutual exclusion
#[derive(Debug, Clone, Copy, Default)]
pub struct PollingLock;

impl LockPolicy for PollingLock {
    type Lock<T> = Mutex<T>;
    type Guard<'a, T: 'a> = MutexGuard<'a, T>;

    const NAME: &'static str = "polling";

    #[inline]
    fn wrap<T>(value: T) -> Mutex<T> {
        Mutex::new(value)
    }

    fn acquire<'a, T: 'a>(lock: &'a Mutex<T>) -> MutexGuard<'a, T> {
        let mut spins = 0;
        loop {
            if let Some(guard) = lock.try_lock() {
                return guard;
            }
            if spins < SPINS_BEFORE_YIELD {
                spins += 1;
                std::hint::spin_loop();
            } else {
                spins = 0;
                std::thread::yield_now();
            }
        }
    }

    fn into_inner<T>(lock: Mutex<T>) -> T {
        lock.into_inner()
    }
}

/// Parking mutual exclusion
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingLock;

impl LockPolicy for BlockingLock {
    type Lock<T> = Mutex<T>;
    type Guard<'a, T: 'a> = MutexGuard<'a, T>;

    const NAME: &'static str = "blocking";

    #[inline]
    fn wrap<T>(value: T) -> Mutex<T> {
        Mutex::new(value)
    }

    #[inline]
    fn acquire<'a, T: 'a>(lock: &'a Mutex<T>) -> MutexGuard<'a, T> {
        lock.lock()
    }

    fn into_inner<T>(lock: Mutex<T>) -> T {
        lock.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn hammer<L: LockPolicy>()
    where
        L::Lock<u64>: Send + Sync,
    {
        let lock = Arc::new(L::wrap(0u64));
        thread::scope(|scope| {
            for _ in 0..4 {
                let lock = Arc::clone(&lock);
                scope.spawn(move || {
                    for _ in 0..1000 {
                        *L::acquire(&*lock) += 1;
                    }
                });
            }
        });
        let lock = Arc::try_unwrap(lock).ok().unwrap();
        assert_eq!(L::into_inner(lock), 4000);
    }

    #[test]
    fn test_polling_lock_is_exclusive() {
        hammer::<PollingLock>();
    }

    #[test]
    fn test_blocking_lock_is_exclusive() {
        hammer::<BlockingLock>();
    }

    #[test]
    fn test_no_lock_guard_released_on_drop() {
        let lock = NoLock::wrap(vec![1]);
        {
            let mut guard = NoLock::acquire(&lock);
            guard.push(2);
        }
        NoLock::acquire(&lock).push(3);
        assert_eq!(NoLock::into_inner(lock), vec![1, 2, 3]);
    }
}
