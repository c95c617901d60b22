use std::{
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicPtr, Ordering},
    time::{Duration, Instant},
};

use crossbeam::utils::Backoff;
use util::Padded;

mod gate;
use gate::{Gate, claimed};

/// An exclusive-access value cell synchronized by a single atomic word.
///
/// The word holds the address of the current value while the cell is
/// available, or a sentinel while some thread has the value checked out.
/// Writers install a freshly boxed value with a compare-and-swap against the
/// installed address, so a write can only commit while no guard is live and
/// the displaced storage can be freed immediately.
pub struct SpinCell<T> {
    gate: Padded<AtomicPtr<T>>,
}

/// Scoped access to the cell's current value. See [SpinCell::acquire].
///
/// Dropping the guard publishes the address back into the gate, returning the
/// cell to available on every exit path.
pub struct Guard<'a, T> {
    cell: &'a SpinCell<T>,
    value: *mut T,
}

// Guards hand out &mut T to one thread at a time, so the cell is Sync under
// the same bound a mutex would require.
unsafe impl<T: Send> Send for SpinCell<T> {}
unsafe impl<T: Send> Sync for SpinCell<T> {}

impl<T> SpinCell<T> {
    /// Create a cell holding `value`.
    pub fn new(value: T) -> Self {
        let address = Box::into_raw(Box::new(value));
        Self {
            gate: Padded::new(AtomicPtr::new(address)),
        }
    }

    /// Check the value out, spinning until the gate is available.
    pub fn acquire(&self) -> Guard<'_, T> {
        let backoff = Backoff::new();
        loop {
            match self.try_acquire() {
                Some(guard) => return guard,
                None => backoff.snooze(),
            }
        }
    }

    /// Attempt a single checkout. Returns `None` when another guard is live.
    pub fn try_acquire(&self) -> Option<Guard<'_, T>> {
        match Gate::decode(self.gate.swap(claimed(), Ordering::AcqRel)) {
            Gate::Available(value) => Some(Guard { cell: self, value }),
            Gate::Claimed => None,
        }
    }

    /// Check the value out, giving up once `timeout` has elapsed.
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<Guard<'_, T>> {
        let deadline = Instant::now() + timeout;
        let backoff = Backoff::new();
        loop {
            if let Some(guard) = self.try_acquire() {
                return Some(guard);
            }
            if Instant::now() >= deadline {
                return None;
            }
            backoff.snooze();
        }
    }

    /// Publish a new value, spinning while a guard is live or another writer
    /// wins the race. After this returns, every later checkout observes this
    /// value or a newer one.
    pub fn write(&self, value: T) {
        let new = Box::into_raw(Box::new(value));
        let committed = self.install(new, None);
        debug_assert!(committed);
    }

    /// Attempt a single publish. Returns the value back when the cell is
    /// checked out or another writer got there first.
    pub fn try_write(&self, value: T) -> Result<(), T> {
        let new = Box::into_raw(Box::new(value));
        if let Gate::Available(old) = Gate::decode(self.gate.load(Ordering::Relaxed)) {
            if self
                .gate
                .compare_exchange(old, new, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                drop(unsafe { Box::from_raw(old) });
                return Ok(());
            }
        }
        Err(*unsafe { Box::from_raw(new) })
    }

    /// Publish a new value, giving up once `timeout` has elapsed. Returns the
    /// value back when the deadline passes without a commit.
    pub fn write_timeout(&self, value: T, timeout: Duration) -> Result<(), T> {
        let new = Box::into_raw(Box::new(value));
        if self.install(new, Some(Instant::now() + timeout)) {
            Ok(())
        } else {
            Err(*unsafe { Box::from_raw(new) })
        }
    }

    /// Swap a new value in and return the previous one.
    pub fn replace(&self, value: T) -> T {
        let mut guard = self.acquire();
        std::mem::replace(&mut *guard, value)
    }

    /// Clone the current value out.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        let guard = self.acquire();
        (*guard).clone()
    }

    /// Consume the cell and recover the value it holds.
    pub fn into_inner(mut self) -> T {
        let word = *self.gate.get_mut();
        let Gate::Available(address) = Gate::decode(word) else {
            unreachable!("guard leaked while consuming the cell");
        };
        std::mem::forget(self);
        unsafe { *Box::from_raw(address) }
    }

    /// CAS loop installing `new`, backing off while the gate is claimed.
    /// Returns false when `deadline` passes first; `new` is untouched then.
    fn install(&self, new: *mut T, deadline: Option<Instant>) -> bool {
        let backoff = Backoff::new();
        let mut word = self.gate.load(Ordering::Relaxed);
        loop {
            match Gate::decode(word) {
                Gate::Available(old) => {
                    match self.gate.compare_exchange_weak(
                        old,
                        new,
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => {
                            drop(unsafe { Box::from_raw(old) });
                            return true;
                        }
                        Err(current) => {
                            // Rival writers advancing the gate count against
                            // the deadline just like a live guard does.
                            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                                return false;
                            }
                            word = current;
                            backoff.spin();
                        }
                    }
                }
                Gate::Claimed => {
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        return false;
                    }
                    backoff.snooze();
                    word = self.gate.load(Ordering::Relaxed);
                }
            }
        }
    }
}

impl<T: Default> Default for SpinCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Drop for SpinCell<T> {
    fn drop(&mut self) {
        // A leaked guard leaves the gate claimed; its storage leaks with it.
        if let Gate::Available(address) = Gate::decode(*self.gate.get_mut()) {
            drop(unsafe { Box::from_raw(address) });
        }
    }
}

impl<T> Drop for Guard<'_, T> {
    fn drop(&mut self) {
        self.cell.gate.store(self.value, Ordering::Release);
    }
}

impl<T> Deref for Guard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        unsafe { &*self.value }
    }
}

impl<T> DerefMut for Guard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.value }
    }
}
