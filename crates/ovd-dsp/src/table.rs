use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use ovd_core::{BANDS, CHANNELS};

use crate::coeffs::Coeffs;

/// `[channel][band]` coefficient table, one full generation.
pub type Table = [[Coeffs; BANDS]; CHANNELS];

fn identity_table() -> Table {
    [[Coeffs::IDENTITY; BANDS]; CHANNELS]
}

/// Two-slot coefficient arena with atomic-pointer publication. The control
/// thread rebuilds the slot that isn't currently published and then
/// release-stores its address into `current`; the audio thread acquire-loads
/// `current` once per processing block and holds that reference for the
/// whole block.
///
/// Only one thread may call [`rebuild`](Self::rebuild) at a time (the loop
/// thread, per the control surface). Any number of readers may call
/// [`current`](Self::current) concurrently with a rebuild; they will see
/// either the old or the new generation, never a partially written one.
pub struct CoefficientTable {
    slot_a: Box<UnsafeCell<Table>>,
    slot_b: Box<UnsafeCell<Table>>,
    current: AtomicPtr<Table>,
    next_write: AtomicUsize,
}

// SAFETY: `current` is only ever written by `rebuild`'s single writer and
// only ever read through `current()`, which never retains the pointer past
// one call; the slot behind a stale pointer is never mutated until the
// writer has moved on to the other slot. `next_write` is only touched by
// the same single writer.
unsafe impl Sync for CoefficientTable {}
unsafe impl Send for CoefficientTable {}

impl CoefficientTable {
    pub fn new() -> Self {
        let slot_a = Box::new(UnsafeCell::new(identity_table()));
        let slot_b = Box::new(UnsafeCell::new(identity_table()));
        let current = AtomicPtr::new(slot_a.get());
        Self { slot_a, slot_b, current, next_write: AtomicUsize::new(1) }
    }

    /// Rebuilds the inactive slot in place via `f`, then publishes it.
    /// Call only from the control/loop thread.
    pub fn rebuild(&self, f: impl FnOnce(&mut Table)) {
        let idx = self.next_write.load(Ordering::Relaxed);
        let slot = if idx == 0 { &self.slot_a } else { &self.slot_b };
        // SAFETY: this slot is not the one `current` points at, so no
        // reader can be observing it.
        let table = unsafe { &mut *slot.get() };
        f(table);
        self.current.store(slot.get(), Ordering::Release);
        self.next_write.store(1 - idx, Ordering::Relaxed);
    }

    /// Acquire-loads the published table.
    #[inline]
    pub fn current(&self) -> &Table {
        let ptr = self.current.load(Ordering::Acquire);
        // SAFETY: `ptr` always points at one of `slot_a`/`slot_b`, both of
        // which live as long as `self`.
        unsafe { &*ptr }
    }
}

impl Default for CoefficientTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_identity_coefficients() {
        let table = CoefficientTable::new();
        for channel in table.current() {
            for c in channel {
                assert_eq!(*c, Coeffs::IDENTITY);
            }
        }
    }

    #[test]
    fn rebuild_publishes_new_generation() {
        let table = CoefficientTable::new();
        let fresh = Coeffs::design(48_000.0, 1_000.0, 0.707, 6.0);
        table.rebuild(|t| {
            for channel in t.iter_mut() {
                for c in channel.iter_mut() {
                    *c = fresh;
                }
            }
        });
        assert_eq!(table.current()[0][0], fresh);
    }

    #[test]
    fn successive_rebuilds_alternate_slots_without_aliasing() {
        let table = CoefficientTable::new();
        let first = Coeffs::design(48_000.0, 1_000.0, 0.707, 3.0);
        let second = Coeffs::design(48_000.0, 2_000.0, 0.707, -3.0);
        table.rebuild(|t| t[0][0] = first);
        assert_eq!(table.current()[0][0], first);
        table.rebuild(|t| t[0][0] = second);
        assert_eq!(table.current()[0][0], second);
    }
}
