// Mutual exclusion spin locks.

use crate::proc::{mycpu, Cpu};
use crate::riscv::{
    __sync_lock_release, __sync_lock_test_and_set, __sync_synchronize, intr_get, intr_off,
    intr_on,
};

#[derive(Copy, Clone)]
pub struct Spinlock {
    locked: u64, // Is the lock held?

    // For debugging:
    name: &'static str,      // Name of lock.
    cpu: Option<*mut Cpu>,   // The cpu holding the lock.
}

unsafe impl Sync for Spinlock {}

impl Spinlock {
    pub const fn init_lock(name: &'static str) -> Self {
        Spinlock {
            locked: 0,
            name,
            cpu: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Acquire the lock. Spins until the lock is acquired.
    pub fn acquire(&mut self) {
        push_off(); // disable interrupts to avoid deadlock.
        if self.holding() {
            panic!("acquire {}", self.name);
        }

        // On RISC-V, sync_lock_test_and_set is an atomic swap.
        while __sync_lock_test_and_set(&mut self.locked, 1) != 0 {}

        // Loads/stores after this point must not be reordered ahead of it.
        __sync_synchronize();

        self.cpu = Some(mycpu());
    }

    /// Release the lock.
    pub fn release(&mut self) {
        if !self.holding() {
            panic!("release {}", self.name);
        }

        self.cpu = None;

        __sync_synchronize();
        __sync_lock_release(&self.locked);

        pop_off();
    }

    /// Check whether this cpu is holding the lock.
    /// Interrupts must be off.
    pub fn holding(&self) -> bool {
        self.locked == 1 && self.cpu == Some(mycpu() as *mut Cpu)
    }
}

/// push_off/pop_off are like intr_off()/intr_on() except that they are
/// matched: it takes two pop_off()s to undo two push_off()s. If
/// interrupts are initially off, push_off/pop_off leaves them off.
pub fn push_off() {
    let old = intr_get();

    intr_off();
    let cpu = mycpu();
    unsafe {
        if (*cpu).noff == 0 {
            (*cpu).intena = old;
        }
        (*cpu).noff += 1;
    }
}

pub fn pop_off() {
    let cpu = mycpu();
    if intr_get() {
        panic!("pop_off - interruptible");
    }

    unsafe {
        if (*cpu).noff < 1 {
            panic!("pop_off");
        }
        (*cpu).noff -= 1;
        if (*cpu).noff == 0 && (*cpu).intena {
            intr_on();
        }
    }
}
