// Long-term locks for processes, built on top of a spinlock + condition.

use crate::proc::{myproc, sleep, wakeup};
use crate::spinlock::Spinlock;

#[derive(Copy, Clone)]
pub struct Sleeplock {
    locked: u64,  // Is the lock held?
    lk: Spinlock, // spinlock protecting this sleep lock

    // For debugging:
    name: &'static str, // Name of lock.
    pid: u32,            // Process holding lock
}

impl Sleeplock {
    pub const fn init_lock(name: &'static str) -> Self {
        Sleeplock {
            locked: 0,
            lk: Spinlock::init_lock("sleep lock"),
            name,
            pid: 0,
        }
    }

    pub fn acquire_sleep(&mut self) {
        self.lk.acquire();

        while self.locked != 0 {
            sleep(self as *const Sleeplock as usize, &mut self.lk);
        }
        self.locked = 1;
        self.pid = myproc().pid();
        self.lk.release();
    }

    pub fn release_sleep(&mut self) {
        self.lk.acquire();
        self.locked = 0;
        self.pid = 0;
        wakeup(self as *const Sleeplock as usize);
        self.lk.release();
    }

    pub fn holding_sleep(&mut self) -> bool {
        self.lk.acquire();
        let r = self.locked != 0 && self.pid == myproc().pid();
        self.lk.release();
        r
    }
}
