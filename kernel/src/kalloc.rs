// Physical memory allocator, for user processes, kernel stacks, page
// table pages, and pipe buffers. Allocates whole 4096-byte pages.
//
// One freelist per CPU (spec 4.1). alloc_page tries the caller's own
// list first; on empty it steals from another CPU's list, releasing
// its own lock before taking a remote one so at most one freelist
// lock is ever held at a time (no AB/BA deadlock across CPUs). Freed
// pages always return to the freeing CPU's own list.

use core::ptr;

use crate::error::{KResult, KernelError};
use crate::memlayout::PHYSTOP;
use crate::param::NCPU;
use crate::proc::cpuid;
use crate::riscv::PGSIZE;
use crate::spinlock::{pop_off, push_off, Spinlock};
use crate::string::memset;
use crate::PGROUNDUP;

extern "C" {
    // first address after kernel.
    // defined by kernel.ld.
    static mut end: u8;
}

struct Run {
    next: *mut Run,
}

struct PerCpu {
    lock: Spinlock,
    freelist: *mut Run,
}

pub struct KMem {
    cpus: [PerCpu; NCPU],
}

unsafe impl Sync for KMem {}

pub static mut KMEM: KMem = KMem::create();

impl KMem {
    const fn create() -> Self {
        const INIT: PerCpu = PerCpu {
            lock: Spinlock::init_lock("kmem"),
            freelist: ptr::null_mut(),
        };
        Self {
            cpus: [INIT; NCPU],
        }
    }

    pub fn kinit() {
        unsafe {
            KMEM.freerange((&mut end) as *mut u8, PHYSTOP as *mut u8);
        }
    }

    // All of physical RAM starts out owned by CPU 0's freelist; work
    // stealing spreads it out as other harts start running and allocate.
    fn freerange<T: Sized>(self: &mut Self, pa_start: *mut T, pa_end: *mut T) {
        let mut p = PGROUNDUP!(pa_start);
        while p + PGSIZE <= pa_end as usize {
            self.kfree(p as *mut T);
            p += PGSIZE;
        }
    }

    /// Free the page of physical memory pointed at by pa, which
    /// normally should have been returned by a call to kalloc(). The
    /// exception is when initializing the allocator; see kinit above.
    /// Always pushed onto the calling CPU's own list.
    pub fn kfree<T: Sized>(self: &mut Self, pa: *mut T) {
        unsafe {
            let pa_usize = pa as usize;
            if pa_usize % PGSIZE != 0
                || pa_usize < ((&end) as *const u8) as usize
                || pa_usize >= PHYSTOP
            {
                panic!("kfree");
            }
        }

        // Fill with junk to catch dangling refs.
        memset(pa as *mut u8, 1, PGSIZE);

        let r = pa as *mut Run;

        push_off();
        let id = cpuid();
        pop_off();

        let c = &mut self.cpus[id];
        c.lock.acquire();
        unsafe {
            (*r).next = c.freelist;
        }
        c.freelist = r;
        c.lock.release();
    }

    /// Allocate one 4096-byte page of physical memory. Returns a
    /// pointer the kernel can use, or null if none is available
    /// anywhere (own list empty and every other CPU's list empty too).
    pub fn kalloc<T: Sized>(self: &mut Self) -> *mut T {
        push_off();
        let id = cpuid();
        pop_off();

        let mut r = self.take_local(id);
        if r.is_null() {
            r = self.steal(id);
        }

        if !r.is_null() {
            memset(r as *mut u8, 5, PGSIZE); // fill with junk
        }
        r as *mut T
    }

    /// Same as kalloc, but for callers that want to propagate exhaustion
    /// through `?` instead of testing the returned pointer for null.
    pub fn try_kalloc<T: Sized>(self: &mut Self) -> KResult<*mut T> {
        let r: *mut T = self.kalloc();
        if r.is_null() {
            log::warn!("kalloc: out of physical memory");
            Err(KernelError::NoMemory)
        } else {
            Ok(r)
        }
    }

    fn take_local(&mut self, id: usize) -> *mut Run {
        let c = &mut self.cpus[id];
        c.lock.acquire();
        let r = c.freelist;
        if !r.is_null() {
            unsafe {
                c.freelist = (*r).next;
            }
        }
        c.lock.release();
        r
    }

    // Scan the other CPUs in order, taking the head of the first
    // non-empty list. Only one freelist lock is held at a time: the
    // caller's own lock was already released by take_local.
    fn steal(&mut self, id: usize) -> *mut Run {
        for offset in 1..NCPU {
            let victim = (id + offset) % NCPU;
            let c = &mut self.cpus[victim];
            c.lock.acquire();
            let r = c.freelist;
            if !r.is_null() {
                unsafe {
                    c.freelist = (*r).next;
                }
            }
            c.lock.release();
            if !r.is_null() {
                return r;
            }
        }
        ptr::null_mut()
    }
}
