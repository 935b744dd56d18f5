// Buffer cache.
//
// The buffer cache is sharded across NBUCKET hash buckets, each guarded by
// its own spinlock and holding a singly-linked chain of buffers. Caching
// disk blocks in memory reduces the number of disk reads and also provides
// a synchronization point for disk blocks used by multiple processes.
//
// A global eviction_lock serializes the rare cross-bucket LRU scan that
// runs on a cache miss, so normal hits under a single bucket lock never
// contend with each other.
//
// Interface:
// * To get a buffer for a particular disk block, call bread.
// * After changing buffer data, call bwrite to write it to disk.
// * When done with the buffer, call brelse.
// * Do not use the buffer after calling brelse.
// * Only one process at a time can use a buffer, so do not keep them
//   longer than necessary.

use core::ptr::NonNull;

use crate::buf::Buf;
use crate::param::{NBUCKET, NBUF};
use crate::spinlock::Spinlock;
use crate::trap::ticks;
use crate::virtio::virtio_disk::virtio_disk_rw;

#[derive(Copy, Clone)]
struct Bucket {
    lock: Spinlock,
    head: Option<NonNull<Buf>>,
}

impl Bucket {
    const fn empty() -> Self {
        Bucket { lock: Spinlock::init_lock("bcache_bucket"), head: None }
    }
}

struct BCache {
    buf: [Buf; NBUF],
    eviction_lock: Spinlock,
    buckets: [Bucket; NBUCKET],
}

unsafe impl Sync for BCache {}

static mut BCACHE: BCache = BCache {
    buf: [Buf::new(); NBUF],
    eviction_lock: Spinlock::init_lock("bcache_eviction"),
    buckets: [Bucket::empty(); NBUCKET],
};

fn hash(dev: u32, blockno: u32) -> usize {
    ((dev as usize).wrapping_mul(31).wrapping_add(blockno as usize)) % NBUCKET
}

pub fn binit() {
    unsafe {
        // Distribute the static buffer array across the buckets up front so
        // every buffer starts out reachable from some chain; bget's miss
        // path re-links buffers between buckets as blocks are evicted.
        for (i, b) in BCACHE.buf.iter_mut().enumerate() {
            let bucket = i % NBUCKET;
            b.bucket_next = BCACHE.buckets[bucket].head;
            BCACHE.buckets[bucket].head = NonNull::new(b as *mut Buf);
        }
    }
}

// Unlink buf `target` from bucket `bucket`'s chain. Caller must hold
// BCACHE.buckets[bucket].lock.
unsafe fn unlink_from_bucket(bucket: usize, target: *mut Buf) {
    let head = BCACHE.buckets[bucket].head;
    match head {
        Some(h) if h.as_ptr() == target => {
            BCACHE.buckets[bucket].head = (*target).bucket_next;
        }
        _ => {
            let mut cur = head;
            while let Some(mut c) = cur {
                let c_ref = c.as_mut();
                if let Some(n) = c_ref.bucket_next {
                    if n.as_ptr() == target {
                        c_ref.bucket_next = (*target).bucket_next;
                        return;
                    }
                }
                cur = c_ref.bucket_next;
            }
        }
    }
}

// Look through buffer cache for block on device dev.
// If not found, allocate a buffer.
// In either case, return locked buffer.
fn bget(dev: u32, blockno: u32) -> &'static mut Buf {
    let bucket = hash(dev, blockno);

    unsafe {
        // Hit path.
        BCACHE.buckets[bucket].lock.acquire();
        let mut cur = BCACHE.buckets[bucket].head;
        while let Some(mut c) = cur {
            let b = c.as_mut();
            if b.dev == dev && b.blockno == blockno {
                b.refcnt += 1;
                BCACHE.buckets[bucket].lock.release();
                b.lock.acquire_sleep();
                return b;
            }
            cur = b.bucket_next;
        }
        BCACHE.buckets[bucket].lock.release();

        // Miss path: serialize evictions globally, then rescan in case
        // another CPU installed this block while we didn't hold any lock.
        BCACHE.eviction_lock.acquire();

        BCACHE.buckets[bucket].lock.acquire();
        let mut cur = BCACHE.buckets[bucket].head;
        while let Some(mut c) = cur {
            let b = c.as_mut();
            if b.dev == dev && b.blockno == blockno {
                b.refcnt += 1;
                BCACHE.buckets[bucket].lock.release();
                BCACHE.eviction_lock.release();
                b.lock.acquire_sleep();
                return b;
            }
            cur = b.bucket_next;
        }
        BCACHE.buckets[bucket].lock.release();

        // Scan every bucket for the globally least-recently-used buffer
        // with refcnt==0. Only the owning bucket's lock is held once the
        // scan finishes; every bucket that loses the comparison is
        // released immediately.
        let mut victim: Option<NonNull<Buf>> = None;
        let mut victim_bucket: Option<usize> = None;
        let mut victim_last_used: u64 = u64::MAX;

        for i in 0..NBUCKET {
            BCACHE.buckets[i].lock.acquire();

            let mut best_here: Option<(NonNull<Buf>, u64)> = None;
            let mut cur = BCACHE.buckets[i].head;
            while let Some(c) = cur {
                let b = c.as_ref();
                if b.refcnt == 0 && best_here.map_or(true, |(_, lu)| b.last_used < lu) {
                    best_here = Some((c, b.last_used));
                }
                cur = b.bucket_next;
            }

            match best_here {
                Some((cand, last_used)) if last_used < victim_last_used => {
                    if let Some(vb) = victim_bucket {
                        BCACHE.buckets[vb].lock.release();
                    }
                    victim = Some(cand);
                    victim_last_used = last_used;
                    victim_bucket = Some(i);
                }
                _ => {
                    BCACHE.buckets[i].lock.release();
                }
            }
        }

        let victim = victim.expect("bget: no buffers");
        let victim_bucket = victim_bucket.unwrap();
        let vptr = victim.as_ptr();

        if victim_bucket != bucket {
            unlink_from_bucket(victim_bucket, vptr);
            BCACHE.buckets[victim_bucket].lock.release();

            BCACHE.buckets[bucket].lock.acquire();
            (*vptr).bucket_next = BCACHE.buckets[bucket].head;
            BCACHE.buckets[bucket].head = Some(victim);
        }

        let b = victim.as_ptr().as_mut().unwrap();
        b.dev = dev;
        b.blockno = blockno;
        b.valid = false;
        b.refcnt = 1;
        BCACHE.buckets[bucket].lock.release();
        BCACHE.eviction_lock.release();

        b.lock.acquire_sleep();
        b
    }
}

// Return a locked buf with the contents of the indicated block.
pub fn bread(dev: u32, blockno: u32) -> &'static mut Buf {
    let b = bget(dev, blockno);
    if !b.valid {
        unsafe { virtio_disk_rw(b, false) };
        b.valid = true
    }

    b
}

// Write b's contents to disk.  Must be locked.
pub fn bwrite(b: &mut Buf) {
    if !b.lock.holding_sleep() {
        panic!("bwrite");
    }
    unsafe {
        virtio_disk_rw(b, true);
    }
}

// Release a locked buffer.
pub fn brelse(b: &mut Buf) {
    if !b.lock.holding_sleep() {
        panic!("brelse");
    }

    b.lock.release_sleep();

    let bucket = hash(b.dev, b.blockno);
    unsafe {
        BCACHE.buckets[bucket].lock.acquire();
        b.refcnt -= 1;
        if b.refcnt == 0 {
            b.last_used = ticks();
        }
        BCACHE.buckets[bucket].lock.release();
    }
}

pub fn bpin(b: &mut Buf) {
    let bucket = hash(b.dev, b.blockno);
    unsafe {
        BCACHE.buckets[bucket].lock.acquire();
        b.refcnt += 1;
        BCACHE.buckets[bucket].lock.release();
    }
}

pub fn bunpin(b: *mut Buf) {
    unsafe {
        let b = b.as_mut().unwrap();
        let bucket = hash(b.dev, b.blockno);
        BCACHE.buckets[bucket].lock.acquire();
        b.refcnt -= 1;
        BCACHE.buckets[bucket].lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::hash;
    use crate::param::NBUCKET;

    #[test]
    fn hash_is_in_range() {
        for dev in 0..4 {
            for blockno in 0..500 {
                assert!(hash(dev, blockno) < NBUCKET);
            }
        }
    }

    #[test]
    fn hash_spreads_sequential_blocks() {
        let mut seen = [false; NBUCKET];
        for blockno in 0..NBUCKET as u32 {
            seen[hash(1, blockno)] = true;
        }
        assert!(seen.iter().all(|&b| b));
    }
}
