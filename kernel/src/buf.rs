use crate::fs::BSIZE;
use crate::sleeplock::Sleeplock;
use core::ptr::NonNull;

#[derive(Copy, Clone)]
pub struct Buf {
    pub(crate) valid: bool, // has data been read from disk?
    pub(crate) disk: bool,  // does disk "own" buf?
    pub(crate) dev: u32,
    pub(crate) blockno: u32,
    pub(crate) lock: Sleeplock,
    pub(crate) refcnt: u32,
    pub(crate) last_used: u64, // ticks at last release, for LRU eviction
    pub(crate) bucket_next: Option<NonNull<Buf>>, // next buf in this hash bucket's chain
    pub(crate) data: [u8; BSIZE],
}

impl Buf {
    pub const fn new() -> Self {
        Buf {
            valid: false,
            disk: false,
            dev: 0,
            blockno: 0,
            lock: Sleeplock::init_lock("buffer"),
            refcnt: 0,
            last_used: 0,
            bucket_next: None,
            data: [0; BSIZE],
        }
    }
}
