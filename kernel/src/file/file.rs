use crate::file::FDType::{FD_DEVICE, FD_INODE, FD_NONE, FD_PIPE};
use crate::file::{Devsw, File, DEVSW};
use crate::fs::BSIZE;
use crate::log::{begin_op, end_op};
use crate::param::{MAXOPBLOCKS, NDEV, NFILE};
use crate::pipe::{piperead, pipewrite};
use crate::spinlock::Spinlock;

struct FTable {
    lock: Spinlock,
    file: [File; NFILE]
}

static mut FTABLE: FTable = FTable {
    lock: Spinlock::init_lock("ftable"),
    file: [File::create(); NFILE],
};

pub fn fileinit() {
    // empty due to FTABLE has already been initialized
}

// Allocate a file structure.
pub fn filealloc() -> Option<&'static mut File> {
    unsafe {
        FTABLE.lock.acquire();
        for f in &mut FTABLE.file {
            if f.ref_cnt == 0 {
                f.ref_cnt = 1;
                FTABLE.lock.release();
                return Some(f);
            }
        }

        FTABLE.lock.release();
        return None;
    }
}

// Increment ref count for file f.
pub(crate) fn filedup(f: *mut File) {
    unsafe {
        FTABLE.lock.acquire();
        let f = f.as_mut().unwrap();
        if f.ref_cnt < 1 {
            panic!("filedup")
        }

        f.ref_cnt += 1;
        FTABLE.lock.release();
    }
}

// Close file f.  (Decrement ref count, close when reaches 0.)
pub(crate) fn fileclose(f: &mut File) {
    unsafe {
        FTABLE.lock.acquire();
        if f.ref_cnt < 1 {
            panic!("fileclose");
        }

        f.ref_cnt -= 1;
        if f.ref_cnt > 0 {
            FTABLE.lock.release();
            return;
        }

        let file_type = f.file_type;
        let pipe = f.pipe;
        let writable = f.writable;
        let ip = f.ip;

        f.ref_cnt = 0;
        f.file_type = FD_NONE;
        FTABLE.lock.release();

        if file_type == FD_PIPE {
            pipe.unwrap().as_mut().unwrap().close(writable);
        } else if file_type == FD_INODE || file_type == FD_DEVICE {
            begin_op();
            ip.unwrap().as_mut().unwrap().iput();
            end_op();
        }
    }
}

// Read from file f.
pub(crate) fn fileread(f: &mut File, addr: usize, n: usize) -> i32 {
    if !f.readable {
        return -1;
    }

    match f.file_type {
        FD_PIPE => unsafe { piperead(f.pipe.unwrap().as_mut().unwrap(), true, addr, n) },
        FD_DEVICE => {
            if f.major < 0 || f.major as usize >= NDEV {
                return -1;
            }
            unsafe {
                match DEVSW[f.major as usize] {
                    Some(dev) => (*dev).read(true, addr, n),
                    None => -1,
                }
            }
        }
        FD_INODE => unsafe {
            let ip = f.ip.unwrap().as_mut().unwrap();
            ip.ilock();
            let r = ip.readi(true, addr as *mut u8, f.off, n);
            f.off += r as u32;
            ip.iunlock();
            r as i32
        },
        _ => panic!("fileread: unknown file type"),
    }
}

// Write to file f.
pub(crate) fn filewrite(f: &mut File, addr: usize, n: usize) -> i32 {
    if !f.writable {
        return -1;
    }

    match f.file_type {
        FD_PIPE => unsafe { pipewrite(f.pipe.unwrap().as_mut().unwrap(), true, addr, n) },
        FD_DEVICE => {
            if f.major < 0 || f.major as usize >= NDEV {
                return -1;
            }
            unsafe {
                match DEVSW[f.major as usize] {
                    Some(dev) => (*dev).write(true, addr, n),
                    None => -1,
                }
            }
        }
        FD_INODE => {
            // write a few blocks at a time to avoid exceeding the
            // maximum log transaction size, including i-node, indirect
            // block, allocation blocks, and 2 blocks of slop for non-aligned writes.
            let max = ((MAXOPBLOCKS - 1 - 1 - 2) / 2) * BSIZE;
            let mut i = 0;
            let mut ret = 0;
            while i < n {
                let n1 = core::cmp::min(n - i, max);

                begin_op();
                let ip = unsafe { f.ip.unwrap().as_mut().unwrap() };
                ip.ilock();
                let r = ip.writei(true, (addr + i) as *mut u8, f.off, n1);
                if r > 0 {
                    f.off += r as u32;
                }
                ip.iunlock();
                end_op();

                if r < 0 {
                    break;
                }
                if r as usize != n1 {
                    panic!("short filewrite");
                }
                i += r as usize;
                ret = i;
            }
            if i == n {
                ret as i32
            } else {
                -1
            }
        }
        _ => panic!("filewrite: unknown file type"),
    }
}
