use crate::file::file::filealloc;
use crate::file::FDType::FD_PIPE;
use crate::file::File;
use crate::kalloc::KMEM;
use crate::proc::{either_copyin, either_copyout, myproc, sleep, wakeup};
use crate::spinlock::Spinlock;

const PIPESIZE: usize = 512;
pub struct Pipe {
    lock: Spinlock,
    data: [u8; PIPESIZE],
    nread: u32,     // number of bytes read
    nwrite: u32,    // number of bytes written
    readopen: bool, // read fd is still open
    writeopen: bool, // write fd is still open
}

impl Pipe {
    const fn create() -> Self {
        Pipe {
            lock: Spinlock::init_lock("pipe"),
            data: [0; PIPESIZE],
            nread: 0,
            nwrite: 0,
            readopen: true,
            writeopen: true,
        }
    }

    pub(crate) fn close(self: &mut Self, writable: bool) {
        self.lock.acquire();
        if writable {
            self.writeopen = false;
            wakeup(&self.nread as *const u32 as usize);
        } else {
            self.readopen = false;
            wakeup(&self.nwrite as *const u32 as usize);
        }
        if !self.readopen && !self.writeopen {
            self.lock.release();
            unsafe { KMEM.kfree(self as *mut Pipe); }
        } else {
            self.lock.release();
        }
    }

    fn write(self: &mut Self, is_user_src: bool, addr: usize, n: usize) -> i32 {
        let mut i = 0;
        self.lock.acquire();
        while i < n {
            if !self.readopen || myproc().killed() != 0 {
                self.lock.release();
                return -1;
            }
            if self.nwrite == self.nread + PIPESIZE as u32 {
                // buffer full, wake reader and wait for space
                wakeup(&self.nread as *const u32 as usize);
                sleep(&self.nwrite as *const u32 as usize, &mut self.lock);
            } else {
                let mut ch: u8 = 0;
                if either_copyin(&mut ch as *mut u8, is_user_src, (addr + i) as *const u8, 1) == -1 {
                    break;
                }
                let idx = (self.nwrite % PIPESIZE as u32) as usize;
                self.data[idx] = ch;
                self.nwrite += 1;
                i += 1;
            }
        }
        wakeup(&self.nread as *const u32 as usize);
        self.lock.release();
        i as i32
    }

    fn read(self: &mut Self, is_user_dst: bool, addr: usize, n: usize) -> i32 {
        self.lock.acquire();
        while self.nread == self.nwrite && self.writeopen {
            if myproc().killed() != 0 {
                self.lock.release();
                return -1;
            }
            sleep(&self.nread as *const u32 as usize, &mut self.lock);
        }

        let mut i = 0;
        while i < n {
            if self.nread == self.nwrite {
                break;
            }
            let idx = (self.nread % PIPESIZE as u32) as usize;
            let ch = self.data[idx];
            self.nread += 1;
            if either_copyout(is_user_dst, (addr + i) as *mut u8, &ch, 1) == -1 {
                break;
            }
            i += 1;
        }
        wakeup(&self.nwrite as *const u32 as usize);
        self.lock.release();
        i as i32
    }
}

// Allocate a pipe: a freshly-kalloc'd Pipe and a pair of files
// wired up as its read and write ends.
pub fn pipealloc() -> Option<(&'static mut File, &'static mut File)> {
    let f0 = filealloc()?;
    let f1 = filealloc()?;

    let pi: *mut Pipe = unsafe { KMEM.kalloc() };
    if pi.is_null() {
        return None;
    }
    unsafe { core::ptr::write(pi, Pipe::create()) };

    f0.readable = true;
    f0.writable = false;
    f0.file_type = FD_PIPE;
    f0.pipe = Some(pi);

    f1.readable = false;
    f1.writable = true;
    f1.file_type = FD_PIPE;
    f1.pipe = Some(pi);

    Some((f0, f1))
}

pub fn piperead(pi: &mut Pipe, is_user_dst: bool, addr: usize, n: usize) -> i32 {
    pi.read(is_user_dst, addr, n)
}

pub fn pipewrite(pi: &mut Pipe, is_user_src: bool, addr: usize, n: usize) -> i32 {
    pi.write(is_user_src, addr, n)
}