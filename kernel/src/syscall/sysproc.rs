use crate::proc;
use crate::syscall::syscall::{argaddr, argint};

pub(crate) fn sys_fork() -> u64 {
    match proc::fork() {
        Some(pid) => pid as u64,
        None => u64::MAX,
    }
}

pub(crate) fn sys_exit() -> u64 {
    let n = argint(0);
    proc::exit(n);
}

pub(crate) fn sys_wait() -> u64 {
    let addr = argaddr(0);
    proc::wait(addr) as u64
}
