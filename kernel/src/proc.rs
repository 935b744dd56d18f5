use core::mem;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::file::file::filedup;
use crate::file::{File, INode};
use crate::fs::fs::{fsinit, namei};
use crate::kalloc::KMEM;
use crate::memlayout::{TRAMPOLINE, TRAPFRAME};
use crate::param::{NCPU, NOFILE, NPROC, ROOTDEV};
use crate::proc::Procstate::{RUNNABLE, RUNNING, SLEEPING, UNUSED, USED, ZOMBIE};
use crate::riscv::{r_tp, PageTable, PGSIZE, PTE_R, PTE_W, PTE_X};
use crate::spinlock::{pop_off, push_off, Spinlock};
use crate::string::safestrcpy;
use crate::trap::usertrapret;
use crate::vm::{
    copyin, copyout, kvmmap, mappages, uvmalloc, uvmcopy, uvmcreate, uvmdealloc, uvmfirst,
    uvmfree, uvmunmap,
};
use crate::KSTACK;

extern "C" {
    fn swtch(old: *mut Context, new: *mut Context);
    static trampoline: u8;
}

// Saved registers for kernel context switches.
#[derive(Copy, Clone)]
pub struct Context {
    ra: u64,
    sp: u64,

    // callee-saved
    s0: u64,
    s1: u64,
    s2: u64,
    s3: u64,
    s4: u64,
    s5: u64,
    s6: u64,
    s7: u64,
    s8: u64,
    s9: u64,
    s10: u64,
    s11: u64,
}

impl Context {
    const fn zeroed() -> Self {
        Context {
            ra: 0,
            sp: 0,
            s0: 0,
            s1: 0,
            s2: 0,
            s3: 0,
            s4: 0,
            s5: 0,
            s6: 0,
            s7: 0,
            s8: 0,
            s9: 0,
            s10: 0,
            s11: 0,
        }
    }
}

// Per-CPU state.
#[derive(Copy, Clone)]
pub struct Cpu {
    proc: Option<*mut Proc>, // The process running on this cpu, or None.
    context: Context,        // swtch() here to enter scheduler().
    pub noff: u8,            // Depth of push_off() nesting.
    pub intena: bool,        // Were interrupts enabled before push_off()?
}

impl Cpu {
    const fn default() -> Self {
        Cpu {
            proc: None,
            context: Context::zeroed(),
            noff: 0,
            intena: false,
        }
    }
}

static mut CPUS: [Cpu; NCPU] = [Cpu::default(); NCPU];
static mut PROCS: [Proc; NPROC] = [Proc::default(); NPROC];

static mut INIT_PROC: Option<*mut Proc> = None;

// per-process data for the trap handling code in trampoline.S.
// sits in a page by itself just under the trampoline page in the
// user page table. not specially mapped in the kernel page table.
// uservec in trampoline.S saves user registers in the trapframe,
// then initializes registers from the trapframe's
// kernel_sp, kernel_hartid, kernel_satp, and jumps to kernel_trap.
// usertrapret() and userret in trampoline.S set up
// the trapframe's kernel_*, restore user registers from the
// trapframe, switch to the user page table, and enter user space.
// the trapframe includes callee-saved user registers like s0-s11 because the
// return-to-user path via usertrapret() doesn't return through
// the entire kernel call stack.
#[repr(C)]
pub struct Trapframe {
    /*   0 */ pub kernel_satp: u64, // kernel page table
    /*   8 */ pub kernel_sp: u64,   // top of process's kernel stack
    /*  16 */ pub kernel_trap: u64, // usertrap()
    /*  24 */ pub epc: u64,         // saved user program counter
    /*  32 */ pub kernel_hartid: u64, // saved kernel tp
    /*  40 */ pub ra: u64,
    /*  48 */ pub sp: u64,
    /*  56 */ pub gp: u64,
    /*  64 */ pub tp: u64,
    /*  72 */ pub t0: u64,
    /*  80 */ pub t1: u64,
    /*  88 */ pub t2: u64,
    /*  96 */ pub s0: u64,
    /* 104 */ pub s1: u64,
    /* 112 */ pub a0: u64,
    /* 120 */ pub a1: u64,
    /* 128 */ pub a2: u64,
    /* 136 */ pub a3: u64,
    /* 144 */ pub a4: u64,
    /* 152 */ pub a5: u64,
    /* 160 */ pub a6: u64,
    /* 168 */ pub a7: u64,
    /* 176 */ pub s2: u64,
    /* 184 */ pub s3: u64,
    /* 192 */ pub s4: u64,
    /* 200 */ pub s5: u64,
    /* 208 */ pub s6: u64,
    /* 216 */ pub s7: u64,
    /* 224 */ pub s8: u64,
    /* 232 */ pub s9: u64,
    /* 240 */ pub s10: u64,
    /* 248 */ pub s11: u64,
    /* 256 */ pub t3: u64,
    /* 264 */ pub t4: u64,
    /* 272 */ pub t5: u64,
    /* 280 */ pub t6: u64,
}

impl Trapframe {
    const fn zeroed() -> Self {
        unsafe { mem::zeroed() }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Procstate {
    UNUSED,
    USED,
    SLEEPING,
    RUNNABLE,
    RUNNING,
    ZOMBIE,
}

// Per-process state
#[derive(Copy, Clone)]
pub struct Proc {
    lock: Spinlock,

    // p.lock must be held when using these:
    state: Procstate,      // Process state
    chan: usize,           // If non-zero, sleeping on this channel
    killed: bool,          // If true, has been killed
    xstate: i32,           // Exit status to be returned to parent's wait
    pid: u32,              // Process ID

    // wait_lock must be held when using this:
    parent: Option<*mut Proc>, // Parent process

    // these are private to the process, so p.lock need not be held.
    pub(crate) kstack: usize,                 // Virtual address of kernel stack
    pub sz: usize,                            // Size of process memory (bytes)
    pub pagetable: Option<*mut PageTable>,     // User page table
    pub trapframe: Option<*mut Trapframe>,     // data page for trampoline.S
    context: Context,                         // swtch() here to run process
    pub ofile: [Option<*mut File>; NOFILE],    // Open files
    pub cwd: Option<*mut INode>,               // Current directory
    pub name: [u8; 16],                        // Process name (debugging)
}

unsafe impl Sync for Proc {}

impl Proc {
    const fn default() -> Self {
        Proc {
            lock: Spinlock::init_lock("proc"),
            state: UNUSED,
            chan: 0,
            killed: false,
            xstate: 0,
            pid: 0,
            parent: None,
            kstack: 0,
            sz: 0,
            pagetable: None,
            trapframe: None,
            context: Context::zeroed(),
            ofile: [None; NOFILE],
            cwd: None,
            name: [0; 16],
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn killed(&mut self) -> i32 {
        self.lock.acquire();
        let k = self.killed;
        self.lock.release();
        if k {
            1
        } else {
            0
        }
    }

    pub fn setkilled(&mut self) {
        self.lock.acquire();
        self.killed = true;
        self.lock.release();
    }
}

static NEXT_PID: AtomicU32 = AtomicU32::new(1);
// helps ensure that wakeups of wait()ing
// parents are not lost. helps obey the
// memory model when using p.parent.
// must be acquired before any p.lock.
static mut WAIT_LOCK: Spinlock = Spinlock::init_lock("wait_lock");

// Must be called with interrupts disabled,
// to prevent race with process being moved
// to a different CPU.
pub fn cpuid() -> usize {
    r_tp() as usize
}

// Return this CPU's cpu struct.
// Interrupts must be disabled.
pub fn mycpu() -> &'static mut Cpu {
    unsafe { &mut CPUS[cpuid()] }
}

// Whether this CPU currently has a process running on it. kerneltrap()
// must not yield on a timer tick taken while idling in the scheduler.
pub fn has_current_proc() -> bool {
    current_proc().is_some()
}

// Return the current struct proc, or panic if none.
pub fn myproc() -> &'static mut Proc {
    unsafe { current_proc().expect("myproc: no current process").as_mut().unwrap() }
}

// Return a pointer to the current struct proc, or None if this CPU is
// idling in the scheduler. Unlike myproc(), safe to call from interrupt
// paths that may run with no current process (e.g. wakeup() from a timer
// or disk-completion interrupt taken while a CPU is idle).
fn current_proc() -> Option<*mut Proc> {
    push_off();
    let c = mycpu();
    let p = c.proc;
    pop_off();
    p
}

fn allocpid() -> u32 {
    NEXT_PID.fetch_add(1, Ordering::Relaxed)
}

// Allocate a page for each process's kernel stack.
// Map it high in memory, followed by an invalid
// guard page.
pub fn proc_mapstacks(kpgtbl: &mut PageTable) {
    for idx in 0..NPROC {
        unsafe {
            let pa: *mut u8 = KMEM.kalloc();
            if pa.is_null() {
                panic!("kalloc");
            }
            let va = KSTACK!(idx);
            kvmmap(kpgtbl, va, pa.expose_provenance(), PGSIZE, PTE_R | PTE_W);
            PROCS[idx].kstack = va;
        }
    }
}

// initialize the proc table.
pub fn procinit() {
    // empty: PID counter, WAIT_LOCK and PROCS are statically initialized
}

// a user program that calls exec("/init")
// assembled from ../user/initcode.S
// od -t xC ../user/initcode
const INITCODE: [u8; 52] = [
    0x17, 0x05, 0x00, 0x00, 0x13, 0x05, 0x45, 0x02, 0x97, 0x05, 0x00, 0x00, 0x93, 0x85, 0x35,
    0x02, 0x93, 0x08, 0x70, 0x00, 0x73, 0x00, 0x00, 0x00, 0x93, 0x08, 0x20, 0x00, 0x73, 0x00,
    0x00, 0x00, 0xef, 0xf0, 0x9f, 0xff, 0x2f, 0x69, 0x6e, 0x69, 0x74, 0x00, 0x00, 0x24, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

// Set up first user process.
pub fn userinit() {
    let p = allocproc().expect("userinit: allocproc failed");
    unsafe {
        INIT_PROC = Some(p as *mut Proc);
    }

    // allocate one user page and copy initcode's instructions
    // and data into it.
    let pagetable = unsafe { p.pagetable.unwrap().as_mut().unwrap() };
    uvmfirst(pagetable, INITCODE.as_ptr(), INITCODE.len());
    p.sz = PGSIZE;

    // prepare for the very first "return" from kernel to user.
    let tf = unsafe { p.trapframe.unwrap().as_mut().unwrap() };
    tf.epc = 0; // user program counter
    tf.sp = PGSIZE as u64; // user stack pointer

    let name_len = p.name.len();
    safestrcpy(&mut p.name, b"initcode", name_len);
    p.cwd = namei(b"/\0").map(|ip| ip as *mut INode);

    p.state = RUNNABLE;

    p.lock.release();
}

static mut FIRST: bool = true;

// A fork child's very first scheduling by scheduler()
// will swtch to forkret.
fn forkret() {
    // Still holding p.lock from scheduler.
    myproc().lock.release();

    unsafe {
        if FIRST {
            // File system initialization must be run in the context of a
            // regular process (e.g., because it calls sleep), and thus cannot
            // be run from main().
            FIRST = false;
            fsinit(ROOTDEV);
        }
    }

    usertrapret();
}

// Look in the process table for an UNUSED proc.
// If found, initialize state required to run in the kernel,
// and return with p.lock held.
// If there are no free procs, or a memory allocation fails, return None.
fn allocproc() -> Option<&'static mut Proc> {
    let mut found: Option<&'static mut Proc> = None;
    for i in 0..NPROC {
        let p = unsafe { &mut PROCS[i] };
        p.lock.acquire();

        if p.state == UNUSED {
            found = Some(p);
            break;
        }

        p.lock.release();
    }

    let p = found?;
    p.pid = allocpid();
    p.state = USED;

    // Allocate a trapframe page.
    let trapframe_ptr: *mut Trapframe = unsafe { KMEM.kalloc() };
    if trapframe_ptr.is_null() {
        freeproc(p);
        p.lock.release();
        return None;
    }
    p.trapframe = Some(trapframe_ptr);

    // An empty user page table.
    p.pagetable = proc_pagetable(p);
    if p.pagetable.is_none() {
        freeproc(p);
        p.lock.release();
        return None;
    }

    // Set up new context to start executing at forkret,
    // which returns to user space.
    p.context = Context::zeroed();
    p.context.ra = forkret as usize as u64;
    p.context.sp = (p.kstack + PGSIZE) as u64;

    Some(p)
}

// free a proc structure and the data hanging from it,
// including user pages.
// p.lock must be held.
fn freeproc(p: &mut Proc) {
    if let Some(tf) = p.trapframe {
        unsafe { KMEM.kfree(tf) };
    }
    p.trapframe = None;

    if let Some(pt) = p.pagetable {
        let pt = unsafe { pt.as_mut().unwrap() };
        proc_freepagetable(pt, p.sz);
    }
    p.pagetable = None;

    p.sz = 0;
    p.pid = 0;
    p.parent = None;
    p.name = [0; 16];
    p.chan = 0;
    p.killed = false;
    p.xstate = 0;
    p.state = UNUSED;
}

// Create a user page table for a given process, with no user memory,
// but with trampoline and trapframe pages.
pub(crate) fn proc_pagetable(p: &Proc) -> Option<*mut PageTable> {
    // An empty page table.
    let pagetable = uvmcreate()?;

    // map the trampoline code (for system call return)
    // at the highest user virtual address.
    // only the supervisor uses it, on the way
    // to/from user space, so not PTE_U.
    let trampoline_addr = (unsafe { &trampoline } as *const u8).expose_provenance();
    if mappages(pagetable, TRAMPOLINE, trampoline_addr, PGSIZE, PTE_R | PTE_X) != 0 {
        uvmfree(pagetable, 0);
        return None;
    }

    // map the trapframe page just below the trampoline page, for
    // trampoline.S.
    let trapframe_addr = (p.trapframe.unwrap() as *const Trapframe).expose_provenance();
    if mappages(pagetable, TRAPFRAME, trapframe_addr, PGSIZE, PTE_R | PTE_W) != 0 {
        uvmunmap(pagetable, TRAMPOLINE, 1, false);
        uvmfree(pagetable, 0);
        return None;
    }

    Some(pagetable as *mut PageTable)
}

// Free a process's page table, and free the
// physical memory it refers to.
pub fn proc_freepagetable(pagetable: &mut PageTable, sz: usize) {
    uvmunmap(pagetable, TRAMPOLINE, 1, false);
    uvmunmap(pagetable, TRAPFRAME, 1, false);
    uvmfree(pagetable, sz);
}

// Grow or shrink user memory by n bytes.
// Returns 0 on success, -1 on failure.
pub fn growproc(n: i32) -> i32 {
    let p = myproc();
    let mut sz = p.sz;

    if n > 0 {
        let pagetable = unsafe { p.pagetable.unwrap().as_mut().unwrap() };
        let newsz = uvmalloc(pagetable, sz, sz + n as usize, PTE_W);
        if newsz == 0 {
            return -1;
        }
        sz = newsz;
    } else if n < 0 {
        let pagetable = unsafe { p.pagetable.unwrap().as_mut().unwrap() };
        sz = uvmdealloc(pagetable, sz, (sz as isize + n as isize) as usize);
    }
    p.sz = sz;
    0
}

// Create a new process, copying the parent.
// Sets up child kernel stack to return as if from fork() system call.
pub fn fork() -> Option<u32> {
    let p = myproc();

    // Allocate process.
    let np = allocproc()?;

    // Copy user memory from parent to child.
    let ppt = unsafe { p.pagetable.unwrap().as_mut().unwrap() };
    let npt = unsafe { np.pagetable.unwrap().as_mut().unwrap() };
    if !uvmcopy(ppt, npt, p.sz) {
        freeproc(np);
        np.lock.release();
        return None;
    }
    np.sz = p.sz;

    // copy saved user registers.
    unsafe {
        *np.trapframe.unwrap() = core::ptr::read(p.trapframe.unwrap());
    }

    // Cause fork to return 0 in the child.
    unsafe {
        np.trapframe.unwrap().as_mut().unwrap().a0 = 0;
    }

    // increment reference counts on open file descriptors.
    for i in 0..NOFILE {
        if let Some(f) = p.ofile[i] {
            filedup(f);
            np.ofile[i] = Some(f);
        }
    }
    np.cwd = p.cwd.map(|ip| unsafe { ip.as_mut().unwrap().idup() as *mut INode });

    np.name = p.name;

    let pid = np.pid;

    np.lock.release();

    unsafe {
        WAIT_LOCK.acquire();
        np.parent = Some(p as *mut Proc);
        WAIT_LOCK.release();
    }

    np.lock.acquire();
    np.state = RUNNABLE;
    np.lock.release();

    Some(pid)
}

// Pass p's abandoned children to init.
// Caller must hold wait_lock.
fn reparent(p: &mut Proc) {
    for i in 0..NPROC {
        let pp = unsafe { &mut PROCS[i] };
        if pp.parent == Some(p as *mut Proc) {
            pp.parent = unsafe { INIT_PROC };
            wakeup(unsafe { INIT_PROC.unwrap() as usize });
        }
    }
}

// Exit the current process. Does not return.
// An exited process remains in the zombie state
// until its parent calls wait().
pub fn exit(status: i32) -> ! {
    let p = myproc();

    if core::ptr::eq(p, unsafe { INIT_PROC.unwrap() }) {
        panic!("init exiting");
    }

    // Close all open files.
    for i in 0..NOFILE {
        if let Some(f) = p.ofile[i] {
            crate::file::file::fileclose(unsafe { f.as_mut().unwrap() });
            p.ofile[i] = None;
        }
    }

    crate::log::begin_op();
    if let Some(cwd) = p.cwd {
        unsafe { cwd.as_mut().unwrap().iput() };
    }
    crate::log::end_op();
    p.cwd = None;

    unsafe {
        WAIT_LOCK.acquire();

        // Give any children to init.
        reparent(p);

        // Parent might be sleeping in wait().
        wakeup(p.parent.unwrap() as usize);

        p.lock.acquire();

        p.xstate = status;
        p.state = ZOMBIE;

        WAIT_LOCK.release();
    }

    // Jump into the scheduler, never to return.
    sched();
    panic!("zombie exit");
}

// Wait for a child process to exit and return its pid.
// Return -1 if this process has no children.
pub fn wait(addr: usize) -> i32 {
    let p = myproc();

    unsafe { WAIT_LOCK.acquire() };

    loop {
        let mut havekids = false;
        for i in 0..NPROC {
            let pp = unsafe { &mut PROCS[i] };
            if pp.parent == Some(p as *mut Proc) {
                // make sure the child isn't still in exit() or swtch().
                pp.lock.acquire();

                havekids = true;
                if pp.state == ZOMBIE {
                    // Found one.
                    let pid = pp.pid;
                    if addr != 0
                        && !copyout(
                            unsafe { p.pagetable.unwrap().as_mut().unwrap() },
                            addr,
                            &pp.xstate as *const i32 as *const u8,
                            mem::size_of::<i32>(),
                        )
                    {
                        pp.lock.release();
                        unsafe { WAIT_LOCK.release() };
                        return -1;
                    }
                    freeproc(pp);
                    pp.lock.release();
                    unsafe { WAIT_LOCK.release() };
                    return pid as i32;
                }
                pp.lock.release();
            }
        }

        // No point waiting if we don't have any children.
        if !havekids || p.killed().is_positive() {
            unsafe { WAIT_LOCK.release() };
            return -1;
        }

        // Wait for a child to exit.
        sleep(p as *const Proc as usize, unsafe { &mut WAIT_LOCK });
    }
}

// Per-CPU process scheduler.
// Each CPU calls scheduler() after setting itself up.
// Scheduler never returns. It loops, doing:
//  - choose a process to run.
//  - swtch to start running that process.
//  - eventually that process transfers control
//    via swtch back to the scheduler.
pub fn scheduler() -> ! {
    let c = mycpu();
    c.proc = None;

    loop {
        // avoid deadlock by ensuring devices can interrupt.
        crate::riscv::intr_on();

        let mut found = false;
        for i in 0..NPROC {
            let p = unsafe { &mut PROCS[i] };
            p.lock.acquire();
            if p.state == RUNNABLE {
                // Switch to chosen process. It is the process's job
                // to release its lock and then reacquire it
                // before jumping back to us.
                p.state = RUNNING;
                c.proc = Some(p as *mut Proc);
                unsafe {
                    swtch(&mut c.context, &mut p.context);
                }

                // Process is done running for now.
                // It should have changed its p.state before coming back.
                c.proc = None;
                found = true;
            }
            p.lock.release();
        }

        if !found {
            // nothing to run; wait for a device interrupt.
            crate::riscv::__sync_synchronize();
        }
    }
}

// Switch to scheduler. Must hold only p.lock
// and have changed proc.state. Saves and restores
// intena because intena is a property of this
// kernel thread, not this CPU. It should
// be proc.intena and proc.noff, but that would
// break in the few places where a lock is held but
// there's no process.
fn sched() {
    let p = myproc();

    if !p.lock.holding() {
        panic!("sched p.lock");
    }
    let c = mycpu();
    if c.noff != 1 {
        panic!("sched locks");
    }
    if p.state == RUNNING {
        panic!("sched running");
    }
    if crate::riscv::intr_get() {
        panic!("sched interruptible");
    }

    let intena = c.intena;
    unsafe {
        swtch(&mut p.context, &mut c.context);
    }
    c.intena = intena;
}

// Give up the CPU for one scheduling round.
pub fn yield_proc() {
    let p = myproc();
    p.lock.acquire();
    p.state = RUNNABLE;
    sched();
    p.lock.release();
}

// Atomically release lock and sleep on chan.
// Reacquires lock when awakened.
pub fn sleep(chan: usize, lk: &mut Spinlock) {
    let p = myproc();

    // Must acquire p.lock in order to
    // change p.state and then call sched.
    // Once we hold p.lock, we can be
    // guaranteed that we won't miss any wakeup
    // (wakeup locks p.lock),
    // so it's okay to release lk.
    if !core::ptr::eq(&p.lock, lk) {
        p.lock.acquire();
        lk.release();
    }

    // Go to sleep.
    p.chan = chan;
    p.state = SLEEPING;

    sched();

    // Tidy up.
    p.chan = 0;

    // Reacquire original lock.
    if !core::ptr::eq(&p.lock, lk) {
        p.lock.release();
        lk.acquire();
    }
}

// Wake up all processes sleeping on chan.
// Must be called without any p.lock.
pub fn wakeup(chan: usize) {
    let running = current_proc();
    for i in 0..NPROC {
        let p = unsafe { &mut PROCS[i] };
        if running != Some(p as *mut Proc) {
            p.lock.acquire();
            if p.state == SLEEPING && p.chan == chan {
                p.state = RUNNABLE;
            }
            p.lock.release();
        }
    }
}

// Kill the process with the given pid.
// The victim won't exit until it tries to return
// to user space (see usertrap() in trap.rs).
pub fn kill(pid: u32) -> i32 {
    for i in 0..NPROC {
        let p = unsafe { &mut PROCS[i] };
        p.lock.acquire();
        if p.pid == pid {
            p.killed = true;
            if p.state == SLEEPING {
                // Wake process from sleep().
                p.state = RUNNABLE;
            }
            p.lock.release();
            return 0;
        }
        p.lock.release();
    }
    -1
}

// Copy to either a user address, or kernel address,
// depending on is_user_dst.
// Returns 0 on success, -1 on error.
pub fn either_copyout(is_user_dst: bool, dst: *mut u8, src: *const u8, len: usize) -> i32 {
    let p = myproc();
    if is_user_dst {
        let pagetable = unsafe { p.pagetable.unwrap().as_mut().unwrap() };
        if copyout(pagetable, dst.expose_provenance(), src, len) {
            0
        } else {
            -1
        }
    } else {
        unsafe { core::ptr::copy(src, dst, len) };
        0
    }
}

// Copy from either a user address, or kernel address,
// depending on is_user_src.
// Returns 0 on success, -1 on error.
pub fn either_copyin(dst: *mut u8, is_user_src: bool, src: *const u8, len: usize) -> i32 {
    let p = myproc();
    if is_user_src {
        let pagetable = unsafe { p.pagetable.unwrap().as_mut().unwrap() };
        if copyin(pagetable, dst, src.expose_provenance(), len) {
            0
        } else {
            -1
        }
    } else {
        unsafe { core::ptr::copy(src, dst, len) };
        0
    }
}

const STATE_NAMES: [&str; 6] = ["unused", "used", "sleep ", "runble", "run   ", "zombie"];

// Print a process listing to console. For debugging.
// Runs when user types ^P on console.
// No lock to avoid wedging a stuck machine further.
pub fn procdump() {
    crate::printf!("\n");
    for i in 0..NPROC {
        let p = unsafe { &PROCS[i] };
        if p.state == UNUSED {
            continue;
        }
        let name = core::str::from_utf8(&p.name)
            .unwrap_or("?")
            .trim_end_matches('\0');
        crate::printf!("{} {} {}\n", p.pid, STATE_NAMES[p.state as usize], name);
    }
}
