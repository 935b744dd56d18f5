use crate::memlayout::TRAMPOLINE;
use crate::plic::{plic_claim, plic_complete};
use crate::memlayout::{UART0_IRQ, VIRTIO0_IRQ};
use crate::proc::{cpuid, has_current_proc, myproc, wakeup, yield_proc};
use crate::riscv::{
    intr_get, intr_off, r_satp, r_scause, r_sepc, r_sip, r_sstatus, r_stval, r_tp, w_sepc,
    w_sip, w_sstatus, w_stvec, PageTable, PGSIZE, SSTATUS_SPIE, SSTATUS_SPP,
};
use crate::spinlock::Spinlock;
use crate::uart::UART_INSTANCE;
use crate::virtio::virtio_disk::virtio_disk_intr;
use crate::MAKE_SATP;

static mut TICKS_LOCK: Spinlock = Spinlock::init_lock("time");
static mut TICKS: u64 = 0;

pub fn ticks() -> u64 {
    unsafe {
        TICKS_LOCK.acquire();
        let t = TICKS;
        TICKS_LOCK.release();
        t
    }
}

// in kernelvec.S, calls kerneltrap().
extern "C" {
    static kernelvec: u8;
    static trampoline: u8;
    static uservec: u8;
    static userret: u8;
}

pub fn trapinit() {
    // TICKS_LOCK / TICKS are statically initialized.
}

// set up to take exceptions and traps while in the kernel.
pub fn trapinithart() {
    w_stvec((unsafe { &kernelvec } as *const u8).expose_provenance());
}

// Supervisor Trap Cause values we care about.
const SCAUSE_INTR_BIT: u64 = 1 << 63;
const SCAUSE_SYSCALL: u64 = 8;

//
// handle an interrupt, exception, or system call from user space.
// called from trampoline.S
//
fn usertrap() {
    if (r_sstatus() & SSTATUS_SPP as u64) != 0 {
        panic!("usertrap: not from user mode");
    }

    // send interrupts and exceptions to kerneltrap(),
    // since we're now in the kernel.
    w_stvec((unsafe { &kernelvec } as *const u8).expose_provenance());

    let p = myproc();

    // save user program counter.
    let tf = unsafe { p.trapframe.unwrap().as_mut().unwrap() };
    tf.epc = r_sepc() as u64;

    let scause = r_scause();

    if scause == SCAUSE_SYSCALL {
        if p.killed() != 0 {
            crate::proc::exit(-1);
        }

        // sepc points to the ecall instruction,
        // but we want to return to the next instruction.
        tf.epc += 4;

        // an interrupt will change sepc, scause, and sstatus,
        // so enable only now that we're done with those registers.
        crate::riscv::intr_on();

        crate::syscall::syscall::syscall();
    } else {
        let which_dev = devintr(scause);
        if which_dev == 0 {
            crate::printf!(
                "usertrap(): unexpected scause {:x} pid={}\n",
                scause,
                p.pid()
            );
            crate::printf!("            sepc={:x} stval={:x}\n", r_sepc(), r_stval());
            p.setkilled();
        }

        if which_dev == 2 {
            yield_proc();
        }
    }

    if p.killed() != 0 {
        crate::proc::exit(-1);
    }

    usertrapret();
}

//
// return to user space
//
pub fn usertrapret() {
    let p = myproc();

    // we're about to switch the destination of traps from
    // kerneltrap() to usertrap(), so turn off interrupts until
    // we're back in user space, where usertrap() is correct.
    intr_off();

    // send syscalls, interrupts, and exceptions to uservec in trampoline.S
    let uservec_addr = (unsafe { &uservec } as *const u8).expose_provenance();
    let trampoline_addr = (unsafe { &trampoline } as *const u8).expose_provenance();
    let trampoline_uservec = TRAMPOLINE + uservec_addr - trampoline_addr;
    w_stvec(trampoline_uservec);

    // set up trapframe values that uservec will need when
    // the process next traps into the kernel.

    let trapframe_ptr = p.trapframe.unwrap();
    let trapframe = unsafe { trapframe_ptr.as_mut().unwrap() };
    trapframe.kernel_satp = r_satp() as u64; // kernel page table
    trapframe.kernel_sp = (p.kstack + PGSIZE) as u64; // process's kernel stack
    trapframe.kernel_trap = usertrap as usize as u64;
    trapframe.kernel_hartid = r_tp(); // hartid for cpuid()

    // set up the registers that trampoline.S's sret will use
    // to get to user space.

    // set S Previous Privilege mode to User.
    let mut x = r_sstatus();
    x &= !SSTATUS_SPP; // clear SPP to 0 for user mode
    x |= SSTATUS_SPIE; // enable interrupts in user mode
    w_sstatus(x);

    // set S Exception Program Counter to the saved user pc.
    w_sepc(trapframe.epc as usize);

    // tell trampoline.S the user page table to switch to.
    let satp = MAKE_SATP!((p.pagetable.unwrap() as *const PageTable).expose_provenance());

    // tell uservec where to find the trapframe on the next trap, via
    // sscratch, then jump to userret in trampoline.S at the top of
    // memory, which switches to the user page table, restores user
    // registers, and switches to user mode with sret.
    crate::riscv::w_sscratch(trapframe_ptr.expose_provenance());

    let userret_addr = (unsafe { &userret } as *const u8).expose_provenance();
    let trampoline_userret = TRAMPOLINE + userret_addr - trampoline_addr;

    unsafe {
        let func: extern "C" fn(usize) = core::mem::transmute(trampoline_userret);
        func(satp);
    };
}

// interrupts and exceptions from kernel code go here via kernelvec,
// on whatever the current kernel stack is.
#[no_mangle]
pub extern "C" fn kerneltrap() {
    let sepc = r_sepc();
    let sstatus = r_sstatus();
    let scause = r_scause();

    if (sstatus & SSTATUS_SPP as u64) == 0 {
        panic!("kerneltrap: not from supervisor mode");
    }
    if intr_get() {
        panic!("kerneltrap: interrupts enabled");
    }

    let which_dev = devintr(scause);
    if which_dev == 0 {
        crate::printf!("scause {:x}\n", scause);
        crate::printf!(
            "sepc={:x} stval={:x}\n",
            r_sepc(),
            r_stval()
        );
        panic!("kerneltrap");
    }

    // give up the CPU if this is a timer interrupt.
    if which_dev == 2 && has_current_proc() {
        yield_proc();
    }

    // the yield() may have caused some traps to occur,
    // so restore trap registers for use by kernelvec.S's sepc instruction.
    w_sepc(sepc as usize);
    w_sstatus(sstatus);
}

fn clockintr() {
    if cpuid() == 0 {
        unsafe {
            TICKS_LOCK.acquire();
            TICKS += 1;
            TICKS_LOCK.release();
        }
        wakeup((unsafe { &TICKS as *const u64 }).expose_provenance());
    }
}

// check if it's an external interrupt or software interrupt,
// and handle it.
// returns 2 if timer interrupt,
// 1 if other device,
// 0 if not recognized.
fn devintr(scause: u64) -> i32 {
    if scause & SCAUSE_INTR_BIT != 0 && (scause & 0xff) == 9 {
        // this is a supervisor external interrupt, via PLIC.

        // irq indicates which device interrupted.
        let irq = plic_claim();

        if irq == UART0_IRQ as u32 {
            unsafe { UART_INSTANCE.intr() };
        } else if irq == VIRTIO0_IRQ as u32 {
            virtio_disk_intr();
        } else if irq != 0 {
            crate::printf!("unexpected interrupt irq={}\n", irq);
        }

        // the PLIC allows each device to raise at most one
        // interrupt at a time; tell the PLIC the device is
        // now allowed to interrupt again.
        if irq != 0 {
            plic_complete(irq);
        }

        1
    } else if scause == 0x8000000000000001 {
        // software interrupt from a machine-mode timer interrupt,
        // forwarded by timervec in kernelvec.S.

        clockintr();

        // acknowledge the software interrupt by clearing
        // the SSIP bit in sip.
        w_sip(r_sip() & !2);

        2
    } else {
        0
    }
}
