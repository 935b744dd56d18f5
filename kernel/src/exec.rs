use core::mem;

use crate::elf::{ElfHeader, ProgramHeader, ELF_MAGIC, ELF_PROG_LOAD};
use crate::file::INode;
use crate::fs::fs::namei;
use crate::log::{begin_op, end_op};
use crate::param::{MAXARG, MAXPATH};
use crate::proc::{myproc, proc_freepagetable, proc_pagetable};
use crate::riscv::{PageTable, PGSIZE, PTE_W, PTE_X};
use crate::string::strlen;
use crate::vm::{copyout, uvmalloc, uvmclear, walkaddr};
use crate::PGROUNDUP;

fn flags2perm(flags: u32) -> usize {
    let mut perm = 0;
    if flags & 0x1 != 0 {
        perm = PTE_X;
    }
    if flags & 0x2 != 0 {
        perm |= PTE_W;
    }
    perm
}

pub fn exec(path: &[u8; MAXPATH], argv: &[Option<*mut u8>; MAXARG]) -> i32 {
    begin_op();

    let ip = match namei(path) {
        Some(ip) => ip,
        None => {
            end_op();
            return -1;
        }
    };

    ip.ilock();

    // Check ELF header
    let mut elf = ElfHeader::create();
    let tot = ip.readi(false, &mut elf, 0, mem::size_of::<ElfHeader>());
    if tot != mem::size_of::<ElfHeader>() || elf.magic != ELF_MAGIC {
        return goto_bad(None, 0, ip);
    }

    let page_table_ptr = match proc_pagetable(myproc()) {
        Some(pt) => pt,
        None => return goto_bad(None, 0, ip),
    };
    let page_table = unsafe { page_table_ptr.as_mut().unwrap() };

    // Load program into memory.
    let mut off = elf.phoff as u32;
    let ph_sz = mem::size_of::<ProgramHeader>();
    let mut sz = 0usize;
    for _ in 0..elf.phnum {
        let mut ph = ProgramHeader::create();
        let tot = ip.readi(false, &mut ph, off, ph_sz);
        if tot != ph_sz {
            return goto_bad(Some(page_table), sz, ip);
        }
        if ph.hdr_type != ELF_PROG_LOAD {
            off += ph_sz as u32;
            continue;
        }
        if ph.memsz < ph.filesz
            || ph.vaddr + ph.memsz < ph.vaddr
            || ph.vaddr % PGSIZE as u64 != 0
        {
            return goto_bad(Some(page_table), sz, ip);
        }

        let sz1 = uvmalloc(page_table, sz, (ph.vaddr + ph.memsz) as usize, flags2perm(ph.flags));
        if sz1 == 0 {
            return goto_bad(Some(page_table), sz, ip);
        }
        sz = sz1;
        if loadseg(page_table, ph.vaddr, ip, ph.off, ph.filesz) < 0 {
            return goto_bad(Some(page_table), sz, ip);
        }

        off += ph_sz as u32;
    }
    ip.iunlockput();
    end_op();

    let p = myproc();
    let oldsz = p.sz;

    // Allocate two pages at the next page boundary.
    // Make the first inaccessible as a stack guard.
    // Use the second as the user stack.
    sz = PGROUNDUP!(sz);
    let sz1 = uvmalloc(page_table, sz, sz + 2 * PGSIZE, PTE_W);
    if sz1 == 0 {
        return goto_bad_no_ip(page_table, sz);
    }
    sz = sz1;
    uvmclear(page_table, sz - 2 * PGSIZE);

    let mut sp = sz;
    let stackbase = sp - PGSIZE;
    let mut argc = 0;
    let mut ustack: [usize; MAXARG] = [0; MAXARG];

    // Push argument strings, prepare rest of stack in ustack.
    while let Some(curr_argv) = argv[argc] {
        if argc >= MAXARG {
            return goto_bad_no_ip(page_table, sz);
        }

        sp -= strlen(curr_argv) + 1;
        sp -= sp % 16; // riscv sp must be 16-byte aligned
        if sp < stackbase {
            return goto_bad_no_ip(page_table, sz);
        }

        if !copyout(page_table, sp, curr_argv, strlen(curr_argv) + 1) {
            return goto_bad_no_ip(page_table, sz);
        }
        ustack[argc] = sp;
        argc += 1;
    }
    ustack[argc] = 0;

    // push the array of argv[] pointers.
    sp -= (argc + 1) * mem::size_of::<u64>();
    sp -= sp % 16;
    if sp < stackbase {
        return goto_bad_no_ip(page_table, sz);
    }
    if !copyout(
        page_table,
        sp,
        &ustack as *const usize as *const u8,
        (argc + 1) * mem::size_of::<u64>(),
    ) {
        return goto_bad_no_ip(page_table, sz);
    }

    // arguments to user main(argc, argv)
    // argc is returned via the system call return
    // value, which goes in a0.
    let tf = unsafe { p.trapframe.unwrap().as_mut().unwrap() };
    tf.a1 = sp as u64;

    // Save program name for debugging.
    let mut name = [0u8; 16];
    let name_len = name.len();
    crate::string::safestrcpy(&mut name, path, name_len);
    p.name = name;

    // Commit to the user image.
    let oldpagetable = unsafe { p.pagetable.unwrap().as_mut().unwrap() };
    p.pagetable = Some(page_table as *mut PageTable);
    p.sz = sz;
    tf.epc = elf.entry; // initial program counter = main
    tf.sp = sp as u64; // initial stack pointer
    proc_freepagetable(oldpagetable, oldsz);

    argc as i32 // this ends up in a0, the first argument to main(argc, argv)
}

fn goto_bad(page_table: Option<&mut PageTable>, sz: usize, ip: &mut INode) -> i32 {
    if let Some(pt) = page_table {
        proc_freepagetable(pt, sz);
    }
    ip.iunlockput();
    end_op();
    -1
}

fn goto_bad_no_ip(page_table: &mut PageTable, sz: usize) -> i32 {
    proc_freepagetable(page_table, sz);
    -1
}

// Load a program segment into pagetable at virtual address va.
// va must be page-aligned
// and the pages from va to va+sz must already be mapped.
// Returns 0 on success, -1 on failure.
fn loadseg(page_table: &mut PageTable, va: u64, ip: &mut INode, offset: u64, sz: u64) -> i32 {
    for i in (0..sz).step_by(PGSIZE) {
        let pa = walkaddr(page_table, (va + i) as usize);
        if pa == 0 {
            panic!("loadseg: address should exist");
        }

        let n = if sz - i < PGSIZE as u64 {
            (sz - i) as usize
        } else {
            PGSIZE
        };

        if ip.readi(false, pa as *mut u8, (offset + i) as u32, n) != n {
            return -1;
        }
    }

    0
}
