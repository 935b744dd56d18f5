use core::mem;
use crate::exec::exec;
use crate::file::fcntl::{O_CREATE, O_RDONLY, O_RDWR, O_TRUNC, O_WRONLY};
use crate::file::file::{filealloc, fileclose};
use crate::file::{File, INode};
use crate::file::FDType::{FD_DEVICE, FD_INODE};
use crate::fs::fs::{dirlink, dirlookup, ialloc, namei, nameiparent};
use crate::kalloc::KMEM;
use crate::log::{begin_op, end_op};
use crate::param::{MAXARG, MAXPATH, NDEV, NOFILE};
use crate::proc::myproc;
use crate::riscv::PGSIZE;
use crate::stat::FileType;
use crate::stat::FileType::{T_DEVICE, T_DIR, T_FILE};
use crate::syscall::syscall::{argaddr, argint, argstr, fetchaddr, fetchstr};

pub(crate) fn sys_exec() -> u64 {
    let mut uarg: usize = 0;
    let uargv = argaddr(1);

    let mut path: [u8; MAXPATH] = [0; MAXPATH];
    if argstr(0, path.as_mut_ptr(), MAXPATH) < 0 {
        return u64::MAX;
    }

    let mut argv: [Option<*mut u8>; MAXARG] = [None; MAXARG];
    let mut i = 0;
    let mut bad = false;
    loop {
        if i >= argv.len() {
            bad = true;
            break;
        }

        if fetchaddr(uargv + mem::size_of::<usize>() * i, &mut uarg) < 0 {
            bad = true;
            break;
        }

        if uarg == 0 {
            argv[i] = None;
            break;
        }

        let ptr: *mut u8 = match unsafe { KMEM.try_kalloc() } {
            Ok(ptr) => ptr,
            Err(_) => {
                bad = true;
                break;
            }
        };
        argv[i] = Some(ptr);

        if fetchstr(uarg, argv[i].unwrap(), PGSIZE) < 0 {
            bad = true;
            break;
        }

        i += 1;
    }

    let ret = if !bad { exec(&path, &argv) } else { -1 };

    for slot in argv.iter() {
        match slot {
            Some(ptr) => unsafe { KMEM.kfree(*ptr) },
            None => break,
        }
    }

    ret as u64
}

pub(crate) fn sys_open() -> u64 {
    match sys_open_inner() {
        Some(fd) => fd as u64,
        None => u64::MAX,
    }
}

fn sys_open_inner() -> Option<usize> {
    let mut path: [u8; MAXPATH] = [0; MAXPATH];
    let omode = argint(1);
    let n = argstr(0, path.as_mut_ptr(), MAXPATH);
    if n < 0 {
        return None;
    }
    let pathb = &path[..n as usize];

    begin_op();

    let ip: &mut INode;
    if omode & O_CREATE != 0 {
        match create(pathb, T_FILE, 0, 0) {
            Some(i) => ip = i,
            None => {
                end_op();
                return None;
            }
        }
    } else {
        match namei(pathb) {
            Some(i) => {
                ip = i;
                ip.ilock();
                if ip.file_type == T_DIR && omode != O_RDONLY {
                    ip.iunlockput();
                    end_op();
                    return None;
                }
            }
            None => {
                end_op();
                return None;
            }
        }
    }

    if ip.file_type == T_DEVICE && ip.major as usize >= NDEV {
        ip.iunlockput();
        end_op();
        return None;
    }

    let f = filealloc();
    if f.is_none() {
        ip.iunlockput();
        end_op();
        return None;
    }
    let f = f.unwrap();

    let fd = fdalloc(f);
    if fd.is_none() {
        fileclose(f);
        ip.iunlockput();
        end_op();
        return None;
    }

    if ip.file_type == T_DEVICE {
        f.file_type = FD_DEVICE;
        f.major = ip.major;
    } else {
        f.file_type = FD_INODE;
        f.off = 0;
    }
    f.ip = Some(ip as *mut INode);
    f.readable = omode & O_WRONLY == 0;
    f.writable = (omode & O_WRONLY) != 0 || (omode & O_RDWR) != 0;

    if (omode & O_TRUNC) != 0 && ip.file_type == T_FILE {
        ip.itrunc();
    }

    ip.iunlock();
    end_op();

    fd
}

pub(crate) fn sys_mknod() -> u64 {
    begin_op();
    let major = argint(1) as i16;
    let minor = argint(2) as i16;

    let mut path = [0u8; MAXPATH];
    let n = argstr(0, path.as_mut_ptr(), MAXPATH);
    if n < 0 {
        end_op();
        return u64::MAX;
    }

    let ip = create(&path[..n as usize], T_DEVICE, major, minor);
    if ip.is_none() {
        end_op();
        return u64::MAX;
    }

    ip.unwrap().iunlockput();
    end_op();
    0
}

pub(crate) fn sys_dup() -> u64 {
    let fd = argint(0);
    match myproc_file(fd) {
        Some(f) => match fdalloc(f) {
            Some(newfd) => {
                crate::file::file::filedup(f as *mut File);
                newfd as u64
            }
            None => u64::MAX,
        },
        None => u64::MAX,
    }
}

pub(crate) fn sys_close() -> u64 {
    let fd = argint(0);
    match myproc_file(fd) {
        Some(f) => {
            myproc().ofile[fd as usize] = None;
            fileclose(f);
            0
        }
        None => u64::MAX,
    }
}

pub(crate) fn sys_read() -> u64 {
    match myproc_file(argint(0)) {
        Some(f) => crate::file::file::fileread(f, argaddr(1), argint(2) as usize) as u64,
        None => u64::MAX,
    }
}

pub(crate) fn sys_write() -> u64 {
    match myproc_file(argint(0)) {
        Some(f) => crate::file::file::filewrite(f, argaddr(1), argint(2) as usize) as u64,
        None => u64::MAX,
    }
}

fn myproc_file<'a>(fd: i32) -> Option<&'a mut File> {
    if fd < 0 || fd as usize >= NOFILE {
        return None;
    }
    let p = myproc();
    unsafe { p.ofile[fd as usize].map(|f| &mut *f) }
}

fn create<'a>(path: &[u8], file_type: FileType, major: i16, minor: i16) -> Option<&'a mut INode> {
    let (dp, name) = nameiparent(path);
    let dp = dp?;
    dp.ilock();

    let mut off = 0u32;
    if let Some(ip) = dirlookup(dp, name, &mut off) {
        dp.iunlockput();
        ip.ilock();
        if file_type == T_FILE && (ip.file_type == T_FILE || ip.file_type == T_DEVICE) {
            return Some(ip);
        }
        ip.iunlockput();
        return None;
    }

    let ip = ialloc(dp.dev, file_type);
    if ip.is_none() {
        dp.iunlockput();
        return None;
    }
    let ip = ip.unwrap();
    ip.ilock();
    ip.major = major;
    ip.minor = minor;
    ip.nlink = 1;
    ip.iupdate();

    if file_type == T_DIR {
        // Create . and .. entries. No ip.nlink += 1 for ".": avoid cyclic ref count.
        if dirlink(ip, b".", ip.inum as u16).is_none() || dirlink(ip, b"..", dp.inum as u16).is_none() {
            ip.nlink = 0;
            ip.iupdate();
            ip.iunlockput();
            dp.iunlockput();
            return None;
        }
    }

    if dirlink(dp, name, ip.inum as u16).is_none() {
        ip.nlink = 0;
        ip.iupdate();
        ip.iunlockput();
        dp.iunlockput();
        return None;
    }

    if file_type == T_DIR {
        dp.nlink += 1; // for ".."
        dp.iupdate();
    }

    dp.iunlockput();

    Some(ip)
}

// Allocate a file descriptor for the given file.
// Takes over file reference from caller on success.
fn fdalloc(f: &mut File) -> Option<usize> {
    let p = myproc();

    for fd in 0..NOFILE {
        if p.ofile[fd].is_none() {
            p.ofile[fd] = Some(f as *mut File);
            return Some(fd);
        }
    }

    None
}
