// Kernel-internal error taxonomy.
//
// Resource exhaustion and user-visible faults flow through `Result`;
// invariant violations still `panic!` at the point of detection, since
// those are treated as fatal rather than recoverable.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KernelError {
    NoMemory,
    NoBuffers,
    NoInodes,
    NoDescriptors,
    NoFileSlots,
    BadAddress,
    BadPath,
    NotFound,
    Exists,
    NotADirectory,
    IsADirectory,
    IoError,
}

pub type KResult<T> = Result<T, KernelError>;

impl KernelError {
    // Userspace sees every kernel error as -1; this names the mapping
    // explicitly so syscall glue doesn't need to match on variants.
    pub const fn to_errno(self) -> i64 {
        -1
    }
}
