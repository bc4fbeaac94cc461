//! # Fatal Boot Errors
//!
//! Every error here is fatal to the boot attempt but occurs while boot
//! services are still alive, so it can be shown to the operator. The one
//! failure mode with no representation is the post-`ExitBootServices` one;
//! see [`crate::sequence::Outcome::Unreportable`].

use thiserror::Error;
use uefi::{CStr16, Status};

#[derive(Debug, Error)]
pub enum BootError {
    /// The loaded-image or simple-file-system protocol could not be resolved.
    #[error("boot volume discovery failed: {0:?}")]
    Discovery(Status),

    /// The kernel image is missing from the boot volume. The message doubles
    /// as the fix: put the file there.
    #[error("kernel not found ({status:?}); place the kernel at {path} on the boot volume")]
    KernelNotFound {
        path: &'static CStr16,
        status: Status,
    },

    /// File metadata could not be read, so the image size is unknown.
    #[error("could not query kernel file size: {0:?}")]
    FileInfo(Status),

    /// Both the fixed-address and the firmware-chosen allocation failed.
    #[error("page allocation failed at the fixed and firmware-chosen addresses: {0:?}")]
    Allocate(Status),

    /// The read call itself failed.
    #[error("kernel read failed: {0:?}")]
    Read(Status),

    /// The read returned fewer bytes than the file claims to hold. Partial
    /// images are never handed to the CPU.
    #[error("short kernel read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    /// The memory map did not fit the snapshot buffer or the query failed.
    #[error("memory map snapshot failed: {0:?}")]
    MemoryMap(Status),
}
