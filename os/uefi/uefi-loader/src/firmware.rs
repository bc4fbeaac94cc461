//! # Firmware Service Contract
//!
//! The narrow slice of UEFI the boot sequence actually consumes, expressed as
//! a trait. The production implementation ([`crate::efi::EfiFirmware`]) wraps
//! the `uefi` crate; the test suite drives the sequencer through a scripted
//! double instead. The firmware's fixed-layout service tables themselves are
//! *not* re-modeled here — their shape is dictated by the UEFI specification
//! and owned by the `uefi`/`uefi-raw` crates.

use kernel_info::FramebufferInfo;
use uefi::{CStr16, Guid, Status};

/// How to place a page allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocateMode {
    /// Exactly at this physical address.
    Fixed(u64),
    /// Wherever the firmware likes.
    Any,
}

/// Metadata returned by a memory map snapshot.
///
/// `map_key` is the firmware's generation token: `ExitBootServices` only
/// succeeds if no allocation happened since the snapshot that produced it.
#[derive(Clone, Copy, Debug)]
pub struct MapMeta {
    /// Bytes of descriptor data written into the snapshot buffer.
    pub map_size: usize,
    /// Generation token to pass to [`Firmware::exit_boot_services`].
    pub map_key: usize,
    /// Stride between descriptors in the buffer.
    pub desc_size: usize,
    /// Descriptor layout version.
    pub desc_version: u32,
}

/// Boot services consumed by the handoff sequence, in call order.
///
/// All calls are synchronous and valid only until [`exit_boot_services`]
/// succeeds. Implementations own whatever handles the calls produce
/// (volume, file) so the sequencer never touches firmware objects directly.
///
/// [`exit_boot_services`]: Firmware::exit_boot_services
pub trait Firmware {
    /// Resolve the loader's own image, then the file system it was loaded
    /// from, and open that volume's root directory.
    fn open_boot_volume(&mut self) -> Result<(), Status>;

    /// Open the kernel image read-only at `path` on the boot volume.
    fn open_kernel(&mut self, path: &CStr16) -> Result<(), Status>;

    /// Byte length of the opened kernel image, from file metadata.
    fn kernel_size(&mut self) -> Result<u64, Status>;

    /// Allocate `pages` loader-class pages and return the physical base.
    /// The memory must stay valid across `ExitBootServices`.
    fn allocate_pages(&mut self, mode: AllocateMode, pages: usize) -> Result<u64, Status>;

    /// Read up to `len` bytes of the kernel image to physical address `dst`
    /// in a single blocking call; returns the byte count actually read.
    fn read_kernel(&mut self, dst: u64, len: usize) -> Result<usize, Status>;

    /// Close the kernel file and the volume. Best effort; never fatal.
    fn close_kernel(&mut self);

    /// Look up a configuration table by GUID; returns the table address.
    fn config_table(&self, guid: &Guid) -> Option<u64>;

    /// Copy `buf.len()` bytes from physical address `addr`. Returns `false`
    /// when the address cannot be read (or is null).
    fn read_phys(&self, addr: u64, buf: &mut [u8]) -> bool;

    /// Boot hart id via the RISC-V boot protocol, if the firmware offers it.
    fn boot_hart_id(&mut self) -> Option<usize>;

    /// Current-mode framebuffer, if a linear framebuffer exists.
    fn framebuffer(&mut self) -> Option<FramebufferInfo>;

    /// Snapshot the memory map into `buf` and return its metadata.
    fn memory_map(&mut self, buf: &mut [u8]) -> Result<MapMeta, Status>;

    /// Terminate boot services using `map_key`. On success every other method
    /// of this trait (and the firmware console) becomes forbidden; on failure
    /// the only permitted follow-up is one more [`memory_map`] +
    /// [`exit_boot_services`] pair.
    ///
    /// [`memory_map`]: Firmware::memory_map
    /// [`exit_boot_services`]: Firmware::exit_boot_services
    fn exit_boot_services(&mut self, map_key: usize) -> Result<(), Status>;
}
