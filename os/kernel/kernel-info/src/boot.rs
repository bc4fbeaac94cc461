//! # Boot Information
//!
//! Structures handed from the loader to the kernel at the moment of control
//! transfer. Everything here crosses an ABI boundary: keep the layouts
//! `#[repr(C)]` and prefer fixed-size integers.

/// Value of [`KernelBootInfo::magic`]; ASCII `"HANDOFF1"`.
pub const BOOT_INFO_MAGIC: u64 = 0x4841_4e44_4f46_4631;

/// RISC-V kernel entry point.
///
/// # ABI
/// Standard C convention: `a0` = boot hart id, `a1` = device tree blob
/// pointer (may be null). Matches the Linux RISC-V boot protocol, so a Linux
/// kernel image works as well as a custom one.
///
/// Deliberately *not* declared diverging: the entry is a foreign flat binary
/// and nothing guarantees it never returns. The loader parks the CPU itself
/// if control ever comes back.
pub type RiscvKernelEntry = unsafe extern "C" fn(hart_id: usize, dtb: *const u8);

/// x86_64 kernel entry point.
///
/// # ABI
/// `sysv64` with a single pointer argument. By the time the loader makes this
/// call, `ExitBootServices` has succeeded and no firmware calling conventions
/// apply anymore; the native convention is the contract.
///
/// Deliberately *not* declared diverging, for the same reason as
/// [`RiscvKernelEntry`].
pub type X86KernelEntry = unsafe extern "sysv64" fn(boot_info: *const KernelBootInfo);

/// Information the x86_64 kernel needs right after `ExitBootServices`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct KernelBootInfo {
    /// Always [`BOOT_INFO_MAGIC`]. First field so the kernel can verify it
    /// before trusting anything else in the record.
    pub magic: u64,

    /// Memory map captured immediately before `ExitBootServices`.
    pub mmap: MemoryMapInfo,

    /// RSDP physical address (ACPI 2.0 preferred over 1.0), or 0 if absent.
    pub rsdp_addr: u64,

    /// Framebuffer information from UEFI GOP; zero-filled when no linear
    /// framebuffer is available.
    pub fb: FramebufferInfo,
}

impl KernelBootInfo {
    /// All-zero record (including the magic). The loader overwrites this with
    /// real data before the jump.
    pub const EMPTY: Self = Self {
        magic: 0,
        mmap: MemoryMapInfo::EMPTY,
        rsdp_addr: 0,
        fb: FramebufferInfo::EMPTY,
    };
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct MemoryMapInfo {
    /// Pointer to the raw UEFI memory map buffer (an array of
    /// `EFI_MEMORY_DESCRIPTOR` bytes).
    pub mmap_ptr: u64,

    /// Length of the memory map buffer in **bytes**.
    pub mmap_len: u64,

    /// Size of a single memory descriptor in bytes. Descriptors may be larger
    /// than the structure definition; always advance by this stride.
    pub mmap_desc_size: u64,

    /// Descriptor version reported by the firmware.
    pub mmap_desc_version: u32,
}

impl MemoryMapInfo {
    pub const EMPTY: Self = Self {
        mmap_ptr: 0,
        mmap_len: 0,
        mmap_desc_size: 0,
        mmap_desc_version: 0,
    };
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FramebufferInfo {
    /// Linear framebuffer base (physical). Writable after `ExitBootServices`.
    pub framebuffer_ptr: u64,

    /// Total framebuffer size in **bytes**.
    pub framebuffer_size: u64,

    /// Visible width in **pixels**.
    pub framebuffer_width: u64,

    /// Visible height in **pixels**.
    pub framebuffer_height: u64,

    /// Pixels per scanline; may exceed the width due to padding.
    pub framebuffer_stride: u64,

    /// Pixel format tag.
    pub framebuffer_format: BootPixelFormat,

    /// Channel masks; only meaningful for [`BootPixelFormat::Bitmask`].
    pub framebuffer_masks: BootPixelMasks,
}

impl FramebufferInfo {
    /// Zero-filled record, used when the platform has no usable framebuffer.
    pub const EMPTY: Self = Self {
        framebuffer_ptr: 0,
        framebuffer_size: 0,
        framebuffer_width: 0,
        framebuffer_height: 0,
        framebuffer_stride: 0,
        framebuffer_format: BootPixelFormat::Rgb,
        framebuffer_masks: BootPixelMasks {
            red_mask: 0,
            green_mask: 0,
            blue_mask: 0,
            alpha_mask: 0,
        },
    };
}

/// Pixel format tag compatible with UEFI GOP.
/// Plain `repr(u32)` because it crosses the ABI boundary.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootPixelFormat {
    /// R, G, B stored in low-to-high bytes.
    Rgb = 0,
    /// B, G, R stored in low-to-high bytes.
    Bgr = 1,
    /// Channel layout described by [`BootPixelMasks`].
    Bitmask = 2,
}

/// Bit masks for [`BootPixelFormat::Bitmask`]; zero for `Rgb`/`Bgr`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct BootPixelMasks {
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
    pub alpha_mask: u32,
}
