//! # Compiled-In Loader Configuration
//!
//! The loader takes no command line and reads no variables: the kernel path,
//! the load address, and the policy knobs are build-time constants chosen per
//! target architecture. Changing any of them means recompiling.

use uefi::{CStr16, cstr16};

/// When to clear the screen relative to printing the banner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearPolicy {
    /// Clear first, then print the banner (banner stays visible).
    BeforeBanner,
    /// Print the banner, then clear. Useful when the firmware's own output
    /// should be wiped but the banner is only wanted in the scrollback.
    AfterBanner,
    /// Leave the screen alone.
    Never,
}

/// Which platform-description bundle the kernel expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformStyle {
    /// Device tree blob + boot hart id, passed as two scalars (RISC-V).
    DeviceTree,
    /// Pointer to a statically-stored boot-info record (x86_64).
    AcpiBootInfo,
}

/// Build-time loader configuration.
#[derive(Clone, Copy, Debug)]
pub struct LoaderConfig {
    /// Absolute path of the kernel image on the boot volume.
    pub kernel_path: &'static CStr16,

    /// Preferred physical load address. If the firmware reports it busy, the
    /// loader falls back to a firmware-chosen address.
    pub load_addr: u64,

    /// Fixed physical address to probe for a device tree when the config
    /// tables carry none. `None` disables the probe.
    pub dtb_fallback_addr: Option<u64>,

    /// Console clear behavior at startup.
    pub clear: ClearPolicy,

    /// Platform-description flavor to assemble for the kernel.
    pub platform: PlatformStyle,
}

impl LoaderConfig {
    /// RISC-V: load address and DTB probe address follow the Linux kernel and
    /// OpenSBI conventions.
    pub const RISCV: Self = Self {
        kernel_path: cstr16!("\\kernel.bin"),
        load_addr: 0x8020_0000,
        dtb_fallback_addr: Some(0x8220_0000),
        clear: ClearPolicy::BeforeBanner,
        platform: PlatformStyle::DeviceTree,
    };

    /// x86_64: conventional 1 MiB load address, boot-info record handoff.
    pub const X86_64: Self = Self {
        kernel_path: cstr16!("\\kernel.bin"),
        load_addr: 0x0010_0000,
        dtb_fallback_addr: None,
        clear: ClearPolicy::BeforeBanner,
        platform: PlatformStyle::AcpiBootInfo,
    };

    /// Configuration for the architecture this loader is being built for.
    #[cfg(any(target_arch = "riscv64", target_arch = "riscv32"))]
    pub const NATIVE: Self = Self::RISCV;

    /// Configuration for the architecture this loader is being built for.
    #[cfg(not(any(target_arch = "riscv64", target_arch = "riscv32")))]
    pub const NATIVE: Self = Self::X86_64;
}
