//! # Architecture-Specific Control Transfer
//!
//! The last few instructions of the loader's life. By the time
//! [`enter_kernel`] runs, boot services are terminated: there is no firmware
//! abstraction left, only the raw calling convention of the target CPU.

use crate::sequence::Handoff;

#[cfg(target_arch = "x86_64")]
use core::cell::UnsafeCell;
#[cfg(target_arch = "x86_64")]
use kernel_info::{KernelBootInfo, X86KernelEntry};
#[cfg(any(target_arch = "riscv64", target_arch = "riscv32"))]
use kernel_info::RiscvKernelEntry;

/// Jumps to the loaded kernel. Never returns; if the kernel entry somehow
/// comes back, the CPU is parked as a safety net.
///
/// # Safety
/// `handoff.entry` must point at valid kernel code for this architecture and
/// boot services must already be terminated.
#[cfg(any(target_arch = "riscv64", target_arch = "riscv32"))]
pub unsafe fn enter_kernel(handoff: Handoff) -> ! {
    let Handoff::DeviceTree {
        entry,
        hart_id,
        dtb,
    } = handoff
    else {
        // Wrong flavor for this target; nothing sane to jump to.
        halt_spin()
    };

    let entry: RiscvKernelEntry = unsafe { core::mem::transmute(entry as usize) };
    unsafe { entry(hart_id, dtb as usize as *const u8) };

    // A well-behaved kernel never returns. A misbehaving one must not fall
    // off the end of the loader.
    halt_spin()
}

#[cfg(target_arch = "x86_64")]
struct BootInfoSlot(UnsafeCell<KernelBootInfo>);

// Single-threaded until the handoff, and the kernel owns it afterwards.
#[cfg(target_arch = "x86_64")]
unsafe impl Sync for BootInfoSlot {}

/// The record handed to the kernel. It must not live on the loader's stack or
/// in pool memory: both may be reclaimed once the kernel takes over the
/// memory map, so the record gets static storage inside the loader image.
#[cfg(target_arch = "x86_64")]
static BOOT_INFO: BootInfoSlot = BootInfoSlot(UnsafeCell::new(KernelBootInfo::EMPTY));

/// Jumps to the loaded kernel. Never returns; if the kernel entry somehow
/// comes back, the CPU is parked as a safety net.
///
/// # Safety
/// `handoff.entry` must point at valid kernel code for this architecture and
/// boot services must already be terminated.
#[cfg(target_arch = "x86_64")]
pub unsafe fn enter_kernel(handoff: Handoff) -> ! {
    let Handoff::BootInfo { entry, info } = handoff else {
        // Wrong flavor for this target; nothing sane to jump to.
        halt_spin()
    };

    unsafe {
        *BOOT_INFO.0.get() = info;
        let entry: X86KernelEntry = core::mem::transmute(entry as usize);
        entry(BOOT_INFO.0.get());
    }

    // A well-behaved kernel never returns. A misbehaving one must not fall
    // off the end of the loader.
    halt_spin()
}

#[cfg(not(any(target_arch = "riscv64", target_arch = "riscv32", target_arch = "x86_64")))]
pub unsafe fn enter_kernel(_handoff: Handoff) -> ! {
    halt_spin()
}

/// Parks the CPU forever in its low-power wait instruction. The only legal
/// response to a post-`ExitBootServices` failure.
pub fn halt_spin() -> ! {
    loop {
        #[cfg(any(target_arch = "riscv64", target_arch = "riscv32"))]
        unsafe {
            core::arch::asm!("wfi", options(nomem, nostack, preserves_flags));
        }
        #[cfg(target_arch = "x86_64")]
        unsafe {
            core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
        }
        #[cfg(not(any(target_arch = "riscv64", target_arch = "riscv32", target_arch = "x86_64")))]
        core::hint::spin_loop();
    }
}
