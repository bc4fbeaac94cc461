//! UEFI entry point: console setup, one boot attempt, and the jump.
//!
//! Kept deliberately thin; everything with logic in it lives in the library
//! so it can run under `cargo test` on the host.

#![cfg_attr(target_os = "uefi", no_std)]
#![cfg_attr(target_os = "uefi", no_main)]
#![allow(unsafe_code)]

#[cfg(target_os = "uefi")]
mod efi_app {
    use core::cell::UnsafeCell;

    use log::LevelFilter;
    use uefi::prelude::*;
    use uefi_loader::config::LoaderConfig;
    use uefi_loader::efi::EfiFirmware;
    use uefi_loader::sequence::{self, Outcome};
    use uefi_loader::{arch, console, logger};

    /// Upper bound for the memory map snapshot, descriptors included.
    const MAX_MEMORY_MAP: usize = 16 * 1024;

    struct MmapBuffer(UnsafeCell<[u8; MAX_MEMORY_MAP]>);

    // Single-threaded by the UEFI execution model.
    unsafe impl Sync for MmapBuffer {}

    /// The snapshot is referenced by the boot-info record the kernel reads
    /// after `ExitBootServices`, so the buffer needs static storage — stack
    /// space may be reused before the kernel gets to it.
    static MMAP_BUFFER: MmapBuffer = MmapBuffer(UnsafeCell::new([0; MAX_MEMORY_MAP]));

    #[entry]
    fn efi_main() -> Status {
        if uefi::helpers::init().is_err() {
            return Status::UNSUPPORTED;
        }
        let _ = logger::init(LevelFilter::Info);

        let config = LoaderConfig::NATIVE;
        console::greet(&config);

        let mut firmware = EfiFirmware::new();
        // SAFETY: single execution context; this is the only reference.
        let mmap_buf = unsafe { &mut *MMAP_BUFFER.0.get() };

        match sequence::run(&mut firmware, &config, mmap_buf) {
            Outcome::Ready(handoff) => {
                // SAFETY: boot services are terminated and `handoff` carries
                // the verified load address of the kernel image.
                unsafe { arch::enter_kernel(handoff) }
            }
            Outcome::Failed(err) => {
                uefi::println!();
                uefi::println!("Boot failed: {err}");
                uefi::println!("Press any key ...");
                console::wait_for_key();
                Status::LOAD_ERROR
            }
            // ExitBootServices failed twice. The service table is in an
            // undefined state and even the console is off limits; the only
            // safe move is to park the CPU.
            Outcome::Unreportable => arch::halt_spin(),
        }
    }
}

#[cfg(not(target_os = "uefi"))]
fn main() {
    // The loader is a UEFI application; there is nothing to run on a host OS.
}
