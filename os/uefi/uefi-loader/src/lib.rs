//! # UEFI Boot Stub for Raw Binary Kernels
//!
//! A deliberately small UEFI application that loads a flat binary kernel from
//! the boot volume, gathers the platform facts the kernel cannot discover on
//! its own, terminates firmware boot services, and jumps to the kernel entry
//! point.
//!
//! ## Boot sequence
//!
//! ```text
//! UEFI firmware
//!     ↓
//! 1. Resolve the loader's own device and open the boot volume
//! 2. Open the kernel image at its well-known path (read-only)
//! 3. Query the file size and derive the page count
//! 4. Allocate pages at the fixed load address, or anywhere as fallback
//! 5. Read the whole image in one blocking call
//! 6. Close file handles (best effort)
//! 7. Collect platform data:
//!      RISC-V  → device tree blob (config table, then fixed-address probe)
//!                and the boot hart id via the RISC-V boot protocol
//!      x86_64  → ACPI RSDP (2.0 preferred), framebuffer, boot-info record
//! 8. Snapshot the memory map and remember the map key
//! 9. ExitBootServices with that key; on a stale key, re-snapshot and retry
//!    exactly once
//! 10. Jump to the kernel — this call does not return
//! ```
//!
//! Every failure before step 9 halts with a console diagnostic and a
//! `LOAD_ERROR` exit status. A double failure in step 9 is unreportable: the
//! firmware console is no longer safe to touch, so the loader parks the CPU
//! in a low-power spin.
//!
//! ## Structure
//!
//! The sequencing logic ([`sequence`]) is written against the narrow
//! [`firmware::Firmware`] trait so it can run on the host under `cargo test`
//! with a scripted double. [`efi::EfiFirmware`] is the production
//! implementation on top of the `uefi` crate; the jump itself lives in
//! [`arch`] and is the only per-target code besides the compiled-in
//! [`config::LoaderConfig`] constants.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod arch;
pub mod config;
pub mod console;
pub mod devicetree;
pub mod efi;
pub mod error;
pub mod firmware;
pub mod kernel_image;
pub mod logger;
pub mod platform;
pub mod pool_alloc;
pub mod rsdp;
pub mod sequence;
