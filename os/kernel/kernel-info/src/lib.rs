//! # Loader/Kernel Handoff Contract
//!
//! This crate is the authoritative definition of the interface between the
//! UEFI boot stub and the kernel it launches. It contains nothing but data:
//! `#[repr(C)]` records with fixed-width fields, the entry-point function
//! signatures per target architecture, and the magic constant the kernel can
//! use to sanity-check the record it received.
//!
//! ## Why a separate crate
//!
//! The loader and the kernel are built separately (different targets, different
//! profiles) but must agree bit-for-bit on the handoff structures. Centralizing
//! them here prevents the two sides from drifting apart.
//!
//! ## Entry conventions
//!
//! * **RISC-V** (`riscv32`/`riscv64`): the kernel entry takes two scalar
//!   arguments in the standard C calling convention, matching the Linux RISC-V
//!   boot protocol: `a0` carries the boot hart id, `a1` a pointer to the
//!   device tree blob (null when no tree was found).
//! * **x86_64**: the kernel entry takes a single pointer to a
//!   [`boot::KernelBootInfo`] record in the `sysv64` convention. The record
//!   lives in the loader image itself so it remains valid after
//!   `ExitBootServices`.

#![no_std]

pub mod boot;

pub use boot::{
    BOOT_INFO_MAGIC, BootPixelFormat, BootPixelMasks, FramebufferInfo, KernelBootInfo,
    MemoryMapInfo, RiscvKernelEntry, X86KernelEntry,
};
