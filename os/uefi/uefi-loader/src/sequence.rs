//! # Boot Handoff Sequencer
//!
//! Drives the whole boot attempt as a strict pipeline and owns the one piece
//! of genuinely delicate logic in the loader: the `ExitBootServices` commit
//! with its single-retry policy.
//!
//! The firmware's map key is a generation token; any service call between the
//! memory map snapshot and `ExitBootServices` — including console output by
//! the firmware itself — can invalidate it. The UEFI specification allows
//! exactly one recovery: snapshot again, retry once. This module writes that
//! out as a literal two-attempt sequence instead of a retry abstraction,
//! because no other stage in the loader has this property.

use log::info;

use crate::config::LoaderConfig;
use crate::error::BootError;
use crate::firmware::{Firmware, MapMeta};
use crate::kernel_image::{self, KernelImage};
use crate::platform::{self, Platform};
use kernel_info::{BOOT_INFO_MAGIC, KernelBootInfo, MemoryMapInfo};

/// Result of a boot attempt.
#[derive(Debug)]
pub enum Outcome {
    /// Boot services are terminated and the jump data is assembled. The only
    /// thing left to do is [`crate::arch::enter_kernel`].
    Ready(Handoff),

    /// Fatal failure while boot services were still alive. The caller may
    /// still use the console to report it and must exit with `LOAD_ERROR`.
    Failed(BootError),

    /// `ExitBootServices` failed twice. Firmware state is torn down, the
    /// console is gone, and no further service call is permitted; the caller
    /// must park the CPU without touching anything.
    Unreportable,
}

/// Everything needed for the final jump. By the time this exists, firmware
/// services are already terminated.
#[derive(Debug)]
pub enum Handoff {
    /// RISC-V entry: `a0` = hart id, `a1` = device tree pointer.
    DeviceTree {
        entry: u64,
        hart_id: usize,
        dtb: u64,
    },
    /// x86_64 entry: one pointer to the boot-info record. The record is
    /// assembled here by value; the architecture code parks it in static
    /// storage before the jump.
    BootInfo { entry: u64, info: KernelBootInfo },
}

impl Handoff {
    fn assemble(image: &KernelImage, platform: Platform, mmap_ptr: u64, meta: &MapMeta) -> Self {
        match platform {
            Platform::DeviceTree { hart_id, dtb } => Self::DeviceTree {
                entry: image.load_addr,
                hart_id,
                dtb,
            },
            Platform::BootInfo { rsdp_addr, fb } => Self::BootInfo {
                entry: image.load_addr,
                info: KernelBootInfo {
                    magic: BOOT_INFO_MAGIC,
                    mmap: MemoryMapInfo {
                        mmap_ptr,
                        mmap_len: meta.map_size as u64,
                        mmap_desc_size: meta.desc_size as u64,
                        mmap_desc_version: meta.desc_version,
                    },
                    rsdp_addr,
                    fb,
                },
            },
        }
    }
}

/// Runs one boot attempt start to finish.
///
/// `mmap_buf` receives the memory map snapshot and is referenced by the
/// x86_64 boot-info record, so the production caller hands in a buffer with
/// static storage duration.
pub fn run<F: Firmware>(fw: &mut F, config: &LoaderConfig, mmap_buf: &mut [u8]) -> Outcome {
    let image = match kernel_image::load(fw, config) {
        Ok(image) => image,
        Err(err) => return Outcome::Failed(err),
    };
    info!(
        "kernel loaded: {} bytes at {:#x}",
        image.size_bytes, image.load_addr
    );

    let platform = platform::collect(fw, config);

    info!("exiting boot services");
    commit(fw, &image, platform, mmap_buf)
}

/// The point of no return: snapshot, terminate, retry once on a stale key.
///
/// Nothing in here may log or print. A failed `ExitBootServices` already
/// leaves the console in an undefined state, and on success there is no
/// firmware left to print with.
fn commit<F: Firmware>(
    fw: &mut F,
    image: &KernelImage,
    platform: Platform,
    mmap_buf: &mut [u8],
) -> Outcome {
    let meta = match fw.memory_map(mmap_buf) {
        Ok(meta) => meta,
        // Still pre-termination: the console is fine, report it.
        Err(status) => return Outcome::Failed(BootError::MemoryMap(status)),
    };

    let meta = if fw.exit_boot_services(meta.map_key).is_ok() {
        meta
    } else {
        // Stale key: something moved the map between snapshot and commit.
        // One re-snapshot and one retry, then we are out of options.
        let Ok(meta) = fw.memory_map(mmap_buf) else {
            return Outcome::Unreportable;
        };
        if fw.exit_boot_services(meta.map_key).is_err() {
            return Outcome::Unreportable;
        }
        meta
    };

    Outcome::Ready(Handoff::assemble(
        image,
        platform,
        mmap_buf.as_ptr() as u64,
        &meta,
    ))
}
