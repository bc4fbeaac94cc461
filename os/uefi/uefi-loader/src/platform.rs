//! # Platform Description Collection
//!
//! Stage 7 and 8 of the boot sequence: gather the facts the kernel cannot
//! discover before it has drivers of its own. Every lookup here is a soft
//! failure — a kernel is always launched, with null/zero placeholders for
//! whatever was missing.

use log::{debug, info};

use crate::config::{LoaderConfig, PlatformStyle};
use crate::devicetree;
use crate::firmware::Firmware;
use crate::rsdp;
use kernel_info::FramebufferInfo;

/// Architecture-dependent bundle passed to the kernel.
///
/// Exactly one variant is ever constructed per build; the tag mirrors
/// [`PlatformStyle`] in the compiled-in configuration.
#[derive(Clone, Copy, Debug)]
pub enum Platform {
    /// RISC-V: two scalars for the entry registers.
    DeviceTree {
        hart_id: usize,
        /// Blob address, or 0 when no valid tree was found.
        dtb: u64,
    },
    /// x86_64: raw material for the boot-info record.
    BootInfo {
        /// RSDP address, or 0 when absent.
        rsdp_addr: u64,
        fb: FramebufferInfo,
    },
}

/// Collects the platform description for the configured flavor.
pub fn collect<F: Firmware>(fw: &mut F, config: &LoaderConfig) -> Platform {
    match config.platform {
        PlatformStyle::DeviceTree => {
            let dtb = match devicetree::locate(fw, config) {
                Some(tree) => {
                    info!(
                        "device tree at {:#x} ({} bytes)",
                        tree.addr, tree.total_size
                    );
                    tree.addr
                }
                None => {
                    info!("no device tree found; kernel gets a null pointer");
                    0
                }
            };

            // Absent protocol or failed query both mean hart 0.
            let hart_id = fw.boot_hart_id().unwrap_or(0);
            info!("boot hart id {hart_id}");

            Platform::DeviceTree { hart_id, dtb }
        }
        PlatformStyle::AcpiBootInfo => {
            let rsdp_addr = rsdp::find_rsdp(fw);
            if rsdp_addr == 0 {
                info!("no ACPI RSDP found; kernel gets a zero pointer");
            } else {
                info!("ACPI RSDP at {rsdp_addr:#x}");
            }

            let fb = fw.framebuffer().unwrap_or_else(|| {
                debug!("no linear framebuffer; zero-filling the fields");
                FramebufferInfo::EMPTY
            });

            Platform::BootInfo { rsdp_addr, fb }
        }
    }
}
