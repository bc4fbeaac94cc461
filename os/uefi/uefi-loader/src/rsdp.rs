//! # Root System Description Pointer
//!
//! x86_64 kernels use the ACPI table chain instead of a device tree. The
//! firmware publishes the RSDP in the configuration tables, possibly under
//! both the ACPI 2.0 and the legacy 1.0 GUID.

use crate::firmware::Firmware;
use uefi::table::cfg::{ACPI_GUID, ACPI2_GUID};

/// Returns the physical address of the RSDP, or 0 if absent.
///
/// Prefers the ACPI 2.0 entry; a missing RSDP is a soft failure — the kernel
/// is launched with a zero pointer.
pub fn find_rsdp<F: Firmware>(fw: &F) -> u64 {
    fw.config_table(&ACPI2_GUID)
        .or_else(|| fw.config_table(&ACPI_GUID))
        .unwrap_or(0)
}
