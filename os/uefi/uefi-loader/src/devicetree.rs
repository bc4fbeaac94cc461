//! # Device Tree Discovery
//!
//! RISC-V kernels receive a pointer to a flattened device tree (FDT). The
//! firmware normally publishes it in the EFI configuration tables; some
//! OpenSBI-based setups instead leave it at a conventional physical address.
//! Either way the blob is used in place — the loader validates the header and
//! passes the pointer through, it never copies or relocates the tree.

use log::debug;

use crate::config::LoaderConfig;
use crate::firmware::Firmware;
use uefi::{Guid, guid};

/// `EFI_DTB_TABLE_GUID`, the configuration-table entry carrying the FDT.
pub const DTB_TABLE_GUID: Guid = guid!("b1b621d5-f19c-41a5-830b-d9152c69aae0");

/// Big-endian magic in the first word of every FDT header.
pub const FDT_MAGIC: u32 = 0xd00d_feed;

/// Bytes of header needed to validate a candidate: magic + totalsize.
pub const FDT_PROBE_LEN: usize = 8;

/// A validated device tree blob, used in place.
#[derive(Clone, Copy, Debug)]
pub struct DeviceTree {
    pub addr: u64,
    pub total_size: u32,
}

/// Validates an FDT header and extracts the self-reported total size.
///
/// The header stores all fields big-endian regardless of host endianness.
/// Returns `None` unless the magic matches and the size field is non-zero.
#[must_use]
pub fn fdt_total_size(header: &[u8]) -> Option<u32> {
    if header.len() < FDT_PROBE_LEN {
        return None;
    }
    let magic = u32::from_be_bytes(header[0..4].try_into().ok()?);
    if magic != FDT_MAGIC {
        return None;
    }
    let total_size = u32::from_be_bytes(header[4..8].try_into().ok()?);
    (total_size != 0).then_some(total_size)
}

/// Finds a device tree: configuration table first, then (if the build enables
/// it) the fixed fallback address.
///
/// Returning `None` is a soft failure; the kernel is launched with a null
/// pointer and is on its own if it needed the tree.
pub fn locate<F: Firmware>(fw: &F, config: &LoaderConfig) -> Option<DeviceTree> {
    let mut header = [0u8; FDT_PROBE_LEN];

    if let Some(addr) = fw.config_table(&DTB_TABLE_GUID) {
        if fw.read_phys(addr, &mut header) {
            if let Some(total_size) = fdt_total_size(&header) {
                debug!("device tree from config table at {addr:#x} ({total_size} bytes)");
                return Some(DeviceTree { addr, total_size });
            }
        }
        debug!("config table DTB entry at {addr:#x} failed validation");
    }

    let addr = config.dtb_fallback_addr?;
    if !fw.read_phys(addr, &mut header) {
        return None;
    }
    let total_size = fdt_total_size(&header)?;
    debug!("device tree at fallback address {addr:#x} ({total_size} bytes)");
    Some(DeviceTree { addr, total_size })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(magic: u32, total: u32) -> [u8; 8] {
        let mut h = [0u8; 8];
        h[0..4].copy_from_slice(&magic.to_be_bytes());
        h[4..8].copy_from_slice(&total.to_be_bytes());
        h
    }

    #[test]
    fn accepts_valid_header() {
        assert_eq!(fdt_total_size(&header(FDT_MAGIC, 0x2000)), Some(0x2000));
    }

    #[test]
    fn rejects_wrong_magic() {
        assert_eq!(fdt_total_size(&header(0xfeed_d00d, 0x2000)), None);
        assert_eq!(fdt_total_size(&header(0, 0x2000)), None);
    }

    #[test]
    fn rejects_zero_size() {
        assert_eq!(fdt_total_size(&header(FDT_MAGIC, 0)), None);
    }

    #[test]
    fn rejects_truncated_header() {
        assert_eq!(fdt_total_size(&[0xd0, 0x0d, 0xfe]), None);
        assert_eq!(fdt_total_size(&[]), None);
    }

    #[test]
    fn magic_is_checked_big_endian() {
        // A little-endian encoding of the magic must not validate.
        let mut h = [0u8; 8];
        h[0..4].copy_from_slice(&FDT_MAGIC.to_le_bytes());
        h[4..8].copy_from_slice(&0x100u32.to_be_bytes());
        assert_eq!(fdt_total_size(&h), None);
    }
}
