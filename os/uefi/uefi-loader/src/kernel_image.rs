//! # Kernel Image Loading
//!
//! Stages 1–6 of the boot sequence: discover the boot volume, open the kernel
//! file, size it, allocate physical pages, read the image in one call, close
//! the handles. The image is a flat binary — no parsing, no relocation; byte
//! zero of the file is the entry point.

use log::{debug, info};

use crate::config::LoaderConfig;
use crate::error::BootError;
use crate::firmware::{AllocateMode, Firmware};
use uefi::Status;
use uefi::boot::PAGE_SIZE;

/// A kernel image resident in physical memory. Immutable once loaded.
#[derive(Clone, Copy, Debug)]
pub struct KernelImage {
    /// Exact byte length of the image file.
    pub size_bytes: usize,
    /// Physical address the image was loaded at; also the entry point.
    pub load_addr: u64,
    /// Pages backing the image.
    pub pages: usize,
}

/// Pages needed to hold `size_bytes` bytes.
#[must_use]
pub const fn page_count(size_bytes: usize) -> usize {
    size_bytes.div_ceil(PAGE_SIZE)
}

/// Loads the kernel image into physical memory.
///
/// Allocation is tried at the configured fixed address first; if the firmware
/// reports that range busy, a firmware-chosen address is accepted instead.
/// The pages are requested as loader-code class so they survive
/// `ExitBootServices`.
pub fn load<F: Firmware>(fw: &mut F, config: &LoaderConfig) -> Result<KernelImage, BootError> {
    fw.open_boot_volume().map_err(BootError::Discovery)?;

    info!("opening kernel image {}", config.kernel_path);
    fw.open_kernel(config.kernel_path)
        .map_err(|status| BootError::KernelNotFound {
            path: config.kernel_path,
            status,
        })?;

    let size_bytes = fw.kernel_size().map_err(BootError::FileInfo)?;
    let size_bytes = usize::try_from(size_bytes)
        .map_err(|_| BootError::FileInfo(Status::BAD_BUFFER_SIZE))?;
    let pages = page_count(size_bytes);
    info!("kernel image is {size_bytes} bytes ({pages} pages)");

    let load_addr = match fw.allocate_pages(AllocateMode::Fixed(config.load_addr), pages) {
        Ok(addr) => addr,
        Err(status) => {
            debug!(
                "fixed load address {:#x} unavailable ({status:?}), trying any address",
                config.load_addr
            );
            fw.allocate_pages(AllocateMode::Any, pages)
                .map_err(BootError::Allocate)?
        }
    };
    info!("kernel memory at {load_addr:#x}");

    let got = fw.read_kernel(load_addr, size_bytes).map_err(BootError::Read)?;
    if got != size_bytes {
        return Err(BootError::ShortRead {
            expected: size_bytes,
            got,
        });
    }

    fw.close_kernel();

    Ok(KernelImage {
        size_bytes,
        load_addr,
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(342), 1);
        assert_eq!(page_count(PAGE_SIZE), 1);
        assert_eq!(page_count(PAGE_SIZE + 1), 2);
        assert_eq!(page_count(10 * PAGE_SIZE - 1), 10);
        assert_eq!(page_count(10 * PAGE_SIZE), 10);
    }
}
