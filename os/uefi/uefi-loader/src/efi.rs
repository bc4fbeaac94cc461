//! # Production Firmware Implementation
//!
//! [`EfiFirmware`] implements the [`Firmware`] contract on top of the `uefi`
//! crate. Two calls go through `uefi-raw` instead of the high-level wrappers:
//! `GetMemoryMap` and `ExitBootServices`. The `uefi` crate's safe
//! `exit_boot_services` hides the map key and retries internally; the
//! sequencer owns that retry policy here, so those two calls are made with
//! the key held explicitly.

use core::ffi::c_void;

use crate::firmware::{AllocateMode, Firmware, MapMeta};
use kernel_info::{BootPixelFormat, BootPixelMasks, FramebufferInfo};
use uefi::boot::{self, AllocateType, MemoryType, ScopedProtocol};
use uefi::proto::console::gop::{GraphicsOutput, PixelFormat};
use uefi::proto::media::file::{Directory, File, FileAttribute, FileInfo, FileMode, RegularFile};
use uefi::proto::media::fs::SimpleFileSystem;
use uefi::proto::unsafe_protocol;
use uefi::{CStr16, Guid, Status, system};
use uefi_raw::table::boot::MemoryDescriptor;

/// `RISCV_EFI_BOOT_PROTOCOL` from the RISC-V UEFI platform specification.
/// Published by the firmware so loaders can learn which hart they run on.
#[repr(C)]
#[unsafe_protocol("ccd15aa8-5e42-4c68-8836-241c1d1c179a")]
pub struct RiscvBootProtocol {
    pub revision: u64,
    pub get_boot_hart_id:
        unsafe extern "efiapi" fn(this: *mut RiscvBootProtocol, boot_hart_id: *mut usize) -> Status,
}

/// Firmware access for a real UEFI environment.
///
/// Owns the volume and file handles produced along the way; the firmware
/// itself owns the underlying device.
#[derive(Default)]
pub struct EfiFirmware {
    fs: Option<ScopedProtocol<SimpleFileSystem>>,
    root: Option<Directory>,
    kernel: Option<RegularFile>,
}

impl EfiFirmware {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fs: None,
            root: None,
            kernel: None,
        }
    }
}

impl Firmware for EfiFirmware {
    fn open_boot_volume(&mut self) -> Result<(), Status> {
        let image = boot::image_handle();
        let mut fs = boot::get_image_file_system(image).map_err(|e| e.status())?;
        let root = fs.open_volume().map_err(|e| e.status())?;
        self.fs = Some(fs);
        self.root = Some(root);
        Ok(())
    }

    fn open_kernel(&mut self, path: &CStr16) -> Result<(), Status> {
        let root = self.root.as_mut().ok_or(Status::NOT_READY)?;
        let handle = root
            .open(path, FileMode::Read, FileAttribute::empty())
            .map_err(|e| e.status())?;
        let file = handle.into_regular_file().ok_or(Status::NOT_FOUND)?;
        self.kernel = Some(file);
        Ok(())
    }

    fn kernel_size(&mut self) -> Result<u64, Status> {
        let file = self.kernel.as_mut().ok_or(Status::NOT_READY)?;
        let info = file.get_boxed_info::<FileInfo>().map_err(|e| e.status())?;
        Ok(info.file_size())
    }

    fn allocate_pages(&mut self, mode: AllocateMode, pages: usize) -> Result<u64, Status> {
        let ty = match mode {
            AllocateMode::Fixed(addr) => AllocateType::Address(addr),
            AllocateMode::Any => AllocateType::AnyPages,
        };
        // LOADER_CODE: the region must stay reserved for the kernel image
        // across ExitBootServices.
        let base = boot::allocate_pages(ty, MemoryType::LOADER_CODE, pages)
            .map_err(|e| e.status())?;
        Ok(base.as_ptr() as u64)
    }

    fn read_kernel(&mut self, dst: u64, len: usize) -> Result<usize, Status> {
        let file = self.kernel.as_mut().ok_or(Status::NOT_READY)?;
        // SAFETY: `dst` is the base of a page allocation of at least `len`
        // bytes, made by `allocate_pages` above and owned by this loader.
        let buf = unsafe { core::slice::from_raw_parts_mut(dst as usize as *mut u8, len) };
        file.read(buf).map_err(|e| e.status())
    }

    fn close_kernel(&mut self) {
        if let Some(kernel) = self.kernel.take() {
            kernel.close();
        }
        if let Some(root) = self.root.take() {
            root.close();
        }
        self.fs = None;
    }

    fn config_table(&self, guid: &Guid) -> Option<u64> {
        system::with_config_table(|entries| {
            entries
                .iter()
                .find(|entry| entry.guid == *guid)
                .map(|entry| entry.address as usize as u64)
        })
    }

    fn read_phys(&self, addr: u64, buf: &mut [u8]) -> bool {
        if addr == 0 {
            return false;
        }
        // UEFI executes identity-mapped, so a physical address is directly
        // dereferenceable here.
        let src = addr as usize as *const u8;
        unsafe {
            core::ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), buf.len());
        }
        true
    }

    fn boot_hart_id(&mut self) -> Option<usize> {
        let handle = boot::get_handle_for_protocol::<RiscvBootProtocol>().ok()?;
        let proto = boot::open_protocol_exclusive::<RiscvBootProtocol>(handle).ok()?;
        let mut hart_id = 0usize;
        let this = core::ptr::from_ref::<RiscvBootProtocol>(&*proto).cast_mut();
        let status = unsafe { (proto.get_boot_hart_id)(this, &mut hart_id) };
        status.is_success().then_some(hart_id)
    }

    fn framebuffer(&mut self) -> Option<FramebufferInfo> {
        let handle = boot::get_handle_for_protocol::<GraphicsOutput>().ok()?;
        let mut gop = boot::open_protocol_exclusive::<GraphicsOutput>(handle).ok()?;

        let mode = gop.current_mode_info();
        let (width, height) = mode.resolution();
        let stride = mode.stride();

        let zero_masks = BootPixelMasks {
            red_mask: 0,
            green_mask: 0,
            blue_mask: 0,
            alpha_mask: 0,
        };
        let (format, masks) = match mode.pixel_format() {
            PixelFormat::Rgb => (BootPixelFormat::Rgb, zero_masks),
            PixelFormat::Bgr => (BootPixelFormat::Bgr, zero_masks),
            PixelFormat::Bitmask => {
                let m = mode.pixel_bitmask()?;
                (
                    BootPixelFormat::Bitmask,
                    BootPixelMasks {
                        red_mask: m.red,
                        green_mask: m.green,
                        blue_mask: m.blue,
                        alpha_mask: m.reserved,
                    },
                )
            }
            // No linear framebuffer to hand over; the kernel gets zeros.
            PixelFormat::BltOnly => return None,
        };

        let mut fb = gop.frame_buffer();
        Some(FramebufferInfo {
            framebuffer_ptr: fb.as_mut_ptr() as u64,
            framebuffer_size: fb.size() as u64,
            framebuffer_width: width as u64,
            framebuffer_height: height as u64,
            framebuffer_stride: stride as u64,
            framebuffer_format: format,
            framebuffer_masks: masks,
        })
    }

    fn memory_map(&mut self, buf: &mut [u8]) -> Result<MapMeta, Status> {
        let st = uefi::table::system_table_raw().ok_or(Status::NOT_READY)?;
        let bs = unsafe { (*st.as_ptr()).boot_services };

        let mut map_size = buf.len();
        let mut map_key = 0usize;
        let mut desc_size = 0usize;
        let mut desc_version = 0u32;
        let status = unsafe {
            ((*bs).get_memory_map)(
                &mut map_size,
                buf.as_mut_ptr().cast::<MemoryDescriptor>(),
                &mut map_key,
                &mut desc_size,
                &mut desc_version,
            )
        };
        if !status.is_success() {
            return Err(status);
        }
        Ok(MapMeta {
            map_size,
            map_key,
            desc_size,
            desc_version,
        })
    }

    fn exit_boot_services(&mut self, map_key: usize) -> Result<(), Status> {
        // From here on the console must be treated as gone, success or not.
        crate::logger::mark_boot_services_exited();

        let st = uefi::table::system_table_raw().ok_or(Status::NOT_READY)?;
        let bs = unsafe { (*st.as_ptr()).boot_services };
        let image: *mut c_void = boot::image_handle().as_ptr();
        let status = unsafe { ((*bs).exit_boot_services)(image, map_key) };
        if status.is_success() { Ok(()) } else { Err(status) }
    }
}
