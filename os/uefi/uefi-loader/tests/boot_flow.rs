//! End-to-end sequencer tests against a scripted firmware double.
//!
//! These cover the ordering, fallback, and retry policies of the boot
//! sequence: the allocation fallback, the soft-failure platform lookups, and
//! the single-retry `ExitBootServices` commit.

use std::collections::HashMap;

use kernel_info::{BOOT_INFO_MAGIC, FramebufferInfo};
use uefi::{CStr16, Guid, Status};
use uefi_loader::config::LoaderConfig;
use uefi_loader::devicetree::{DTB_TABLE_GUID, FDT_MAGIC};
use uefi_loader::error::BootError;
use uefi_loader::firmware::{AllocateMode, Firmware, MapMeta};
use uefi_loader::sequence::{self, Handoff, Outcome};

const RISCV: LoaderConfig = LoaderConfig::RISCV;
const X86_64: LoaderConfig = LoaderConfig::X86_64;

const ACPI_GUID: Guid = uefi::table::cfg::ACPI_GUID;
const ACPI2_GUID: Guid = uefi::table::cfg::ACPI2_GUID;

/// Scripted firmware: behavior is configured up front, calls are counted.
struct MockFirmware {
    /// Kernel file content; `None` means the file does not exist.
    kernel: Option<Vec<u8>>,
    /// Bytes the read call actually delivers; defaults to the full file.
    read_limit: Option<usize>,
    fixed_alloc_ok: bool,
    any_alloc_addr: Option<u64>,
    tables: Vec<(Guid, u64)>,
    phys: HashMap<u64, Vec<u8>>,
    hart_id: Option<usize>,
    fb: Option<FramebufferInfo>,
    /// Number of `exit_boot_services` calls to fail with a stale key.
    stale_exits: u32,
    /// When set, every snapshot request fails.
    mmap_fails: bool,

    volume_open: bool,
    kernel_open: bool,
    last_map_key: Option<usize>,
    alloc_calls: u32,
    read_calls: u32,
    map_calls: u32,
    exit_calls: u32,
    pages_requested: Vec<usize>,
    read_dst: Option<u64>,
}

impl MockFirmware {
    fn new() -> Self {
        Self {
            kernel: None,
            read_limit: None,
            fixed_alloc_ok: true,
            any_alloc_addr: None,
            tables: Vec::new(),
            phys: HashMap::new(),
            hart_id: None,
            fb: None,
            stale_exits: 0,
            mmap_fails: false,
            volume_open: false,
            kernel_open: false,
            last_map_key: None,
            alloc_calls: 0,
            read_calls: 0,
            map_calls: 0,
            exit_calls: 0,
            pages_requested: Vec::new(),
            read_dst: None,
        }
    }

    fn with_kernel(len: usize) -> Self {
        let mut fw = Self::new();
        fw.kernel = Some(vec![0xAA; len]);
        fw
    }

    fn valid_fdt(total_size: u32) -> Vec<u8> {
        let mut blob = Vec::new();
        blob.extend_from_slice(&FDT_MAGIC.to_be_bytes());
        blob.extend_from_slice(&total_size.to_be_bytes());
        blob
    }
}

impl Firmware for MockFirmware {
    fn open_boot_volume(&mut self) -> Result<(), Status> {
        self.volume_open = true;
        Ok(())
    }

    fn open_kernel(&mut self, _path: &CStr16) -> Result<(), Status> {
        assert!(self.volume_open, "kernel opened before the volume");
        if self.kernel.is_some() {
            self.kernel_open = true;
            Ok(())
        } else {
            Err(Status::NOT_FOUND)
        }
    }

    fn kernel_size(&mut self) -> Result<u64, Status> {
        assert!(self.kernel_open);
        Ok(self.kernel.as_ref().unwrap().len() as u64)
    }

    fn allocate_pages(&mut self, mode: AllocateMode, pages: usize) -> Result<u64, Status> {
        self.alloc_calls += 1;
        self.pages_requested.push(pages);
        match mode {
            AllocateMode::Fixed(addr) => {
                if self.fixed_alloc_ok {
                    Ok(addr)
                } else {
                    Err(Status::NOT_FOUND)
                }
            }
            AllocateMode::Any => self.any_alloc_addr.ok_or(Status::OUT_OF_RESOURCES),
        }
    }

    fn read_kernel(&mut self, dst: u64, len: usize) -> Result<usize, Status> {
        assert!(self.kernel_open, "read without an open kernel file");
        self.read_calls += 1;
        self.read_dst = Some(dst);
        let available = self.kernel.as_ref().unwrap().len();
        Ok(self.read_limit.unwrap_or(available).min(len))
    }

    fn close_kernel(&mut self) {
        self.kernel_open = false;
    }

    fn config_table(&self, guid: &Guid) -> Option<u64> {
        self.tables
            .iter()
            .find(|(g, _)| g == guid)
            .map(|(_, addr)| *addr)
    }

    fn read_phys(&self, addr: u64, buf: &mut [u8]) -> bool {
        match self.phys.get(&addr) {
            Some(bytes) if bytes.len() >= buf.len() => {
                buf.copy_from_slice(&bytes[..buf.len()]);
                true
            }
            _ => false,
        }
    }

    fn boot_hart_id(&mut self) -> Option<usize> {
        self.hart_id
    }

    fn framebuffer(&mut self) -> Option<FramebufferInfo> {
        self.fb
    }

    fn memory_map(&mut self, buf: &mut [u8]) -> Result<MapMeta, Status> {
        assert!(buf.len() >= 1024, "snapshot buffer suspiciously small");
        self.map_calls += 1;
        if self.mmap_fails {
            return Err(Status::BUFFER_TOO_SMALL);
        }
        let map_key = self.map_calls as usize;
        self.last_map_key = Some(map_key);
        Ok(MapMeta {
            map_size: 42 * 48,
            map_key,
            desc_size: 48,
            desc_version: 1,
        })
    }

    fn exit_boot_services(&mut self, map_key: usize) -> Result<(), Status> {
        self.exit_calls += 1;
        if self.stale_exits > 0 {
            self.stale_exits -= 1;
            return Err(Status::INVALID_PARAMETER);
        }
        assert_eq!(Some(map_key), self.last_map_key, "stale map key committed");
        Ok(())
    }
}

#[test]
fn full_riscv_boot_with_device_tree_and_hart_id() {
    let mut fw = MockFirmware::with_kernel(342);
    fw.tables.push((DTB_TABLE_GUID, 0x4000_0000));
    fw.phys.insert(0x4000_0000, MockFirmware::valid_fdt(0x1800));
    fw.hart_id = Some(1);

    let mut mmap = vec![0u8; 16 * 1024];
    let outcome = sequence::run(&mut fw, &RISCV, &mut mmap);

    let Outcome::Ready(Handoff::DeviceTree {
        entry,
        hart_id,
        dtb,
    }) = outcome
    else {
        panic!("expected a device-tree handoff, got {outcome:?}");
    };
    assert_eq!(entry, RISCV.load_addr);
    assert_eq!(hart_id, 1);
    assert_eq!(dtb, 0x4000_0000);

    // 342 bytes round up to a single page.
    assert_eq!(fw.pages_requested, vec![1]);
    assert_eq!(fw.read_dst, Some(RISCV.load_addr));
    assert!(!fw.kernel_open, "kernel file left open");
}

#[test]
fn missing_kernel_halts_before_any_allocation() {
    let mut fw = MockFirmware::new();

    let mut mmap = vec![0u8; 16 * 1024];
    let outcome = sequence::run(&mut fw, &RISCV, &mut mmap);

    assert!(matches!(
        outcome,
        Outcome::Failed(BootError::KernelNotFound { .. })
    ));
    assert_eq!(fw.alloc_calls, 0);
    assert_eq!(fw.read_calls, 0);
    assert_eq!(fw.exit_calls, 0);
}

#[test]
fn fixed_address_failure_falls_back_to_any_address() {
    let mut fw = MockFirmware::with_kernel(8192);
    fw.fixed_alloc_ok = false;
    fw.any_alloc_addr = Some(0x9000_0000);
    fw.hart_id = Some(0);

    let mut mmap = vec![0u8; 16 * 1024];
    let outcome = sequence::run(&mut fw, &RISCV, &mut mmap);

    let Outcome::Ready(Handoff::DeviceTree { entry, .. }) = outcome else {
        panic!("expected a handoff, got {outcome:?}");
    };
    // The firmware-chosen address, not the fixed one, reaches the entry jump.
    assert_eq!(entry, 0x9000_0000);
    assert_eq!(fw.alloc_calls, 2);
    assert_eq!(fw.read_dst, Some(0x9000_0000));
}

#[test]
fn both_allocations_failing_is_fatal_and_skips_the_read() {
    let mut fw = MockFirmware::with_kernel(4096);
    fw.fixed_alloc_ok = false;
    fw.any_alloc_addr = None;

    let mut mmap = vec![0u8; 16 * 1024];
    let outcome = sequence::run(&mut fw, &RISCV, &mut mmap);

    assert!(matches!(outcome, Outcome::Failed(BootError::Allocate(_))));
    assert_eq!(fw.alloc_calls, 2);
    assert_eq!(fw.read_calls, 0);
}

#[test]
fn short_read_is_fatal() {
    let mut fw = MockFirmware::with_kernel(100);
    fw.read_limit = Some(50);

    let mut mmap = vec![0u8; 16 * 1024];
    let outcome = sequence::run(&mut fw, &RISCV, &mut mmap);

    assert!(matches!(
        outcome,
        Outcome::Failed(BootError::ShortRead {
            expected: 100,
            got: 50
        })
    ));
    assert_eq!(fw.exit_calls, 0);
}

#[test]
fn invalid_config_table_blob_falls_back_to_fixed_probe_address() {
    let mut fw = MockFirmware::with_kernel(342);
    // Config table points at garbage; the OpenSBI-convention address holds
    // the real tree.
    fw.tables.push((DTB_TABLE_GUID, 0x4000_0000));
    fw.phys.insert(0x4000_0000, vec![0u8; 8]);
    let fallback = RISCV.dtb_fallback_addr.unwrap();
    fw.phys.insert(fallback, MockFirmware::valid_fdt(0x2000));

    let mut mmap = vec![0u8; 16 * 1024];
    let outcome = sequence::run(&mut fw, &RISCV, &mut mmap);

    let Outcome::Ready(Handoff::DeviceTree { dtb, .. }) = outcome else {
        panic!("expected a handoff, got {outcome:?}");
    };
    assert_eq!(dtb, fallback);
}

#[test]
fn missing_device_tree_and_hart_protocol_are_soft_failures() {
    let mut fw = MockFirmware::with_kernel(342);

    let mut mmap = vec![0u8; 16 * 1024];
    let outcome = sequence::run(&mut fw, &RISCV, &mut mmap);

    let Outcome::Ready(Handoff::DeviceTree {
        hart_id, dtb, ..
    }) = outcome
    else {
        panic!("expected a handoff, got {outcome:?}");
    };
    assert_eq!(dtb, 0, "absent tree must become a null pointer");
    assert_eq!(hart_id, 0, "absent protocol must default to hart 0");
}

#[test]
fn memory_map_failure_is_fatal_before_any_exit_attempt() {
    let mut fw = MockFirmware::with_kernel(342);
    fw.mmap_fails = true;

    let mut mmap = vec![0u8; 16 * 1024];
    let outcome = sequence::run(&mut fw, &RISCV, &mut mmap);

    // The snapshot is mandatory input for termination; without it the boot
    // halts while the console is still alive.
    assert!(matches!(outcome, Outcome::Failed(BootError::MemoryMap(_))));
    assert_eq!(fw.map_calls, 1);
    assert_eq!(fw.exit_calls, 0, "no termination without a snapshot");
}

#[test]
fn stale_map_key_is_retried_exactly_once_then_succeeds() {
    let mut fw = MockFirmware::with_kernel(342);
    fw.stale_exits = 1;

    let mut mmap = vec![0u8; 16 * 1024];
    let outcome = sequence::run(&mut fw, &RISCV, &mut mmap);

    assert!(matches!(outcome, Outcome::Ready(_)));
    assert_eq!(fw.map_calls, 2, "one snapshot plus one re-snapshot");
    assert_eq!(fw.exit_calls, 2, "one attempt plus one retry");
}

#[test]
fn second_stale_map_key_is_unreportable_and_makes_no_further_calls() {
    let mut fw = MockFirmware::with_kernel(342);
    fw.stale_exits = 2;

    let mut mmap = vec![0u8; 16 * 1024];
    let outcome = sequence::run(&mut fw, &RISCV, &mut mmap);

    assert!(matches!(outcome, Outcome::Unreportable));
    assert_eq!(fw.exit_calls, 2, "no third attempt is permitted");
    assert_eq!(fw.map_calls, 2, "no snapshot after the failed retry");
}

#[test]
fn x86_boot_info_record_is_assembled_and_prefers_acpi2() {
    let mut fw = MockFirmware::with_kernel(0x3000);
    fw.tables.push((ACPI_GUID, 0x000E_0000));
    fw.tables.push((ACPI2_GUID, 0x000E_2000));

    let mut mmap = vec![0u8; 16 * 1024];
    let mmap_ptr = mmap.as_ptr() as u64;
    let outcome = sequence::run(&mut fw, &X86_64, &mut mmap);

    let Outcome::Ready(Handoff::BootInfo { entry, info }) = outcome else {
        panic!("expected a boot-info handoff, got {outcome:?}");
    };
    assert_eq!(entry, X86_64.load_addr);
    assert_eq!(info.magic, BOOT_INFO_MAGIC);
    assert_eq!(info.rsdp_addr, 0x000E_2000, "ACPI 2.0 entry must win");
    assert_eq!(info.mmap.mmap_ptr, mmap_ptr);
    assert_eq!(info.mmap.mmap_len, 42 * 48);
    assert_eq!(info.mmap.mmap_desc_size, 48);
    assert_eq!(info.mmap.mmap_desc_version, 1);
    // No framebuffer was offered, so the fields must be zero-filled.
    assert_eq!(info.fb.framebuffer_ptr, 0);
    assert_eq!(info.fb.framebuffer_size, 0);
    assert_eq!(fw.pages_requested, vec![3]);
}

#[test]
fn x86_without_acpi2_uses_legacy_rsdp() {
    let mut fw = MockFirmware::with_kernel(0x1000);
    fw.tables.push((ACPI_GUID, 0x000E_0000));

    let mut mmap = vec![0u8; 16 * 1024];
    let outcome = sequence::run(&mut fw, &X86_64, &mut mmap);

    let Outcome::Ready(Handoff::BootInfo { info, .. }) = outcome else {
        panic!("expected a boot-info handoff, got {outcome:?}");
    };
    assert_eq!(info.rsdp_addr, 0x000E_0000);
}
